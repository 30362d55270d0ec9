//! Exports [`Indexer`] and [`build_index`], which stitch together the steps of
//! indexing a content directory: scanning for source files
//! ([`crate::scan`]), parsing them into posts ([`crate::post`]), sorting them
//! into a [`Collection`], and deriving the tag and archive indices
//! ([`crate::index`]). The result is a [`Snapshot`].
//!
//! Problems with individual files are collected as [`Issue`]s and don't stop
//! the build. Two things do: an unavailable content root, and two files
//! whose names produce the same slug.

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::collection::{Collection, NotFound};
use crate::config::Config;
use crate::index::{self, ArchiveIndex, TagIndex};
use crate::markdown::{Markdown, Renderer};
use crate::post::{slug_for, Issue, IssueKind, Parsed, Parser as PostParser, Post};
use crate::scan::{self, Scanner, MARKDOWN_EXTENSION};

/// One consistent view of the content directory: the sorted posts and the
/// indices derived from them, built together and never modified afterwards.
#[derive(Debug)]
pub struct Snapshot {
    /// Every successfully parsed post, most recent first.
    pub posts: Collection,

    /// Every tag used by any post.
    pub tags: TagIndex,

    /// Post counts per year and month.
    pub archive: ArchiveIndex,

    /// Non-fatal problems encountered while building, ordered by path.
    pub issues: Vec<Issue>,

    /// When the snapshot was built.
    pub built_at: Instant,
}

impl Snapshot {
    /// Shorthand for `self.posts.get(slug)`.
    pub fn get(&self, slug: &str) -> std::result::Result<&Arc<Post>, NotFound> {
        self.posts.get(slug)
    }

    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }
}

/// Builds [`Snapshot`]s from a content directory.
#[derive(Clone)]
pub struct Indexer {
    scanner: Scanner,
    threads: Option<usize>,
    renderer: Arc<dyn Renderer>,
}

impl Indexer {
    /// Constructs an indexer for `.md` files under `root`, rendering bodies
    /// with `renderer` on rayon's global thread pool.
    pub fn new<P: Into<PathBuf>>(root: P, renderer: Arc<dyn Renderer>) -> Indexer {
        Indexer {
            scanner: Scanner::new(root, MARKDOWN_EXTENSION),
            threads: None,
            renderer,
        }
    }

    /// Constructs an indexer from project configuration, using the default
    /// Markdown renderer.
    pub fn from_config(config: &Config) -> Indexer {
        Indexer {
            scanner: Scanner::new(&config.content_directory, config.extension.as_str()),
            threads: config.threads,
            renderer: Arc::new(Markdown::with_heading_offset(config.heading_offset)),
        }
    }

    /// Parses on a dedicated pool of `threads` workers instead of the global
    /// pool.
    pub fn with_threads(mut self, threads: usize) -> Indexer {
        self.threads = Some(threads);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Indexer {
        self.renderer = renderer;
        self
    }

    pub fn root(&self) -> &Path {
        self.scanner.root()
    }

    /// Scans the content root and builds a fresh [`Snapshot`].
    pub fn build(&self) -> Result<Snapshot> {
        let mut issues = Vec::new();
        let mut paths = Vec::new();
        for result in self.scanner.scan()? {
            match result {
                Ok(path) => {
                    debug!(path = %path.display(), "discovered post");
                    paths.push(path);
                }
                Err(err) => {
                    let path = err
                        .path()
                        .map(|path| self.scanner.relative(path))
                        .unwrap_or_default();
                    issues.push(Issue {
                        path,
                        kind: IssueKind::Walk(err),
                    });
                }
            }
        }
        check_slugs(&paths)?;

        let mut posts = Vec::with_capacity(paths.len());
        for result in self.parse_all(&paths)? {
            match result {
                Ok(Parsed { post, warnings }) => {
                    posts.push(post);
                    issues.extend(warnings);
                }
                Err(issue) => issues.push(issue),
            }
        }
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        for issue in &issues {
            warn!(
                path = %issue.path.display(),
                omitted = issue.is_omission(),
                error = %issue,
                "problem with post"
            );
        }

        let posts = Collection::new(posts);
        let (tags, archive) = index::build(posts.iter().map(|p| &**p));
        info!(
            root = %self.root().display(),
            posts = posts.len(),
            tags = tags.len(),
            years = archive.len(),
            issues = issues.len(),
            "built index"
        );
        Ok(Snapshot {
            posts,
            tags,
            archive,
            issues,
            built_at: Instant::now(),
        })
    }

    fn parse_all(&self, paths: &[PathBuf]) -> Result<Vec<ParseResult>> {
        let parser = PostParser::new(&*self.renderer);
        let root = self.root();
        let parse = || -> Vec<ParseResult> {
            paths
                .par_iter()
                .map(|path| parser.parse_post(root, path))
                .collect()
        };
        match self.threads {
            None => Ok(parse()),
            Some(threads) => Ok(ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()?
                .install(parse)),
        }
    }
}

type ParseResult = std::result::Result<Parsed, Issue>;

/// Builds a [`Snapshot`] of the `.md` files under `root` with the default
/// Markdown renderer.
pub fn build_index<P: Into<PathBuf>>(root: P) -> Result<Snapshot> {
    Indexer::new(root, Arc::new(Markdown::default())).build()
}

/// Fails if two paths produce the same slug. Paths are visited in sorted
/// order so the reported pair doesn't depend on discovery order. Paths with
/// no valid slug are left for the parser to report.
fn check_slugs(paths: &[PathBuf]) -> Result<()> {
    let mut sorted: Vec<&PathBuf> = paths.iter().collect();
    sorted.sort();
    let mut seen: HashMap<String, &PathBuf> = HashMap::with_capacity(paths.len());
    for path in sorted {
        if let Ok(slug) = slug_for(path) {
            if let Some(first) = seen.insert(slug.clone(), path) {
                return Err(Error::SlugCollision {
                    slug,
                    first: first.clone(),
                    second: path.clone(),
                });
            }
        }
    }
    Ok(())
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a snapshot. Any of these aborts the whole
/// build.
#[derive(Debug)]
pub enum Error {
    /// Returned when the content root can't be scanned.
    Scan(scan::Error),

    /// Returned when two source files map to the same slug.
    SlugCollision {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Returned when the parsing thread pool can't be created.
    ThreadPool(rayon::ThreadPoolBuildError),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Scan(err) => err.fmt(f),
            Error::SlugCollision {
                slug,
                first,
                second,
            } => write!(
                f,
                "Slug `{}` is claimed by both '{}' and '{}'",
                slug,
                first.display(),
                second.display()
            ),
            Error::ThreadPool(err) => {
                write!(f, "Creating thread pool: {}", err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::SlugCollision { .. } => None,
            Error::ThreadPool(err) => Some(err),
        }
    }
}

impl From<scan::Error> for Error {
    /// Converts [`scan::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: scan::Error) -> Error {
        Error::Scan(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for Error {
    /// Converts [`rayon::ThreadPoolBuildError`]s into [`Error`]. This allows
    /// us to use the `?` operator.
    fn from(err: rayon::ThreadPoolBuildError) -> Error {
        Error::ThreadPool(err)
    }
}
