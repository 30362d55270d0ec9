//! Defines the [`Post`], [`Parser`], and [`Issue`] types. [`Parser`] turns a
//! single source file into a [`Post`], applying defaults for missing metadata
//! and rendering the body through a [`Renderer`]. Problems that affect only
//! one file are reported as [`Issue`]s instead of aborting the build.

use chrono::NaiveDate;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::frontmatter;
use crate::markdown::{self, Renderer};

/// The date format expected in the `date` frontmatter field.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A single post, fully parsed and rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// Unique identifier, taken from the file name less its extension.
    pub slug: String,

    /// The title of the post. Defaults to the slug.
    pub title: String,

    /// The publish date, if the post has a valid one.
    pub date: Option<NaiveDate>,

    /// The tags associated with the post, in source order.
    pub tags: Vec<String>,

    /// The raw Markdown body.
    pub body: String,

    /// The body after rendering.
    pub rendered_html: String,

    /// The source file, relative to the content root.
    pub source_path: PathBuf,

    /// Frontmatter keys with no meaning to the indexer.
    pub extra: BTreeMap<String, Value>,
}

impl Post {
    /// Returns true if the post carries `tag` (exact match).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// The outcome of parsing one file: the post plus any non-fatal problems
/// that were papered over while building it.
#[derive(Debug)]
pub struct Parsed {
    pub post: Post,
    pub warnings: Vec<Issue>,
}

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    renderer: &'a dyn Renderer,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser which renders post bodies with `renderer`.
    pub fn new(renderer: &'a dyn Renderer) -> Parser<'a> {
        Parser { renderer }
    }

    /// Reads and parses the file at `root/relative_path`. Any error is
    /// annotated with `relative_path`.
    pub fn parse_post(
        &self,
        root: &Path,
        relative_path: &Path,
    ) -> Result<Parsed, Issue> {
        let contents = fs::read_to_string(root.join(relative_path)).map_err(
            |err| Issue::new(relative_path, IssueKind::Unreadable(err)),
        )?;
        self.parse_str(relative_path, &contents)
    }

    /// Parses an in-memory document. `relative_path` determines the slug.
    pub fn parse_str(
        &self,
        relative_path: &Path,
        contents: &str,
    ) -> Result<Parsed, Issue> {
        let annotate = |kind: IssueKind| Issue::new(relative_path, kind);

        let slug = slug_for(relative_path).map_err(|e| {
            annotate(IssueKind::InvalidFileName(e.0))
        })?;
        let document = frontmatter::parse(contents)
            .map_err(|e| annotate(IssueKind::Malformed(e)))?;
        let frontmatter::Frontmatter {
            title,
            date,
            tags,
            extra,
        } = document.frontmatter;

        let mut warnings = Vec::new();
        let date = match date.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
                Ok(date) => Some(date),
                Err(_) => {
                    warnings.push(annotate(IssueKind::InvalidDate(
                        raw.to_owned(),
                    )));
                    None
                }
            },
        };

        let body = document.body.to_owned();
        let rendered_html = match self.renderer.render(&body) {
            Ok(html) => html,
            Err(err) => {
                warnings.push(annotate(IssueKind::Render(err)));
                markdown::placeholder(&body)
            }
        };

        debug!(slug = %slug, path = %relative_path.display(), "parsed post");
        Ok(Parsed {
            post: Post {
                title: title.unwrap_or_else(|| slug.clone()),
                slug,
                date,
                tags,
                body,
                rendered_html,
                source_path: relative_path.to_owned(),
                extra,
            },
            warnings,
        })
    }
}

/// Derives a slug from a source path: the file name with its directory and
/// extension stripped. Only RFC 3986 unreserved characters are allowed so the
/// slug can be dropped straight into a URL.
pub fn slug_for(path: &Path) -> Result<String, InvalidFileNameError> {
    let invalid = || InvalidFileNameError(path.to_owned());
    let stem = path.file_stem().ok_or_else(invalid)?.to_str().ok_or_else(invalid)?;
    if stem.is_empty() || !stem.chars().all(is_unreserved) {
        return Err(invalid());
    }
    Ok(stem.to_owned())
}

fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~')
}

#[derive(Debug)]
pub struct InvalidFileNameError(pub PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// A non-fatal problem with one source file. Issues are collected during a
/// build and reported alongside the resulting snapshot.
#[derive(Debug)]
pub struct Issue {
    /// The offending file, relative to the content root when known.
    pub path: PathBuf,
    pub kind: IssueKind,
}

impl Issue {
    pub fn new(path: &Path, kind: IssueKind) -> Issue {
        Issue {
            path: path.to_owned(),
            kind,
        }
    }

    /// Returns true if the file behind this issue was left out of the
    /// collection entirely (as opposed to being included in degraded form).
    pub fn is_omission(&self) -> bool {
        !matches!(self.kind, IssueKind::InvalidDate(_) | IssueKind::Render(_))
    }
}

/// The kinds of [`Issue`].
#[derive(Debug)]
pub enum IssueKind {
    /// The file couldn't be read or isn't valid UTF-8. The post is omitted.
    Unreadable(std::io::Error),

    /// A directory entry couldn't be visited while scanning.
    Walk(walkdir::Error),

    /// The file name doesn't yield a usable slug. The post is omitted.
    InvalidFileName(PathBuf),

    /// The frontmatter is malformed. The post is omitted.
    Malformed(frontmatter::Error),

    /// The `date` field couldn't be parsed. The post is kept without a date.
    InvalidDate(String),

    /// The body failed to render. The post is kept with placeholder HTML.
    Render(markdown::Error),
}

impl fmt::Display for Issue {
    /// Displays an [`Issue`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: ", self.path.display())?;
        match &self.kind {
            IssueKind::Unreadable(err) => write!(f, "reading post: {}", err),
            IssueKind::Walk(err) => write!(f, "scanning: {}", err),
            IssueKind::InvalidFileName(path) => {
                write!(f, "no URL-safe slug in file name {:?}", path)
            }
            IssueKind::Malformed(err) => write!(f, "parsing post: {}", err),
            IssueKind::InvalidDate(raw) => {
                write!(f, "invalid date {:?}, expected YYYY-MM-DD", raw)
            }
            IssueKind::Render(err) => write!(f, "rendering post: {}", err),
        }
    }
}

impl std::error::Error for Issue {
    /// Implements the [`std::error::Error`] trait for [`Issue`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            IssueKind::Unreadable(err) => Some(err),
            IssueKind::Walk(err) => Some(err),
            IssueKind::InvalidFileName(_) => None,
            IssueKind::Malformed(err) => Some(err),
            IssueKind::InvalidDate(_) => None,
            IssueKind::Render(err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::markdown::Markdown;

    fn parse(path: &str, contents: &str) -> Result<Parsed, Issue> {
        Parser::new(&Markdown::default()).parse_str(Path::new(path), contents)
    }

    #[test]
    fn test_parse_full_post() -> Result<(), Issue> {
        let parsed = parse(
            "notes/hello-world.md",
            "---\ntitle: Hello\ndate: 2024-01-05\ntags: [go, systems]\n---\nHi *there*\n",
        )?;
        assert!(parsed.warnings.is_empty());
        let post = parsed.post;
        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.title, "Hello");
        assert_eq!(post.date, NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(post.tags, vec!["go", "systems"]);
        assert_eq!(post.body, "Hi *there*\n");
        assert_eq!(post.rendered_html, "<p>Hi <em>there</em></p>\n");
        assert_eq!(post.source_path, PathBuf::from("notes/hello-world.md"));
        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<(), Issue> {
        let parsed = parse("bare.md", "just a body")?;
        assert!(parsed.warnings.is_empty());
        assert_eq!(parsed.post.title, "bare");
        assert_eq!(parsed.post.date, None);
        assert!(parsed.post.tags.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_dates_degrade() -> Result<(), Issue> {
        for raw in &["2024-13-01", "2023-02-29", "yesterday", "2024"] {
            let parsed = parse("p.md", &format!("---\ndate: {}\n---\n", raw))?;
            assert_eq!(parsed.post.date, None, "{}", raw);
            assert_eq!(parsed.warnings.len(), 1, "{}", raw);
            assert!(matches!(
                &parsed.warnings[0].kind,
                IssueKind::InvalidDate(d) if d == raw
            ));
        }
        Ok(())
    }

    #[test]
    fn test_empty_date_is_silent() -> Result<(), Issue> {
        let parsed = parse("p.md", "---\ndate: \"\"\n---\n")?;
        assert_eq!(parsed.post.date, None);
        assert!(parsed.warnings.is_empty());
        Ok(())
    }

    #[test]
    fn test_leap_day() -> Result<(), Issue> {
        let parsed = parse("p.md", "---\ndate: 2024-02-29\n---\n")?;
        assert_eq!(parsed.post.date, NaiveDate::from_ymd_opt(2024, 2, 29));
        Ok(())
    }

    #[test]
    fn test_render_failure_is_isolated() -> Result<(), Issue> {
        let failing = |_: &str| -> Result<String, markdown::Error> {
            Err(markdown::Error::Rejected("nope".to_owned()))
        };
        let parsed = Parser::new(&failing)
            .parse_str(Path::new("broken.md"), "---\ntitle: T\n---\n<b>")?;
        assert_eq!(parsed.post.rendered_html, "<pre><code>&lt;b&gt;</code></pre>\n");
        assert_eq!(parsed.warnings.len(), 1);
        assert!(matches!(parsed.warnings[0].kind, IssueKind::Render(_)));
        assert!(!parsed.warnings[0].is_omission());
        Ok(())
    }

    #[test]
    fn test_malformed_is_an_issue() {
        let issue = parse("bad.md", "---\ntitle: never closed\n").unwrap_err();
        assert_eq!(issue.path, PathBuf::from("bad.md"));
        assert!(matches!(
            issue.kind,
            IssueKind::Malformed(frontmatter::Error::MissingEndFence)
        ));
        assert!(issue.is_omission());
    }

    #[test]
    fn test_slug_for() {
        assert_eq!(slug_for(Path::new("a/b/my-post.md")).unwrap(), "my-post");
        assert_eq!(slug_for(Path::new("v1.2_notes~.md")).unwrap(), "v1.2_notes~");
        assert!(slug_for(Path::new("has space.md")).is_err());
        assert!(slug_for(Path::new("caf\u{e9}.md")).is_err());
        assert!(slug_for(Path::new("..")).is_err());
    }

    #[test]
    fn test_has_tag_is_exact() -> Result<(), Issue> {
        let post = parse("p.md", "---\ntags: [Rust, go]\n---\n")?.post;
        assert!(post.has_tag("Rust"));
        assert!(!post.has_tag("rust"));
        Ok(())
    }
}
