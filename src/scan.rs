//! Discovers post source files beneath a content root.
//!
//! Posts may be organized into arbitrarily nested subdirectories (e.g., by
//! category); only the file name matters for the post's slug. Hidden files
//! and directories (names beginning with `.`) are skipped. Symbolic links are
//! followed; a link cycle is reported as a walk error on the looping entry.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// The default extension for post source files.
pub const MARKDOWN_EXTENSION: &str = "md";

/// Walks a content root looking for post source files.
#[derive(Clone, Debug)]
pub struct Scanner {
    root: PathBuf,
    extension: String,
}

impl Scanner {
    /// Constructs a scanner for files under `root` whose extension is exactly
    /// `extension` (without the leading dot).
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root: P, extension: S) -> Scanner {
        Scanner {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns a lazy iterator over the paths of matching files, relative to
    /// the root. Fails up front if the root is missing, isn't a directory, or
    /// can't be read. Errors visiting individual entries are yielded in-line
    /// so the caller can skip them.
    pub fn scan(
        &self,
    ) -> Result<impl Iterator<Item = std::result::Result<PathBuf, walkdir::Error>> + '_> {
        self.check_root()?;
        Ok(WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry))
            .filter_map(move |result| match result {
                Err(err) => Some(Err(err)),
                Ok(entry) if self.is_post(&entry) => Some(Ok(self.relative(entry.path()))),
                Ok(_) => None,
            }))
    }

    fn check_root(&self) -> Result<()> {
        let unavailable = |err| Error::StoreUnavailable {
            path: self.root.clone(),
            err,
        };
        let metadata = fs::metadata(&self.root).map_err(unavailable)?;
        if !metadata.is_dir() {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::Other,
                "not a directory",
            )));
        }
        fs::read_dir(&self.root).map_err(unavailable)?;
        Ok(())
    }

    fn is_post(&self, entry: &DirEntry) -> bool {
        entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == self.extension.as_str())
    }

    /// Returns `path` relative to the root, or `path` unchanged if it lies
    /// outside it.
    pub(crate) fn relative(&self, path: &Path) -> PathBuf {
        // strip_prefix shouldn't fail since the root is always an ancestor of
        // the entry path
        path.strip_prefix(&self.root).unwrap_or(path).to_owned()
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().map_or(false, |name| name.starts_with('.'))
}

/// Represents the result of a scan operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error scanning the content root.
#[derive(Debug)]
pub enum Error {
    /// Returned when the content root doesn't exist or can't be read.
    StoreUnavailable { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::StoreUnavailable { path, err } => {
                write!(f, "Content directory '{}' unavailable: {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StoreUnavailable { path: _, err } => Some(err),
        }
    }
}
