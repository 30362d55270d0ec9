//! Loads project configuration from a `scrivener.yaml` file. Every key is
//! optional:
//!
//! ```yaml
//! content_directory: posts   # relative to this file
//! extension: md
//! threads: 4
//! heading_offset: 2
//! refresh_interval: 60       # seconds
//! ```

use serde::Deserialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "scrivener.yaml";

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default = "Project::default_content_directory")]
    content_directory: PathBuf,

    #[serde(default = "Project::default_extension")]
    extension: String,

    #[serde(default)]
    threads: Option<usize>,

    #[serde(default)]
    heading_offset: u32,

    #[serde(default)]
    refresh_interval: Option<u64>,
}

impl Project {
    fn default_content_directory() -> PathBuf {
        PathBuf::from("posts")
    }

    fn default_extension() -> String {
        String::from(crate::scan::MARKDOWN_EXTENSION)
    }
}

impl Default for Project {
    fn default() -> Project {
        Project {
            content_directory: Project::default_content_directory(),
            extension: Project::default_extension(),
            threads: None,
            heading_offset: 0,
            refresh_interval: None,
        }
    }
}

/// Resolved project settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// The directory holding post source files.
    pub content_directory: PathBuf,

    /// The extension of post source files, without the leading dot.
    pub extension: String,

    /// The number of parser threads. `None` uses rayon's global pool.
    pub threads: Option<usize>,

    /// How many levels to demote Markdown headings.
    pub heading_offset: u32,

    /// How old a cached snapshot may get before it is rebuilt.
    pub refresh_interval: Option<Duration>,
}

impl Config {
    /// Searches `dir` and then each of its ancestors for a
    /// [`PROJECT_FILE`] and loads the first one found. A relative `dir` is
    /// taken relative to the current working directory.
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let cwd = env::current_dir().map_err(|err| Error::Io {
            path: dir.to_owned(),
            err,
        })?;
        Config::search(&cwd.join(dir))
    }

    fn search(start: &Path) -> Result<Config> {
        for ancestor in start.ancestors() {
            let path = ancestor.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path);
            }
        }
        Err(Error::NotFound(start.to_owned()))
    }

    /// Loads the project file at `path`. Relative paths inside the file are
    /// resolved against the file's directory.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let contents = fs::read_to_string(path).map_err(|err| Error::Io {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = if contents.trim().is_empty() {
            Project::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|err| Error::Yaml {
                path: path.to_owned(),
                err,
            })?
        };
        let project_root = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Config::from_project(project_root, project))
    }

    /// Default settings for a content directory with no project file.
    pub fn for_content_directory<P: Into<PathBuf>>(dir: P) -> Config {
        Config {
            content_directory: dir.into(),
            ..Config::from_project(Path::new("."), Project::default())
        }
    }

    fn from_project(project_root: &Path, project: Project) -> Config {
        Config {
            content_directory: project_root.join(project.content_directory),
            extension: project.extension,
            threads: project.threads,
            heading_offset: project.heading_offset,
            refresh_interval: project.refresh_interval.map(Duration::from_secs),
        }
    }
}

/// Represents the result of loading configuration.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error loading configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned when no project file exists in the directory or any parent.
    NotFound(PathBuf),

    /// Returned when the project file can't be read.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid.
    Yaml { path: PathBuf, err: serde_yaml::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotFound(dir) => write!(
                f,
                "Could not find `{}` in '{}' or any parent directory",
                PROJECT_FILE,
                dir.display()
            ),
            Error::Io { path, err } => {
                write!(f, "Reading project file '{}': {}", path.display(), err)
            }
            Error::Yaml { path, err } => {
                write!(f, "Loading configuration '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::NotFound(_) => None,
            Error::Io { path: _, err } => Some(err),
            Error::Yaml { path: _, err } => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(PROJECT_FILE),
            "content_directory: content\nthreads: 2\nheading_offset: 1\nrefresh_interval: 30\n",
        )
        .unwrap();
        let nested = tmp.path().join("content/deep");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested)?;
        assert_eq!(config.content_directory, tmp.path().join("content"));
        assert_eq!(config.extension, "md");
        assert_eq!(config.threads, Some(2));
        assert_eq!(config.heading_offset, 1);
        assert_eq!(config.refresh_interval, Some(Duration::from_secs(30)));
        Ok(())
    }

    #[test]
    fn test_relative_start_searches_parents() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PROJECT_FILE), "content_directory: content\n").unwrap();
        let cwd = tmp.path().join("content/deep");
        fs::create_dir_all(&cwd).unwrap();

        // Resolved the way `from_directory` resolves against the working
        // directory.
        for start in &[".", "..", "./nested/.."] {
            let config = Config::search(&cwd.join(start))?;
            assert_eq!(config.content_directory, tmp.path().join("content"));
        }
        Ok(())
    }

    #[test]
    fn test_from_directory_resolves_relative_start() {
        match Config::from_directory(Path::new("definitely/not/here")) {
            Err(Error::NotFound(start)) => {
                assert!(start.is_absolute());
                assert!(start.ends_with("definitely/not/here"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            // A project file above the working directory is outside this
            // test's control.
            Ok(_) => {}
        }
    }

    #[test]
    fn test_empty_file_uses_defaults() -> Result<()> {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        fs::write(&path, "\n").unwrap();
        let config = Config::from_project_file(&path)?;
        assert_eq!(config.content_directory, tmp.path().join("posts"));
        assert_eq!(config.threads, None);
        assert_eq!(config.refresh_interval, None);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(PROJECT_FILE);
        fs::write(&path, "content_dir: typo\n").unwrap();
        assert!(matches!(Config::from_project_file(&path), Err(Error::Yaml { .. })));
    }

    #[test]
    fn test_for_content_directory() {
        let config = Config::for_content_directory("somewhere");
        assert_eq!(config.content_directory, PathBuf::from("somewhere"));
        assert_eq!(config.extension, "md");
        assert_eq!(config.heading_offset, 0);
    }
}
