//! Defines the [`Frontmatter`] and [`Document`] types and the [`parse`]
//! function which splits a post source file into its YAML header and its
//! Markdown body.
//!
//! A header is optional. When present it is fenced by `---` lines:
//!
//! ```md
//! ---
//! title: Hello, world!
//! date: 2021-04-16
//! tags: [greet]
//! ---
//! # Hello
//!
//! World
//! ```

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;

const FENCE: &str = "---";

/// The typed metadata header of a post. Every recognized field is optional;
/// defaults are applied later by [`crate::post::Parser`].
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Frontmatter {
    /// The title of the post.
    #[serde(default, alias = "Title", deserialize_with = "scalar")]
    pub title: Option<String>,

    /// The publish date of the post, unparsed. Expected to be `YYYY-MM-DD`.
    #[serde(default, alias = "Date", deserialize_with = "scalar")]
    pub date: Option<String>,

    /// The tags associated with the post, in source order.
    #[serde(default, alias = "Tags", deserialize_with = "tags")]
    pub tags: Vec<String>,

    /// Any keys we don't recognize. Kept around but otherwise ignored.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A source file split into its header and body.
#[derive(Debug, PartialEq)]
pub struct Document<'a> {
    pub frontmatter: Frontmatter,
    pub body: &'a str,
}

/// Splits `input` into a [`Document`]. If the first line isn't a `---` fence
/// the whole input is treated as body and the frontmatter is empty.
pub fn parse(input: &str) -> Result<Document<'_>> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    match header_indices(input)? {
        None => Ok(Document {
            frontmatter: Frontmatter::default(),
            body: input,
        }),
        Some((yaml_start, yaml_stop, body_start)) => {
            let yaml = &input[yaml_start..yaml_stop];
            let frontmatter = if is_blank(yaml) {
                Frontmatter::default()
            } else {
                serde_yaml::from_str(yaml)?
            };
            Ok(Document {
                frontmatter,
                body: &input[body_start..],
            })
        }
    }
}

/// Finds the byte offsets of the YAML region and the start of the body.
/// Returns `None` when the document has no header at all.
fn header_indices(input: &str) -> Result<Option<(usize, usize, usize)>> {
    let mut lines = input.split_inclusive('\n');
    match lines.next() {
        Some(first) if is_fence(first) => {
            let yaml_start = first.len();
            let mut offset = yaml_start;
            for line in lines {
                if is_fence(line) {
                    return Ok(Some((
                        yaml_start,          // yaml_start
                        offset,              // yaml_stop
                        offset + line.len(), // body_start
                    )));
                }
                offset += line.len();
            }
            Err(Error::MissingEndFence)
        }
        _ => Ok(None),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim_end() == FENCE
}

// serde_yaml refuses to deserialize a struct from an empty or comment-only
// document, so treat those as "no metadata".
fn is_blank(yaml: &str) -> bool {
    yaml.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

/// Reads any YAML scalar as a string. `null` is treated as absent; sequences
/// and mappings are rejected.
fn scalar<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_to_string(Value::deserialize(deserializer)?).map_err(D::Error::custom)
}

/// Reads `tags` as either a sequence of scalars or a single scalar.
fn tags<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Sequence(items) => items
            .into_iter()
            .filter_map(|item| scalar_to_string(item).transpose())
            .collect::<std::result::Result<Vec<String>, String>>()
            .map_err(D::Error::custom),
        other => Ok(scalar_to_string(other)
            .map_err(D::Error::custom)?
            .into_iter()
            .collect()),
    }
}

fn scalar_to_string(value: Value) -> std::result::Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Sequence(_) => Err(String::from("expected a scalar, found a sequence")),
        Value::Mapping(_) => Err(String::from("expected a scalar, found a mapping")),
    }
}

/// Represents the result of a [`parse`] operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a malformed document header.
#[derive(Debug)]
pub enum Error {
    /// Returned when a document opens its frontmatter with `---` but the
    /// terminal fence is missing.
    MissingEndFence,

    /// Returned when the frontmatter isn't a valid YAML mapping or one of the
    /// recognized keys has the wrong shape.
    Yaml(serde_yaml::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingEndFence => write!(f, "Missing closing `---`"),
            Error::Yaml(err) => write!(f, "Invalid frontmatter: {}", err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingEndFence => None,
            Error::Yaml(err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::Yaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_header_and_body() -> Result<()> {
        let doc = parse("---\ntitle: Hello\ndate: 2021-04-16\ntags: [greet, intro]\n---\n# Hi\n")?;
        assert_eq!(doc.frontmatter.title.as_deref(), Some("Hello"));
        assert_eq!(doc.frontmatter.date.as_deref(), Some("2021-04-16"));
        assert_eq!(doc.frontmatter.tags, vec!["greet", "intro"]);
        assert_eq!(doc.body, "# Hi\n");
        Ok(())
    }

    #[test]
    fn test_no_header_is_all_body() -> Result<()> {
        let input = "# Just a body\n\nNo metadata here.\n";
        let doc = parse(input)?;
        assert_eq!(doc.frontmatter, Frontmatter::default());
        assert_eq!(doc.body, input);
        Ok(())
    }

    #[test]
    fn test_unterminated_header() {
        match parse("---\ntitle: Oops\n\nbody without a closing fence\n") {
            Err(Error::MissingEndFence) => {}
            other => panic!("wanted MissingEndFence, got {:?}", other),
        }
    }

    #[test]
    fn test_fence_alone_is_unterminated() {
        assert!(matches!(parse("---"), Err(Error::MissingEndFence)));
    }

    #[test]
    fn test_crlf_and_bom() -> Result<()> {
        let doc = parse("\u{feff}---\r\ntitle: Windows\r\n---\r\nbody\r\n")?;
        assert_eq!(doc.frontmatter.title.as_deref(), Some("Windows"));
        assert_eq!(doc.body, "body\r\n");
        Ok(())
    }

    #[test]
    fn test_empty_and_comment_only_headers() -> Result<()> {
        assert_eq!(parse("---\n---\nbody")?.frontmatter, Frontmatter::default());
        assert_eq!(
            parse("---\n# nothing yet\n\n---\nbody")?.frontmatter,
            Frontmatter::default()
        );
        Ok(())
    }

    #[test]
    fn test_dashes_inside_a_line_are_not_a_fence() -> Result<()> {
        let doc = parse("---\ntitle: a --- b\n---\nbody")?;
        assert_eq!(doc.frontmatter.title.as_deref(), Some("a --- b"));
        assert_eq!(doc.body, "body");
        Ok(())
    }

    #[test]
    fn test_capitalized_aliases() -> Result<()> {
        let doc = parse("---\nTitle: Old Style\nDate: 2020-02-02\nTags: [legacy]\n---\n")?;
        assert_eq!(doc.frontmatter.title.as_deref(), Some("Old Style"));
        assert_eq!(doc.frontmatter.date.as_deref(), Some("2020-02-02"));
        assert_eq!(doc.frontmatter.tags, vec!["legacy"]);
        Ok(())
    }

    #[test]
    fn test_scalar_coercion() -> Result<()> {
        let doc = parse("---\ntitle: 1984\ndate: 2024\ntags: [rust, 2024, ~]\n---\n")?;
        assert_eq!(doc.frontmatter.title.as_deref(), Some("1984"));
        assert_eq!(doc.frontmatter.date.as_deref(), Some("2024"));
        assert_eq!(doc.frontmatter.tags, vec!["rust", "2024"]);
        Ok(())
    }

    #[test]
    fn test_single_tag_and_null_fields() -> Result<()> {
        let doc = parse("---\ntitle: ~\ndate:\ntags: solo\n---\n")?;
        assert_eq!(doc.frontmatter.title, None);
        assert_eq!(doc.frontmatter.date, None);
        assert_eq!(doc.frontmatter.tags, vec!["solo"]);
        Ok(())
    }

    #[test]
    fn test_unknown_keys_are_preserved() -> Result<()> {
        let doc = parse("---\ntitle: x\ndraft: true\nauthor: me\n---\n")?;
        assert_eq!(doc.frontmatter.extra.len(), 2);
        assert_eq!(doc.frontmatter.extra.get("draft"), Some(&Value::Bool(true)));
        Ok(())
    }

    #[test]
    fn test_malformed_values() {
        assert!(matches!(parse("---\ntags: {a: b}\n---\n"), Err(Error::Yaml(_))));
        assert!(matches!(parse("---\ntags: [[nested]]\n---\n"), Err(Error::Yaml(_))));
        assert!(matches!(parse("---\ntitle: [a, b]\n---\n"), Err(Error::Yaml(_))));
        assert!(matches!(parse("---\n- just\n- a list\n---\n"), Err(Error::Yaml(_))));
        assert!(matches!(parse("---\ntitle: [unclosed\n---\n"), Err(Error::Yaml(_))));
    }
}
