//! Defines the [`Renderer`] trait, the swappable text transform that turns a
//! post body into HTML, and [`Markdown`], the default pulldown-cmark
//! implementation.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag};
use std::fmt;
use std::io;

/// Converts a post body into HTML. Implementations are expected to be pure:
/// the same body must always produce the same output.
pub trait Renderer: Send + Sync {
    fn render(&self, body: &str) -> Result<String, Error>;
}

impl<F> Renderer for F
where
    F: Fn(&str) -> Result<String, Error> + Send + Sync,
{
    fn render(&self, body: &str) -> Result<String, Error> {
        self(body)
    }
}

/// Renders CommonMark plus footnotes, strikethrough, tables, task lists, and
/// smart punctuation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Markdown {
    /// The number of levels by which to demote headings. With an offset of 2,
    /// `#` becomes `<h3>` so that post headings sit beneath the site title
    /// and the post title. Headings never go below `<h6>`.
    pub heading_offset: u32,
}

impl Markdown {
    pub fn with_heading_offset(heading_offset: u32) -> Markdown {
        Markdown { heading_offset }
    }

    fn options() -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options
    }

    fn convert<'a>(&self, ev: Event<'a>) -> Event<'a> {
        match ev {
            Event::Start(Tag::Heading(level)) => {
                Event::Start(Tag::Heading(self.demote(level)))
            }
            Event::End(Tag::Heading(level)) => {
                Event::End(Tag::Heading(self.demote(level)))
            }
            _ => ev,
        }
    }

    fn demote(&self, level: u32) -> u32 {
        level.saturating_add(self.heading_offset).min(6)
    }
}

impl Renderer for Markdown {
    fn render(&self, body: &str) -> Result<String, Error> {
        let mut out = String::with_capacity(body.len() * 3 / 2);
        html::push_html(
            &mut out,
            Parser::new_ext(body, Self::options()).map(|ev| self.convert(ev)),
        );
        Ok(out)
    }
}

/// The HTML used in place of a post whose body failed to render: the raw
/// body, escaped, as a preformatted code block.
pub fn placeholder(body: &str) -> String {
    let block = Tag::CodeBlock(CodeBlockKind::Indented);
    let events = vec![
        Event::Start(block.clone()),
        Event::Text(CowStr::Borrowed(body)),
        Event::End(block),
    ];
    let mut out = String::with_capacity(body.len() + 24);
    html::push_html(&mut out, events.into_iter());
    out
}

/// Represents an error converting a post body to HTML.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O errors inside a renderer.
    Io(io::Error),

    /// Returned when a renderer rejects its input.
    Rejected(String),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(f),
            Error::Rejected(reason) => write!(f, "render rejected: {}", reason),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Rejected(_) => None,
        }
    }
}

impl From<io::Error> for Error {
    /// Converts a [`io::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for IO operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
