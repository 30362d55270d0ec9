//! The library code for the `scrivener` blog indexer. The architecture can be
//! broken down into three steps:
//!
//! 1. Discovering post source files on disk ([`crate::scan`])
//! 2. Parsing each file into a [`crate::post::Post`] ([`crate::frontmatter`],
//!    [`crate::post`], and the text transform in [`crate::markdown`])
//! 3. Sorting the posts into a [`crate::collection::Collection`] and deriving
//!    the tag and archive indices from it ([`crate::index`])
//!
//! [`crate::build`] ties these together into a single, immutable
//! [`crate::build::Snapshot`]. Everything after that is a pure query over the
//! snapshot: listing all posts, filtering by tag, year, or month, and looking
//! up a post by slug.
//!
//! Snapshots are never modified. To pick up changes on disk, build a new one;
//! [`crate::cache::SnapshotCache`] does this and swaps the result in
//! atomically so concurrent readers always see a consistent view.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod cache;
pub mod collection;
pub mod config;
pub mod frontmatter;
pub mod index;
pub mod markdown;
pub mod post;
pub mod scan;

pub use build::{build_index, Indexer, Snapshot};
pub use cache::SnapshotCache;
pub use collection::{Collection, NotFound};
pub use post::Post;
