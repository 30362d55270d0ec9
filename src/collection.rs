//! Defines [`Collection`], the ordered, immutable sequence of posts that every
//! query returns, along with the queries themselves.
//!
//! A collection is always sorted most-recent first. Undated posts follow all
//! dated posts, and ties are broken by slug so that the order never depends
//! on the order in which files were discovered. Filtering a collection never
//! reorders it.

use chrono::Datelike;
use std::fmt;
use std::slice;
use std::sync::Arc;

use crate::post::Post;

/// An ordered, immutable sequence of [`Post`]s. Posts are shared, so
/// filtering is cheap.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Collection {
    posts: Vec<Arc<Post>>,
}

impl Collection {
    /// Builds a collection from posts in any order.
    pub fn new(posts: Vec<Post>) -> Collection {
        let mut posts: Vec<Arc<Post>> = posts.into_iter().map(Arc::new).collect();
        posts.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
        Collection { posts }
    }

    fn filter<F>(&self, predicate: F) -> Collection
    where
        F: Fn(&Post) -> bool,
    {
        Collection {
            posts: self
                .posts
                .iter()
                .filter(|post| predicate(post))
                .cloned()
                .collect(),
        }
    }

    /// Returns the whole collection.
    pub fn list_all(&self) -> Collection {
        self.clone()
    }

    /// Returns the posts carrying `tag`. An unknown tag yields an empty
    /// collection.
    pub fn by_tag(&self, tag: &str) -> Collection {
        self.filter(|post| post.has_tag(tag))
    }

    /// Returns the posts dated in `year`. Undated posts are never included.
    pub fn by_year(&self, year: i32) -> Collection {
        self.filter(|post| post.date.map_or(false, |d| d.year() == year))
    }

    /// Returns the posts dated in the given month. A month outside 1-12
    /// yields an empty collection.
    pub fn by_year_month(&self, year: i32, month: u32) -> Collection {
        self.filter(|post| {
            post.date
                .map_or(false, |d| d.year() == year && d.month() == month)
        })
    }

    /// Looks up a single post by slug.
    pub fn get(&self, slug: &str) -> Result<&Arc<Post>, NotFound> {
        self.posts
            .iter()
            .find(|post| post.slug == slug)
            .ok_or_else(|| NotFound(slug.to_owned()))
    }

    pub fn iter(&self) -> slice::Iter<'_, Arc<Post>> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    /// The slugs in collection order. Mostly useful in tests and diagnostics.
    pub fn slugs(&self) -> Vec<&str> {
        self.posts.iter().map(|post| post.slug.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Arc<Post>;
    type IntoIter = slice::Iter<'a, Arc<Post>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Returned when no post has the requested slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotFound(pub String);

impl fmt::Display for NotFound {
    /// Displays a [`NotFound`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "post not found: {}", self.0)
    }
}

impl std::error::Error for NotFound {}
