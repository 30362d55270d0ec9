//! Derives the navigation indices from a full collection of posts: the
//! [`TagIndex`] (every tag in use) and the [`ArchiveIndex`] (post counts per
//! year and month).
//!
//! Both are built by [`build`] in a single pass and depend only on the set of
//! posts given, never on their order.

use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};
use std::iter::Rev;

use crate::post::Post;

/// The vocabulary of all tags in use. Tags are case-sensitive and iterate in
/// byte order, so `Rust` sorts before `go`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TagIndex(BTreeSet<String>);

impl TagIndex {
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the tags as a sorted vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

/// Post counts for a single year.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct YearArchive {
    /// Number of posts per month (1-12). Months with no posts are absent.
    pub months: BTreeMap<u32, usize>,

    /// Number of posts in the year; always the sum of `months`.
    pub total: usize,
}

/// Post counts per year and month, covering dated posts only. Years with no
/// dated posts are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchiveIndex(BTreeMap<i32, YearArchive>);

impl ArchiveIndex {
    /// Iterates over the years, most recent first.
    pub fn years(&self) -> Rev<std::collections::btree_map::Iter<'_, i32, YearArchive>> {
        self.0.iter().rev()
    }

    pub fn get(&self, year: i32) -> Option<&YearArchive> {
        self.0.get(&year)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn record(&mut self, year: i32, month: u32) {
        let entry = self.0.entry(year).or_default();
        *entry.months.entry(month).or_insert(0) += 1;
        entry.total += 1;
    }
}

/// Builds both indices from the full collection.
pub fn build<'a, I>(posts: I) -> (TagIndex, ArchiveIndex)
where
    I: IntoIterator<Item = &'a Post>,
{
    let mut tags = BTreeSet::new();
    let mut archive = ArchiveIndex::default();
    for post in posts {
        for tag in &post.tags {
            if !tags.contains(tag) {
                tags.insert(tag.clone());
            }
        }
        if let Some(date) = post.date {
            archive.record(date.year(), date.month());
        }
    }
    (TagIndex(tags), archive)
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    pub(crate) fn post(slug: &str, date: Option<(i32, u32, u32)>, tags: &[&str]) -> Post {
        Post {
            slug: slug.to_owned(),
            title: slug.to_owned(),
            date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            body: String::new(),
            rendered_html: String::new(),
            source_path: PathBuf::from(format!("{}.md", slug)),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_worked_example() {
        let posts = vec![
            post("new", Some((2024, 1, 5)), &["go", "systems"]),
            post("old", Some((2023, 12, 1)), &["go"]),
        ];
        let (tags, archive) = build(&posts);
        assert_eq!(tags.to_vec(), vec!["go", "systems"]);

        let years: Vec<(i32, &YearArchive)> = archive.years().map(|(y, a)| (*y, a)).collect();
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].0, 2024);
        assert_eq!(years[0].1.months.get(&1), Some(&1));
        assert_eq!(years[0].1.total, 1);
        assert_eq!(years[1].0, 2023);
        assert_eq!(years[1].1.months.get(&12), Some(&1));
        assert_eq!(years[1].1.total, 1);
    }

    #[test]
    fn test_totals_match_month_sums() {
        let posts = vec![
            post("a", Some((2022, 3, 1)), &[]),
            post("b", Some((2022, 3, 20)), &[]),
            post("c", Some((2022, 11, 2)), &[]),
            post("d", Some((2020, 1, 1)), &[]),
            post("undated", None, &["misc"]),
        ];
        let (_, archive) = build(&posts);
        assert_eq!(archive.len(), 2);
        assert!(archive.get(2021).is_none());
        for (year, entry) in archive.years() {
            assert_eq!(entry.total, entry.months.values().sum::<usize>());
            let dated = posts
                .iter()
                .filter(|p| p.date.map(|d| d.year()) == Some(*year))
                .count();
            assert_eq!(entry.total, dated);
        }
        assert_eq!(archive.get(2022).unwrap().months.get(&3), Some(&2));
    }

    #[test]
    fn test_tags_collapse_and_sort_case_sensitively() {
        let posts = vec![
            post("a", None, &["rust", "Rust", "rust"]),
            post("b", None, &["async", "rust"]),
        ];
        let (tags, _) = build(&posts);
        assert_eq!(tags.to_vec(), vec!["Rust", "async", "rust"]);
        assert!(tags.contains("async"));
        assert!(!tags.contains("ASYNC"));
    }

    #[test]
    fn test_order_independent() {
        let mut posts = vec![
            post("a", Some((2021, 5, 5)), &["z", "m"]),
            post("b", Some((2019, 7, 1)), &["a"]),
            post("c", None, &["q", "a"]),
            post("d", Some((2021, 6, 30)), &["m"]),
        ];
        let forward = build(&posts);
        posts.reverse();
        posts.swap(0, 2);
        assert_eq!(build(&posts), forward);
    }

    #[test]
    fn test_empty() {
        let (tags, archive) = build(&Vec::<Post>::new());
        assert!(tags.is_empty());
        assert!(archive.is_empty());
    }
}
