//! Defines the [`TagIndex`] type, which groups [`DocumentRecord`]s into
//! [`Bucket`]s: one per tag, plus the global bucket holding every article
//! under the blog path.

use crate::config::Config;
use crate::document::DocumentRecord;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// The slug of the global bucket. A keyword slugifying to this value would
/// collide with it on disk and is ignored.
pub const INDEX_SLUG: &str = "index";

/// The articles filed under one tag, or under the global index.
#[derive(Clone, Debug)]
pub struct Bucket<'a> {
    /// The tag as first spelled by an article, or the site title for the
    /// global bucket.
    pub name: String,

    /// Names the bucket's feed and page files.
    pub slug: String,

    /// Newest first. Articles sharing a date keep their manifest order.
    pub records: Vec<&'a DocumentRecord>,
}

impl<'a> Bucket<'a> {
    fn new(name: String, slug: String) -> Bucket<'a> {
        Bucket {
            name,
            slug,
            records: Vec::new(),
        }
    }

    pub fn is_index(&self) -> bool {
        self.slug == INDEX_SLUG
    }

    /// Adds `record` unless an article with the same slug is already filed
    /// here.
    fn push(&mut self, record: &'a DocumentRecord) {
        match self.records.iter().find(|r| r.slug == record.slug) {
            Some(existing) => warn!(
                bucket = %self.slug,
                slug = %record.slug,
                kept = %existing.path,
                dropped = %record.path,
                "duplicate article slug"
            ),
            None => self.records.push(record),
        }
    }

    fn sort(&mut self) {
        self.records.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

/// Every bucket built from one manifest.
#[derive(Clone, Debug)]
pub struct TagIndex<'a> {
    pub all: Bucket<'a>,

    /// Tag buckets keyed by slug.
    pub tags: BTreeMap<String, Bucket<'a>>,
}

impl<'a> TagIndex<'a> {
    /// Indexes the records living under the configured blog path. Without a
    /// blog path the index is empty.
    pub fn build(config: &Config, documents: &'a [DocumentRecord]) -> TagIndex<'a> {
        let mut index = TagIndex {
            all: Bucket::new(config.title.clone(), INDEX_SLUG.to_owned()),
            tags: BTreeMap::new(),
        };
        let blog_path = match &config.blog_path {
            Some(blog_path) => blog_path,
            None => {
                debug!("no blog path configured, skipping indexing");
                return index;
            }
        };

        for record in documents.iter().filter(|r| r.is_under(blog_path)) {
            index.all.push(record);
            for keyword in &record.keywords {
                let slug = slug::slugify(keyword);
                if slug.is_empty() || slug == INDEX_SLUG {
                    warn!(keyword = %keyword, path = %record.path, "ignoring unusable keyword");
                    continue;
                }
                index
                    .tags
                    .entry(slug.clone())
                    .or_insert_with(|| Bucket::new(keyword.clone(), slug))
                    .push(record);
            }
        }

        index.all.sort();
        for bucket in index.tags.values_mut() {
            bucket.sort();
        }
        index
    }

    pub fn is_empty(&self) -> bool {
        self.all.records.is_empty()
    }

    /// The global bucket followed by the tag buckets in slug order.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket<'a>> {
        std::iter::once(&self.all).chain(self.tags.values())
    }
}
