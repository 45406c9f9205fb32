//! Writes a [`TagIndex`] to the public folder: one Atom feed and one HTML
//! page per bucket, plus an overview page linking every tag.
//!
//! Given a blog path `blog`, the layout is:
//!
//! * `feeds/{slug}.xml` for every bucket, the global one being `index`;
//! * `tags/{slug}.html` for every tag bucket;
//! * `blog/index.html` for the global bucket;
//! * `tags/index.html`, the overview.

use crate::config::Config;
use crate::feed::{self, render_atom};
use crate::tag::{Bucket, TagIndex};
use crate::util::write_atomic;
use crate::value::{bucket_value, site_value};
use chrono::{DateTime, FixedOffset};
use gtmpl::{Context, Template, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The built-in template for the global and per-tag pages.
pub const TAG_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{ .lang }}">
<head>
<meta charset="utf-8"/>
<title>{{ .bucket.name }}</title>
<link rel="alternate" type="application/atom+xml" title="{{ .bucket.name }}" href="{{ .bucket.feed_url }}"/>
</head>
<body>
<p class="site"><a href="{{ .home_page }}">{{ .site_title }}</a></p>
<h1>{{ .bucket.name }}</h1>
<p><a href="{{ .bucket.feed_url }}">Atom feed</a> | <a href="{{ .tags_url }}">All tags</a></p>
<ul class="articles">
{{ range .bucket.articles }}<li><time datetime="{{ .datetime }}">{{ .date }}</time> <a href="{{ .url }}">{{ .title }}</a></li>
{{ end }}</ul>
</body>
</html>
"#;

/// The built-in template for the tag overview page.
pub const TAGS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="{{ .lang }}">
<head>
<meta charset="utf-8"/>
<title>{{ .site_title }}: tags</title>
</head>
<body>
<p class="site"><a href="{{ .home_page }}">{{ .site_title }}</a></p>
<h1>Tags</h1>
<p><a href="{{ .index.url }}">All articles</a> (<a href="{{ .index.feed_url }}">Atom feed</a>)</p>
<ul class="tags">
{{ range .tags }}<li><a href="{{ .url }}">{{ .name }}</a> ({{ .count }}) <a href="{{ .feed_url }}">feed</a></li>
{{ end }}</ul>
</body>
</html>
"#;

/// Responsible for templating and writing the feeds and pages of a
/// [`TagIndex`].
pub struct IndexWriter<'a> {
    config: &'a Config,

    /// The template for the global and per-tag pages.
    tag_template: Template,

    /// The template for the tag overview page.
    tags_template: Template,

    /// Stamps every feed written by this writer.
    updated: DateTime<FixedOffset>,
}

impl<'a> IndexWriter<'a> {
    /// Loads the configured templates, falling back to [`TAG_TEMPLATE`] and
    /// [`TAGS_TEMPLATE`].
    pub fn new(config: &'a Config, updated: DateTime<FixedOffset>) -> Result<IndexWriter<'a>> {
        Ok(IndexWriter {
            config,
            tag_template: parse_template(config.tag_template.as_deref(), TAG_TEMPLATE)?,
            tags_template: parse_template(config.tags_template.as_deref(), TAGS_TEMPLATE)?,
            updated,
        })
    }

    fn public_path(&self, relative: &str) -> PathBuf {
        self.config.public_folder.join(relative)
    }

    /// Where the HTML page of `bucket` goes. `None` when the global bucket has
    /// no blog path to live in.
    fn page_path(&self, bucket: &Bucket) -> Option<PathBuf> {
        match (bucket.is_index(), &self.config.blog_path) {
            (true, Some(blog_path)) => Some(self.public_path(blog_path).join("index.html")),
            (true, None) => None,
            (false, _) => Some(self.public_path(&format!("tags/{}.html", bucket.slug))),
        }
    }

    /// Writes the feed and the page of one bucket.
    pub fn write_bucket(&self, bucket: &Bucket) -> Result<()> {
        let feed_path = self.public_path(&format!("feeds/{}.xml", bucket.slug));
        let atom = render_atom(self.config, bucket, self.updated)?;
        write_file(&feed_path, atom.as_bytes())?;

        if let Some(page_path) = self.page_path(bucket) {
            let mut page = site_value(self.config);
            page.insert("bucket".to_owned(), bucket_value(self.config, bucket));
            let html = render(&self.tag_template, Value::Object(page))?;
            write_file(&page_path, html.as_bytes())?;
        }
        debug!(bucket = %bucket.slug, articles = bucket.records.len(), "wrote bucket");
        Ok(())
    }

    /// Writes `tags/index.html`, linking the global page and every tag page.
    pub fn write_overview(&self, index: &TagIndex) -> Result<()> {
        let mut page = site_value(self.config);
        page.insert("index".to_owned(), bucket_value(self.config, &index.all));
        page.insert(
            "tags".to_owned(),
            Value::Array(
                index
                    .tags
                    .values()
                    .map(|bucket| bucket_value(self.config, bucket))
                    .collect(),
            ),
        );
        let html = render(&self.tags_template, Value::Object(page))?;
        write_file(&self.public_path("tags/index.html"), html.as_bytes())
    }
}

fn render(template: &Template, value: Value) -> Result<String> {
    let context = Context::from(value).map_err(Error::Template)?;
    let mut out: Vec<u8> = Vec::new();
    template.execute(&mut out, &context).map_err(Error::Template)?;
    String::from_utf8(out).map_err(|e| Error::Template(e.to_string()))
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    write_atomic(path, contents).map_err(|err| Error::Write {
        path: path.to_owned(),
        err,
    })
}

/// Loads the template at `path`, or parses `builtin` when there is none.
fn parse_template(path: Option<&Path>, builtin: &str) -> Result<Template> {
    let contents = match path {
        None => builtin.to_owned(),
        Some(path) => {
            let mut contents = String::new();
            std::fs::File::open(path)
                .and_then(|mut file| file.read_to_string(&mut contents))
                .map_err(|err| Error::OpenTemplateFile {
                    path: path.to_owned(),
                    err,
                })?;
            contents
        }
    };

    let mut template = Template::default();
    template.parse(&contents).map_err(Error::Template)?;
    Ok(template)
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned for I/O problems while opening template files.
    #[error("Opening template file `{}`: {err}", path.display())]
    OpenTemplateFile {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// An error parsing or executing a template.
    #[error("template error: {0}")]
    Template(String),

    /// Returned when a feed can't be rendered.
    #[error(transparent)]
    Feed(#[from] feed::Error),

    /// An error writing an output file.
    #[error("Writing `{}`: {err}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::{DocumentRecord, SourceDocument};
    use url::Url;

    fn config(public: &Path, blog_path: Option<&str>) -> Config {
        let mut config = Config::new(Url::parse("https://example.org").unwrap());
        config.title = String::from("Site");
        config.public_folder = public.to_owned();
        config.blog_path = blog_path.map(String::from);
        config
    }

    fn documents(config: &Config, count: usize) -> Vec<DocumentRecord> {
        (1..=count)
            .map(|day| {
                let source = SourceDocument {
                    title: format!("Post {}", day),
                    path: format!("blog/post-{}.html", day),
                    date: format!("2021-01-{:02}", day),
                    keywords: vec![String::from("Rust")],
                    ..SourceDocument::default()
                };
                DocumentRecord::from_source(source, config).unwrap()
            })
            .collect()
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-06-01T00:00:00+00:00").unwrap()
    }

    #[test]
    fn test_page_lists_every_article() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let config = config(dir.path(), Some("blog"));
        let docs = documents(&config, 12);
        let index = TagIndex::build(&config, &docs);
        let writer = IndexWriter::new(&config, now())?;
        for bucket in index.buckets() {
            writer.write_bucket(bucket)?;
        }
        writer.write_overview(&index)?;

        let page = std::fs::read_to_string(dir.path().join("tags/rust.html"))?;
        assert_eq!(12, page.matches("<li>").count());
        assert!(page.contains("href=\"https://example.org/feeds/rust.xml\""));
        assert!(page.contains("<a href=\"https://example.org\">Site</a>"));

        let feed = std::fs::read_to_string(dir.path().join("feeds/rust.xml"))?;
        assert_eq!(feed::FEED_ENTRY_LIMIT, feed.matches("<entry>").count());

        let global = std::fs::read_to_string(dir.path().join("blog/index.html"))?;
        assert_eq!(12, global.matches("<li>").count());
        assert!(dir.path().join("feeds/index.xml").exists());

        let overview = std::fs::read_to_string(dir.path().join("tags/index.html"))?;
        assert!(overview.contains("href=\"https://example.org/tags/rust.html\""));
        assert!(overview.contains("(12)"));
        assert!(overview.contains("<a href=\"https://example.org\">Site</a>"));
        Ok(())
    }

    #[test]
    fn test_custom_template() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let template = dir.path().join("tag.html");
        std::fs::write(&template, "{{ .bucket.name }}:{{ .bucket.count }}")?;
        let mut config = config(&dir.path().join("public"), Some("blog"));
        config.tag_template = Some(template);

        let docs = documents(&config, 2);
        let index = TagIndex::build(&config, &docs);
        IndexWriter::new(&config, now())?.write_bucket(&index.tags["rust"])?;

        let page = std::fs::read_to_string(dir.path().join("public/tags/rust.html"))?;
        assert_eq!("Rust:2", page);
        Ok(())
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path(), Some("blog"));
        config.tags_template = Some(dir.path().join("missing.html"));
        assert!(matches!(
            IndexWriter::new(&config, now()),
            Err(Error::OpenTemplateFile { .. })
        ));
    }
}
