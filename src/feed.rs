//! Support for creating Atom feeds from a [`Bucket`] of articles.

use crate::config::Config;
use crate::document::DocumentRecord;
use crate::tag::Bucket;
use crate::util::md5_hex;
use atom_syndication::extension::{Extension, ExtensionMap};
use atom_syndication::{Content, Entry, Error as AtomError, Feed, Link, Person, Text};
use chrono::{DateTime, FixedOffset};
use std::collections::BTreeMap;

/// The number of most recent articles a feed carries. Tag pages list every
/// article regardless.
pub const FEED_ENTRY_LIMIT: usize = 10;

const DC_NAMESPACE: &str = "http://purl.org/dc/elements/1.1/";

/// The URL of a bucket's feed.
pub fn feed_url(config: &Config, slug: &str) -> String {
    config.url_for(&format!("feeds/{}.xml", slug))
}

/// The URL of the HTML page listing a bucket: the blog section itself for
/// the global bucket, a tag page otherwise.
pub fn page_url(config: &Config, bucket: &Bucket) -> String {
    match (bucket.is_index(), &config.blog_path) {
        (true, Some(blog_path)) => config.url_for(blog_path),
        (true, None) => config.domain().to_owned(),
        (false, _) => config.url_for(&format!("tags/{}.html", bucket.slug)),
    }
}

/// Renders `bucket` as an Atom document, XML declaration included.
/// `updated` stamps the feed itself; entries carry their article dates.
pub fn render_atom(
    config: &Config,
    bucket: &Bucket,
    updated: DateTime<FixedOffset>,
) -> Result<String> {
    let bytes = feed(config, bucket, updated).write_to(Vec::new())?;
    Ok(String::from_utf8(bytes)?)
}

fn feed(config: &Config, bucket: &Bucket, updated: DateTime<FixedOffset>) -> Feed {
    let mut namespaces = BTreeMap::new();
    namespaces.insert("dc".to_owned(), DC_NAMESPACE.to_owned());

    Feed {
        title: Text::plain(match bucket.is_index() {
            true => config.title.clone(),
            false => bucket.name.clone(),
        }),
        id: format!("urn:md5:{}", md5_hex(config.domain())),
        updated,
        authors: vec![person(&config.author)],
        links: vec![
            link("self", feed_url(config, &bucket.slug)),
            link("alternate", page_url(config, bucket)),
        ],
        entries: bucket
            .records
            .iter()
            .take(FEED_ENTRY_LIMIT)
            .map(|record| entry(record))
            .collect(),
        namespaces,
        lang: Some(config.lang.clone()),
        ..Feed::default()
    }
}

fn entry(record: &DocumentRecord) -> Entry {
    let body = match record.body.is_empty() {
        true => &record.excerpt,
        false => &record.body,
    };

    Entry {
        id: format!("urn:md5:{}", md5_hex(&record.timekey)),
        title: Text::plain(record.title.clone()),
        updated: record.date,
        published: Some(record.date),
        authors: vec![person(&record.author)],
        links: vec![link("alternate", record.url.clone())],
        content: Some(Content {
            content_type: Some("html".to_owned()),
            value: Some(body.clone()),
            ..Content::default()
        }),
        summary: match record.excerpt.is_empty() {
            true => None,
            false => Some(Text::plain(record.excerpt.clone())),
        },
        extensions: subjects(&record.keywords),
        ..Entry::default()
    }
}

/// One `dc:subject` element per keyword.
fn subjects(keywords: &[String]) -> ExtensionMap {
    let mut extensions = ExtensionMap::default();
    if keywords.is_empty() {
        return extensions;
    }
    let subjects = keywords
        .iter()
        .map(|keyword| Extension {
            name: "dc:subject".to_owned(),
            value: Some(keyword.clone()),
            ..Extension::default()
        })
        .collect();
    extensions
        .entry("dc".to_owned())
        .or_default()
        .insert("subject".to_owned(), subjects);
    extensions
}

fn person(name: &str) -> Person {
    Person {
        name: name.to_owned(),
        email: None,
        uri: None,
        ..Person::default()
    }
}

fn link(rel: &str, href: String) -> Link {
    Link {
        href,
        rel: rel.to_owned(),
        ..Link::default()
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem rendering a feed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the Atom writer fails.
    #[error("writing Atom feed: {0}")]
    Atom(#[from] AtomError),

    /// Returned when the serialized feed isn't valid UTF-8.
    #[error("Atom feed is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::SourceDocument;
    use crate::tag::TagIndex;
    use url::Url;

    fn config() -> Config {
        let mut config = Config::new(Url::parse("https://example.org/").unwrap());
        config.title = String::from("A & B");
        config.author = String::from("Alice");
        config.blog_path = Some(String::from("blog"));
        config
    }

    fn documents(config: &Config, count: usize) -> Vec<DocumentRecord> {
        (1..=count)
            .map(|day| {
                let source = SourceDocument {
                    title: format!("Post {}", day),
                    path: format!("blog/post-{}.html", day),
                    date: format!("2021-01-{:02}", day),
                    keywords: vec![String::from("Rust & C")],
                    excerpt: format!("excerpt {}", day),
                    body: match day % 2 {
                        0 => format!("<p>body {}</p>", day),
                        _ => String::new(),
                    },
                    ..SourceDocument::default()
                };
                DocumentRecord::from_source(source, config).unwrap()
            })
            .collect()
    }

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2021-06-01T12:00:00+00:00").unwrap()
    }

    #[test]
    fn test_truncates_to_most_recent() -> Result<()> {
        let config = config();
        let docs = documents(&config, 12);
        let index = TagIndex::build(&config, &docs);
        assert_eq!(12, index.all.records.len());

        let xml = render_atom(&config, &index.all, now())?;
        assert_eq!(FEED_ENTRY_LIMIT, xml.matches("<entry>").count());
        assert!(xml.contains("Post 12"));
        assert!(xml.contains("Post 3<"));
        assert!(!xml.contains("Post 2<"));
        assert!(xml.find("Post 12").unwrap() < xml.find("Post 11").unwrap());
        Ok(())
    }

    #[test]
    fn test_feed_header() -> Result<()> {
        let config = config();
        let docs = documents(&config, 1);
        let index = TagIndex::build(&config, &docs);

        let xml = render_atom(&config, &index.all, now())?;
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("xml:lang=\"en\""));
        assert!(xml.contains(&format!("xmlns:dc=\"{}\"", DC_NAMESPACE)));
        assert!(xml.contains("A &amp; B"));
        assert!(xml.contains(&format!("<id>urn:md5:{}</id>", md5_hex("https://example.org"))));
        assert!(xml.contains("href=\"https://example.org/feeds/index.xml\""));
        assert!(xml.contains("href=\"https://example.org/blog\""));
        assert!(xml.contains("<name>Alice</name>"));

        let tag = &index.tags["rust-c"];
        let xml = render_atom(&config, tag, now())?;
        assert!(xml.contains("Rust &amp; C"));
        assert!(xml.contains("href=\"https://example.org/feeds/rust-c.xml\""));
        assert!(xml.contains("href=\"https://example.org/tags/rust-c.html\""));
        Ok(())
    }

    #[test]
    fn test_entries() -> Result<()> {
        let config = config();
        let docs = documents(&config, 2);
        let index = TagIndex::build(&config, &docs);

        let xml = render_atom(&config, &index.all, now())?;
        assert!(xml.contains(&format!("urn:md5:{}", md5_hex("20210101000000"))));
        assert!(xml.contains("<published>2021-01-02T00:00:00+00:00</published>"));
        assert!(xml.contains("<dc:subject>Rust &amp; C</dc:subject>"));
        assert!(xml.contains("href=\"https://example.org/blog/post-1.html\""));
        assert!(xml.contains(">excerpt 1</summary>"));
        // Post 1 has no body, so its excerpt becomes the content.
        assert!(xml.contains(">excerpt 1</content>"));
        assert!(xml.contains("&lt;p&gt;body 2&lt;/p&gt;"));
        Ok(())
    }

    /// The `<id>` of every entry, in feed order.
    fn entry_ids(xml: &str) -> Vec<String> {
        xml.split("<entry>")
            .skip(1)
            .filter_map(|entry| {
                let start = entry.find("<id>")? + "<id>".len();
                let end = entry[start..].find("</id>")? + start;
                Some(entry[start..end].to_owned())
            })
            .collect()
    }

    #[test]
    fn test_entry_id_survives_edits() -> Result<()> {
        let config = config();
        let build = |title: &str, body: &str| {
            let source = SourceDocument {
                title: title.to_owned(),
                path: String::from("blog/post.html"),
                date: String::from("2021-01-01"),
                body: body.to_owned(),
                timekey: Some(String::from("20210101-post")),
                ..SourceDocument::default()
            };
            vec![DocumentRecord::from_source(source, &config).unwrap()]
        };

        let before = build("Draft title", "<p>draft</p>");
        let after = build("Final title", "<p>final</p>");
        let first = render_atom(&config, &TagIndex::build(&config, &before).all, now())?;
        let second = render_atom(&config, &TagIndex::build(&config, &after).all, now())?;

        assert_ne!(first, second);
        let expected = vec![format!("urn:md5:{}", md5_hex("20210101-post"))];
        assert_eq!(expected, entry_ids(&first));
        assert_eq!(expected, entry_ids(&second));
        Ok(())
    }
}
