//! Conversions from index types into template [`Value`]s. Strings are
//! HTML-escaped here, so templates can print every field as is.

use crate::config::Config;
use crate::document::DocumentRecord;
use crate::feed::{feed_url, page_url};
use crate::tag::Bucket;
use gtmpl_value::Value;
use quick_xml::escape::escape;
use std::collections::HashMap;

fn text(s: &str) -> Value {
    Value::String(escape(s).into_owned())
}

impl From<&DocumentRecord> for Value {
    fn from(record: &DocumentRecord) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), text(&record.title));
        m.insert("url".to_owned(), text(&record.url));
        m.insert("author".to_owned(), text(&record.author));
        m.insert("date".to_owned(), Value::String(record.date.format("%Y-%m-%d").to_string()));
        m.insert("datetime".to_owned(), Value::String(record.date.to_rfc3339()));
        m.insert("excerpt".to_owned(), text(&record.excerpt));
        m.insert(
            "keywords".to_owned(),
            Value::Array(record.keywords.iter().map(|k| text(k)).collect()),
        );
        Value::Object(m)
    }
}

/// The template value for one bucket: its names, links and the full list of
/// its articles.
pub fn bucket_value(config: &Config, bucket: &Bucket) -> Value {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("name".to_owned(), text(&bucket.name));
    m.insert("slug".to_owned(), text(&bucket.slug));
    m.insert("url".to_owned(), text(&page_url(config, bucket)));
    m.insert("feed_url".to_owned(), text(&feed_url(config, &bucket.slug)));
    m.insert("count".to_owned(), Value::from(bucket.records.len() as u64));
    m.insert(
        "articles".to_owned(),
        Value::Array(bucket.records.iter().map(|&record| record.into()).collect()),
    );
    Value::Object(m)
}

/// Site-wide fields shared by every page.
pub fn site_value(config: &Config) -> HashMap<String, Value> {
    let mut m: HashMap<String, Value> = HashMap::new();
    m.insert("site_title".to_owned(), text(&config.title));
    m.insert("lang".to_owned(), text(&config.lang));
    m.insert("home_page".to_owned(), text(config.domain()));
    m.insert("tags_url".to_owned(), text(&config.url_for("tags/index.html")));
    m
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::SourceDocument;
    use crate::tag::TagIndex;
    use url::Url;

    fn field<'v>(value: &'v Value, key: &str) -> &'v Value {
        match value {
            Value::Object(m) => &m[key],
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_bucket_value() {
        let mut config = Config::new(Url::parse("https://example.org").unwrap());
        config.blog_path = Some(String::from("blog"));
        let source = SourceDocument {
            title: String::from("<b>Bold</b>"),
            path: String::from("blog/bold.html"),
            date: String::from("2021-03-04 05:06:07"),
            keywords: vec![String::from("Q&A")],
            ..SourceDocument::default()
        };
        let docs = vec![DocumentRecord::from_source(source, &config).unwrap()];
        let index = TagIndex::build(&config, &docs);

        let value = bucket_value(&config, &index.tags["q-a"]);
        assert_eq!(&Value::from("Q&amp;A"), field(&value, "name"));
        assert_eq!(
            &Value::from("https://example.org/tags/q-a.html"),
            field(&value, "url")
        );
        let articles = match field(&value, "articles") {
            Value::Array(articles) => articles,
            _ => panic!("articles is not an array"),
        };
        assert_eq!(1, articles.len());
        assert_eq!(
            &Value::from("&lt;b&gt;Bold&lt;/b&gt;"),
            field(&articles[0], "title")
        );
        assert_eq!(&Value::from("2021-03-04"), field(&articles[0], "date"));
    }
}
