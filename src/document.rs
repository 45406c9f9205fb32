//! Defines [`DocumentRecord`], the normalized form of one published article,
//! and [`SourceDocument`], the shape in which the exporter hands articles
//! over (a YAML or JSON list, see [`load_manifest`]). The markup itself is
//! never parsed here: titles, keywords and bodies arrive already extracted.

use crate::config::Config;
use crate::util::open;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::warn;

/// One article as listed in the manifest.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SourceDocument {
    pub title: String,

    /// The article's output file, relative to the public folder (e.g.
    /// `blog/2021/hello/index.html`).
    pub path: String,

    /// RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`.
    pub date: String,

    #[serde(default)]
    pub author: Option<String>,

    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub excerpt: String,

    /// The rendered HTML body.
    #[serde(default)]
    pub body: String,

    /// A stable identity for the article. Derived from the date when absent.
    #[serde(default)]
    pub timekey: Option<String>,
}

/// An article ready for indexing. Never mutated once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRecord {
    pub title: String,
    pub slug: String,

    /// Absolute URL of the article.
    pub url: String,

    /// Output path relative to the public folder, without a leading slash.
    pub path: String,
    pub author: String,
    pub date: DateTime<FixedOffset>,

    /// Keywords in declaration order. Keywords that slugify to the same
    /// value are collapsed into the first spelling.
    pub keywords: Vec<String>,
    pub excerpt: String,
    pub body: String,
    pub timekey: String,
}

impl DocumentRecord {
    pub fn from_source(source: SourceDocument, config: &Config) -> Result<DocumentRecord> {
        let path = source.path.trim_start_matches('/').to_owned();
        let date = parse_date(&source.date).map_err(|err| Error::Date {
            path: path.clone(),
            date: source.date.clone(),
            err,
        })?;

        let mut slug = slug::slugify(&source.title);
        if slug.is_empty() {
            slug = slug::slugify(path_stem(&path));
        }
        if slug.is_empty() {
            return Err(Error::Slug { path });
        }

        Ok(DocumentRecord {
            url: config.url_for(&path),
            author: source.author.unwrap_or_else(|| config.author.clone()),
            keywords: collapse_keywords(source.keywords),
            timekey: source
                .timekey
                .unwrap_or_else(|| date.format("%Y%m%d%H%M%S").to_string()),
            title: source.title,
            slug,
            path,
            date,
            excerpt: source.excerpt,
            body: source.body,
        })
    }

    /// Whether the article's output file lives under `blog_path` (compared
    /// component by component).
    pub fn is_under(&self, blog_path: &str) -> bool {
        Path::new(&self.path).starts_with(blog_path)
    }
}

/// The name an article is known by when its title is empty: the file stem,
/// or the directory name for `.../index.html`.
fn path_stem(path: &str) -> &str {
    let path = Path::new(path);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    if stem == "index" {
        if let Some(dir) = path.parent().and_then(|p| p.file_name()).and_then(|s| s.to_str()) {
            return dir;
        }
    }
    stem
}

fn collapse_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .into_iter()
        .map(|keyword| keyword.trim().to_owned())
        .filter(|keyword| !keyword.is_empty() && seen.insert(slug::slugify(keyword)))
        .collect()
}

/// Parses a manifest date. Dates without an offset are taken as UTC.
pub fn parse_date(input: &str) -> std::result::Result<DateTime<FixedOffset>, chrono::ParseError> {
    let input = input.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date);
    }
    let naive = match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        Ok(naive) => naive,
        Err(_) => match NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M") {
            Ok(naive) => naive,
            Err(_) => NaiveDate::parse_from_str(input, "%Y-%m-%d")?
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default(),
        },
    };
    Ok(Utc.from_utc_datetime(&naive).into())
}

/// Reads the manifest at `path`: a list of [`SourceDocument`]s in YAML or
/// JSON.
pub fn load_manifest(path: &Path) -> anyhow::Result<Vec<SourceDocument>> {
    Ok(serde_yaml::from_reader(open(path, "manifest")?)?)
}

/// Builds the records for `sources`. Records that can't be built are
/// reported and left out.
pub fn records(config: &Config, sources: Vec<SourceDocument>) -> Vec<DocumentRecord> {
    sources
        .into_iter()
        .filter_map(|source| match DocumentRecord::from_source(source, config) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%err, "excluding document from indexes");
                None
            }
        })
        .collect()
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem with one manifest entry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the entry's date can't be parsed.
    #[error("invalid date `{date}` for `{path}`: {err}")]
    Date {
        path: String,
        date: String,
        #[source]
        err: chrono::ParseError,
    },

    /// Returned when neither the title nor the path yields a slug.
    #[error("can't derive a slug for `{path}`")]
    Slug { path: String },
}
