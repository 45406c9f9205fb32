//! Stitches the passes together. [`customize_files`] runs the customizer
//! ([`crate::customize`]) over a set of generated files, and
//! [`build_indexes`] turns a manifest into records ([`crate::document`]),
//! groups them ([`crate::tag`]) and writes feeds and pages
//! ([`crate::write`]).
//!
//! Every file and every bucket is an independent unit: a failing unit is
//! logged and counted in the returned [`Report`], and the pass moves on.

use crate::config::Config;
use crate::customize::{Customizer, Outcome};
use crate::document::{load_manifest, records};
use crate::tag::TagIndex;
use crate::write::IndexWriter;
use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use walkdir::WalkDir;

/// Counts the units a pass went through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub processed: usize,
    pub failed: usize,
}

impl Report {
    fn record<T, E: Display>(&mut self, unit: &str, result: std::result::Result<T, E>) -> Option<T> {
        self.processed += 1;
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                error!(unit, %err, "failed");
                self.failed += 1;
                None
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.failed == 0
    }
}

/// Applies the configured template rules to each of `files`.
pub fn customize_files(config: &Config, files: &[PathBuf]) -> Report {
    let customizer = Customizer::new(config);
    let mut report = Report::default();
    let mut changed = 0;

    for file in files {
        let unit = file.display().to_string();
        match report.record(&unit, customizer.customize(file)) {
            Some(Outcome::Customized(rules)) => {
                debug!(file = %unit, rules, "customized");
                changed += 1;
            }
            Some(Outcome::AlreadyApplied) => debug!(file = %unit, "already customized"),
            Some(Outcome::Unchanged) => debug!(file = %unit, "no applicable rule"),
            None => {}
        }
    }

    info!(
        files = report.processed,
        changed,
        failed = report.failed,
        "customization done"
    );
    report
}

/// Every `.html` file under `dir`, in a stable order.
pub fn html_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Walking `{}`", dir.display()))?;
        if entry.file_type().is_file()
            && entry.path().extension().map_or(false, |ext| ext == "html")
        {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Builds the tag index of the articles listed in `manifest` and writes its
/// feeds and pages under the public folder.
pub fn build_indexes(config: &Config, manifest: &Path) -> Result<Report> {
    let sources = load_manifest(manifest)
        .with_context(|| format!("Loading manifest `{}`", manifest.display()))?;
    let documents = records(config, sources);
    let index = TagIndex::build(config, &documents);

    let mut report = Report::default();
    if index.is_empty() {
        info!("nothing to index");
        return Ok(report);
    }

    let writer = IndexWriter::new(config, Utc::now().into())?;
    for bucket in index.buckets() {
        report.record(&bucket.slug, writer.write_bucket(bucket));
    }
    report.record("tags overview", writer.write_overview(&index));

    info!(
        articles = index.all.records.len(),
        tags = index.tags.len(),
        failed = report.failed,
        "indexing done"
    );
    Ok(report)
}
