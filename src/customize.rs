//! Applies the configured [`TemplateRule`]s to generated HTML files.
//!
//! Every applied rule leaves a fingerprint comment, `<!-- Neruda Template:
//! {md5 of the rule content} -->`, as the first child of `<head>`. Before a
//! rule is applied the fingerprints are checked: if the file already carries
//! the fingerprint of *any* applicable rule, the whole pass for that file is
//! abandoned and the file is left untouched. Running the pass twice over the
//! same output is therefore a no-op the second time.

use crate::config::{Config, Position, TemplateRule};
use crate::dom::{self, Document, Dom};
use crate::util::{md5_hex, write_atomic};
use glob::{MatchOptions, Pattern};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

const FINGERPRINT_PREFIX: &str = " Neruda Template: ";

/// Path patterns are case sensitive, `*` stops at `/`, and dotfiles are
/// matched like any other file.
const PATH_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// The text of the fingerprint comment recording that `content` was
/// injected.
pub fn fingerprint(content: &str) -> String {
    format!("{}{} ", FINGERPRINT_PREFIX, md5_hex(content))
}

/// What a customization pass did to one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// This many rules were applied and the file was rewritten.
    Customized(usize),

    /// The file already carries the fingerprint of an applicable rule.
    AlreadyApplied,

    /// No rule applied; the file was not touched.
    Unchanged,
}

/// The result of applying rules to an in-memory document.
#[derive(Debug, PartialEq, Eq)]
pub enum Pass {
    Customized { html: Vec<u8>, applied: usize },
    AlreadyApplied,
    Unchanged,
}

/// Applies `rules`, in order, to the HTML in `content`. See the module
/// documentation for the fingerprint protocol. Inert rules, rules whose
/// selector does not parse, and every rule of a document without `<head>`
/// are skipped.
pub fn apply_rules<D: Dom>(content: &[u8], rules: &[&TemplateRule]) -> dom::Result<Pass> {
    let mut document = D::parse(content)?;
    let mut applied = 0;

    for rule in rules {
        let (selector, html) = match rule.directive() {
            Some(directive) => directive,
            None => continue,
        };
        let head = match document.head() {
            Some(head) => head,
            None => {
                debug!("document has no <head>, skipping template rule");
                continue;
            }
        };

        let marker = fingerprint(html);
        if document.comments(&head).iter().any(|comment| *comment == marker) {
            return Ok(Pass::AlreadyApplied);
        }

        let targets = match document.query(selector) {
            Ok(targets) => targets,
            Err(err) => {
                warn!(%err, "skipping template rule");
                continue;
            }
        };

        let comment = document.create_comment(&marker);
        document.prepend(&head, vec![comment]);
        for target in &targets {
            let nodes = document.parse_fragment(html);
            match rule.position {
                Position::Before => document.insert_before(target, nodes),
                Position::After => document.insert_after(target, nodes),
                Position::Replace => document.replace(target, nodes),
            }
        }
        applied += 1;
    }

    Ok(match applied {
        0 => Pass::Unchanged,
        _ => Pass::Customized {
            html: document.serialize()?,
            applied,
        },
    })
}

/// Customizes output files according to a [`Config`]'s template rules.
pub struct Customizer<'a> {
    config: &'a Config,
    public_folder: PathBuf,
}

impl<'a> Customizer<'a> {
    pub fn new(config: &'a Config) -> Customizer<'a> {
        Customizer {
            public_folder: absolute(&config.public_folder),
            config,
        }
    }

    /// Returns the non-inert rules whose path patterns (if any) match
    /// `file_path`, in configuration order.
    pub fn applicable_rules(&self, file_path: &Path) -> Vec<&'a TemplateRule> {
        let config: &'a Config = self.config;
        let file_path = absolute(file_path);
        config
            .templates
            .iter()
            .filter(|rule| rule.directive().is_some())
            .filter(|rule| self.matches_path(rule, &file_path))
            .collect()
    }

    fn matches_path(&self, rule: &TemplateRule, file_path: &Path) -> bool {
        let patterns = match &rule.path_pattern {
            None => return true,
            Some(patterns) => patterns.patterns(),
        };
        let root = Pattern::escape(&self.public_folder.to_string_lossy());
        let file_path = file_path.to_string_lossy();
        patterns.iter().any(|pattern| {
            let full = format!(
                "{}/{}",
                root.trim_end_matches('/'),
                pattern.trim_start_matches('/')
            );
            match Pattern::new(&full) {
                Ok(pattern) => pattern.matches_with(&file_path, PATH_MATCH_OPTIONS),
                Err(err) => {
                    warn!(pattern = %full, %err, "invalid template path pattern");
                    false
                }
            }
        })
    }

    /// Runs the customization pass over one file, rewriting it in place when
    /// at least one rule was applied.
    pub fn customize(&self, file_path: &Path) -> Result<Outcome> {
        let content = std::fs::read(file_path).map_err(|err| Error::Read {
            path: file_path.to_owned(),
            err,
        })?;
        let rules = self.applicable_rules(file_path);
        if rules.is_empty() {
            return Ok(Outcome::Unchanged);
        }

        let pass = apply_rules::<Document>(&content, &rules).map_err(|err| Error::Html {
            path: file_path.to_owned(),
            err,
        })?;

        Ok(match pass {
            Pass::Customized { html, applied } => {
                write_atomic(file_path, &html).map_err(|err| Error::Write {
                    path: file_path.to_owned(),
                    err,
                })?;
                Outcome::Customized(applied)
            }
            Pass::AlreadyApplied => Outcome::AlreadyApplied,
            Pass::Unchanged => Outcome::Unchanged,
        })
    }
}

/// Makes `path` absolute against the working directory and drops `.`
/// and `..` components lexically.
fn absolute(path: &Path) -> PathBuf {
    let joined = match path.is_absolute() {
        true => path.to_owned(),
        false => std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_owned()),
    };
    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to customize one file.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the file can't be read.
    #[error("Reading `{}`: {err}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    /// Returned when the file isn't UTF-8 or can't be serialized back.
    #[error("Parsing `{}`: {err}", path.display())]
    Html {
        path: PathBuf,
        #[source]
        err: dom::Error,
    },

    /// Returned when the customized file can't be written back.
    #[error("Writing `{}`: {err}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
}
