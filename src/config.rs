//! Loads the site configuration from a `neruda.yml` project file. The
//! resulting [`Config`] is an immutable value handed by reference to every
//! pass; nothing in the crate reads configuration from anywhere else.

use crate::util::open;
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

/// The name of the project file searched for by [`Config::from_directory`].
pub const PROJECT_FILE: &str = "neruda.yml";

/// Where a [`TemplateRule`]'s content goes relative to each matched node.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Before,
    #[default]
    After,
    Replace,
}

/// One or many glob patterns, as written in the project file.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum PathPattern {
    One(String),
    Many(Vec<String>),
}

impl PathPattern {
    pub fn patterns(&self) -> &[String] {
        match self {
            PathPattern::One(pattern) => std::slice::from_ref(pattern),
            PathPattern::Many(patterns) => patterns,
        }
    }
}

/// A customization directive applied to generated HTML files. A rule
/// without a `selector` or without `content` is inert.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TemplateRule {
    /// CSS selector of the nodes the content is placed around.
    #[serde(default)]
    pub selector: Option<String>,

    /// HTML fragment to inject.
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default, rename = "type")]
    pub position: Position,

    /// Glob(s) restricting the rule to some output files, relative to the
    /// public folder (e.g. `/blog/**/*.html`).
    #[serde(default, rename = "path")]
    pub path_pattern: Option<PathPattern>,
}

impl TemplateRule {
    /// Returns the selector and content of an applicable rule, or `None`
    /// for an inert one.
    pub fn directive(&self) -> Option<(&str, &str)> {
        match (&self.selector, &self.content) {
            (Some(selector), Some(content)) => Some((selector, content)),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct Project {
    domain: Url,

    #[serde(default)]
    title: String,

    #[serde(default)]
    author: Option<String>,

    #[serde(default = "default_lang")]
    lang: String,

    #[serde(default = "default_public_folder")]
    public_folder: PathBuf,

    #[serde(default)]
    blog_path: Option<String>,

    #[serde(default)]
    templates: Vec<TemplateRule>,

    #[serde(default)]
    tag_template: Option<PathBuf>,

    #[serde(default)]
    tags_template: Option<PathBuf>,
}

fn default_lang() -> String {
    String::from("en")
}

fn default_public_folder() -> PathBuf {
    PathBuf::from("public_html")
}

/// The resolved site configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The site root URL. Always rendered without a trailing slash, see
    /// [`Config::domain`].
    pub domain: Url,
    pub title: String,
    pub author: String,
    pub lang: String,

    /// The directory holding the generated site.
    pub public_folder: PathBuf,

    /// Path of the blog section relative to [`Config::public_folder`],
    /// without leading or trailing slashes. `None` disables indexing.
    pub blog_path: Option<String>,

    pub templates: Vec<TemplateRule>,

    /// Template files for the per-tag pages and the tag overview page.
    /// `None` selects the built-in templates.
    pub tag_template: Option<PathBuf>,
    pub tags_template: Option<PathBuf>,
}

impl Config {
    /// Builds a configuration with defaults for everything but the domain.
    pub fn new(domain: Url) -> Config {
        Config {
            domain,
            title: String::new(),
            author: default_author(),
            lang: default_lang(),
            public_folder: default_public_folder(),
            blog_path: None,
            templates: Vec::new(),
            tag_template: None,
            tags_template: None,
        }
    }

    /// Searches `dir` and then its ancestors for [`PROJECT_FILE`].
    pub fn from_directory(dir: &Path) -> Result<Config> {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            Config::from_project_file(&path)
                .with_context(|| format!("Loading configuration `{}`", path.display()))
        } else {
            match dir.parent() {
                Some(parent) => Config::from_directory(parent),
                None => Err(anyhow!(
                    "Could not find `{}` in any parent directory",
                    PROJECT_FILE
                )),
            }
        }
    }

    /// Loads a project file. Relative paths in it are resolved against the
    /// directory containing the file.
    pub fn from_project_file(path: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_reader(open(path, "project")?)?;
        let project_root = path.parent().ok_or_else(|| {
            anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )
        })?;
        Ok(Config::from_project(project, project_root))
    }

    /// Parses a project from YAML text, resolving relative paths against
    /// `project_root`.
    pub fn from_yaml(yaml: &str, project_root: &Path) -> Result<Config> {
        let project: Project = serde_yaml::from_str(yaml)?;
        Ok(Config::from_project(project, project_root))
    }

    fn from_project(project: Project, project_root: &Path) -> Config {
        Config {
            domain: project.domain,
            title: project.title,
            author: project.author.unwrap_or_else(default_author),
            lang: project.lang,
            public_folder: project_root.join(project.public_folder),
            blog_path: project.blog_path.and_then(|path| normalize_blog_path(&path)),
            templates: project.templates,
            tag_template: project.tag_template.map(|p| project_root.join(p)),
            tags_template: project.tags_template.map(|p| project_root.join(p)),
        }
    }

    /// The domain without a trailing slash, ready for `format!("{}/...")`.
    pub fn domain(&self) -> &str {
        self.domain.as_str().trim_end_matches('/')
    }

    /// Joins a site-relative path onto the domain.
    pub fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.domain(), relative.trim_start_matches('/'))
    }
}

fn normalize_blog_path(path: &str) -> Option<String> {
    let trimmed = path.trim_matches('/');
    match trimmed.is_empty() {
        true => None,
        false => Some(trimmed.to_owned()),
    }
}

fn default_author() -> String {
    std::env::var("USER").unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;

    const PROJECT: &str = r#"
domain: https://example.org/
title: My Site
author: Alice
blog_path: /blog/
templates:
  - selector: "div#content"
    content: "<p>footer</p>"
  - selector: "h1"
    content: "<hr/>"
    type: before
    path: /customize/*
  - selector: "title"
    type: replace
    path: ["/a/*", "/b/**/*.html"]
"#;

    #[test]
    fn test_from_yaml() -> Result<()> {
        let config = Config::from_yaml(PROJECT, Path::new("/srv/site"))?;
        assert_eq!("https://example.org", config.domain());
        assert_eq!("My Site", config.title);
        assert_eq!("Alice", config.author);
        assert_eq!("en", config.lang);
        assert_eq!(PathBuf::from("/srv/site/public_html"), config.public_folder);
        assert_eq!(Some(String::from("blog")), config.blog_path);
        assert_eq!(3, config.templates.len());
        Ok(())
    }

    #[test]
    fn test_template_rule_defaults() -> Result<()> {
        let config = Config::from_yaml(PROJECT, Path::new("."))?;
        let rules = &config.templates;

        assert_eq!(Position::After, rules[0].position);
        assert_eq!(None, rules[0].path_pattern);
        assert_eq!(Some(("div#content", "<p>footer</p>")), rules[0].directive());

        assert_eq!(Position::Before, rules[1].position);
        assert_eq!(
            Some(PathPattern::One(String::from("/customize/*"))),
            rules[1].path_pattern
        );

        assert_eq!(Position::Replace, rules[2].position);
        assert_eq!(None, rules[2].directive());
        assert_eq!(
            2,
            rules[2].path_pattern.as_ref().map_or(0, |p| p.patterns().len())
        );
        Ok(())
    }

    #[test]
    fn test_empty_blog_path_disables_indexing() -> Result<()> {
        let config = Config::from_yaml("domain: https://example.org\nblog_path: /\n", Path::new("."))?;
        assert_eq!(None, config.blog_path);
        Ok(())
    }

    #[test]
    fn test_url_for() {
        let config = Config::new(Url::parse("https://example.org/").unwrap());
        assert_eq!("https://example.org/feeds/index.xml", config.url_for("/feeds/index.xml"));
        assert_eq!("https://example.org/blog", config.url_for("blog"));
    }

    #[test]
    fn test_from_directory_searches_parents() -> Result<()> {
        let dir = tempfile::tempdir()?;
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "domain: https://example.org\npublic_folder: out\n",
        )?;
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested)?;

        let config = Config::from_directory(&nested)?;
        assert_eq!(dir.path().join("out"), config.public_folder);
        Ok(())
    }
}
