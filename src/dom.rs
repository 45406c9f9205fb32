//! The HTML document capabilities needed by [`crate::customize`]: parse a
//! file, query it with a CSS selector, splice fragments around the matches,
//! and serialize it back. [`Dom`] is the seam; [`Document`] implements it on
//! `kuchikiki`, which parses with html5ever and matches with the `selectors`
//! engine.

use kuchikiki::traits::TendrilSink;
use kuchikiki::NodeRef;

/// Operations the customization pass performs on a parsed HTML file.
pub trait Dom: Sized {
    /// A handle to one node of the tree.
    type Node: Clone;

    fn parse(bytes: &[u8]) -> Result<Self>;

    fn serialize(&self) -> Result<Vec<u8>>;

    /// The `<head>` element, when the markup declares one.
    fn head(&self) -> Option<Self::Node>;

    /// Returns the elements matching `selector`, in document order.
    fn query(&self, selector: &str) -> Result<Vec<Self::Node>>;

    /// The text of every comment that is a direct child of `parent`.
    fn comments(&self, parent: &Self::Node) -> Vec<String>;

    /// Creates a detached comment node.
    fn create_comment(&mut self, text: &str) -> Self::Node;

    /// Parses `html` as body content into detached nodes.
    fn parse_fragment(&mut self, html: &str) -> Vec<Self::Node>;

    /// Inserts `nodes` as the first children of `parent`.
    fn prepend(&mut self, parent: &Self::Node, nodes: Vec<Self::Node>);

    fn insert_before(&mut self, target: &Self::Node, nodes: Vec<Self::Node>);

    fn insert_after(&mut self, target: &Self::Node, nodes: Vec<Self::Node>);

    /// Substitutes `nodes` for `target`, detaching it.
    fn replace(&mut self, target: &Self::Node, nodes: Vec<Self::Node>);
}

/// A parsed HTML document.
pub struct Document {
    root: NodeRef,

    /// html5ever always builds a `<head>`; this records whether the source
    /// had one of its own.
    declares_head: bool,
}

impl Dom for Document {
    type Node = NodeRef;

    fn parse(bytes: &[u8]) -> Result<Document> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Document {
            root: kuchikiki::parse_html().one(text),
            declares_head: declares_head(text),
        })
    }

    fn serialize(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.root.serialize(&mut out)?;
        Ok(out)
    }

    fn head(&self) -> Option<NodeRef> {
        if !self.declares_head {
            return None;
        }
        self.root
            .select_first("head")
            .ok()
            .map(|head| head.as_node().clone())
    }

    fn query(&self, selector: &str) -> Result<Vec<NodeRef>> {
        let matches = self.root.select(selector).map_err(|()| Error::Selector {
            selector: selector.to_owned(),
        })?;
        Ok(matches.map(|element| element.as_node().clone()).collect())
    }

    fn comments(&self, parent: &NodeRef) -> Vec<String> {
        parent
            .children()
            .filter_map(|child| child.as_comment().map(|text| text.borrow().clone()))
            .collect()
    }

    fn create_comment(&mut self, text: &str) -> NodeRef {
        NodeRef::new_comment(text)
    }

    fn parse_fragment(&mut self, html: &str) -> Vec<NodeRef> {
        let wrapper = kuchikiki::parse_html()
            .one(format!("<html><head></head><body>{}</body></html>", html));
        let body = match wrapper.select_first("body") {
            Ok(body) => body.as_node().clone(),
            Err(()) => return Vec::new(),
        };
        let nodes: Vec<NodeRef> = body.children().collect();
        for node in &nodes {
            node.detach();
        }
        nodes
    }

    fn prepend(&mut self, parent: &NodeRef, nodes: Vec<NodeRef>) {
        for node in nodes.into_iter().rev() {
            parent.prepend(node);
        }
    }

    fn insert_before(&mut self, target: &NodeRef, nodes: Vec<NodeRef>) {
        for node in nodes {
            target.insert_before(node);
        }
    }

    fn insert_after(&mut self, target: &NodeRef, nodes: Vec<NodeRef>) {
        for node in nodes.into_iter().rev() {
            target.insert_after(node);
        }
    }

    fn replace(&mut self, target: &NodeRef, nodes: Vec<NodeRef>) {
        self.insert_before(target, nodes);
        target.detach();
    }
}

/// Whether `html` has a `<head>` start tag (not to be confused with
/// `<header>`).
fn declares_head(html: &str) -> bool {
    let lower = html.to_ascii_lowercase();
    lower.match_indices("<head").any(|(at, tag)| {
        match lower[at + tag.len()..].chars().next() {
            Some(c) => c == '>' || c == '/' || c.is_ascii_whitespace(),
            None => false,
        }
    })
}

pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failure to read, query or write a document.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the file is not UTF-8.
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Returned when a selector uses unsupported or malformed syntax.
    #[error("invalid selector `{selector}`")]
    Selector { selector: String },

    /// Returned when serialization fails.
    #[error("serializing document: {0}")]
    Io(#[from] std::io::Error),
}
