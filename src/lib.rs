//! The library code for `neruda`, a post-processor for statically generated
//! blogs. It runs two independent passes over a site that has already been
//! built:
//!
//! 1. Customization ([`crate::customize`]): configured HTML fragments are
//!    injected around the nodes matching a CSS selector. Each applied rule
//!    leaves a fingerprint comment in `<head>` so that running the pass again
//!    leaves the file untouched.
//! 2. Indexing ([`crate::build::build_indexes`]): the articles listed in a
//!    manifest ([`crate::document`]) are grouped by tag ([`crate::tag`]) and
//!    every group gets an Atom feed ([`crate::feed`]) and an HTML page
//!    ([`crate::write`]).
//!
//! Both passes read a single immutable [`config::Config`].

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod customize;
pub mod document;
pub mod dom;
pub mod feed;
pub mod tag;
pub mod util;
pub mod value;
pub mod write;
