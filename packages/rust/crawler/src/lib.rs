//! Fetching, link extraction, and recursive graph expansion.
//!
//! This crate provides:
//! - [`fetch`] — the [`ArticleStore`] seam and its HTTP implementation
//! - [`extract`] — the [`LinkExtractor`] seam and the selector-driven [`SiteExtractor`]
//! - [`layout`] — identifier → local content path
//! - [`engine`] — the depth-bounded [`TraversalEngine`]

pub mod engine;
pub mod extract;
pub mod fetch;
pub mod layout;

pub use engine::{
    ArticleTarget, ExpansionFuture, SharedRegistry, TraversalEngine, TraversalOptions,
};
pub use extract::{LinkExtractor, SiteExtractor};
pub use fetch::{ArticleStore, HttpArticleStore};
pub use layout::{ContentLayout, file_stem};
