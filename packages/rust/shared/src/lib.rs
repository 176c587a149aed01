//! Shared types, error model, and configuration for termgraph.
//!
//! This crate is the foundation depended on by all other termgraph crates.
//! It provides:
//! - [`TermGraphError`] — the unified error type
//! - Domain types ([`ArticleRegistry`], [`LinkGraph`], [`OutboundLink`], [`Expansion`])
//! - Configuration ([`AppConfig`], [`TraversalConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, HttpConfig, SEED_REGISTRY_FILE, SelectorConfig, SiteConfig,
    TraversalConfig, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TermGraphError};
pub use types::{ArticleRecord, ArticleRegistry, Expansion, LinkGraph, OutboundLink};
