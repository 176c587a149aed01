//! Pipelines for termgraph.
//!
//! `seed` downloads the seed articles listed on the glossary category pages.
//! `pipeline` expands every seed into the term/article link graph.

pub mod pipeline;
pub mod seed;
