//! End-to-end `expand` pipeline: seed registry → traversal → graph files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use termgraph_crawler::{
    ArticleStore, ArticleTarget, ContentLayout, LinkExtractor, SharedRegistry, TraversalEngine,
    TraversalOptions,
};
use termgraph_shared::{ArticleRecord, ArticleRegistry, LinkGraph, Result, TermGraphError, TraversalConfig};

/// Result of the `expand_graph` pipeline.
#[derive(Debug)]
pub struct ExpandGraphResult {
    /// Seeds whose traversal ran.
    pub seeds_expanded: usize,
    /// Seeds skipped because their content was missing.
    pub seeds_skipped: usize,
    /// Entries in the expanded registry.
    pub article_count: usize,
    /// Nodes with an edge set in the graph.
    pub node_count: usize,
    /// Total edges in the graph.
    pub edge_count: usize,
    /// Where the expanded registry was written.
    pub registry_path: PathBuf,
    /// Where the graph was written.
    pub graph_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each unit of work (a seed, a downloaded article).
    fn advance(&self, label: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn finish(&self);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn advance(&self, _label: &str, _current: usize, _total: usize) {}
    fn finish(&self) {}
}

/// Run the full `expand` pipeline.
///
/// 1. Load the seed registry (missing file is fatal)
/// 2. Expand every seed whose content exists, `concurrency` seeds at a time
/// 3. Merge each seed's delta into the working registry and graph
/// 4. Write the depth-tagged registry and graph files
#[instrument(skip_all, fields(max_depth = config.max_depth, force = config.force_refetch))]
pub async fn expand_graph(
    config: &TraversalConfig,
    store: Arc<dyn ArticleStore>,
    extractor: Arc<dyn LinkExtractor>,
    progress: &dyn ProgressReporter,
) -> Result<ExpandGraphResult> {
    let start = Instant::now();

    // --- Phase 1: Seeds ---
    progress.phase("Loading seed registry");
    let seed_path = config.seed_registry_path();
    let seeds = ArticleRegistry::load(&seed_path)?;
    info!(seeds = seeds.len(), path = %seed_path.display(), "seed registry loaded");

    for folder in ["term", "article"] {
        let dir = config.data_dir.join(folder);
        std::fs::create_dir_all(&dir).map_err(|e| TermGraphError::io(&dir, e))?;
    }

    let registry: SharedRegistry = Arc::new(Mutex::new(seeds.clone()));
    let mut graph = LinkGraph::with_nodes(seeds.identifiers().cloned());
    let engine = TraversalEngine::new(
        store,
        extractor,
        ContentLayout::new(&config.data_dir),
        Arc::clone(&registry),
        TraversalOptions::from(config),
    );

    // --- Phase 2: Traversal ---
    progress.phase("Expanding graph");
    let targets: Vec<(String, ArticleRecord)> = seeds
        .iter()
        .map(|(id, record)| (id.clone(), record.clone()))
        .collect();
    let total = targets.len();
    let batch_size = engine.options().concurrency;
    let mut seeds_expanded = 0usize;
    let mut seeds_skipped = 0usize;

    for batch in targets.chunks(batch_size) {
        let mut handles = Vec::with_capacity(batch.len());

        for (identifier, record) in batch {
            if !record.path.exists() {
                warn!(
                    identifier = %identifier,
                    path = %record.path.display(),
                    "seed content missing, skipping"
                );
                seeds_skipped += 1;
                progress.advance(identifier, seeds_expanded + seeds_skipped, total);
                continue;
            }

            // Seeds come from the glossary listing, so they are terms.
            let target = ArticleTarget::new(identifier.clone(), record.locator.clone(), true);
            let task = engine.expand(target, config.max_depth);
            handles.push((identifier.clone(), tokio::spawn(task)));
        }

        for (identifier, handle) in handles {
            match handle.await {
                Ok(expansion) => {
                    registry.lock().await.merge(expansion.articles);
                    graph.merge(expansion.graph);
                    seeds_expanded += 1;
                }
                Err(e) => {
                    warn!(identifier = %identifier, error = %e, "seed traversal failed");
                    seeds_skipped += 1;
                }
            }
            progress.advance(&identifier, seeds_expanded + seeds_skipped, total);
        }
    }

    // --- Phase 3: Persist ---
    progress.phase("Writing graph");
    graph.prune_empty();
    let expanded = registry.lock().await.clone();

    let registry_path = config.expanded_registry_path();
    let graph_path = config.graph_path();
    expanded.save(&registry_path)?;
    graph.save(&graph_path)?;

    let result = ExpandGraphResult {
        seeds_expanded,
        seeds_skipped,
        article_count: expanded.len(),
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        registry_path,
        graph_path,
        elapsed: start.elapsed(),
    };

    info!(
        seeds_expanded = result.seeds_expanded,
        seeds_skipped = result.seeds_skipped,
        articles = result.article_count,
        nodes = result.node_count,
        edges = result.edge_count,
        duration_ms = result.elapsed.as_millis(),
        "graph expansion completed"
    );

    progress.finish();
    Ok(result)
}
