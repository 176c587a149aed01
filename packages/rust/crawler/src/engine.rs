//! Depth-bounded graph expansion over related-term and related-article links.
//!
//! Every call claims its article in the shared registry before doing any
//! work, so sibling and recursive expansions see each other's discoveries
//! and a popular article is fetched once no matter how many paths reach it.
//! Edges travel back up as [`Expansion`] deltas that callers merge.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell, Semaphore};
use tracing::{debug, instrument, warn};
use url::Url;

use termgraph_shared::{ArticleRecord, ArticleRegistry, Expansion, OutboundLink, TraversalConfig};

use crate::extract::LinkExtractor;
use crate::fetch::ArticleStore;
use crate::layout::ContentLayout;

/// Registry handle shared between the driver and every expansion task.
pub type SharedRegistry = Arc<Mutex<ArticleRegistry>>;

/// Boxed so the recursion can be spawned onto the runtime.
pub type ExpansionFuture = Pin<Box<dyn Future<Output = Expansion> + Send>>;

/// Single-flight fetch slot; resolves to whether the fetch succeeded.
type FetchSlot = Arc<OnceCell<bool>>;

// ---------------------------------------------------------------------------
// ArticleTarget / TraversalOptions
// ---------------------------------------------------------------------------

/// An article to expand or register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleTarget {
    pub identifier: String,
    pub locator: String,
    /// Decides the content folder when the article is first seen.
    pub is_term: bool,
}

impl ArticleTarget {
    pub fn new(identifier: impl Into<String>, locator: impl Into<String>, is_term: bool) -> Self {
        Self {
            identifier: identifier.into(),
            locator: locator.into(),
            is_term,
        }
    }
}

impl From<OutboundLink> for ArticleTarget {
    fn from(link: OutboundLink) -> Self {
        Self {
            identifier: link.display_name,
            locator: link.locator,
            is_term: link.is_term,
        }
    }
}

/// Knobs the engine reads on every call.
#[derive(Debug, Clone)]
pub struct TraversalOptions {
    /// Re-fetch known articles (once per identifier per engine).
    pub force_refetch: bool,
    /// Skip nodes already expanded with an equal or larger depth budget.
    pub skip_revisits: bool,
    /// Fetch the targets of depth-0 nodes without parsing them.
    pub fetch_horizon: bool,
    /// Maximum fetches in flight.
    pub concurrency: usize,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            force_refetch: false,
            skip_revisits: true,
            fetch_horizon: true,
            concurrency: 4,
        }
    }
}

impl From<&TraversalConfig> for TraversalOptions {
    fn from(config: &TraversalConfig) -> Self {
        Self {
            force_refetch: config.force_refetch,
            skip_revisits: config.skip_revisits,
            fetch_horizon: config.fetch_horizon,
            concurrency: config.concurrency.max(1) as usize,
        }
    }
}

/// Outcome of the atomic check-and-insert on the registry.
struct Claim {
    record: ArticleRecord,
    /// This call inserted or overwrote the registry entry.
    inserted: bool,
    /// Pending or finished fetch for the identifier, if any.
    fetch: Option<FetchSlot>,
}

// ---------------------------------------------------------------------------
// TraversalEngine
// ---------------------------------------------------------------------------

/// Recursive expansion over a shared article registry.
pub struct TraversalEngine {
    store: Arc<dyn ArticleStore>,
    extractor: Arc<dyn LinkExtractor>,
    layout: ContentLayout,
    registry: SharedRegistry,
    options: TraversalOptions,
    /// Identifiers claimed for fetching in this run. Lock after `registry`.
    fetches: Mutex<HashMap<String, FetchSlot>>,
    /// Largest depth budget each identifier has been expanded with.
    expanded: Mutex<HashMap<String, u32>>,
    permits: Semaphore,
}

impl TraversalEngine {
    pub fn new(
        store: Arc<dyn ArticleStore>,
        extractor: Arc<dyn LinkExtractor>,
        layout: ContentLayout,
        registry: SharedRegistry,
        options: TraversalOptions,
    ) -> Arc<Self> {
        let permits = Semaphore::new(options.concurrency.max(1));
        Arc::new(Self {
            store,
            extractor,
            layout,
            registry,
            options,
            fetches: Mutex::new(HashMap::new()),
            expanded: Mutex::new(HashMap::new()),
            permits,
        })
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    pub fn options(&self) -> &TraversalOptions {
        &self.options
    }

    /// Expand `target`: fetch it if needed, record its outbound references,
    /// and recurse into them while `depth > 0`.
    ///
    /// Failures never propagate; an unreachable article contributes no edges.
    pub fn expand(self: &Arc<Self>, target: ArticleTarget, depth: u32) -> ExpansionFuture {
        let engine = Arc::clone(self);
        Box::pin(async move { engine.expand_node(target, depth).await })
    }

    /// Claim and fetch `target` without parsing it.
    pub fn register(self: &Arc<Self>, target: ArticleTarget) -> ExpansionFuture {
        let engine = Arc::clone(self);
        Box::pin(async move {
            let mut expansion = Expansion::default();
            engine.materialize(&target, &mut expansion).await;
            expansion
        })
    }

    #[instrument(level = "debug", skip_all, fields(identifier = %target.identifier, depth = depth))]
    async fn expand_node(self: Arc<Self>, target: ArticleTarget, depth: u32) -> Expansion {
        let mut expansion = Expansion::default();
        let record = self.materialize(&target, &mut expansion).await;

        let html = match tokio::fs::read(&record.path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                warn!(
                    identifier = %target.identifier,
                    path = %record.path.display(),
                    error = %e,
                    "local content unavailable, skipping"
                );
                return expansion;
            }
        };

        if self.options.skip_revisits && !self.mark_expanded(&target.identifier, depth).await {
            debug!("already expanded with an equal or larger budget");
            return expansion;
        }

        let links = self.outbound_links(&html, &record.locator);
        debug!(links = links.len(), "outbound links extracted");
        expansion.graph.add_edges(
            target.identifier.clone(),
            links.iter().map(|link| link.display_name.clone()),
        );

        if depth > 0 || self.options.fetch_horizon {
            let mut handles = Vec::with_capacity(links.len());
            for link in links {
                let child = ArticleTarget::from(link);
                let task = if depth > 0 {
                    self.expand(child, depth - 1)
                } else {
                    self.register(child)
                };
                handles.push(tokio::spawn(task));
            }

            for handle in handles {
                match handle.await {
                    Ok(child) => expansion.absorb(child),
                    Err(e) => warn!(error = %e, "expansion task failed"),
                }
            }
        }

        expansion.graph.prune_empty();
        expansion
    }

    /// Claim `target`, record a fresh claim in `expansion`, and make sure any
    /// pending fetch for it has finished. Returns the registry record.
    async fn materialize(&self, target: &ArticleTarget, expansion: &mut Expansion) -> ArticleRecord {
        let claim = self.claim(target).await;
        if claim.inserted {
            expansion
                .articles
                .insert(target.identifier.clone(), claim.record.clone());
        }
        if let Some(slot) = &claim.fetch {
            self.fetch_once(slot, &target.identifier, &claim.record).await;
        }
        claim.record
    }

    /// Atomic check-and-insert. The first caller for an unseen identifier (or,
    /// when forcing, the first caller this run) inserts the record and opens a
    /// fetch slot; everyone else gets the existing record and slot.
    async fn claim(&self, target: &ArticleTarget) -> Claim {
        let mut registry = self.registry.lock().await;
        let mut fetches = self.fetches.lock().await;

        let known = registry.get(&target.identifier).cloned();
        let refresh = self.options.force_refetch && !fetches.contains_key(&target.identifier);

        match known {
            Some(record) if !refresh => Claim {
                record,
                inserted: false,
                fetch: fetches.get(&target.identifier).cloned(),
            },
            known => {
                let path = match known {
                    Some(existing) => existing.path,
                    None => self
                        .layout
                        .discovered_path(&target.identifier, target.is_term),
                };
                let record = ArticleRecord::new(path, target.locator.clone());
                registry.insert(target.identifier.clone(), record.clone());

                let slot = FetchSlot::default();
                fetches.insert(target.identifier.clone(), Arc::clone(&slot));
                Claim {
                    record,
                    inserted: true,
                    fetch: Some(slot),
                }
            }
        }
    }

    /// Run the fetch for `slot` if nobody has, otherwise wait for it.
    async fn fetch_once(&self, slot: &OnceCell<bool>, identifier: &str, record: &ArticleRecord) {
        slot.get_or_init(|| async {
            let Ok(_permit) = self.permits.acquire().await else {
                return false;
            };
            match self
                .store
                .fetch_and_persist(&record.locator, &record.path)
                .await
            {
                Ok(()) => {
                    debug!(identifier, locator = %record.locator, "article fetched");
                    true
                }
                Err(e) => {
                    warn!(identifier, locator = %record.locator, error = %e, "fetch failed");
                    false
                }
            }
        })
        .await;
    }

    /// Record an expansion of `identifier` with `depth`. Returns `false` if an
    /// equal or deeper expansion was already recorded.
    async fn mark_expanded(&self, identifier: &str, depth: u32) -> bool {
        let mut expanded = self.expanded.lock().await;
        match expanded.get(identifier) {
            Some(&done) if done >= depth => false,
            _ => {
                expanded.insert(identifier.to_string(), depth);
                true
            }
        }
    }

    /// Extract, resolve against `base`, and drop repeated (name, locator) pairs.
    fn outbound_links(&self, html: &str, base: &str) -> Vec<OutboundLink> {
        let base = Url::parse(base).ok();
        let mut seen = HashSet::new();

        self.extractor
            .extract(html)
            .into_iter()
            .map(|mut link| {
                link.locator = resolve_locator(base.as_ref(), &link.locator);
                link
            })
            .filter(|link| seen.insert((link.display_name.clone(), link.locator.clone())))
            .collect()
    }
}

/// Make `href` absolute against `base` and strip its fragment. Unparseable
/// hrefs are kept as written.
fn resolve_locator(base: Option<&Url>, href: &str) -> String {
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    match resolved {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.to_string(),
    }
}
