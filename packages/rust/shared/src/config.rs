//! Application configuration for termgraph.
//!
//! User config lives at `~/.termgraph/termgraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TermGraphError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "termgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".termgraph";

/// File name of the seed registry inside the graph directory.
pub const SEED_REGISTRY_FILE: &str = "article_map.json";

// ---------------------------------------------------------------------------
// Config structs (matching termgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Target site layout.
    #[serde(default)]
    pub site: SiteConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Root directory for downloaded article HTML.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Directory holding the seed registry and graph outputs.
    #[serde(default = "default_graph_dir")]
    pub graph_dir: String,

    /// Default maximum traversal depth.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum concurrent fetches (also the seed batch size).
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Skip re-expanding a node already expanded with an equal or larger budget.
    #[serde(default = "default_true")]
    pub skip_revisits: bool,

    /// Fetch (but do not parse) the targets of nodes expanded at depth 0.
    #[serde(default = "default_true")]
    pub fetch_horizon: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graph_dir: default_graph_dir(),
            max_depth: default_max_depth(),
            concurrency: default_concurrency(),
            skip_revisits: true,
            fetch_horizon: true,
        }
    }
}

fn default_data_dir() -> String {
    "./data".into()
}
fn default_graph_dir() -> String {
    "./graph".into()
}
fn default_max_depth() -> u32 {
    1
}
fn default_concurrency() -> u32 {
    4
}
fn default_true() -> bool {
    true
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site root that category pages are relative to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Category (starting letter) pages listing seed articles.
    #[serde(default = "default_category_pages")]
    pub category_pages: Vec<String>,

    /// Regex whose first group is the folder name of a category page.
    #[serde(default = "default_category_pattern")]
    pub category_pattern: String,

    /// Regex whose first group is the article name of an article URL.
    #[serde(default = "default_article_pattern")]
    pub article_pattern: String,

    /// CSS selectors used by the link extractor.
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            category_pages: default_category_pages(),
            category_pattern: default_category_pattern(),
            article_pattern: default_article_pattern(),
            selectors: SelectorConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Parse the configured base URL.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_url).map_err(|e| {
            TermGraphError::config(format!("invalid base_url '{}': {e}", self.base_url))
        })
    }
}

fn default_base_url() -> String {
    "https://www.investopedia.com/".into()
}
fn default_category_pattern() -> String {
    r"terms-beginning-with-(.*?)-\d+".into()
}
fn default_article_pattern() -> String {
    r"/([^/]+)\.asp$".into()
}

fn default_category_pages() -> Vec<String> {
    let letters = std::iter::once("num".to_string())
        .chain(('a'..='z').map(|c| c.to_string()));
    letters
        .zip(4_769_350u32..)
        .map(|(letter, id)| format!("terms-beginning-with-{letter}-{id}"))
        .collect()
}

/// `[site.selectors]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Article links on a category page.
    #[serde(default = "default_category_link")]
    pub category_link: String,

    /// Related-term anchors on an article page.
    #[serde(default = "default_related_term")]
    pub related_term: String,

    /// Related-article card anchors on an article page.
    #[serde(default = "default_related_article")]
    pub related_article: String,

    /// Title element inside a related-article card.
    #[serde(default = "default_related_article_title")]
    pub related_article_title: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            category_link: default_category_link(),
            related_term: default_related_term(),
            related_article: default_related_article(),
            related_article_title: default_related_article_title(),
        }
    }
}

fn default_category_link() -> String {
    "a.dictionary-top300-list__list.mntl-text-link".into()
}
fn default_related_term() -> String {
    "a.related-terms__title.mntl-text-link".into()
}
fn default_related_article() -> String {
    "a.mntl-document-card.related-articles__link".into()
}
fn default_related_article_title() -> String {
    "span.card__title-text".into()
}

// ---------------------------------------------------------------------------
// Traversal config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime traversal configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct TraversalConfig {
    /// Root directory for article HTML.
    pub data_dir: PathBuf,
    /// Directory holding the seed registry and outputs.
    pub graph_dir: PathBuf,
    /// Maximum traversal depth from each seed.
    pub max_depth: u32,
    /// Maximum concurrent fetches.
    pub concurrency: u32,
    /// Re-fetch every node regardless of registry presence.
    pub force_refetch: bool,
    /// Skip re-expansion of already expanded nodes.
    pub skip_revisits: bool,
    /// Fetch targets found at the depth horizon.
    pub fetch_horizon: bool,
}

impl TraversalConfig {
    /// Path of the seed registry.
    pub fn seed_registry_path(&self) -> PathBuf {
        self.graph_dir.join(SEED_REGISTRY_FILE)
    }

    /// Path of the expanded registry output, tagged with the depth.
    pub fn expanded_registry_path(&self) -> PathBuf {
        self.graph_dir
            .join(format!("expanded_article_map_depth{}.json", self.max_depth))
    }

    /// Path of the graph output, tagged with the depth.
    pub fn graph_path(&self) -> PathBuf {
        self.graph_dir
            .join(format!("term_article_graph_depth{}.json", self.max_depth))
    }
}

impl From<&AppConfig> for TraversalConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            data_dir: PathBuf::from(&config.defaults.data_dir),
            graph_dir: PathBuf::from(&config.defaults.graph_dir),
            max_depth: config.defaults.max_depth,
            concurrency: config.defaults.concurrency.max(1),
            force_refetch: false,
            skip_revisits: config.defaults.skip_revisits,
            fetch_horizon: config.defaults.fetch_horizon,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.termgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| TermGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.termgraph/termgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| TermGraphError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TermGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| TermGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| TermGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| TermGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("graph_dir"));
        assert!(toml_str.contains("related-terms__title"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.max_depth, 1);
        assert_eq!(parsed.site.category_pages.len(), 27);
    }

    #[test]
    fn default_category_pages_cover_every_letter() {
        let pages = default_category_pages();
        assert_eq!(pages[0], "terms-beginning-with-num-4769350");
        assert_eq!(pages[1], "terms-beginning-with-a-4769351");
        assert_eq!(pages[26], "terms-beginning-with-z-4769376");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[defaults]
max_depth = 3
data_dir = "/tmp/tg-data"

[site.selectors]
related_term = "a.see-also"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.defaults.max_depth, 3);
        assert_eq!(config.defaults.graph_dir, "./graph");
        assert_eq!(config.site.selectors.related_term, "a.see-also");
        assert_eq!(
            config.site.selectors.category_link,
            "a.dictionary-top300-list__list.mntl-text-link"
        );
    }

    #[test]
    fn traversal_config_paths_are_depth_tagged() {
        let mut app = AppConfig::default();
        app.defaults.max_depth = 2;
        let traversal = TraversalConfig::from(&app);
        assert!(!traversal.force_refetch);
        assert_eq!(
            traversal.seed_registry_path(),
            PathBuf::from("./graph/article_map.json")
        );
        assert_eq!(
            traversal.graph_path(),
            PathBuf::from("./graph/term_article_graph_depth2.json")
        );
        assert_eq!(
            traversal.expanded_registry_path(),
            PathBuf::from("./graph/expanded_article_map_depth2.json")
        );
    }

    #[test]
    fn zero_concurrency_is_clamped() {
        let mut app = AppConfig::default();
        app.defaults.concurrency = 0;
        assert_eq!(TraversalConfig::from(&app).concurrency, 1);
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let site = SiteConfig {
            base_url: "not a url".into(),
            ..SiteConfig::default()
        };
        let err = site.base_url().unwrap_err();
        assert!(err.to_string().contains("invalid base_url"));
    }
}
