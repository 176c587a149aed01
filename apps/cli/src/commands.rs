//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use termgraph_core::pipeline::{ProgressReporter, expand_graph};
use termgraph_core::seed::{SeedConfig, seed_articles};
use termgraph_crawler::{HttpArticleStore, SiteExtractor};
use termgraph_shared::{AppConfig, TraversalConfig, init_config, load_config, load_config_from};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// termgraph: build a term/article link graph from a financial glossary.
#[derive(Parser)]
#[command(
    name = "termgraph",
    version,
    about = "Download glossary articles and expand them into a term/article link graph.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file to use instead of ~/.termgraph/termgraph.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Download the seed articles listed on every category page.
    Seed {
        /// Re-download articles that already exist locally.
        #[arg(long)]
        restart: bool,

        /// Root directory for article HTML.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory the seed registry is written to.
        #[arg(long)]
        graph_dir: Option<PathBuf>,
    },

    /// Expand the seed articles into the link graph.
    Expand {
        /// Re-download each reached article once, even if present locally.
        #[arg(long, visible_alias = "force")]
        restart: bool,

        /// Link hops to follow from each seed.
        #[arg(long)]
        max_depth: Option<u32>,

        /// Seeds expanded at once, also the bound on in-flight downloads.
        #[arg(long)]
        concurrency: Option<u32>,

        /// Root directory for article HTML.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Directory holding the seed registry and graph outputs.
        #[arg(long)]
        graph_dir: Option<PathBuf>,

        /// Re-expand a node every time it is reached.
        #[arg(long)]
        no_skip_revisits: bool,

        /// Do not download pages that sit one hop past the depth limit.
        #[arg(long)]
        no_fetch_horizon: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "termgraph=info",
        1 => "termgraph=debug",
        _ => "termgraph=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config = resolve_config(cli.config.as_ref())?;

    match cli.command {
        Command::Seed {
            restart,
            data_dir,
            graph_dir,
        } => {
            let seed = SeedConfig {
                data_dir: data_dir.unwrap_or_else(|| PathBuf::from(&config.defaults.data_dir)),
                graph_dir: graph_dir.unwrap_or_else(|| PathBuf::from(&config.defaults.graph_dir)),
                restart,
                site: config.site.clone(),
            };
            cmd_seed(&config, &seed).await
        }
        Command::Expand {
            restart,
            max_depth,
            concurrency,
            data_dir,
            graph_dir,
            no_skip_revisits,
            no_fetch_horizon,
        } => {
            let mut traversal = TraversalConfig::from(&config);
            traversal.force_refetch = restart;
            if let Some(depth) = max_depth {
                traversal.max_depth = depth;
            }
            if let Some(n) = concurrency {
                traversal.concurrency = n.max(1);
            }
            if let Some(dir) = data_dir {
                traversal.data_dir = dir;
            }
            if let Some(dir) = graph_dir {
                traversal.graph_dir = dir;
            }
            if no_skip_revisits {
                traversal.skip_revisits = false;
            }
            if no_fetch_horizon {
                traversal.fetch_horizon = false;
            }
            cmd_expand(&config, &traversal).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&config).await,
        },
    }
}

fn resolve_config(path: Option<&PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_seed(config: &AppConfig, seed: &SeedConfig) -> Result<()> {
    let store = HttpArticleStore::new(&config.http)?;
    let extractor = SiteExtractor::new(&config.site.selectors)?;

    info!(
        data_dir = %seed.data_dir.display(),
        graph_dir = %seed.graph_dir.display(),
        restart = seed.restart,
        "downloading seed articles"
    );

    let reporter = CliProgress::new();
    let result = seed_articles(seed, &store, &extractor, &reporter).await?;

    println!();
    println!("  Seed articles downloaded.");
    println!("  Categories: {}", result.categories);
    println!("  Articles:   {}", result.articles);
    println!("  Downloaded: {}", result.downloaded);
    println!("  Failed:     {}", result.failed);
    println!("  Registry:   {}", result.registry_path.display());
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_expand(config: &AppConfig, traversal: &TraversalConfig) -> Result<()> {
    let store = Arc::new(HttpArticleStore::new(&config.http)?);
    let extractor = Arc::new(SiteExtractor::new(&config.site.selectors)?);

    let reporter = CliProgress::new();
    let result = match expand_graph(traversal, store, extractor, &reporter).await {
        Ok(result) => result,
        Err(e) if e.is_missing_input() => {
            reporter.finish();
            return Err(eyre!("{e}. Run `termgraph seed` first."));
        }
        Err(e) => {
            reporter.finish();
            return Err(e.into());
        }
    };

    println!();
    println!("  Graph expanded to depth {}.", traversal.max_depth);
    println!("  Seeds:    {} expanded, {} skipped", result.seeds_expanded, result.seeds_skipped);
    println!("  Articles: {}", result.article_count);
    println!("  Nodes:    {}", result.node_count);
    println!("  Edges:    {}", result.edge_count);
    println!("  Registry: {}", result.registry_path.display());
    println!("  Graph:    {}", result.graph_path.display());
    println!("  Time:     {:.1}s", result.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn advance(&self, label: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("[{current}/{total}] {label}"));
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}
