//! Article store: fetch a page and persist it verbatim.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use termgraph_shared::{HttpConfig, Result, TermGraphError};

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("termgraph/", env!("CARGO_PKG_VERSION"));

/// Retrieves remote content and writes it to a local path.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Fetch `locator` and write the body to `destination`.
    ///
    /// Returns an error (and writes nothing) on transport failure or a
    /// non-success status.
    async fn fetch_and_persist(&self, locator: &str, destination: &Path) -> Result<()>;
}

/// [`ArticleStore`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpArticleStore {
    client: Client,
}

impl HttpArticleStore {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TermGraphError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// GET `url` and return its body, failing on non-success status.
    pub async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(url, "fetching");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TermGraphError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TermGraphError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| TermGraphError::Network(format!("{url}: body read failed: {e}")))
    }
}

#[async_trait]
impl ArticleStore for HttpArticleStore {
    async fn fetch_and_persist(&self, locator: &str, destination: &Path) -> Result<()> {
        let body = self.fetch_text(locator).await?;

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TermGraphError::io(parent, e))?;
        }
        tokio::fs::write(destination, body)
            .await
            .map_err(|e| TermGraphError::io(destination, e))?;

        debug!(locator, path = %destination.display(), "article saved");
        Ok(())
    }
}
