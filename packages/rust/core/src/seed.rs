//! `seed` pipeline: category pages → seed articles → `article_map.json`.

use std::path::PathBuf;
use std::time::Instant;

use regex::Regex;
use tracing::{info, instrument, warn};
use url::Url;

use termgraph_crawler::{ArticleStore, ContentLayout, HttpArticleStore, SiteExtractor};
use termgraph_shared::{
    ArticleRecord, ArticleRegistry, Result, SEED_REGISTRY_FILE, SiteConfig, TermGraphError,
};

use crate::pipeline::ProgressReporter;

/// Configuration for the `seed_articles` pipeline.
#[derive(Debug, Clone)]
pub struct SeedConfig {
    /// Root directory for article HTML (`<data_dir>/<letter>/<name>.html`).
    pub data_dir: PathBuf,
    /// Directory the seed registry is written to.
    pub graph_dir: PathBuf,
    /// Re-download articles that already exist on disk.
    pub restart: bool,
    /// Site layout and selectors.
    pub site: SiteConfig,
}

/// Result of the `seed_articles` pipeline.
#[derive(Debug)]
pub struct SeedResult {
    /// Category pages that yielded at least one article link.
    pub categories: usize,
    /// Articles recorded in the seed registry.
    pub articles: usize,
    /// Articles downloaded in this run.
    pub downloaded: usize,
    /// Downloads that failed.
    pub failed: usize,
    /// Where the seed registry was written.
    pub registry_path: PathBuf,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Download every article listed on the configured category pages and write
/// the seed registry.
#[instrument(skip_all, fields(base_url = %config.site.base_url, restart = config.restart))]
pub async fn seed_articles(
    config: &SeedConfig,
    store: &HttpArticleStore,
    extractor: &SiteExtractor,
    progress: &dyn ProgressReporter,
) -> Result<SeedResult> {
    let start = Instant::now();
    let base = config.site.base_url()?;
    let category_re = compile(&config.site.category_pattern)?;
    let article_re = compile(&config.site.article_pattern)?;
    let layout = ContentLayout::new(&config.data_dir);

    let mut registry = ArticleRegistry::new();
    let mut categories = 0usize;
    let mut downloaded = 0usize;
    let mut failed = 0usize;

    for page in &config.site.category_pages {
        let Some(folder) = first_group(&category_re, page) else {
            warn!(page = %page, "could not derive category name, skipping");
            continue;
        };
        progress.phase(&format!("Processing articles in {folder} category"));

        let links = match base.join(page) {
            Ok(url) => match store.fetch_text(url.as_str()).await {
                Ok(html) => extractor.category_links(&html),
                Err(e) => {
                    warn!(%url, error = %e, "category page unavailable");
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(page = %page, error = %e, "invalid category page URL");
                Vec::new()
            }
        };

        if links.is_empty() {
            warn!(category = %folder, "no article links found, skipping category");
            continue;
        }
        categories += 1;

        let total = links.len();
        for (i, link) in links.iter().enumerate() {
            let Some(name) = first_group(&article_re, link) else {
                warn!(link = %link, "could not derive article name, skipping");
                continue;
            };

            let path = layout.seed_path(&folder, &name);
            let locator = absolute(&base, link);
            registry.insert(name.clone(), ArticleRecord::new(&path, &locator));

            if config.restart || !path.exists() {
                match store.fetch_and_persist(&locator, &path).await {
                    Ok(()) => downloaded += 1,
                    Err(e) => {
                        warn!(article = %name, error = %e, "download failed");
                        failed += 1;
                    }
                }
            }
            progress.advance(&name, i + 1, total);
        }
    }

    let registry_path = config.graph_dir.join(SEED_REGISTRY_FILE);
    registry.save(&registry_path)?;

    let result = SeedResult {
        categories,
        articles: registry.len(),
        downloaded,
        failed,
        registry_path,
        elapsed: start.elapsed(),
    };

    info!(
        categories = result.categories,
        articles = result.articles,
        downloaded = result.downloaded,
        failed = result.failed,
        duration_ms = result.elapsed.as_millis(),
        "seed download completed"
    );

    progress.finish();
    Ok(result)
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| TermGraphError::config(format!("invalid pattern '{pattern}': {e}")))
}

fn first_group(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|s| !s.is_empty())
}

fn absolute(base: &Url, href: &str) -> String {
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    use termgraph_shared::{HttpConfig, SelectorConfig};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::pipeline::SilentProgress;

    const CATEGORY: &str = "terms-beginning-with-b-4769352";

    fn category_html() -> String {
        r#"<html><body><ul>
            <li><a class="dictionary-top300-list__list mntl-text-link" href="/terms/b/bond.asp">Bond</a></li>
            <li><a class="dictionary-top300-list__list mntl-text-link" href="/terms/b/beta.asp">Beta</a></li>
            <li><a class="dictionary-top300-list__list mntl-text-link" href="/terms/b/glossary">Glossary</a></li>
        </ul></body></html>"#
            .to_string()
    }

    fn seed_config(server: &MockServer, root: &std::path::Path, restart: bool) -> SeedConfig {
        SeedConfig {
            data_dir: root.join("data"),
            graph_dir: root.join("graph"),
            restart,
            site: SiteConfig {
                base_url: format!("{}/", server.uri()),
                category_pages: vec![CATEGORY.into(), "not-a-category".into()],
                ..SiteConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn seeds_registry_from_category_pages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/{CATEGORY}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(category_html()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/terms/b/bond.asp"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>bond</html>"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/terms/b/beta.asp"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let root = std::env::temp_dir().join(format!("tg-seed-{}", uuid::Uuid::now_v7()));
        let store = HttpArticleStore::new(&HttpConfig::default()).unwrap();
        let extractor = SiteExtractor::new(&SelectorConfig::default()).unwrap();

        let config = seed_config(&server, &root, false);
        let result = seed_articles(&config, &store, &extractor, &SilentProgress)
            .await
            .expect("seed succeeds");

        assert_eq!(result.categories, 1);
        assert_eq!(result.articles, 2);
        assert_eq!(result.downloaded, 1);
        assert_eq!(result.failed, 1);

        let registry = ArticleRegistry::load(&result.registry_path).unwrap();
        let bond = registry.get("bond").expect("bond seeded");
        assert_eq!(bond.path, root.join("data").join("b").join("bond.html"));
        assert_eq!(bond.locator, format!("{}/terms/b/bond.asp", server.uri()));
        assert_eq!(std::fs::read_to_string(&bond.path).unwrap(), "<html>bond</html>");
        // Failed downloads are still recorded.
        assert!(registry.contains("beta"));

        // Existing files are not downloaded again without --restart.
        let again = seed_articles(&config, &store, &extractor, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(again.downloaded, 0);
        assert_eq!(again.failed, 1);

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn unreachable_category_yields_empty_registry() {
        let server = MockServer::start().await;
        let root = std::env::temp_dir().join(format!("tg-seed-empty-{}", uuid::Uuid::now_v7()));
        let store = HttpArticleStore::new(&HttpConfig::default()).unwrap();
        let extractor = SiteExtractor::new(&SelectorConfig::default()).unwrap();

        let result = seed_articles(
            &seed_config(&server, &root, false),
            &store,
            &extractor,
            &SilentProgress,
        )
        .await
        .unwrap();

        assert_eq!(result.categories, 0);
        assert_eq!(result.articles, 0);
        assert!(result.registry_path.exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[test]
    fn patterns_extract_names() {
        let category = compile(&SiteConfig::default().category_pattern).unwrap();
        assert_eq!(
            first_group(&category, "terms-beginning-with-num-4769350").as_deref(),
            Some("num")
        );
        assert_eq!(first_group(&category, "about-us"), None);

        let article = compile(&SiteConfig::default().article_pattern).unwrap();
        assert_eq!(
            first_group(&article, "https://www.investopedia.com/terms/b/bond.asp").as_deref(),
            Some("bond")
        );
        assert_eq!(first_group(&article, "https://www.investopedia.com/terms/b/"), None);
    }
}
