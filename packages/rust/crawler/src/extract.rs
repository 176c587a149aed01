//! Link extraction from article and category pages.

use scraper::{ElementRef, Html, Selector};

use termgraph_shared::{OutboundLink, Result, SelectorConfig, TermGraphError};

/// Turns a raw article page into its outbound references.
pub trait LinkExtractor: Send + Sync {
    /// Related terms first, then related articles, in document order.
    fn extract(&self, html: &str) -> Vec<OutboundLink>;
}

/// [`LinkExtractor`] driven by CSS selectors from the site config.
pub struct SiteExtractor {
    category_link: Selector,
    related_term: Selector,
    related_article: Selector,
    related_article_title: Selector,
}

impl SiteExtractor {
    pub fn new(selectors: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            category_link: parse_selector(&selectors.category_link)?,
            related_term: parse_selector(&selectors.related_term)?,
            related_article: parse_selector(&selectors.related_article)?,
            related_article_title: parse_selector(&selectors.related_article_title)?,
        })
    }

    /// Article hrefs listed on a category page.
    pub fn category_links(&self, html: &str) -> Vec<String> {
        let doc = Html::parse_document(html);
        doc.select(&self.category_link)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect()
    }
}

impl LinkExtractor for SiteExtractor {
    fn extract(&self, html: &str) -> Vec<OutboundLink> {
        let doc = Html::parse_document(html);
        let mut links = Vec::new();

        for el in doc.select(&self.related_term) {
            if let Some((name, href)) = name_and_href(el, text_of(el)) {
                links.push(OutboundLink::term(name, href));
            }
        }

        for el in doc.select(&self.related_article) {
            let title = el
                .select(&self.related_article_title)
                .next()
                .map(text_of)
                .unwrap_or_default();
            if let Some((name, href)) = name_and_href(el, title) {
                links.push(OutboundLink::article(name, href));
            }
        }

        links
    }
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| TermGraphError::config(format!("invalid selector '{raw}': {e}")))
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn name_and_href(el: ElementRef<'_>, name: String) -> Option<(String, String)> {
    let href = el.value().attr("href")?.trim();
    if name.is_empty() || href.is_empty() {
        return None;
    }
    Some((name, href.to_string()))
}
