//! Where article content lives on disk.

use std::path::PathBuf;

/// Folder for pages reached through related-term links.
const TERM_DIR: &str = "term";
/// Folder for pages reached through related-article cards.
const ARTICLE_DIR: &str = "article";

/// Maps identifiers to local content paths under a data root.
#[derive(Debug, Clone)]
pub struct ContentLayout {
    data_dir: PathBuf,
}

impl ContentLayout {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Destination for a page discovered through a link.
    pub fn discovered_path(&self, identifier: &str, is_term: bool) -> PathBuf {
        let folder = if is_term { TERM_DIR } else { ARTICLE_DIR };
        self.data_dir
            .join(folder)
            .join(format!("{}.html", file_stem(identifier)))
    }

    /// Destination for a seed article listed under a category folder.
    pub fn seed_path(&self, category: &str, name: &str) -> PathBuf {
        self.data_dir
            .join(file_stem(category))
            .join(format!("{}.html", file_stem(name)))
    }
}

/// Make an identifier safe to use as a single path component.
///
/// Not injective: `"A/B"` and `"A-B"` share a stem, so the later download
/// of the two overwrites the earlier one on disk.
pub fn file_stem(identifier: &str) -> String {
    identifier.replace(['/', '\\'], "-")
}
