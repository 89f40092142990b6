//! Catalog loading for gear descriptions and images
//!
//! The catalog is a CSV file with one row per gear item and columns `EN`,
//! `FR` (localized "Title: Description" strings) and `path_image` (image
//! file name relative to the configured image folder). Loaded catalogs are
//! memoized per (path, language) for the process lifetime; the file only
//! changes on deploy.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::models::{CatalogItem, Language};
use crate::{Error, Result};

/// Loaded catalog for one language: ordered items plus key lookup
#[derive(Debug)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    by_key: HashMap<String, usize>,
}

impl Catalog {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Item keys in catalog order, the input to pair generation
    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|item| item.key.clone()).collect()
    }

    pub fn get(&self, key: &str) -> Option<&CatalogItem> {
        self.by_key.get(key).map(|&i| &self.items[i])
    }
}

/// Split a "Title: Description" display string into its parts.
///
/// The description's first letter is uppercased for display. A row without
/// a ':' separator keeps the whole string as title with an empty description.
fn split_display_string(display: &str) -> (String, String) {
    match display.split_once(':') {
        Some((title, description)) => {
            (title.trim().to_string(), capitalize(description.trim()))
        }
        None => (display.trim().to_string(), String::new()),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Load a catalog from a CSV file, taking at most `max_items` rows.
///
/// Rows with an empty display string for the requested language are skipped
/// with a warning. Duplicate keys keep the first occurrence.
pub fn load_catalog(path: &Path, language: Language, max_items: usize) -> Result<Catalog> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| Error::Catalog(format!("Failed to open {}: {}", path.display(), e)))?;

    let headers = reader
        .headers()
        .map_err(|e| Error::Catalog(format!("Failed to read catalog headers: {}", e)))?
        .clone();

    let column = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::Catalog(format!("Catalog is missing column '{}'", name)))
    };
    let lang_col = column(language.catalog_column())?;
    let image_col = column("path_image")?;

    let mut items = Vec::new();
    let mut by_key = HashMap::new();

    for (row_index, record) in reader.records().enumerate() {
        if items.len() >= max_items {
            break;
        }
        let record =
            record.map_err(|e| Error::Catalog(format!("Malformed catalog row: {}", e)))?;

        let display = record.get(lang_col).unwrap_or("").trim();
        if display.is_empty() {
            warn!(
                row = row_index + 1,
                language = language.catalog_column(),
                "Skipping catalog row with empty display string"
            );
            continue;
        }
        let image_path = record.get(image_col).unwrap_or("").trim().to_string();
        if image_path.is_empty() {
            warn!(row = row_index + 1, "Skipping catalog row with empty image path");
            continue;
        }

        let key = display.to_string();
        if by_key.contains_key(&key) {
            warn!(row = row_index + 1, key = %key, "Skipping duplicate catalog key");
            continue;
        }

        let (title, description) = split_display_string(display);
        by_key.insert(key.clone(), items.len());
        items.push(CatalogItem {
            key,
            title,
            description,
            image_path,
            language,
        });
    }

    Ok(Catalog { items, by_key })
}

type CatalogCache = RwLock<HashMap<(PathBuf, Language), Arc<Catalog>>>;

static CACHE: Lazy<CatalogCache> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Memoized catalog loader keyed by (path, language).
///
/// The catalog file only changes on deploy, so cached entries live for the
/// process lifetime.
pub fn load_catalog_cached(
    path: &Path,
    language: Language,
    max_items: usize,
) -> Result<Arc<Catalog>> {
    let key = (path.to_path_buf(), language);

    if let Some(catalog) = CACHE.read().expect("catalog cache poisoned").get(&key) {
        return Ok(Arc::clone(catalog));
    }

    let catalog = Arc::new(load_catalog(path, language, max_items)?);
    CACHE
        .write()
        .expect("catalog cache poisoned")
        .entry(key)
        .or_insert_with(|| Arc::clone(&catalog));
    Ok(catalog)
}
