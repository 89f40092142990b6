//! Catalog image cache
//!
//! Images are referenced by file name from the catalog, downscaled once to
//! the configured linear scale (0.3 by default) and kept in memory re-encoded
//! as PNG. The originals only change on deploy, so cached entries live for
//! the process lifetime.

use image::imageops::FilterType;
use image::GenericImageView;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use gearpoll_common::{Error, Result};

/// One downscaled, encoded image
#[derive(Debug)]
pub struct CachedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

/// Shared image cache keyed by catalog image file name
#[derive(Clone)]
pub struct ImageCache {
    folder: PathBuf,
    scale: f32,
    cache: Arc<RwLock<HashMap<String, Arc<CachedImage>>>>,
}

impl ImageCache {
    pub fn new(folder: PathBuf, scale: f32) -> Self {
        Self {
            folder,
            scale,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Fetch an image, downscaling and caching it on first access.
    ///
    /// `file` must be a bare file name from the catalog; anything that could
    /// escape the image folder is rejected before touching the filesystem.
    pub async fn get(&self, file: &str) -> Result<Arc<CachedImage>> {
        if !is_safe_file_name(file) {
            return Err(Error::InvalidInput(format!(
                "Invalid image file name: {}",
                file
            )));
        }

        if let Some(cached) = self.cache.read().await.get(file) {
            return Ok(Arc::clone(cached));
        }

        let path = self.folder.join(file);
        let scale = self.scale;
        let file_owned = file.to_string();

        // Decode + resize is CPU-bound; keep it off the async workers
        let cached = tokio::task::spawn_blocking(move || -> Result<CachedImage> {
            let original = image::open(&path)
                .map_err(|e| Error::NotFound(format!("Image {}: {}", file_owned, e)))?;

            let width = ((original.width() as f32 * scale) as u32).max(1);
            let height = ((original.height() as f32 * scale) as u32).max(1);
            let resized = original.resize_exact(width, height, FilterType::Triangle);

            let mut bytes = Vec::new();
            resized
                .write_to(&mut Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
                .map_err(|e| Error::Internal(format!("Image encode failed: {}", e)))?;

            Ok(CachedImage {
                bytes,
                content_type: "image/png",
            })
        })
        .await
        .map_err(|e| Error::Internal(format!("Image task failed: {}", e)))??;

        debug!(file, size_bytes = cached.bytes.len(), "Cached downscaled image");

        let cached = Arc::new(cached);
        self.cache
            .write()
            .await
            .entry(file.to_string())
            .or_insert_with(|| Arc::clone(&cached));
        Ok(cached)
    }
}

/// Reject path separators and parent-directory components
fn is_safe_file_name(file: &str) -> bool {
    !file.is_empty()
        && !file.contains('/')
        && !file.contains('\\')
        && file != "."
        && !file.contains("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_traversal_and_separators() {
        assert!(!is_safe_file_name("../secret.png"));
        assert!(!is_safe_file_name("a/b.png"));
        assert!(!is_safe_file_name("a\\b.png"));
        assert!(!is_safe_file_name(""));
        assert!(!is_safe_file_name("."));
        assert!(is_safe_file_name("trawl.png"));
    }

    #[tokio::test]
    async fn caches_downscaled_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gear.png");
        image::RgbImage::from_pixel(10, 20, image::Rgb([10, 120, 200]))
            .save(&path)
            .unwrap();

        let cache = ImageCache::new(dir.path().to_path_buf(), 0.3);
        let first = cache.get("gear.png").await.unwrap();
        assert_eq!(first.content_type, "image/png");

        let decoded = image::load_from_memory(&first.bytes).unwrap();
        assert_eq!(decoded.width(), 3);
        assert_eq!(decoded.height(), 6);

        // Second fetch hits the cache
        let second = cache.get("gear.png").await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ImageCache::new(dir.path().to_path_buf(), 0.3);
        let err = cache.get("nope.png").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
