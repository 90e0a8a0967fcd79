//! Local type icons, addressed by tag name (`<icon_dir>/<name>.png`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("icon not found: {0}")]
    Missing(PathBuf),
    #[error("failed to decode icon {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded, scaled icons keyed by tag name.
///
/// Lookups happen on worker threads, so the cache sits behind a mutex. Failures are
/// cached as `None` and reported once.
pub struct IconTable {
    dir: PathBuf,
    size: u32,
    cache: Mutex<HashMap<String, Option<DynamicImage>>>,
}

impl IconTable {
    pub fn new(dir: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            dir: dir.into(),
            size,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Icon for `name`, or `None` when the asset is missing or unreadable
    pub fn icon(&self, name: &str) -> Option<DynamicImage> {
        let key = name.to_ascii_lowercase();
        if let Ok(cache) = self.cache.lock() {
            if let Some(entry) = cache.get(&key) {
                return entry.clone();
            }
        }

        let icon = match self.load(&key) {
            Ok(icon) => Some(icon),
            Err(err) => {
                warn!(error = %err, "rendering type row without icon");
                None
            }
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, icon.clone());
        }
        icon
    }

    fn load(&self, name: &str) -> Result<DynamicImage, AssetError> {
        let path = self.dir.join(format!("{name}.png"));
        if !path.is_file() {
            return Err(AssetError::Missing(path));
        }
        let image = image::open(&path).map_err(|source| AssetError::Image {
            path: path.clone(),
            source,
        })?;
        Ok(image.resize_exact(self.size, self.size, FilterType::Triangle))
    }
}

/// Average colour of the opaque pixels, used to draw an icon as a swatch
pub fn dominant_rgb(image: &DynamicImage) -> Option<(u8, u8, u8)> {
    let rgba = image.to_rgba8();
    let (mut r, mut g, mut b, mut count) = (0u64, 0u64, 0u64, 0u64);
    for pixel in rgba.pixels() {
        let [pr, pg, pb, pa] = pixel.0;
        if pa < 128 {
            continue;
        }
        r += u64::from(pr);
        g += u64::from(pg);
        b += u64::from(pb);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(((r / count) as u8, (g / count) as u8, (b / count) as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_icon(dir: &Path, name: &str, color: [u8; 4]) {
        let img = RgbaImage::from_pixel(32, 32, Rgba(color));
        img.save(dir.join(format!("{name}.png"))).unwrap();
    }

    #[test]
    fn test_icon_is_scaled_to_thumbnail() {
        let dir = tempfile::tempdir().unwrap();
        write_icon(dir.path(), "fire", [240, 80, 48, 255]);
        let table = IconTable::new(dir.path(), 20);

        let icon = table.icon("fire").expect("icon should load");
        assert_eq!((icon.width(), icon.height()), (20, 20));
    }

    #[test]
    fn test_missing_icon_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let table = IconTable::new(dir.path(), 20);
        assert!(table.icon("shadow").is_none());
        // cached miss stays a miss
        assert!(table.icon("shadow").is_none());
    }

    #[test]
    fn test_corrupt_icon_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ghost.png"), b"not a png").unwrap();
        let table = IconTable::new(dir.path(), 20);
        assert!(table.icon("ghost").is_none());
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write_icon(dir.path(), "water", [104, 144, 240, 255]);
        let table = IconTable::new(dir.path(), 20);
        assert!(table.icon("Water").is_some());
    }

    #[test]
    fn test_dominant_rgb_ignores_transparent_pixels() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 1, Rgba([200, 100, 50, 255]));
        let rgb = dominant_rgb(&DynamicImage::ImageRgba8(img));
        assert_eq!(rgb, Some((200, 100, 50)));

        let empty = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([9, 9, 9, 0])));
        assert_eq!(dominant_rgb(&empty), None);
    }
}
