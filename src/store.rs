use crate::decompose::AvailabilitySet;
use crate::error::GlyphBookError;
use crate::types::PxSize;
use std::fs;
use std::path::{Path, PathBuf};

/// Handle to one stored glyph image. Dimensions come from the filename
/// suffix (`…_w{W}_h{H}.png`), so layout never has to decode pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub size: PxSize,
}

/// The store seam the engines compose against: lookup, enumeration, and
/// insertion of newly composed entries.
pub trait GlyphStore {
    fn has(&self, key: u64) -> bool;
    fn images(&self, key: u64) -> Result<Vec<ImageRef>, GlyphBookError>;
    fn put(&self, key: u64, image: &image::RgbImage) -> Result<ImageRef, GlyphBookError>;
}

/// Directory-backed store: one subdirectory per integer under `root`
/// (`data/numbers/417/*.png`).
#[derive(Debug, Clone)]
pub struct DirGlyphStore {
    root: PathBuf,
}

impl DirGlyphStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, key: u64) -> PathBuf {
        self.root.join(key.to_string())
    }

    /// Snapshot of every integer with at least one stored image. Taken once
    /// before a composition pass so the pass never sees its own output.
    pub fn available(&self) -> Result<AvailabilitySet, GlyphBookError> {
        let mut set = AvailabilitySet::new();
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(set),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
                continue;
            }
            let Ok(key) = name.parse::<u64>() else {
                continue;
            };
            if dir_has_png(&entry.path())? {
                set.insert(key);
            }
        }
        Ok(set)
    }

    /// Delete every previously composed image, before a fresh compose pass.
    pub fn purge_composed(&self) -> Result<usize, GlyphBookError> {
        let mut removed = 0;
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(err.into()),
        };
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            for file in fs::read_dir(entry.path())? {
                let file = file?;
                let name = file.file_name();
                let Some(name) = name.to_str() else { continue };
                if name.contains("_composed") && name.ends_with(".png") {
                    fs::remove_file(file.path())?;
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Write a glyph cropped from a scan, named `{stem}_w{W}_h{H}.png`.
    /// Returns `None` when the same crop is already stored.
    pub fn put_scan(
        &self,
        key: u64,
        stem: &str,
        image: &image::RgbImage,
    ) -> Result<Option<ImageRef>, GlyphBookError> {
        let dir = self.key_dir(key);
        let (width, height) = image.dimensions();
        let path = dir.join(format!("{}_w{}_h{}.png", stem, width, height));
        if path.exists() {
            return Ok(None);
        }
        fs::create_dir_all(&dir)?;
        image.save(&path).map_err(image_err)?;
        Ok(Some(ImageRef {
            path,
            size: PxSize::new(width, height),
        }))
    }

    /// First stored image for a key, the one the page layout uses.
    pub fn first_image(&self, key: u64) -> Result<ImageRef, GlyphBookError> {
        self.images(key)?.into_iter().next().ok_or_else(|| {
            GlyphBookError::Store(format!(
                "no images for {} in {}; run compose first?",
                key,
                self.key_dir(key).display()
            ))
        })
    }
}

impl GlyphStore for DirGlyphStore {
    fn has(&self, key: u64) -> bool {
        dir_has_png(&self.key_dir(key)).unwrap_or(false)
    }

    fn images(&self, key: u64) -> Result<Vec<ImageRef>, GlyphBookError> {
        png_images(&self.key_dir(key))
    }

    fn put(&self, key: u64, image: &image::RgbImage) -> Result<ImageRef, GlyphBookError> {
        let dir = self.key_dir(key);
        fs::create_dir_all(&dir)?;
        let (width, height) = image.dimensions();
        let path = dir.join(format!("{}_composed_w{}_h{}.png", key, width, height));
        image.save(&path).map_err(image_err)?;
        Ok(ImageRef {
            path,
            size: PxSize::new(width, height),
        })
    }
}

/// Flat directory of occurrence images for a single word
/// (`data/word/the/*.png`), ordered by filename.
#[derive(Debug, Clone)]
pub struct WordGlyphDir {
    dir: PathBuf,
}

impl WordGlyphDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn images(&self) -> Result<Vec<ImageRef>, GlyphBookError> {
        let images = png_images(&self.dir)?;
        if images.is_empty() {
            return Err(GlyphBookError::Store(format!(
                "no images found in {}",
                self.dir.display()
            )));
        }
        Ok(images)
    }

    /// Write one occurrence image, named `{stem}_w{W}_h{H}.png`. Returns
    /// `None` when the same crop is already stored.
    pub fn put(
        &self,
        file_stem: &str,
        image: &image::RgbImage,
    ) -> Result<Option<ImageRef>, GlyphBookError> {
        let (width, height) = image.dimensions();
        let path = self
            .dir
            .join(format!("{}_w{}_h{}.png", file_stem, width, height));
        if path.exists() {
            return Ok(None);
        }
        fs::create_dir_all(&self.dir)?;
        image.save(&path).map_err(image_err)?;
        Ok(Some(ImageRef {
            path,
            size: PxSize::new(width, height),
        }))
    }
}

/// Pull `(width, height)` out of a `…_w{W}_h{H}.png` filename.
pub fn parse_dimensions(file_name: &str) -> Option<PxSize> {
    let stem = file_name.strip_suffix(".png")?;
    let h_idx = stem.rfind("_h")?;
    let height = parse_all_digits(&stem[h_idx + 2..])?;
    let w_part = &stem[..h_idx];
    let w_idx = w_part.rfind("_w")?;
    let width = parse_all_digits(&w_part[w_idx + 2..])?;
    Some(PxSize::new(width, height))
}

fn parse_all_digits(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn dir_has_png(dir: &Path) -> Result<bool, GlyphBookError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };
    for entry in entries {
        let entry = entry?;
        if entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.ends_with(".png"))
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn png_images(dir: &Path) -> Result<Vec<ImageRef>, GlyphBookError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.ends_with(".png") {
            continue;
        }
        let size = parse_dimensions(name).ok_or_else(|| {
            GlyphBookError::Store(format!(
                "image filename carries no dimensions: {}",
                entry.path().display()
            ))
        })?;
        images.push(ImageRef {
            path: entry.path(),
            size,
        });
    }
    images.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(images)
}

pub(crate) fn image_err(err: image::ImageError) -> GlyphBookError {
    GlyphBookError::Store(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn white(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    #[test]
    fn filename_dimension_parsing() {
        assert_eq!(
            parse_dimensions("417_bookid_0012_w88_h31.png"),
            Some(PxSize::new(88, 31))
        );
        assert_eq!(
            parse_dimensions("3_composed_w120_h40.png"),
            Some(PxSize::new(120, 40))
        );
        assert_eq!(parse_dimensions("417.png"), None);
        assert_eq!(parse_dimensions("417_w12_h.png"), None);
        assert_eq!(parse_dimensions("417_w12_h9"), None);
        assert_eq!(parse_dimensions("417_wx_h9.png"), None);
    }

    #[test]
    fn put_round_trips_through_the_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirGlyphStore::new(dir.path());
        let stored = store.put(42, &white(88, 31)).expect("put");
        assert_eq!(stored.size, PxSize::new(88, 31));
        assert!(store.has(42));
        let images = store.images(42).expect("images");
        assert_eq!(images, vec![stored]);
        assert!(!store.has(43));
    }

    #[test]
    fn availability_ignores_non_numeric_and_empty_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirGlyphStore::new(dir.path());
        store.put(7, &white(10, 10)).expect("put");
        store.put(123, &white(10, 10)).expect("put");
        std::fs::create_dir(dir.path().join("notanumber")).expect("dir");
        std::fs::create_dir(dir.path().join("99")).expect("dir");

        let available = store.available().expect("available");
        assert_eq!(available.len(), 2);
        assert!(available.contains(7));
        assert!(available.contains(123));
        assert!(!available.contains(99));
    }

    #[test]
    fn purge_removes_only_composed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirGlyphStore::new(dir.path());
        store.put(5, &white(10, 10)).expect("put");
        let scan = dir.path().join("5").join("5_bookid_0001_w10_h10.png");
        white(10, 10).save(&scan).expect("save");

        let removed = store.purge_composed().expect("purge");
        assert_eq!(removed, 1);
        assert!(store.has(5));
        assert_eq!(store.images(5).expect("images").len(), 1);
    }

    #[test]
    fn word_dir_orders_by_filename() {
        let dir = tempfile::tempdir().expect("tempdir");
        let words = WordGlyphDir::new(dir.path());
        words.put("the_book_0002_1", &white(30, 12)).expect("put");
        words.put("the_book_0001_0", &white(20, 10)).expect("put");

        let images = words.images().expect("images");
        assert_eq!(images.len(), 2);
        assert!(images[0].path < images[1].path);
        assert_eq!(images[0].size, PxSize::new(20, 10));
    }

    #[test]
    fn missing_dimensions_are_a_store_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DirGlyphStore::new(dir.path());
        let bad_dir = dir.path().join("8");
        std::fs::create_dir(&bad_dir).expect("dir");
        white(10, 10).save(bad_dir.join("8.png")).expect("save");

        assert!(matches!(
            store.images(8),
            Err(GlyphBookError::Store(_))
        ));
    }
}
