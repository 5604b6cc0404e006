use crate::error::GlyphBookError;
use crate::numwords;
use crate::report::RunLogger;
use crate::store::{DirGlyphStore, WordGlyphDir, image_err};
use kuchiki::traits::TendrilSink;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// Minimum OCR word confidence (`x_wconf`) a glyph must exceed.
const MIN_CONFIDENCE: f32 = 90.0;

/// Pixel bounding box `(x0, y0, x1, y1)` in page-image coordinates.
pub type BBox = (u32, u32, u32, u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberRegion {
    pub number: u64,
    pub bbox: BBox,
}

/// Pull the `bbox x0 y0 x1 y1` field out of an hOCR `title` attribute.
pub fn parse_bbox(title: &str) -> Option<BBox> {
    for field in title.split(';') {
        if let Some(rest) = field.trim().strip_prefix("bbox ") {
            let mut coords = rest.split_whitespace().map(|c| c.parse::<u32>());
            let x0 = coords.next()?.ok()?;
            let y0 = coords.next()?.ok()?;
            let x1 = coords.next()?.ok()?;
            let y1 = coords.next()?.ok()?;
            return Some((x0, y0, x1, y1));
        }
    }
    None
}

/// Pull the `x_wconf` confidence out of an hOCR `title` attribute.
pub fn parse_confidence(title: &str) -> Option<f32> {
    for field in title.split(';') {
        if let Some(rest) = field.trim().strip_prefix("x_wconf ") {
            return rest.trim().parse().ok();
        }
    }
    None
}

/// Pull the page image's file name out of an hOCR page `title` attribute
/// (`image "path/to/page_0001.jp2"`).
pub fn parse_image_name(title: &str) -> Option<String> {
    for field in title.split(';') {
        let field = field.trim();
        if let Some(rest) = field.strip_prefix("image ") {
            let quoted = rest.trim().strip_prefix('"')?.strip_suffix('"')?;
            let name = Path::new(quoted).file_name()?.to_str()?;
            return Some(name.to_string());
        }
    }
    None
}

/// Interpret OCR'd text as an integer in `0..=max`.
///
/// Accepts canonical decimal strings (no leading zeros except "0" itself)
/// and spelled-out English numbers. Word form never yields 0: stray words
/// the word parser maps to zero are not digits on the page.
pub fn number_from_text(text: &str, max: u64) -> Option<u64> {
    let text = text.trim().to_ascii_lowercase();
    if text == "zero" {
        return Some(0);
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        if text.len() > 1 && text.starts_with('0') {
            return None;
        }
        let value = text.parse::<u64>().ok()?;
        return (value <= max).then_some(value);
    }
    let value = numwords::parse_words(&text)?;
    (value >= 1 && value <= max).then_some(value)
}

/// Parse an hOCR document and collect, per page image, every integer in
/// `0..=max` with a confident bounding box. Only the first occurrence of
/// each value in the document is kept.
pub fn numbers_from_hocr(html: &str, max: u64) -> BTreeMap<String, Vec<NumberRegion>> {
    let document = kuchiki::parse_html().one(html);
    let mut by_image: BTreeMap<String, Vec<NumberRegion>> = BTreeMap::new();
    let mut seen: HashSet<u64> = HashSet::new();

    let Ok(pages) = document.select("div.ocr_page") else {
        return by_image;
    };
    for page in pages {
        let Some(image_name) = page
            .attributes
            .borrow()
            .get("title")
            .and_then(parse_image_name)
        else {
            continue;
        };
        let Ok(words) = page.as_node().select("span.ocrx_word") else {
            continue;
        };
        for word in words {
            let text = word.text_contents();
            let Some(number) = number_from_text(&text, max) else {
                continue;
            };
            if seen.contains(&number) {
                continue;
            }
            let attrs = word.attributes.borrow();
            let Some(title) = attrs.get("title") else {
                continue;
            };
            if !parse_confidence(title).is_some_and(|c| c > MIN_CONFIDENCE) {
                continue;
            }
            let Some(bbox) = parse_bbox(title) else {
                continue;
            };
            by_image
                .entry(image_name.clone())
                .or_default()
                .push(NumberRegion { number, bbox });
            seen.insert(number);
        }
    }
    by_image
}

/// Parse an hOCR document and collect every confident occurrence of one
/// word, per page image, in document order.
pub fn word_occurrences_from_hocr(html: &str, target_word: &str) -> BTreeMap<String, Vec<BBox>> {
    let document = kuchiki::parse_html().one(html);
    let target = target_word.to_ascii_lowercase();
    let mut by_image: BTreeMap<String, Vec<BBox>> = BTreeMap::new();

    let Ok(pages) = document.select("div.ocr_page") else {
        return by_image;
    };
    for page in pages {
        let Some(image_name) = page
            .attributes
            .borrow()
            .get("title")
            .and_then(parse_image_name)
        else {
            continue;
        };
        let Ok(words) = page.as_node().select("span.ocrx_word") else {
            continue;
        };
        for word in words {
            if word.text_contents().trim().to_ascii_lowercase() != target {
                continue;
            }
            let attrs = word.attributes.borrow();
            let Some(title) = attrs.get("title") else {
                continue;
            };
            if !parse_confidence(title).is_some_and(|c| c > MIN_CONFIDENCE) {
                continue;
            }
            if let Some(bbox) = parse_bbox(title) {
                by_image.entry(image_name.clone()).or_default().push(bbox);
            }
        }
    }
    by_image
}

/// A downloaded book: the hOCR file plus the page-image directory next to
/// it. Archive naming is `{id}_hocr.html` and `{id}_jp2/`.
#[derive(Debug, Clone)]
pub struct BookSource {
    pub name: String,
    pub hocr: PathBuf,
    pub page_images: PathBuf,
}

impl BookSource {
    pub fn locate(book_dir: &Path) -> Result<Option<Self>, GlyphBookError> {
        let mut hocr = None;
        let mut page_images = None;
        for entry in fs::read_dir(book_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.ends_with("_hocr.html") && entry.file_type()?.is_file() {
                hocr = Some(entry.path());
            } else if name.ends_with("_jp2") && entry.file_type()?.is_dir() {
                page_images = Some(entry.path());
            }
        }
        let (Some(hocr), Some(page_images)) = (hocr, page_images) else {
            return Ok(None);
        };
        let name = book_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("book")
            .to_string();
        Ok(Some(Self {
            name,
            hocr,
            page_images,
        }))
    }

    /// The archive's hOCR names pages by their original `.jp2` file. Sources
    /// converted to a decodable format keep the stem, so fall back through
    /// common raster extensions.
    fn resolve_page_image(&self, image_name: &str) -> Option<PathBuf> {
        let exact = self.page_images.join(image_name);
        if exact.exists() {
            return Some(exact);
        }
        let stem = Path::new(image_name).file_stem()?.to_str()?;
        for ext in ["png", "tif", "tiff", "jpg", "jpeg"] {
            let candidate = self.page_images.join(format!("{stem}.{ext}"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }
}

fn crop_region(
    page: &image::DynamicImage,
    bbox: BBox,
) -> Option<image::RgbImage> {
    let (x0, y0, x1, y1) = bbox;
    if x1 <= x0 || y1 <= y0 || x1 > page.width() || y1 > page.height() {
        return None;
    }
    Some(page.crop_imm(x0, y0, x1 - x0, y1 - y0).to_rgb8())
}

/// Harvest every qualifying number from one book into the store. Returns
/// the count of newly written glyphs.
pub fn extract_book_numbers(
    source: &BookSource,
    store: &DirGlyphStore,
    max: u64,
    logger: Option<&RunLogger>,
) -> Result<usize, GlyphBookError> {
    let html = fs::read_to_string(&source.hocr)?;
    let by_image = numbers_from_hocr(&html, max);

    let mut written = 0;
    for (image_name, regions) in &by_image {
        let Some(page_path) = source.resolve_page_image(image_name) else {
            if let Some(logger) = logger {
                logger.event(
                    "extract.page_image_missing",
                    &[("book", &source.name), ("image", image_name)],
                );
            }
            continue;
        };
        let page = image::open(&page_path).map_err(image_err)?;
        let page_stem = Path::new(image_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page");
        for region in regions {
            let Some(cropped) = crop_region(&page, region.bbox) else {
                continue;
            };
            let stem = format!("{}_{}_{}", region.number, source.name, page_stem);
            if store.put_scan(region.number, &stem, &cropped)?.is_some() {
                written += 1;
            }
        }
    }

    if let Some(logger) = logger {
        logger.event(
            "extract.book",
            &[
                ("book", &source.name),
                ("glyphs", &written.to_string()),
            ],
        );
        logger.increment("extract.glyphs", written as u64);
    }
    Ok(written)
}

/// Harvest every confident occurrence of one word from one book. Returns
/// the count of newly written occurrence images.
pub fn extract_book_word(
    source: &BookSource,
    out: &WordGlyphDir,
    target_word: &str,
    logger: Option<&RunLogger>,
) -> Result<usize, GlyphBookError> {
    let html = fs::read_to_string(&source.hocr)?;
    let by_image = word_occurrences_from_hocr(&html, target_word);

    let mut written = 0;
    for (image_name, bboxes) in &by_image {
        let Some(page_path) = source.resolve_page_image(image_name) else {
            continue;
        };
        let page = image::open(&page_path).map_err(image_err)?;
        let page_stem = Path::new(image_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("page");
        for (idx, bbox) in bboxes.iter().enumerate() {
            let Some(cropped) = crop_region(&page, *bbox) else {
                continue;
            };
            let stem = format!("{}_{}_{}_{}", target_word, source.name, page_stem, idx);
            if out.put(&stem, &cropped)?.is_some() {
                written += 1;
            }
        }
    }

    if let Some(logger) = logger {
        logger.event(
            "extract.word_book",
            &[
                ("book", &source.name),
                ("word", target_word),
                ("occurrences", &written.to_string()),
            ],
        );
        logger.increment("extract.occurrences", written as u64);
    }
    Ok(written)
}

/// Run number extraction across every book under `raw_dir`, one rayon task
/// per book. A failing book is logged and skipped; tasks share nothing but
/// the disjoint store keys they write.
pub fn extract_all_numbers(
    raw_dir: &Path,
    store: &DirGlyphStore,
    max: u64,
    logger: Option<&RunLogger>,
) -> Result<usize, GlyphBookError> {
    let books = book_dirs(raw_dir)?;
    let total = books
        .par_iter()
        .map(|book_dir| {
            let outcome = BookSource::locate(book_dir).and_then(|source| match source {
                Some(source) => extract_book_numbers(&source, store, max, logger),
                None => Ok(0),
            });
            match outcome {
                Ok(count) => count,
                Err(err) => {
                    if let Some(logger) = logger {
                        logger.event(
                            "extract.book_failed",
                            &[
                                ("book", &book_dir.display().to_string()),
                                ("error", &err.to_string()),
                            ],
                        );
                    }
                    0
                }
            }
        })
        .sum();
    if let Some(logger) = logger {
        logger.emit_summary("extract");
    }
    Ok(total)
}

/// Word-mode counterpart of `extract_all_numbers`.
pub fn extract_all_word(
    raw_dir: &Path,
    out: &WordGlyphDir,
    target_word: &str,
    logger: Option<&RunLogger>,
) -> Result<usize, GlyphBookError> {
    let books = book_dirs(raw_dir)?;
    let total = books
        .par_iter()
        .map(|book_dir| {
            let outcome = BookSource::locate(book_dir).and_then(|source| match source {
                Some(source) => extract_book_word(&source, out, target_word, logger),
                None => Ok(0),
            });
            match outcome {
                Ok(count) => count,
                Err(err) => {
                    if let Some(logger) = logger {
                        logger.event(
                            "extract.book_failed",
                            &[
                                ("book", &book_dir.display().to_string()),
                                ("error", &err.to_string()),
                            ],
                        );
                    }
                    0
                }
            }
        })
        .sum();
    if let Some(logger) = logger {
        logger.emit_summary("extract-word");
    }
    Ok(total)
}

fn book_dirs(raw_dir: &Path) -> Result<Vec<PathBuf>, GlyphBookError> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(raw_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::GlyphStore;
    use image::{Rgb, RgbImage};

    #[test]
    fn title_attribute_fields() {
        let title = "image \"data/raw/book/page_0004.jp2\"; bbox 0 0 2480 3508; ppageno 3";
        assert_eq!(parse_image_name(title), Some("page_0004.jp2".to_string()));
        assert_eq!(parse_bbox(title), Some((0, 0, 2480, 3508)));
        assert_eq!(parse_confidence(title), None);

        let word_title = "bbox 120 340 188 371; x_wconf 96.21";
        assert_eq!(parse_bbox(word_title), Some((120, 340, 188, 371)));
        assert_eq!(parse_confidence(word_title), Some(96.21));
        assert_eq!(parse_image_name(word_title), None);
    }

    #[test]
    fn number_text_forms() {
        assert_eq!(number_from_text("417", 50_000), Some(417));
        assert_eq!(number_from_text(" 417 ", 50_000), Some(417));
        assert_eq!(number_from_text("zero", 50_000), Some(0));
        assert_eq!(number_from_text("twenty-three", 50_000), Some(23));
        assert_eq!(number_from_text("0417", 50_000), None);
        assert_eq!(number_from_text("00", 50_000), None);
        assert_eq!(number_from_text("60000", 50_000), None);
        assert_eq!(number_from_text("point", 50_000), None);
        assert_eq!(number_from_text("", 50_000), None);
    }

    fn hocr_page(image: &str, words: &[(&str, &str)]) -> String {
        let spans: String = words
            .iter()
            .map(|(text, title)| {
                format!("<span class=\"ocrx_word\" title=\"{title}\">{text}</span>")
            })
            .collect();
        format!(
            "<div class=\"ocr_page\" title=\"image &quot;{image}&quot;; bbox 0 0 2480 3508\">{spans}</div>"
        )
    }

    #[test]
    fn hocr_numbers_first_occurrence_and_confidence() {
        let html = format!(
            "<html><body>{}{}</body></html>",
            hocr_page(
                "page_0001.jp2",
                &[
                    ("12", "bbox 10 10 40 30; x_wconf 95"),
                    ("12", "bbox 50 10 80 30; x_wconf 99"),
                    ("7", "bbox 90 10 110 30; x_wconf 80"),
                ],
            ),
            hocr_page(
                "page_0002.jp2",
                &[
                    ("7", "bbox 10 10 30 30; x_wconf 91"),
                    ("noise", "bbox 40 10 70 30; x_wconf 99"),
                ],
            ),
        );
        let by_image = numbers_from_hocr(&html, 50_000);
        assert_eq!(by_image.len(), 2);
        assert_eq!(
            by_image["page_0001.jp2"],
            vec![NumberRegion {
                number: 12,
                bbox: (10, 10, 40, 30)
            }]
        );
        assert_eq!(
            by_image["page_0002.jp2"],
            vec![NumberRegion {
                number: 7,
                bbox: (10, 10, 30, 30)
            }]
        );
    }

    #[test]
    fn hocr_word_occurrences_keep_every_instance() {
        let html = hocr_page(
            "page_0001.jp2",
            &[
                ("The", "bbox 10 10 40 30; x_wconf 95"),
                ("cat", "bbox 50 10 80 30; x_wconf 95"),
                ("the", "bbox 90 10 120 30; x_wconf 95"),
                ("the", "bbox 10 40 40 60; x_wconf 50"),
            ],
        );
        let by_image = word_occurrences_from_hocr(&html, "the");
        assert_eq!(
            by_image["page_0001.jp2"],
            vec![(10, 10, 40, 30), (90, 10, 120, 30)]
        );
    }

    #[test]
    fn extract_book_crops_into_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let book_dir = dir.path().join("raw").join("somebook");
        let jp2_dir = book_dir.join("somebook_jp2");
        std::fs::create_dir_all(&jp2_dir).expect("dirs");

        // Page image saved as PNG under the original jp2 stem.
        let mut page = RgbImage::from_pixel(200, 100, Rgb([255, 255, 255]));
        for x in 10..40 {
            for y in 10..30 {
                page.put_pixel(x, y, Rgb([0, 0, 0]));
            }
        }
        page.save(jp2_dir.join("page_0001.png")).expect("save page");

        let html = hocr_page("page_0001.jp2", &[("12", "bbox 10 10 40 30; x_wconf 95")]);
        std::fs::write(book_dir.join("somebook_hocr.html"), html).expect("write hocr");

        let store = DirGlyphStore::new(dir.path().join("numbers"));
        let source = BookSource::locate(&book_dir)
            .expect("locate")
            .expect("complete book");
        let written = extract_book_numbers(&source, &store, 50_000, None).expect("extract");
        assert_eq!(written, 1);

        let images = store.images(12).expect("images");
        assert_eq!(images.len(), 1);
        assert_eq!((images[0].size.width, images[0].size.height), (30, 20));

        // A second pass finds the file already present and writes nothing.
        let written = extract_book_numbers(&source, &store, 50_000, None).expect("re-extract");
        assert_eq!(written, 0);
    }
}
