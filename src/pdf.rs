use crate::error::GlyphBookError;
use lopdf::{
    Dictionary as LoDictionary, Document as LoDocument, Object as LoObject,
    ObjectId as LoObjectId, Stream as LoStream, dictionary,
};
use std::path::Path;

fn lopdf_err(err: lopdf::Error) -> GlyphBookError {
    GlyphBookError::Assembly(err.to_string())
}

/// Merge rendered page PDFs into one document, in input order.
///
/// Every source document's objects are imported with renumbered ids, each
/// page is reparented under one fresh page tree, and the old catalogs and
/// page trees are pruned away. Page-level attributes the sources inherited
/// from their own page trees are copied down first so reparenting cannot
/// lose them.
pub fn merge(inputs: &[impl AsRef<Path>], output: &Path) -> Result<(), GlyphBookError> {
    if inputs.is_empty() {
        return Err(GlyphBookError::Assembly(
            "no documents provided to merge".to_string(),
        ));
    }

    let mut merged = LoDocument::with_version("1.5");
    let mut page_ids: Vec<LoObjectId> = Vec::new();
    for input in inputs {
        let src = LoDocument::load(input.as_ref()).map_err(lopdf_err)?;
        if src.is_encrypted() {
            return Err(GlyphBookError::Assembly(format!(
                "cannot merge encrypted PDF: {}",
                input.as_ref().display()
            )));
        }
        page_ids.extend(import_document_objects(&mut merged, src));
    }

    let pages_id = merged.new_object_id();
    let mut kids: Vec<LoObject> = Vec::with_capacity(page_ids.len());
    for page_id in &page_ids {
        let mut page_dict = merged
            .get_object(*page_id)
            .and_then(LoObject::as_dict)
            .map_err(lopdf_err)?
            .clone();
        for key in [b"Resources".as_slice(), b"MediaBox", b"CropBox", b"Rotate"] {
            if page_dict.get(key).is_err() {
                if let Some(value) = inherited_attribute(&merged, &page_dict, key) {
                    page_dict.set(key.to_vec(), value);
                }
            }
        }
        page_dict.set("Parent", LoObject::Reference(pages_id));
        merged
            .objects
            .insert(*page_id, LoObject::Dictionary(page_dict));
        kids.push(LoObject::Reference(*page_id));
    }

    merged.objects.insert(
        pages_id,
        LoObject::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.prune_objects();
    merged.renumber_objects();
    merged.compress();
    merged.save(output)?;
    Ok(())
}

fn import_document_objects(dst: &mut LoDocument, mut src: LoDocument) -> Vec<LoObjectId> {
    let start_id = dst.max_id + 1;
    src.renumber_objects_with(start_id);
    let page_ids: Vec<LoObjectId> = src.get_pages().values().copied().collect();
    if src.max_id > dst.max_id {
        dst.max_id = src.max_id;
    }
    dst.objects.extend(src.objects);
    page_ids
}

/// Walk the Parent chain for an inheritable page attribute.
fn inherited_attribute(
    doc: &LoDocument,
    page_dict: &LoDictionary,
    key: &[u8],
) -> Option<LoObject> {
    let mut current = page_dict.clone();
    loop {
        let parent_id = match current.get(b"Parent") {
            Ok(LoObject::Reference(id)) => *id,
            _ => return None,
        };
        let parent = doc.get_object(parent_id).ok()?.as_dict().ok()?.clone();
        if let Ok(value) = parent.get(key) {
            return Some(value.clone());
        }
        current = parent;
    }
}

/// Re-encode every raster image XObject in `pdf_path` as JPEG at `quality`
/// (1-100), rewriting the file in place. Streams that are not plain 8-bit
/// gray/RGB rasters are left untouched.
pub fn compress(pdf_path: &Path, quality: u8) -> Result<(), GlyphBookError> {
    let quality = quality.clamp(1, 100);
    let mut doc = LoDocument::load(pdf_path).map_err(lopdf_err)?;

    let image_ids: Vec<LoObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| {
            let stream = object.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            (subtype == b"Image").then_some(*id)
        })
        .collect();

    for id in image_ids {
        let stream = match doc.get_object(id).and_then(LoObject::as_stream) {
            Ok(stream) => stream.clone(),
            Err(_) => continue,
        };
        if let Some(recompressed) = recompress_image(&stream, quality) {
            doc.objects.insert(id, LoObject::Stream(recompressed));
        }
    }

    doc.compress();
    doc.save(pdf_path)?;
    Ok(())
}

fn recompress_image(stream: &LoStream, quality: u8) -> Option<LoStream> {
    let decoded = decode_image_stream(stream)?;
    let mut jpeg = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut jpeg, quality);
    decoded.write_with_encoder(encoder).ok()?;

    let mut dict = stream.dict.clone();
    dict.set("Filter", LoObject::Name(b"DCTDecode".to_vec()));
    dict.remove(b"DecodeParms");
    let mut out = LoStream::new(dict, jpeg);
    // DCT data is already compressed; a Flate pass would only grow it.
    out.allows_compression = false;
    Some(out)
}

fn decode_image_stream(stream: &LoStream) -> Option<image::DynamicImage> {
    let filter = first_filter(&stream.dict);
    if filter.as_deref() == Some(b"DCTDecode") {
        return image::load_from_memory(&stream.content).ok();
    }

    // A stream with no filter holds raw sample data already;
    // decompressed_content only applies once a filter is present.
    let content = match filter {
        Some(_) => stream.decompressed_content().ok()?,
        None => stream.content.clone(),
    };
    let width = stream.dict.get(b"Width").ok()?.as_i64().ok()?;
    let height = stream.dict.get(b"Height").ok()?.as_i64().ok()?;
    if width <= 0 || height <= 0 {
        return None;
    }
    let (width, height) = (width as u32, height as u32);
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|v| v.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return None;
    }
    let color_space = stream.dict.get(b"ColorSpace").ok()?.as_name().ok()?;
    match color_space {
        b"DeviceRGB" => image::RgbImage::from_raw(width, height, content)
            .map(image::DynamicImage::ImageRgb8),
        b"DeviceGray" => image::GrayImage::from_raw(width, height, content)
            .map(image::DynamicImage::ImageLuma8),
        _ => None,
    }
}

fn first_filter(dict: &LoDictionary) -> Option<Vec<u8>> {
    match dict.get(b"Filter").ok()? {
        LoObject::Name(name) => Some(name.clone()),
        LoObject::Array(filters) => filters
            .first()
            .and_then(|f| f.as_name().ok())
            .map(|name| name.to_vec()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn single_page_pdf(dir: &Path, name: &str, text: &str) -> PathBuf {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content = LoStream::new(
            dictionary! {},
            format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET").into_bytes(),
        );
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            LoObject::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![LoObject::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let path = dir.join(name);
        doc.save(&path).expect("save pdf");
        path
    }

    #[test]
    fn merge_preserves_page_order_and_count() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = single_page_pdf(dir.path(), "a.pdf", "alpha");
        let second = single_page_pdf(dir.path(), "b.pdf", "beta");
        let third = single_page_pdf(dir.path(), "c.pdf", "gamma");
        let out = dir.path().join("merged.pdf");

        merge(&[&first, &second, &third], &out).expect("merge");

        let merged = LoDocument::load(&out).expect("load merged");
        let pages = merged.get_pages();
        assert_eq!(pages.len(), 3);
        let texts: Vec<String> = (1u32..=3)
            .map(|n| {
                let content = merged
                    .get_page_content(pages[&n])
                    .expect("page content");
                String::from_utf8_lossy(&content).to_string()
            })
            .collect();
        assert!(texts[0].contains("alpha"));
        assert!(texts[1].contains("beta"));
        assert!(texts[2].contains("gamma"));
    }

    #[test]
    fn merge_of_nothing_is_an_assembly_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let inputs: Vec<PathBuf> = Vec::new();
        let err = merge(&inputs, &dir.path().join("merged.pdf")).unwrap_err();
        assert!(matches!(err, GlyphBookError::Assembly(_)));
    }

    fn pdf_with_rgb_image(dir: &Path, name: &str) -> PathBuf {
        let mut doc = LoDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        // 4x4 solid gray-blue raster, raw RGB rows.
        let raw: Vec<u8> = std::iter::repeat([100u8, 120, 200])
            .take(16)
            .flatten()
            .collect();
        let image_id = doc.add_object(LoStream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => 4,
                "Height" => 4,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            raw,
        ));
        let content_id = doc.add_object(LoStream::new(
            dictionary! {},
            b"q 100 0 0 100 72 600 cm /Im1 Do Q".to_vec(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        doc.objects.insert(
            pages_id,
            LoObject::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![LoObject::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let path = dir.join(name);
        doc.save(&path).expect("save pdf");
        path
    }

    fn image_stream(doc: &LoDocument) -> LoStream {
        doc.objects
            .values()
            .filter_map(|object| object.as_stream().ok())
            .find(|stream| {
                stream
                    .dict
                    .get(b"Subtype")
                    .ok()
                    .and_then(|s| s.as_name().ok())
                    == Some(b"Image")
            })
            .expect("image stream")
            .clone()
    }

    #[test]
    fn compress_reencodes_raster_xobjects_as_jpeg() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = pdf_with_rgb_image(dir.path(), "img.pdf");

        compress(&path, 70).expect("compress");

        let doc = LoDocument::load(&path).expect("load");
        let image = image_stream(&doc);
        assert_eq!(first_filter(&image.dict), Some(b"DCTDecode".to_vec()));
        // The replacement stream must itself decode as a JPEG of the same size.
        let decoded = image::load_from_memory(&image.content).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }

    #[test]
    fn compress_handles_already_jpeg_streams_on_repeat_runs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = pdf_with_rgb_image(dir.path(), "img.pdf");

        // First pass sees a raw unfiltered raster, second a DCTDecode stream.
        compress(&path, 70).expect("first pass");
        compress(&path, 40).expect("second pass");

        let doc = LoDocument::load(&path).expect("load");
        let image = image_stream(&doc);
        assert_eq!(first_filter(&image.dict), Some(b"DCTDecode".to_vec()));
        let decoded = image::load_from_memory(&image.content).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (4, 4));
    }
}
