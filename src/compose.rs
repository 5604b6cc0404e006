use crate::decompose::{AvailabilitySet, decompose};
use crate::error::GlyphBookError;
use crate::report::RunLogger;
use crate::store::{DirGlyphStore, GlyphStore, ImageRef, image_err};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};
use rayon::prelude::*;

/// Picks one image among the interchangeable alternatives stored for a key.
///
/// Injected rather than baked in so tests can demand `First` while
/// production runs use `Seeded`, which varies the pick per key but stays
/// reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStrategy {
    First,
    Seeded(u64),
}

impl SelectionStrategy {
    pub fn pick<'a>(&self, key: u64, images: &'a [ImageRef]) -> &'a ImageRef {
        match self {
            SelectionStrategy::First => &images[0],
            SelectionStrategy::Seeded(seed) => {
                let idx = splitmix64(seed.wrapping_add(key)) as usize % images.len();
                &images[idx]
            }
        }
    }
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Horizontally concatenate component images onto one white canvas.
///
/// All inputs are resized to the tallest input's height (aspect preserved,
/// widths rounded to the nearest pixel) so no digit gets clipped; the canvas
/// is exactly (sum of resized widths) x (max height).
pub fn concat_horizontally(images: &[RgbImage]) -> Result<RgbImage, GlyphBookError> {
    let max_height = images
        .iter()
        .map(|img| img.height())
        .max()
        .filter(|h| *h > 0)
        .ok_or_else(|| GlyphBookError::Store("nothing to concatenate".to_string()))?;

    let mut resized = Vec::with_capacity(images.len());
    for img in images {
        if img.height() == max_height {
            resized.push(img.clone());
        } else {
            let new_width = ((img.width() as u64 * max_height as u64
                + img.height() as u64 / 2)
                / img.height() as u64)
                .max(1) as u32;
            resized.push(imageops::resize(
                img,
                new_width,
                max_height,
                FilterType::Lanczos3,
            ));
        }
    }

    let total_width: u32 = resized.iter().map(|img| img.width()).sum();
    let mut canvas = RgbImage::from_pixel(total_width, max_height, Rgb([255, 255, 255]));
    let mut x_offset: i64 = 0;
    for img in &resized {
        imageops::replace(&mut canvas, img, x_offset, 0);
        x_offset += img.width() as i64;
    }
    Ok(canvas)
}

/// Compose one target from already-decomposed components. A component with
/// no retrievable image is a data-integrity failure distinct from "no
/// decomposition exists", and aborts this target without partial output.
pub fn compose_target(
    target: u64,
    components: &[u64],
    store: &dyn GlyphStore,
    strategy: SelectionStrategy,
) -> Result<RgbImage, GlyphBookError> {
    let mut selected = Vec::with_capacity(components.len());
    for component in components {
        let images = store.images(*component)?;
        if images.is_empty() {
            return Err(GlyphBookError::Composition {
                target,
                component: *component,
            });
        }
        let picked = strategy.pick(*component, &images);
        selected.push(image::open(&picked.path).map_err(image_err)?.to_rgb8());
    }
    concat_horizontally(&selected)
}

/// Tally of one `compose_missing` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeSummary {
    pub missing: usize,
    pub composed: usize,
    /// Targets greedy decomposition could not express. Expected and common
    /// with a sparse dictionary; reported, never fatal.
    pub impossible: Vec<u64>,
    /// (target, component) pairs where a decomposed component had no image.
    pub failed: Vec<(u64, u64)>,
}

enum TaskOutcome {
    Composed,
    Impossible(u64),
    MissingComponent { target: u64, component: u64 },
}

/// Compose every missing integer in `1..=max_number` from the store's
/// current primitives.
///
/// Availability is snapshotted once up front, so targets composed during
/// this pass are never used as ingredients for other targets in the same
/// pass, regardless of task scheduling. Targets are independent; each rayon
/// task writes only its own key.
pub fn compose_missing(
    store: &DirGlyphStore,
    max_number: u64,
    strategy: SelectionStrategy,
    logger: Option<&RunLogger>,
) -> Result<ComposeSummary, GlyphBookError> {
    let purged = store.purge_composed()?;
    if purged > 0 {
        if let Some(logger) = logger {
            logger.event("compose.purged", &[("count", &purged.to_string())]);
        }
    }

    let available: AvailabilitySet = store.available()?;
    let targets: Vec<u64> = (1..=max_number)
        .filter(|target| !available.contains(*target))
        .collect();

    let outcomes: Vec<TaskOutcome> = targets
        .par_iter()
        .map(|target| compose_one(*target, &available, store, strategy))
        .collect::<Result<_, _>>()?;

    let mut summary = ComposeSummary {
        missing: targets.len(),
        ..ComposeSummary::default()
    };
    for outcome in outcomes {
        match outcome {
            TaskOutcome::Composed => summary.composed += 1,
            TaskOutcome::Impossible(target) => summary.impossible.push(target),
            TaskOutcome::MissingComponent { target, component } => {
                summary.failed.push((target, component));
            }
        }
    }

    if let Some(logger) = logger {
        logger.increment("compose.missing", summary.missing as u64);
        logger.increment("compose.composed", summary.composed as u64);
        logger.increment("compose.impossible", summary.impossible.len() as u64);
        logger.increment("compose.failed", summary.failed.len() as u64);
        for (target, component) in &summary.failed {
            logger.event(
                "compose.missing_component",
                &[
                    ("target", &target.to_string()),
                    ("component", &component.to_string()),
                ],
            );
        }
        logger.emit_summary("compose");
    }

    Ok(summary)
}

fn compose_one(
    target: u64,
    available: &AvailabilitySet,
    store: &DirGlyphStore,
    strategy: SelectionStrategy,
) -> Result<TaskOutcome, GlyphBookError> {
    let Some(components) = decompose(target, available) else {
        return Ok(TaskOutcome::Impossible(target));
    };
    match compose_target(target, &components, store, strategy) {
        Ok(composite) => {
            store.put(target, &composite)?;
            Ok(TaskOutcome::Composed)
        }
        Err(GlyphBookError::Composition { target, component }) => {
            Ok(TaskOutcome::MissingComponent { target, component })
        }
        Err(err) => Err(err),
    }
}
