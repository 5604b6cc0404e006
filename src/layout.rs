use crate::error::GlyphBookError;
use std::path::PathBuf;

/// One height-tagged entry offered to the column filler. The payload is the
/// caller's identity for the item (a number, an occurrence index).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutItem<T> {
    pub id: T,
    pub height_px: u32,
    pub image: PathBuf,
}

impl<T> LayoutItem<T> {
    pub fn new(id: T, height_px: u32, image: impl Into<PathBuf>) -> Self {
        Self {
            id,
            height_px,
            image: image.into(),
        }
    }
}

/// Sequential column fill: a single forward pass that places a strict prefix
/// of `items` into `num_columns` columns of `target_height_px`.
///
/// Overflow in the last column always ends the pass, even when that column
/// is still empty, so the returned count can be zero. In any earlier column
/// an overflowing item advances past held content and is then placed
/// unconditionally; an empty non-last column takes its first item even when
/// the item alone is taller than the target. Order is never changed and no
/// item is skipped: the returned count is exactly how many leading items
/// were placed.
pub fn fill_columns<T: Clone>(
    items: &[LayoutItem<T>],
    num_columns: usize,
    target_height_px: u32,
) -> Result<(Vec<Vec<LayoutItem<T>>>, usize), GlyphBookError> {
    if num_columns < 1 {
        return Err(GlyphBookError::LayoutConfiguration(
            "at least one column is required".to_string(),
        ));
    }
    if target_height_px == 0 {
        return Err(GlyphBookError::LayoutConfiguration(
            "column target height must be positive".to_string(),
        ));
    }

    let mut columns: Vec<Vec<LayoutItem<T>>> = vec![Vec::new(); num_columns];
    let mut column_idx = 0;
    let mut accumulated: u64 = 0;
    let mut used = 0;

    for item in items {
        let overflows = accumulated + item.height_px as u64 > target_height_px as u64;
        if overflows {
            if column_idx >= num_columns - 1 {
                break;
            }
            if !columns[column_idx].is_empty() {
                column_idx += 1;
                accumulated = 0;
            }
        }
        columns[column_idx].push(item.clone());
        accumulated += item.height_px as u64;
        used += 1;
    }

    Ok((columns, used))
}
