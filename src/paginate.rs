use crate::error::GlyphBookError;
use crate::layout::{LayoutItem, fill_columns};
use crate::types::PageGeometry;
use std::collections::BTreeMap;

/// Width of the contiguous ranges the table of contents is chaptered by.
pub const TOC_BLOCK: u64 = 1000;

/// One table-of-contents row: the first page on which any member of a
/// 1000-wide range appeared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    pub range_start: u64,
    pub range_end: u64,
    pub page_number: usize,
}

/// Everything a page template needs for one content page. Columns hold a
/// strict prefix of the offered items; `used` says how far the cursor moved.
#[derive(Debug, Clone)]
pub struct PagePlan<T> {
    pub page_number: usize,
    pub is_recto: bool,
    pub start: u64,
    pub end: u64,
    pub columns: Vec<Vec<LayoutItem<T>>>,
    pub used: usize,
}

/// Pagination cursor over the logical sequence `start..=max`.
///
/// The caller fetches pending items for the current cursor, hands them to
/// `next_page`, and repeats until `is_done`. All state lives here rather
/// than in loop-local counters, so a single page step is testable on its
/// own. Table-of-contents bookkeeping is first-page-wins per block.
#[derive(Debug, Clone)]
pub struct Paginator {
    cursor: u64,
    max: u64,
    pages_built: usize,
    block_first_page: BTreeMap<u64, usize>,
}

impl Paginator {
    /// The book sequence is 1-based; glyph key 0 exists in storage but
    /// never opens a range, so a start below 1 is clamped.
    pub fn new(start: u64, max: u64) -> Self {
        Self {
            cursor: start.max(1),
            max,
            pages_built: 0,
            block_first_page: BTreeMap::new(),
        }
    }

    pub fn is_done(&self) -> bool {
        self.cursor > self.max
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn pages_built(&self) -> usize {
        self.pages_built
    }

    /// How many items the caller should offer for the next page.
    pub fn pending(&self, geometry: &PageGeometry) -> u64 {
        if self.is_done() {
            return 0;
        }
        let remaining = self.max - self.cursor + 1;
        remaining.min(geometry.items_per_page as u64)
    }

    /// Lay out one page from `items`, which must start at the current
    /// cursor. Placing nothing while items remain means the configuration
    /// can never make progress, which is fatal rather than an infinite loop.
    pub fn next_page<T: Clone>(
        &mut self,
        items: &[LayoutItem<T>],
        geometry: &PageGeometry,
    ) -> Result<PagePlan<T>, GlyphBookError> {
        let (columns, used) =
            fill_columns(items, geometry.columns, geometry.target_height_px)?;
        if used == 0 && !items.is_empty() {
            return Err(GlyphBookError::LayoutConfiguration(format!(
                "no item starting at {} fits a {}px column",
                self.cursor, geometry.target_height_px
            )));
        }

        let page_number = self.pages_built + 1;
        let start = self.cursor;
        let end = if used == 0 {
            start
        } else {
            start + used as u64 - 1
        };

        if used > 0 {
            let first_block = start.saturating_sub(1) / TOC_BLOCK;
            let last_block = end.saturating_sub(1) / TOC_BLOCK;
            for block in first_block..=last_block {
                self.block_first_page.entry(block).or_insert(page_number);
            }
        }

        self.cursor = start + used as u64;
        self.pages_built = page_number;

        Ok(PagePlan {
            page_number,
            is_recto: page_number % 2 == 1,
            start,
            end,
            columns,
            used,
        })
    }

    /// Finalize the table of contents, in ascending block order.
    pub fn finish(self) -> Vec<TocEntry> {
        let max = self.max;
        self.block_first_page
            .into_iter()
            .map(|(block, page_number)| {
                let range_start = block * TOC_BLOCK + 1;
                TocEntry {
                    range_start,
                    range_end: (range_start + TOC_BLOCK - 1).min(max),
                    page_number,
                }
            })
            .collect()
    }
}
