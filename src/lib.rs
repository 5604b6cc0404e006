//! Pipeline for turning scanned number glyphs into printable books.
//!
//! The stages run in order: `extract` crops glyphs out of scanned books via
//! their hOCR coordinates, `compose` composites numbers that were never
//! scanned whole, and `book` paginates the full range into HTML pages,
//! renders them through a browser, and merges the result into one PDF.

mod book;
mod compose;
mod decompose;
mod error;
mod extract;
mod html;
mod layout;
mod numwords;
mod paginate;
mod pdf;
mod render;
mod report;
mod store;
mod types;

pub use book::BookBuilder;
pub use compose::{
    ComposeSummary, SelectionStrategy, compose_missing, compose_target, concat_horizontally,
};
pub use decompose::{AvailabilitySet, decompose};
pub use error::GlyphBookError;
pub use extract::{
    BookSource, NumberRegion, extract_all_numbers, extract_all_word, extract_book_numbers,
    extract_book_word, numbers_from_hocr, word_occurrences_from_hocr,
};
pub use html::{PageStyle, content_page, title_page, toc_page};
pub use layout::{LayoutItem, fill_columns};
pub use numwords::{parse_words, to_words};
pub use paginate::{PagePlan, Paginator, TOC_BLOCK, TocEntry};
pub use pdf::{compress, merge};
pub use render::{ChromiumRenderer, HtmlRenderer};
pub use report::RunLogger;
pub use store::{DirGlyphStore, GlyphStore, ImageRef, WordGlyphDir};
pub use types::{PageGeometry, PxSize, scaled_height};
