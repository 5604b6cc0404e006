#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PxSize {
    pub width: u32,
    pub height: u32,
}

impl PxSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Content-area geometry of a book page, in CSS pixels at 96 dpi.
///
/// Defaults describe a US Letter page with 2in side margins, 0.88in top,
/// 1in bottom, and 0.75in reserved for the running head: five 75px columns
/// filled to 790px.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageGeometry {
    pub columns: usize,
    pub column_width_px: u32,
    pub target_height_px: u32,
    /// Upper bound on items offered to the layout engine per page.
    pub items_per_page: usize,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            columns: 5,
            column_width_px: 75,
            target_height_px: 790,
            items_per_page: 1000,
        }
    }
}

/// Height an image occupies once constrained to a column.
///
/// With `normalize_width` the image is scaled to exactly the column width;
/// otherwise only images wider than the column are scaled down. Matches the
/// CSS `max-width: 100%` behavior the page template relies on.
pub fn scaled_height(size: PxSize, column_width_px: u32, normalize_width: bool) -> u32 {
    if size.width == 0 || size.height == 0 {
        return 0;
    }
    if !normalize_width && size.width <= column_width_px {
        return size.height;
    }
    let scaled = size.height as u64 * column_width_px as u64 / size.width as u64;
    scaled.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_image_keeps_height_without_normalization() {
        assert_eq!(scaled_height(PxSize::new(50, 30), 75, false), 30);
    }

    #[test]
    fn wide_image_scales_down() {
        assert_eq!(scaled_height(PxSize::new(150, 60), 75, false), 30);
    }

    #[test]
    fn normalization_scales_both_ways() {
        assert_eq!(scaled_height(PxSize::new(50, 30), 75, true), 45);
        assert_eq!(scaled_height(PxSize::new(150, 60), 75, true), 30);
    }

    #[test]
    fn degenerate_dimensions_are_zero() {
        assert_eq!(scaled_height(PxSize::new(0, 30), 75, false), 0);
        assert_eq!(scaled_height(PxSize::new(30, 0), 75, true), 0);
    }
}
