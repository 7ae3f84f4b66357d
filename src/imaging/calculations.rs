//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the output size of one responsive variant.
///
/// The width is the target width, or the original width when
/// `without_enlargement` is set and the target is wider than the original.
/// The height keeps the original aspect ratio and never drops below 1.
///
/// # Examples
/// ```
/// # use site_pipeline::imaging::calculate_variant_dimensions;
/// assert_eq!(calculate_variant_dimensions((4000, 3000), 1170, true), (1170, 878));
/// assert_eq!(calculate_variant_dimensions((800, 600), 2340, true), (800, 600));
/// ```
pub fn calculate_variant_dimensions(
    original: (u32, u32),
    target_width: u32,
    without_enlargement: bool,
) -> (u32, u32) {
    let (orig_w, orig_h) = original;
    let width = if without_enlargement {
        target_width.min(orig_w)
    } else {
        target_width
    };
    if orig_w == 0 {
        return (width, orig_h);
    }
    let height = (orig_h as f64 * width as f64 / orig_w as f64).round() as u32;
    (width, height.max(1))
}
