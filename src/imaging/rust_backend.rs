//! Pure Rust image backend built on the `image` crate.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode (JPEG, PNG) | `image::ImageReader` |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → PNG | `PngEncoder` with best compression and adaptive filtering |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{Quality, ResizePlan};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Extensions the raster pass reads and writes.
pub const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Pure Rust backend using the `image` crate ecosystem.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode `img` in the format implied by the output extension.
fn save_image(img: &DynamicImage, path: &Path, quality: Quality) -> Result<(), BackendError> {
    let ext = extension_of(path);
    if !RASTER_EXTENSIONS.contains(&ext.as_str()) {
        return Err(BackendError::ProcessingFailed(format!(
            "Unsupported output format: {}",
            ext
        )));
    }
    let file = File::create(path).map_err(BackendError::Io)?;
    let writer = BufWriter::new(file);

    let result = match ext.as_str() {
        "jpg" | "jpeg" => {
            // JPEG has no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(writer, quality.value() as u8);
            rgb.write_with_encoder(encoder)
        }
        "png" => {
            let encoder =
                PngEncoder::new_with_quality(writer, CompressionType::Best, PngFilter::Adaptive);
            img.write_with_encoder(encoder)
        }
        _ => unreachable!("extension checked above"),
    };
    result.map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to encode {}: {}", path.display(), e))
    })
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resize(&self, plan: &ResizePlan) -> Result<(), BackendError> {
        let img = load_image(&plan.source)?;
        for variant in &plan.variants {
            if variant.width == img.width() && variant.height == img.height() {
                save_image(&img, &variant.output, plan.quality)?;
            } else {
                let resized = img.resize_exact(variant.width, variant.height, FilterType::Lanczos3);
                save_image(&resized, &variant.output, plan.quality)?;
            }
        }
        Ok(())
    }
}
