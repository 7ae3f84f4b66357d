//! Image processing for the optimize stage.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize → JPEG/PNG** | Lanczos3 + `image` encoders |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_variant_dimensions;
pub use operations::{
    ResponsiveConfig, create_variants, is_variant_file, variant_path, variants_up_to_date,
};
pub use params::{Quality, ResizePlan, VariantParams};
pub use rust_backend::{RASTER_EXTENSIONS, RustBackend};
