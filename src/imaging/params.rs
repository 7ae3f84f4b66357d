//! Parameter types for image operations.
//!
//! These structs describe *what* to produce, not *how*. The
//! [`operations`](super::operations) module builds them from config and the
//! [`backend`](super::backend) does the pixel work, so tests can swap in a mock.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(80)
    }
}

/// One output file of a resize plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantParams {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Every variant of one source image. The source is decoded once, so a
/// variant may safely overwrite the source path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizePlan {
    pub source: PathBuf,
    pub variants: Vec<VariantParams>,
    pub quality: Quality,
}
