//! High-level image operations.
//!
//! These functions combine calculations with backend execution: they read
//! the variant rules from config, compute output paths and sizes, and hand a
//! [`ResizePlan`] to the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_variant_dimensions;
use super::params::{Quality, ResizePlan, VariantParams};
use crate::config::VariantRule;
use std::fs;
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Configuration for responsive variant generation.
#[derive(Debug, Clone)]
pub struct ResponsiveConfig {
    pub rules: Vec<VariantRule>,
    pub quality: Quality,
    pub without_enlargement: bool,
}

/// Path of the variant of `source` carrying `suffix` (`a/photo.jpg` + `@2x` → `a/photo@2x.jpg`).
pub fn variant_path(source: &Path, suffix: &str) -> PathBuf {
    if suffix.is_empty() {
        return source.to_path_buf();
    }
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    source.with_file_name(name)
}

/// True when `path` is itself an output of one of the suffixed rules.
///
/// Keeps a second optimize run from producing `photo@2x@2x.jpg`.
pub fn is_variant_file(path: &Path, rules: &[VariantRule]) -> bool {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    rules
        .iter()
        .any(|r| !r.suffix.is_empty() && stem.ends_with(&r.suffix))
}

/// True when every suffixed variant of `source` exists and is no older than it.
///
/// After a run the in-place variant has already replaced `source`, so resizing
/// it again would overwrite the larger variants with smaller ones. A source
/// copied in afterwards is newer than its variants and gets processed.
pub fn variants_up_to_date(source: &Path, rules: &[VariantRule]) -> bool {
    let modified = |path: &Path| fs::metadata(path).and_then(|m| m.modified()).ok();
    let Some(source_time) = modified(source) else {
        return false;
    };
    let mut suffixed = rules.iter().filter(|r| !r.suffix.is_empty()).peekable();
    suffixed.peek().is_some()
        && suffixed.all(|rule| {
            modified(&variant_path(source, &rule.suffix)).is_some_and(|t| t >= source_time)
        })
}

/// Plan every variant of `source` without executing it.
///
/// The in-place output comes first so the suffixed files are written after it.
pub fn plan_variants(source: &Path, original: (u32, u32), config: &ResponsiveConfig) -> ResizePlan {
    let mut variants: Vec<VariantParams> = config
        .rules
        .iter()
        .map(|rule| {
            let (width, height) =
                calculate_variant_dimensions(original, rule.width, config.without_enlargement);
            VariantParams {
                output: variant_path(source, &rule.suffix),
                width,
                height,
            }
        })
        .collect();
    variants.sort_by_key(|v| v.output.as_path() != source);

    ResizePlan {
        source: source.to_path_buf(),
        variants,
        quality: config.quality,
    }
}

/// Identify `source`, then write all of its variants. Returns the written paths.
pub fn create_variants(
    backend: &impl ImageBackend,
    source: &Path,
    config: &ResponsiveConfig,
) -> Result<Vec<PathBuf>> {
    let dims = backend.identify(source)?;
    let plan = plan_variants(source, (dims.width, dims.height), config);
    backend.resize(&plan)?;
    Ok(plan.variants.into_iter().map(|v| v.output).collect())
}
