//! `optimize` stage: production image pass over the output directory.
//!
//! Runs last in `build`, after every asset and the site itself are in place.
//!
//! ```text
//! 1. Raster    dist/img/**/*.{jpg,png}   →  photo.jpg (1170), photo@2x.jpg (2340), photo@3x.jpg (3510)
//!              (dist/img/favicon/** skipped, never enlarged,
//!               images whose variants are newer than them skipped)
//! 2. Vector    dist/img/**/*.svg         →  svg optimizer, in place
//!              dist/img/**/*.gif         →  gif optimizer, in place
//! 3. Srcset    dist/**/*.html            →  srcset on local <img> tags
//!              (dist/docs/** skipped)
//! ```
//!
//! Images in the raster and vector passes are processed in parallel using
//! [rayon](https://docs.rs/rayon).
//!
//! Raster output is baseline JPEG and non-interlaced PNG: the `image` encoders
//! write neither progressive JPEG nor Adam7 PNG.

use crate::assets::{CopyError, collect_files, compile_patterns};
use crate::config::{Layout, OptimizeConfig};
use crate::imaging::{
    BackendError, ImageBackend, Quality, RASTER_EXTENSIONS, ResponsiveConfig, RustBackend,
    create_variants, is_variant_file, variants_up_to_date,
};
use crate::reload::Notifier;
use crate::srcset::add_srcset;
use crate::subprocess::{ToolCommand, ToolError};
use rayon::prelude::*;
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Files(#[from] CopyError),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("Image processing failed for {path}: {source}")]
    Imaging {
        path: PathBuf,
        #[source]
        source: BackendError,
    },
    #[error("Optimizer failed for {path}: {source}")]
    Tool {
        path: PathBuf,
        #[source]
        source: ToolError,
    },
}

/// Counts of what each pass touched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeSummary {
    /// Source images resized.
    pub raster: usize,
    /// Files written by the raster pass, originals included.
    pub variants: usize,
    /// SVG and GIF files passed to external optimizers.
    pub vector: usize,
    /// HTML pages rewritten with `srcset`.
    pub pages: usize,
}

impl OptimizeSummary {
    pub fn files_written(&self) -> usize {
        self.variants + self.vector + self.pages
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Run all three passes with the production image backend.
pub fn optimize(
    layout: &Layout,
    config: &OptimizeConfig,
    notifier: &impl Notifier,
) -> Result<OptimizeSummary, OptimizeError> {
    optimize_with_backend(&RustBackend::new(), layout, config, notifier)
}

/// Run all three passes using a specific image backend (allows testing with mock).
pub fn optimize_with_backend(
    backend: &impl ImageBackend,
    layout: &Layout,
    config: &OptimizeConfig,
    notifier: &impl Notifier,
) -> Result<OptimizeSummary, OptimizeError> {
    let img_dir = layout.output_dir("img");

    let (raster, variants) = resize_rasters(backend, &img_dir, config)?;
    let mut vector = run_optimizer(&img_dir, &["svg"], &config.svg_command, &layout.root)?;
    vector += run_optimizer(&img_dir, &["gif"], &config.gif_command, &layout.root)?;
    let pages = rewrite_pages(&layout.output, config)?;

    let summary = OptimizeSummary {
        raster,
        variants,
        vector,
        pages,
    };
    info!(?summary, "optimized output");
    if summary.files_written() > 0 {
        notifier.reload();
    }
    Ok(summary)
}

/// Raster pass. Returns `(sources, files written)`.
fn resize_rasters(
    backend: &impl ImageBackend,
    img_dir: &Path,
    config: &OptimizeConfig,
) -> Result<(usize, usize), OptimizeError> {
    let exclude = compile_patterns(&config.exclude)?;
    let sources: Vec<PathBuf> = collect_files(img_dir, true, &exclude)?
        .into_iter()
        .filter(|p| has_extension(p, RASTER_EXTENSIONS))
        .filter(|p| !is_variant_file(p, &config.variants))
        .filter(|p| {
            let fresh = variants_up_to_date(p, &config.variants);
            if fresh {
                debug!(source = %p.display(), "variants up to date");
            }
            !fresh
        })
        .collect();

    let responsive = ResponsiveConfig {
        rules: config.variants.clone(),
        quality: Quality::new(config.quality),
        without_enlargement: config.without_enlargement,
    };

    let written: Vec<usize> = sources
        .par_iter()
        .map(|source| {
            debug!(source = %source.display(), "resizing");
            create_variants(backend, source, &responsive)
                .map(|outputs| outputs.len())
                .map_err(|source_err| OptimizeError::Imaging {
                    path: source.clone(),
                    source: source_err,
                })
        })
        .collect::<Result<_, _>>()?;

    Ok((sources.len(), written.iter().sum()))
}

/// Vector/GIF pass: run `command <file>` for every file with a matching extension.
fn run_optimizer(
    img_dir: &Path,
    extensions: &[&str],
    command: &[String],
    cwd: &Path,
) -> Result<usize, OptimizeError> {
    if command.is_empty() {
        return Ok(0);
    }
    let files: Vec<PathBuf> = collect_files(img_dir, true, &[])?
        .into_iter()
        .filter(|p| has_extension(p, extensions))
        .collect();
    if files.is_empty() {
        return Ok(0);
    }

    let tool = ToolCommand::from_argv(command).map_err(|source| OptimizeError::Tool {
        path: img_dir.to_path_buf(),
        source,
    })?;
    files.par_iter().try_for_each(|file| {
        tool.run(cwd, std::slice::from_ref(file), &[])
            .map_err(|source| OptimizeError::Tool {
                path: file.clone(),
                source,
            })
    })?;
    Ok(files.len())
}

/// Srcset pass. Returns the number of pages rewritten.
fn rewrite_pages(output: &Path, config: &OptimizeConfig) -> Result<usize, OptimizeError> {
    let exclude = compile_patterns(&config.srcset_exclude)?;
    let pages: Vec<PathBuf> = collect_files(output, true, &exclude)?
        .into_iter()
        .filter(|p| has_extension(p, &["html"]))
        .collect();

    let mut rewritten = 0;
    for page in pages {
        let html = fs::read_to_string(&page)?;
        if let Cow::Owned(updated) = add_srcset(&html, &config.variants) {
            fs::write(&page, updated)?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}
