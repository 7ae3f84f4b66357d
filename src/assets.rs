//! Verbatim copy stages.
//!
//! | Stage | Source | Destination |
//! |---|---|---|
//! | `fonts` | `src/fonts/**/*` | `dist/fonts` |
//! | `src-root` | `src/*` (files only) | `dist/` |
//! | `images` | `src/img/**/*` | `dist/img` |
//! | `js` (copy half) | `src/js/**/*` minus the bundler entry | `dist/js` |
//!
//! A missing source directory is not an error: the stage simply copies nothing.
//! Relative paths are preserved and destination directories created on demand.

use crate::config::Layout;
use crate::reload::Notifier;
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum CopyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Glob options shared by every relative-path match: `*` stays within one
/// path segment, `**` crosses segments.
pub const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Compile a list of glob strings.
pub fn compile_patterns(globs: &[String]) -> Result<Vec<Pattern>, glob::PatternError> {
    globs.iter().map(|g| Pattern::new(g)).collect()
}

/// Render `path` relative to `base` with `/` separators, for glob matching.
pub fn relative_slash_path(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// True when `relative` matches any of `patterns`.
pub fn is_excluded(relative: &str, patterns: &[Pattern]) -> bool {
    patterns
        .iter()
        .any(|p| p.matches_with(relative, MATCH_OPTIONS))
}

/// One copy operation.
#[derive(Debug, Clone)]
pub struct CopySpec {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Descend into subdirectories (`**/*`) or only take direct children (`*`).
    pub recursive: bool,
    /// Globs relative to `from` that are skipped.
    pub exclude: Vec<Pattern>,
}

impl CopySpec {
    pub fn new(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            recursive: true,
            exclude: Vec::new(),
        }
    }

    pub fn shallow(mut self) -> Self {
        self.recursive = false;
        self
    }

    pub fn excluding(mut self, patterns: Vec<Pattern>) -> Self {
        self.exclude = patterns;
        self
    }
}

/// List files under `root` (sorted), honoring recursion and exclusions.
pub fn collect_files(
    root: &Path,
    recursive: bool,
    exclude: &[Pattern],
) -> Result<Vec<PathBuf>, CopyError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut files = Vec::new();
    for entry in WalkDir::new(root).max_depth(max_depth).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let excluded = relative_slash_path(root, &path)
            .is_some_and(|relative| is_excluded(&relative, exclude));
        if !excluded {
            files.push(path);
        }
    }
    Ok(files)
}

/// Copy every file matched by `spec`, returning the written destination paths.
pub fn copy_tree(spec: &CopySpec) -> Result<Vec<PathBuf>, CopyError> {
    let sources = collect_files(&spec.from, spec.recursive, &spec.exclude)?;
    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let Ok(relative) = source.strip_prefix(&spec.from) else {
            continue;
        };
        let dest = spec.to.join(relative);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, &dest)?;
        written.push(dest);
    }
    debug!(from = %spec.from.display(), to = %spec.to.display(), files = written.len(), "copied");
    Ok(written)
}

fn copy_and_signal(spec: &CopySpec, notifier: &impl Notifier) -> Result<usize, CopyError> {
    let written = copy_tree(spec)?;
    if !written.is_empty() {
        notifier.inject(&written);
    }
    Ok(written.len())
}

/// `fonts` stage.
pub fn copy_fonts(layout: &Layout, notifier: &impl Notifier) -> Result<usize, CopyError> {
    let spec = CopySpec::new(layout.source_dir("fonts"), layout.output_dir("fonts"));
    copy_and_signal(&spec, notifier)
}

/// `src-root` stage: files directly in the source directory.
pub fn copy_src_root(layout: &Layout, notifier: &impl Notifier) -> Result<usize, CopyError> {
    let spec = CopySpec::new(&layout.source, &layout.output).shallow();
    copy_and_signal(&spec, notifier)
}

/// `images` stage.
pub fn copy_images(layout: &Layout, notifier: &impl Notifier) -> Result<usize, CopyError> {
    let spec = CopySpec::new(layout.source_dir("img"), layout.output_dir("img"));
    copy_and_signal(&spec, notifier)
}

/// Copy half of the `js` stage: everything except the bundler entry.
pub fn copy_scripts(
    layout: &Layout,
    entry: &str,
    notifier: &impl Notifier,
) -> Result<usize, CopyError> {
    let exclude = vec![Pattern::new(&Pattern::escape(entry))?];
    let spec = CopySpec::new(layout.source_dir("js"), layout.output_dir("js")).excluding(exclude);
    copy_and_signal(&spec, notifier)
}
