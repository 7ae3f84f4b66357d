//! The stage catalogue.
//!
//! A [`Stage`] is one named unit of work. Names match the CLI subcommands and
//! are what the watcher and the reports print.

use crate::assets::CopyError;
use crate::optimize::OptimizeError;
use crate::scripts::ScriptError;
use crate::styles::StyleError;
use crate::subprocess::SiteError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Compile `src/css/*.css` through the style CLI.
    Css,
    /// Bundle scripts, then copy the rest of `src/js`.
    Js,
    Fonts,
    /// Files sitting directly in `src/`.
    SrcRoot,
    Images,
    /// Run the site generator.
    Hugo,
    /// Run the site generator with drafts and future posts.
    HugoPreview,
    /// Responsive variants, vector/GIF optimizers, `srcset` rewriting.
    Optimize,
}

impl Stage {
    pub const ALL: [Stage; 8] = [
        Stage::Css,
        Stage::Js,
        Stage::Fonts,
        Stage::SrcRoot,
        Stage::Images,
        Stage::Hugo,
        Stage::HugoPreview,
        Stage::Optimize,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::Css => "css",
            Stage::Js => "js",
            Stage::Fonts => "fonts",
            Stage::SrcRoot => "src-root",
            Stage::Images => "images",
            Stage::Hugo => "hugo",
            Stage::HugoPreview => "hugo-preview",
            Stage::Optimize => "optimize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown stage '{0}'")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.name() == s)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Any failure a stage can produce.
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Site(#[from] SiteError),
    #[error(transparent)]
    Copy(#[from] CopyError),
    #[error(transparent)]
    Style(#[from] StyleError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error(transparent)]
    Optimize(#[from] OptimizeError),
}

/// Outcome of one successful stage run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    /// Files written. Zero for stages whose output is opaque (the site generator).
    pub files: usize,
    pub elapsed: Duration,
}
