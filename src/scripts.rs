//! `js` stage: run the bundler, then copy the remaining script files.

use crate::assets::{CopyError, copy_scripts};
use crate::config::{Layout, ScriptsConfig};
use crate::reload::Notifier;
use crate::subprocess::{ToolCommand, ToolError};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Bundler failed: {0}")]
    Bundler(#[from] ToolError),
    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// Bundle, reload, then copy everything but the entry into `<output>/js`.
///
/// A failed bundle stops the stage before anything is copied.
pub fn build_scripts(
    layout: &Layout,
    config: &ScriptsConfig,
    notifier: &impl Notifier,
) -> Result<usize, ScriptError> {
    let command = ToolCommand::from_argv(&config.command)?;
    info!(program = %command.program(), "bundling scripts");
    command.run::<&str>(&layout.root, &[], &[])?;
    notifier.reload();

    Ok(copy_scripts(layout, &config.entry, notifier)?)
}
