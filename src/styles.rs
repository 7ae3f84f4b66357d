//! `css` stage: hand the top-level stylesheets to the style CLI.
//!
//! The transform itself (imports, nesting, grid, color functions) belongs to
//! the external tool and its own config file. This stage only decides which
//! files go in, where they come out, and which variables the tool can read.

use crate::config::{Layout, StylesConfig};
use crate::reload::Notifier;
use crate::subprocess::{ToolCommand, ToolError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Environment variable holding the path of the style variables JSON file.
pub const VARIABLES_ENV: &str = "PIPELINE_STYLE_VARIABLES";

const VARIABLES_FILENAME: &str = "style-variables.json";

#[derive(Error, Debug)]
pub enum StyleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Style tool failed: {0}")]
    Tool(#[from] ToolError),
}

/// Top-level `*.css` files in `dir`, sorted. Partials in subdirectories are
/// pulled in by the tool's import resolution, not compiled on their own.
pub fn stylesheet_inputs(dir: &Path) -> Result<Vec<PathBuf>, StyleError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_css = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("css"));
        if is_css && path.is_file() {
            inputs.push(path);
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Write `variables` as JSON under `temp_dir`, returning the file path.
fn write_variables(config: &StylesConfig, temp_dir: &Path) -> Result<PathBuf, StyleError> {
    fs::create_dir_all(temp_dir)?;
    let path = temp_dir.join(VARIABLES_FILENAME);
    fs::write(&path, serde_json::to_string_pretty(&config.variables)?)?;
    Ok(path)
}

/// Arguments appended to the configured command: the inputs then `--dir <out>`.
pub fn tool_arguments(inputs: &[PathBuf], out_dir: &Path) -> Vec<PathBuf> {
    let mut args = inputs.to_vec();
    args.push(PathBuf::from("--dir"));
    args.push(out_dir.to_path_buf());
    args
}

/// Compile stylesheets into `<output>/css`, returning the produced files.
pub fn compile_styles(
    layout: &Layout,
    config: &StylesConfig,
    notifier: &impl Notifier,
) -> Result<Vec<PathBuf>, StyleError> {
    let inputs = stylesheet_inputs(&layout.source_dir("css"))?;
    if inputs.is_empty() {
        return Ok(Vec::new());
    }

    let out_dir = layout.output_dir("css");
    fs::create_dir_all(&out_dir)?;
    let variables = write_variables(config, &layout.temp)?;

    let command = ToolCommand::from_argv(&config.command)?;
    info!(program = %command.program(), inputs = inputs.len(), "compiling stylesheets");
    command.run(
        &layout.root,
        &tool_arguments(&inputs, &out_dir),
        &[(VARIABLES_ENV, variables.as_os_str())],
    )?;

    let outputs: Vec<PathBuf> = inputs
        .iter()
        .filter_map(|input| input.file_name().map(|name| out_dir.join(name)))
        .collect();
    notifier.inject(&outputs);
    Ok(outputs)
}
