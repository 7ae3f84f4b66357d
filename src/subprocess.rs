//! External tool invocation.
//!
//! Every external program (site generator, style CLI, bundler, image
//! optimizers) is run the same way: from the project root, with stdio
//! inherited so its own output streams straight to the terminal, and judged
//! only by its exit status.
//!
//! The site generator gets its own wrapper, [`SiteGenerator`], because its
//! outcome drives the dev server: success reloads every browser, failure
//! surfaces a fixed notification and fails the stage.

use crate::config::{OUTPUT_PLACEHOLDER, PathsConfig, SITE_PLACEHOLDER, SiteGeneratorConfig};
use crate::reload::Notifier;
use std::ffi::OsStr;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Error carried by a failed site build.
pub const BUILD_FAILED: &str = "Hugo build failed";

/// Notification shown in the browser when a site build fails.
pub const BUILD_FAILED_NOTICE: &str = "Hugo build failed :(";

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{program} exited with {}", describe_code(.code))]
    Failed { program: String, code: Option<i32> },
    #[error("empty command line")]
    EmptyCommand,
}

#[derive(Error, Debug)]
pub enum SiteError {
    /// The generator never ran, so no notice is sent.
    #[error(transparent)]
    Spawn(#[from] ToolError),
    #[error("Hugo build failed")]
    BuildFailed { code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// A program plus its leading arguments, as written in config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split a config command line (`["npx", "postcss"]`) into program and args.
    pub fn from_argv(argv: &[String]) -> Result<Self, ToolError> {
        let (program, args) = argv.split_first().ok_or(ToolError::EmptyCommand)?;
        Ok(Self::new(program.clone(), args.to_vec()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argument list with `extra` appended.
    pub fn argv<S: AsRef<OsStr>>(&self, extra: &[S]) -> Vec<String> {
        self.args
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.as_ref().to_string_lossy().into_owned()))
            .collect()
    }

    /// Run to completion in `cwd`, returning the raw exit status.
    pub fn status<S: AsRef<OsStr>>(
        &self,
        cwd: &Path,
        extra: &[S],
        envs: &[(&str, &OsStr)],
    ) -> Result<ExitStatus, ToolError> {
        let args = self.argv(extra);
        debug!(program = %self.program, ?args, cwd = %cwd.display(), "spawning");
        let mut command = Command::new(&self.program);
        command.args(&args).current_dir(cwd);
        for (key, value) in envs {
            command.env(key, value);
        }
        command.status().map_err(|source| ToolError::Spawn {
            program: self.program.clone(),
            source,
        })
    }

    /// Run to completion and map a non-zero exit to [`ToolError::Failed`].
    pub fn run<S: AsRef<OsStr>>(
        &self,
        cwd: &Path,
        extra: &[S],
        envs: &[(&str, &OsStr)],
    ) -> Result<(), ToolError> {
        let status = self.status(cwd, extra, envs)?;
        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                program: self.program.clone(),
                code: status.code(),
            })
        }
    }
}

/// What a finished site build means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    Success,
    Failure,
}

/// Map a process exit code to a build outcome.
///
/// `None` means the process was terminated by a signal, which counts as failure.
pub fn outcome_for(code: Option<i32>) -> BuildOutcome {
    match code {
        Some(0) => BuildOutcome::Success,
        _ => BuildOutcome::Failure,
    }
}

/// Output directory as the generator sees it.
///
/// Hugo resolves `-d` against its source directory, so a relative output
/// climbs out of the site directory first (`site` + `dist` → `../dist`).
pub fn destination_arg(root: &Path, paths: &PathsConfig) -> PathBuf {
    let output = Path::new(&paths.output);
    let mut climb = PathBuf::new();
    for component in Path::new(&paths.site).components() {
        match component {
            Component::Normal(_) => climb.push(".."),
            Component::CurDir => {}
            _ => return root.join(output),
        }
    }
    climb.join(output)
}

/// The external static site generator.
#[derive(Debug, Clone)]
pub struct SiteGenerator {
    command: ToolCommand,
    working_dir: PathBuf,
}

impl SiteGenerator {
    pub fn new(command: ToolCommand, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
        }
    }

    /// Build the generator for a project, filling the `{output}` and `{site}`
    /// placeholders in its arguments from `paths`.
    pub fn from_config(config: &SiteGeneratorConfig, paths: &PathsConfig, root: &Path) -> Self {
        let destination = destination_arg(root, paths);
        let args = config
            .args
            .iter()
            .map(|arg| match arg.as_str() {
                OUTPUT_PLACEHOLDER => destination.to_string_lossy().into_owned(),
                SITE_PLACEHOLDER => paths.site.clone(),
                _ => arg.clone(),
            })
            .collect();
        Self::new(ToolCommand::new(config.program.clone(), args), root)
    }

    /// Arguments the generator will receive for a run with `extra` appended.
    pub fn arguments(&self, extra: &[String]) -> Vec<String> {
        self.command.argv(extra)
    }

    /// Run the generator and report the result to `notifier`.
    ///
    /// Exit 0 sends exactly one reload. Any other exit sends the failure
    /// notice and returns [`SiteError::BuildFailed`]; no reload is sent.
    pub fn build(&self, extra: &[String], notifier: &impl Notifier) -> Result<(), SiteError> {
        info!(
            program = %self.command.program(),
            args = ?self.arguments(extra),
            "running site generator"
        );
        let status = self.command.status(&self.working_dir, extra, &[])?;

        match outcome_for(status.code()) {
            BuildOutcome::Success => {
                notifier.reload();
                Ok(())
            }
            BuildOutcome::Failure => {
                warn!(code = ?status.code(), "site generator failed");
                notifier.notify(BUILD_FAILED_NOTICE);
                Err(SiteError::BuildFailed {
                    code: status.code(),
                })
            }
        }
    }
}
