//! Filesystem watching for the dev server.
//!
//! Changed paths are batched by a debouncer, mapped to the stages that
//! consume them, and those stages re-run on a blocking thread:
//!
//! | Changed path | Stage |
//! |---|---|
//! | `src/js/**/*.js` | `js` |
//! | `src/css/**/*.css` | `css` |
//! | `src/img/**/*` | `images` |
//! | `src/fonts/**/*` | `fonts` |
//! | `src/*` | `src-root` |
//! | `site/**/*` | `hugo` |
//!
//! Hidden files and directories (`.hugo_build.lock`, editor swap files) never
//! trigger a rebuild.

use crate::config::Layout;
use crate::output::print_rebuild;
use crate::plan::{Plan, StageRunner, execute};
use crate::stage::Stage;
use notify::RecursiveMode;
use notify_debouncer_mini::{DebouncedEvent, Debouncer, new_debouncer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("failed to create filesystem watcher: {0}")]
    Create(#[source] notify::Error),
}

/// Events emitted by the filesystem watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// One debounced batch of changed paths.
    Changed(Vec<PathBuf>),
}

/// Debounced recursive watcher over a set of directories.
pub struct FileWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    event_rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl FileWatcher {
    /// Watch every existing directory in `dirs`. Missing directories are skipped.
    pub fn new(dirs: &[PathBuf], debounce_ms: u64) -> Result<Self, WatchError> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut debouncer = new_debouncer(
            Duration::from_millis(debounce_ms),
            move |res: Result<Vec<DebouncedEvent>, notify::Error>| match res {
                Ok(events) => {
                    let paths: Vec<PathBuf> = events.into_iter().map(|e| e.path).collect();
                    if paths.is_empty() {
                        return;
                    }
                    debug!(count = paths.len(), "file changes detected");
                    if event_tx.send(WatchEvent::Changed(paths)).is_err() {
                        debug!("event receiver dropped, stopping watcher");
                    }
                }
                Err(e) => warn!(error = %e, "filesystem watch error"),
            },
        )
        .map_err(WatchError::Create)?;

        for dir in dirs.iter().filter(|d| d.is_dir()) {
            debouncer
                .watcher()
                .watch(dir, RecursiveMode::Recursive)
                .map_err(|source| WatchError::Watch {
                    path: dir.clone(),
                    source,
                })?;
            info!(path = %dir.display(), debounce_ms, "watching");
        }

        Ok(Self {
            _debouncer: debouncer,
            event_rx,
        })
    }

    /// Receive the next batch. Returns `None` if the watcher has been stopped.
    pub async fn recv(&mut self) -> Option<WatchEvent> {
        self.event_rx.recv().await
    }
}

/// Maps changed paths to stages.
///
/// Each root is kept as given first, then canonicalized when that differs.
#[derive(Debug, Clone)]
pub struct WatchRules {
    source: Vec<PathBuf>,
    site: Vec<PathBuf>,
}

/// A directory as given plus its canonical form, when they differ.
///
/// Watch events carry canonical paths on some platforms (`/private/var` on macOS).
fn both_forms(dir: &Path) -> Vec<PathBuf> {
    let mut forms = vec![dir.to_path_buf()];
    if let Ok(canonical) = dir.canonicalize() {
        if canonical != dir {
            forms.push(canonical);
        }
    }
    forms
}

fn strip_any<'a>(path: &'a Path, roots: &[PathBuf]) -> Option<&'a Path> {
    roots.iter().find_map(|root| path.strip_prefix(root).ok())
}

fn is_hidden(relative: &Path) -> bool {
    relative
        .components()
        .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

impl WatchRules {
    pub fn for_layout(layout: &Layout) -> Self {
        Self {
            source: both_forms(&layout.source),
            site: both_forms(&layout.site),
        }
    }

    /// Directories the watcher should observe.
    pub fn watched_dirs(&self) -> Vec<PathBuf> {
        self.source
            .first()
            .into_iter()
            .chain(self.site.first())
            .cloned()
            .collect()
    }

    /// The stage a single changed path belongs to, if any.
    pub fn stage_for(&self, path: &Path) -> Option<Stage> {
        if let Some(relative) = strip_any(path, &self.source) {
            if relative.as_os_str().is_empty() || is_hidden(relative) {
                return None;
            }
            let mut components = relative.components();
            let first = components.next()?.as_os_str().to_str()?;
            if components.next().is_none() {
                return match first {
                    // Stage directories themselves, not root files.
                    "js" | "css" | "img" | "fonts" => None,
                    _ => Some(Stage::SrcRoot),
                };
            }
            return match first {
                "js" if has_extension(path, "js") => Some(Stage::Js),
                "css" if has_extension(path, "css") => Some(Stage::Css),
                "img" => Some(Stage::Images),
                "fonts" => Some(Stage::Fonts),
                _ => None,
            };
        }
        let relative = strip_any(path, &self.site)?;
        if relative.as_os_str().is_empty() || is_hidden(relative) {
            return None;
        }
        Some(Stage::Hugo)
    }

    /// Deduplicated stages for a batch, in catalogue order.
    pub fn stages_for(&self, paths: &[PathBuf]) -> Vec<Stage> {
        paths
            .iter()
            .filter_map(|p| self.stage_for(p))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Run each stage on its own, in order. Failures are logged and do not stop
/// later stages. Returns the stages that failed.
pub fn rebuild(runner: &impl StageRunner, stages: &[Stage]) -> Vec<Stage> {
    let mut failed = Vec::new();
    for stage in stages {
        if let Err(err) = execute(&Plan::single(*stage), runner) {
            error!(%stage, error = %err, "rebuild failed");
            failed.push(*stage);
        }
    }
    failed
}

/// Consume watcher batches until the watcher stops.
///
/// Each batch is rebuilt on a blocking thread and nothing is cancelled.
/// Site generator runs still queue behind each other inside the runner.
pub async fn watch_and_rebuild<R>(
    runner: Arc<R>,
    rules: WatchRules,
    root: PathBuf,
    mut watcher: FileWatcher,
) where
    R: StageRunner + Send + 'static,
{
    while let Some(WatchEvent::Changed(paths)) = watcher.recv().await {
        let stages = rules.stages_for(&paths);
        if stages.is_empty() {
            continue;
        }
        print_rebuild(&root, &paths, &stages);
        let runner = Arc::clone(&runner);
        tokio::task::spawn_blocking(move || {
            rebuild(runner.as_ref(), &stages);
        });
    }
    info!("watcher stopped");
}
