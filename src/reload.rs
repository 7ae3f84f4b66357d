//! Browser notifications emitted by stages.
//!
//! Stages report what they changed through a [`Notifier`]. One-shot builds use
//! [`NullNotifier`]; the dev server uses a [`ReloadHub`], which fans events out
//! to every connected browser over a broadcast channel.
//!
//! | Call | Event | Browser reaction |
//! |---|---|---|
//! | `reload()` | [`ReloadEvent::Reload`] | full page reload |
//! | `inject(paths)`, all stylesheets | [`ReloadEvent::Inject`] | swap `<link>` hrefs in place |
//! | `inject(paths)`, anything else | [`ReloadEvent::Reload`] | full page reload |
//! | `notify(msg)` | [`ReloadEvent::Notify`] | banner, only if enabled |

use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use tracing::debug;

/// Buffered events per subscriber before slow browsers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// Message pushed to connected browsers, serialized as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadEvent {
    Reload,
    /// URL paths of stylesheets that changed.
    Inject { paths: Vec<String> },
    Notify { message: String },
}

pub trait Notifier: Send + Sync {
    /// Ask browsers for a full page reload.
    fn reload(&self);

    /// Report output files that changed.
    fn inject(&self, paths: &[PathBuf]);

    /// Show a short message in the browser.
    fn notify(&self, message: &str);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn reload(&self) {}
    fn inject(&self, _paths: &[PathBuf]) {}
    fn notify(&self, _message: &str) {}
}

/// Broadcasts [`ReloadEvent`]s to every subscribed browser connection.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
    output_root: PathBuf,
    show_notifications: bool,
}

impl ReloadHub {
    pub fn new(output_root: impl Into<PathBuf>, show_notifications: bool) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            output_root: output_root.into(),
            show_notifications,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    fn send(&self, event: ReloadEvent) {
        // No browser connected yet; nothing to do.
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            debug!(?event, "no reload subscribers");
        }
    }

    /// Decide how browsers should react to a set of changed output files.
    ///
    /// Returns `None` when nothing under the output root changed.
    pub fn event_for(&self, paths: &[PathBuf]) -> Option<ReloadEvent> {
        let urls: Vec<String> = paths
            .iter()
            .filter_map(|p| url_path(&self.output_root, p))
            .collect();
        if urls.is_empty() {
            return None;
        }
        if urls.iter().all(|u| u.ends_with(".css")) {
            Some(ReloadEvent::Inject { paths: urls })
        } else {
            Some(ReloadEvent::Reload)
        }
    }
}

impl Notifier for ReloadHub {
    fn reload(&self) {
        self.send(ReloadEvent::Reload);
    }

    fn inject(&self, paths: &[PathBuf]) {
        if let Some(event) = self.event_for(paths) {
            self.send(event);
        }
    }

    fn notify(&self, message: &str) {
        if self.show_notifications {
            self.send(ReloadEvent::Notify {
                message: message.to_string(),
            });
        }
    }
}

/// Map a file under `root` to its URL path (`dist/css/main.css` → `/css/main.css`).
fn url_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!("/{}", parts.join("/")))
}
