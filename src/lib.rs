//! # site-pipeline
//!
//! The asset pipeline of a Hugo site. Stylesheets, scripts, fonts, and images
//! are built next to the site generator's output in `dist/`, and a dev server
//! serves the result with live reload.
//!
//! # Architecture: Stages and Plans
//!
//! Every unit of work is a named [`stage::Stage`]. Commands run fixed
//! [`plan::Plan`]s: steps of stages, where the stages inside one step run in
//! parallel and the next step waits for all of them.
//!
//! ```text
//! build          [css js fonts src-root images hugo] → optimize
//! build-preview  [css js fonts src-root images hugo-preview]
//! server         [hugo css js fonts src-root images] → serve + watch
//! ```
//!
//! The heavy lifting is delegated. Styles go through the style CLI, scripts
//! through the bundler, the site through `hugo`, and SVG/GIF files through
//! their optimizers. This crate owns the ordering, the file selection, the
//! responsive image variants, and the reload signalling.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`stage`] | Stage catalogue, `StageError`, `StageReport` |
//! | [`plan`] | Plans, steps, and the parallel step executor |
//! | [`pipeline`] | Binds config + layout + notifier; dispatches stages |
//! | [`subprocess`] | External tool runner and the site generator's exit mapping |
//! | [`assets`] | Verbatim copy stages (`fonts`, `src-root`, `images`, `js` copy half) |
//! | [`styles`] | `css` stage |
//! | [`scripts`] | `js` stage |
//! | [`optimize`] | Production image pass: variants, vector/GIF optimizers, `srcset` |
//! | [`imaging`] | Pure-Rust resize and encode for the raster pass |
//! | [`srcset`] | `srcset` rewriting of generated HTML |
//! | [`reload`] | `Notifier` trait and the broadcast `ReloadHub` |
//! | [`server`] | axum dev server with the live-reload client |
//! | [`watch`] | Debounced watcher mapping changed paths to stages |
//! | [`config`] | `pipeline.toml` loading, merging, and validation |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Notifiers Instead of a Global Browser Handle
//!
//! Stages never talk to the dev server directly. They report through a
//! [`reload::Notifier`]: one-shot builds pass a no-op notifier, the server
//! passes a [`reload::ReloadHub`]. Tests pass a recorder and assert on exactly
//! which reloads and notices a stage sent.
//!
//! ## Failures Finish the Step
//!
//! When one stage of a parallel step fails, its siblings are not interrupted.
//! They finish, all failures are reported together, and no later step runs.
//! A failed `hugo` therefore never lets `optimize` rewrite a stale `dist/`.

pub mod assets;
pub mod config;
pub mod imaging;
pub mod optimize;
pub mod output;
pub mod pipeline;
pub mod plan;
pub mod reload;
pub mod scripts;
pub mod server;
pub mod srcset;
pub mod stage;
pub mod styles;
pub mod subprocess;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
