//! Binds the stage catalogue to a project.
//!
//! [`Pipeline`] owns the loaded config, the resolved directory layout, and the
//! notifier every stage reports to. It implements [`StageRunner`], so any
//! [`Plan`](crate::plan::Plan) can be executed against it.
//!
//! One pipeline is shared by the initial build and every watch-triggered
//! rebuild. Site generator runs are serialized: a second trigger waits for
//! the running build to exit, then starts its own.

use crate::assets::{copy_fonts, copy_images, copy_src_root};
use crate::config::{Layout, PipelineConfig};
use crate::optimize::optimize;
use crate::plan::StageRunner;
use crate::reload::Notifier;
use crate::scripts::build_scripts;
use crate::stage::{Stage, StageError};
use crate::styles::compile_styles;
use crate::subprocess::SiteGenerator;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

pub struct Pipeline<N: Notifier> {
    config: PipelineConfig,
    layout: Layout,
    notifier: N,
    /// Held across each site generator run.
    site_lock: Mutex<()>,
}

impl<N: Notifier> Pipeline<N> {
    pub fn new(root: &Path, config: PipelineConfig, notifier: N) -> Self {
        let layout = Layout::resolve(root, &config.paths);
        Self {
            config,
            layout,
            notifier,
            site_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    fn site_generator(&self) -> SiteGenerator {
        SiteGenerator::from_config(&self.config.site, &self.config.paths, &self.layout.root)
    }

    fn build_site(&self, extra: &[String]) -> Result<(), StageError> {
        // The lock guards no data, so a poisoned one is still usable.
        let _running = self.site_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.site_generator().build(extra, &self.notifier)?;
        Ok(())
    }
}

impl<N: Notifier> StageRunner for Pipeline<N> {
    fn run_stage(&self, stage: Stage) -> Result<usize, StageError> {
        let layout = &self.layout;
        let notifier = &self.notifier;
        let files = match stage {
            Stage::Css => compile_styles(layout, &self.config.styles, notifier)?.len(),
            Stage::Js => build_scripts(layout, &self.config.scripts, notifier)?,
            Stage::Fonts => copy_fonts(layout, notifier)?,
            Stage::SrcRoot => copy_src_root(layout, notifier)?,
            Stage::Images => copy_images(layout, notifier)?,
            Stage::Hugo => {
                self.build_site(&[])?;
                0
            }
            Stage::HugoPreview => {
                self.build_site(&self.config.site.preview_args)?;
                0
            }
            Stage::Optimize => {
                optimize(layout, &self.config.optimize, notifier)?.files_written()
            }
        };
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Plan, execute};
    use crate::reload::ReloadEvent;
    use crate::subprocess::BUILD_FAILED_NOTICE;
    use crate::test_helpers::{RecordingNotifier, relative_files, write_file};
    use tempfile::TempDir;

    /// Config whose external tools are `sh -c` stand-ins.
    fn offline_config(site_exit: i32) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        config.site.program = "sh".into();
        config.site.args = vec!["-c".into(), format!("exit {}", site_exit)];
        config.site.preview_args = vec![];
        config.styles.command = vec!["sh".into(), "-c".into(), "exit 0".into()];
        config.scripts.command = vec!["sh".into(), "-c".into(), "exit 0".into()];
        config.optimize.svg_command = vec![];
        config.optimize.gif_command = vec![];
        config
    }

    #[test]
    fn copy_stages_dispatch_to_their_directories() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/fonts/a.woff2", "font");
        write_file(tmp.path(), "src/img/logo.svg", "<svg/>");
        write_file(tmp.path(), "src/robots.txt", "");

        let pipeline = Pipeline::new(
            tmp.path(),
            PipelineConfig::default(),
            RecordingNotifier::default(),
        );
        assert_eq!(pipeline.run_stage(Stage::Fonts).unwrap(), 1);
        assert_eq!(pipeline.run_stage(Stage::Images).unwrap(), 1);
        assert_eq!(pipeline.run_stage(Stage::SrcRoot).unwrap(), 1);
        assert_eq!(
            relative_files(&tmp.path().join("dist")),
            vec!["fonts/a.woff2", "img/logo.svg", "robots.txt"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn successful_site_build_reloads_once() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(tmp.path(), offline_config(0), RecordingNotifier::default());

        assert_eq!(pipeline.run_stage(Stage::Hugo).unwrap(), 0);
        assert_eq!(pipeline.notifier().events(), vec![ReloadEvent::Reload]);
    }

    #[cfg(unix)]
    #[test]
    fn failed_site_build_notifies_and_never_reloads() {
        let tmp = TempDir::new().unwrap();
        let pipeline = Pipeline::new(tmp.path(), offline_config(2), RecordingNotifier::default());

        let err = pipeline.run_stage(Stage::HugoPreview).unwrap_err();
        assert_eq!(err.to_string(), "Hugo build failed");
        assert_eq!(pipeline.notifier().reload_count(), 0);
        assert_eq!(
            pipeline.notifier().events(),
            vec![ReloadEvent::Notify {
                message: BUILD_FAILED_NOTICE.into()
            }]
        );
    }

    #[cfg(unix)]
    #[test]
    fn failed_site_build_stops_build_before_optimize() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "dist/index.html", r#"<img src="/img/a.jpg">"#);
        let pipeline = Pipeline::new(tmp.path(), offline_config(1), RecordingNotifier::default());

        let err = execute(&Plan::build(), &pipeline).unwrap_err();

        assert_eq!(err.skipped, vec![Stage::Optimize]);
        let html = std::fs::read_to_string(tmp.path().join("dist/index.html")).unwrap();
        assert!(!html.contains("srcset"));
    }

    #[cfg(unix)]
    #[test]
    fn concurrent_site_builds_run_one_at_a_time() {
        let tmp = TempDir::new().unwrap();
        let mut config = offline_config(0);
        // Fails if another run still holds the marker directory.
        config.site.args = vec![
            "-c".into(),
            "mkdir running || exit 9; sleep 0.3; rmdir running".into(),
        ];
        let pipeline = Pipeline::new(tmp.path(), config, RecordingNotifier::default());

        let results: Vec<Result<usize, StageError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2)
                .map(|_| scope.spawn(|| pipeline.run_stage(Stage::Hugo)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(results.iter().all(|r| r.is_ok()), "{results:?}");
        assert_eq!(pipeline.notifier().reload_count(), 2);
        assert!(!tmp.path().join("running").exists());
    }

    #[cfg(unix)]
    #[test]
    fn site_build_writes_to_configured_output() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "www/config.toml", "");
        let mut config = offline_config(0);
        config.paths.site = "www".into();
        config.paths.output = "public".into();
        // $1 and $2 are `-d <destination>`, resolved from the site directory.
        config.site.args = vec![
            "-c".into(),
            r#"cd www && mkdir -p "$2" && touch "$2/index.html""#.into(),
            "hugo".into(),
            "-d".into(),
            "{output}".into(),
        ];
        config.validate().unwrap();
        let pipeline = Pipeline::new(tmp.path(), config, RecordingNotifier::default());

        pipeline.run_stage(Stage::Hugo).unwrap();

        assert!(tmp.path().join("public/index.html").is_file());
        assert!(!tmp.path().join("dist").exists());
    }

    #[cfg(unix)]
    #[test]
    fn preview_build_completes_offline() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "src/css/main.css", "body {}");
        write_file(tmp.path(), "src/js/app.js", "entry");
        write_file(tmp.path(), "src/js/extra.js", "extra");

        let pipeline = Pipeline::new(tmp.path(), offline_config(0), RecordingNotifier::default());
        let reports = execute(&Plan::build_preview(), &pipeline).unwrap();

        assert_eq!(reports.len(), 6);
        assert!(
            relative_files(&tmp.path().join("dist")).contains(&"js/extra.js".to_string())
        );
    }
}
