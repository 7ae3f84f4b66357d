//! Shared test utilities.
//!
//! Provides project fixture writers, synthetic images, and a notifier that
//! records what stages reported.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! write_file(tmp.path(), "src/fonts/body.woff2", "font");
//!
//! let notifier = RecordingNotifier::default();
//! copy_fonts(&layout, &notifier).unwrap();
//!
//! assert_eq!(relative_files(&tmp.path().join("dist")), vec!["fonts/body.woff2"]);
//! assert_eq!(notifier.inject_batches(), 1);
//! ```

use crate::reload::{Notifier, ReloadEvent};
use image::{ImageEncoder, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use walkdir::WalkDir;

// =========================================================================
// Project fixtures
// =========================================================================

/// Write `contents` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// Every file under `dir` as a sorted, `/`-separated relative path.
/// Empty when `dir` does not exist.
pub fn relative_files(dir: &Path) -> Vec<String> {
    if !dir.exists() {
        return Vec::new();
    }
    let mut files: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(dir)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect();
    files.sort();
    files
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let writer = std::io::BufWriter::new(fs::File::create(path).unwrap());
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small valid PNG file (with alpha) with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, 255])
    });
    let writer = std::io::BufWriter::new(fs::File::create(path).unwrap());
    image::codecs::png::PngEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
}

// =========================================================================
// Notifications
// =========================================================================

/// Records every notification in call order.
/// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ReloadEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ReloadEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn reload_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ReloadEvent::Reload))
            .count()
    }

    pub fn inject_batches(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ReloadEvent::Inject { .. }))
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn reload(&self) {
        self.events.lock().unwrap().push(ReloadEvent::Reload);
    }

    fn inject(&self, paths: &[PathBuf]) {
        self.events.lock().unwrap().push(ReloadEvent::Inject {
            paths: paths.iter().map(|p| p.display().to_string()).collect(),
        });
    }

    fn notify(&self, message: &str) {
        self.events.lock().unwrap().push(ReloadEvent::Notify {
            message: message.to_string(),
        });
    }
}
