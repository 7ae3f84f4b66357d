//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the optimize stage
//! needs: identify and resize. The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::ResizePlan;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can be shared across rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source once and write every variant of the plan.
    fn resize(&self, plan: &ResizePlan) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use std::sync::Mutex;

    /// Mock backend that records operations without executing them.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub dimensions: Mutex<Vec<Dimensions>>,
        pub operations: Mutex<Vec<RecordedOp>>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Identify(String),
        Resize {
            source: String,
            /// `(output, width, height)` per variant.
            variants: Vec<(String, u32, u32)>,
            quality: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        /// Dimensions are popped from the end, one per `identify` call.
        pub fn with_dimensions(dims: Vec<Dimensions>) -> Self {
            Self {
                dimensions: Mutex::new(dims),
                operations: Mutex::new(Vec::new()),
            }
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }
    }

    impl ImageBackend for MockBackend {
        fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Identify(path.to_string_lossy().to_string()));

            self.dimensions
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| BackendError::ProcessingFailed("No mock dimensions".to_string()))
        }

        fn resize(&self, plan: &ResizePlan) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Resize {
                source: plan.source.to_string_lossy().to_string(),
                variants: plan
                    .variants
                    .iter()
                    .map(|v| (v.output.to_string_lossy().to_string(), v.width, v.height))
                    .collect(),
                quality: plan.quality.value(),
            });
            Ok(())
        }
    }

    #[test]
    fn mock_records_identify() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 800,
            height: 600,
        }]);

        let result = backend.identify(Path::new("/test/image.jpg")).unwrap();
        assert_eq!(result.width, 800);
        assert_eq!(result.height, 600);

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Identify(p) if p == "/test/image.jpg"));
    }

    #[test]
    fn mock_identify_without_dimensions_errors() {
        let backend = MockBackend::new();
        assert!(backend.identify(Path::new("/x.png")).is_err());
    }

    #[test]
    fn mock_records_resize_plan() {
        let backend = MockBackend::new();
        backend
            .resize(&ResizePlan {
                source: "/img/a.jpg".into(),
                variants: vec![crate::imaging::params::VariantParams {
                    output: "/img/a@2x.jpg".into(),
                    width: 2340,
                    height: 1560,
                }],
                quality: Quality::new(80),
            })
            .unwrap();

        assert_eq!(
            backend.get_operations(),
            vec![RecordedOp::Resize {
                source: "/img/a.jpg".into(),
                variants: vec![("/img/a@2x.jpg".into(), 2340, 1560)],
                quality: 80,
            }]
        );
    }
}
