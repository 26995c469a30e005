//! Crate error type.

use thiserror::Error;

/// Errors surfaced when constructing the analysis pipeline.
///
/// The per-frame path itself never fails: invalid detections are dropped and
/// an empty frame is simply "no detections". Detector backend failures
/// propagate through [`crate::AnalyzerPipeline`] as the backend's own error.
#[derive(Debug, Error)]
pub enum Error {
    /// The staff zone polygon has fewer than three vertices.
    #[error("staff zone polygon needs at least 3 vertices, got {0}")]
    DegenerateZone(usize),

    /// The video frame rate is zero or negative.
    #[error("frame rate must be positive, got {0}")]
    InvalidFrameRate(f64),
}
