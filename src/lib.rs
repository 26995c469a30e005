//! Staff/customer analytics over per-frame person detections.
//!
//! Given a stream of bounding-box detections from a video, this crate builds
//! a temporally consistent account of who was present, whether each person
//! was staff or customer, how active staff were, and which customers
//! clustered into groups. Detection inference, video decode and rendering
//! are external collaborators; the crate owns the stateful tracking core:
//!
//! - [`TrackStore`] associates detections to persistent identities and runs
//!   the hysteresis-gated staff/customer classifier.
//! - [`tracker::ActivityClassifier`] is a per-staff-track active/inactive
//!   state machine with asymmetric confirmation windows.
//! - [`GroupTracker`] clusters browsing customers on a degree-limited
//!   proximity graph and carries group identity across frames.
//! - [`FrameOrchestrator`] drives the per-frame sequence and produces a
//!   per-second timeline plus the end-of-run [`AnalysisReport`].
//!
//! Processing is single-threaded and strictly frame-ordered: every update
//! for frame *n* completes before frame *n+1* is accepted.

pub mod analyzer;
pub mod config;
pub mod error;
pub mod tracker;

pub use analyzer::{
    AnalysisReport, AnalyzerPipeline, DetectionBuilder, DetectionSource, FrameOrchestrator,
    FrameSummary, GroupReport, TimelineSample, TrackView,
};
pub use config::AnalyzerConfig;
pub use error::Error;
pub use tracker::{Activity, Detection, GroupTracker, Rect, Track, TrackStore};
