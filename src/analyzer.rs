mod orchestrator;
mod pipeline;
mod report;
mod source;

pub use orchestrator::{FrameOrchestrator, FrameSummary, ProgressSink, TrackView};
pub use pipeline::AnalyzerPipeline;
pub use report::{AnalysisReport, GroupReport, TimelineSample};
pub use source::{DetectionBuilder, DetectionSource};
