//! Pipeline bundling a detection backend with the frame orchestrator.

use crate::analyzer::orchestrator::{FrameOrchestrator, FrameSummary};
use crate::analyzer::report::AnalysisReport;
use crate::analyzer::source::DetectionSource;

/// End-to-end analysis pipeline: detection inference plus tracking.
///
/// Any detector error aborts the run; the pipeline surfaces it unchanged and
/// never returns partial results for the failing frame.
pub struct AnalyzerPipeline<D: DetectionSource> {
    detector: D,
    orchestrator: FrameOrchestrator,
}

impl<D: DetectionSource> AnalyzerPipeline<D> {
    /// Create a pipeline from a detector and a configured orchestrator.
    pub fn new(detector: D, orchestrator: FrameOrchestrator) -> Self {
        Self {
            detector,
            orchestrator,
        }
    }

    /// Run detection on one frame and fold the results into the analysis.
    pub fn process_frame(
        &mut self,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<FrameSummary, D::Error> {
        let detections = self.detector.detect(input, width, height)?;
        Ok(self
            .orchestrator
            .process_frame(&detections, width as f32, height as f32))
    }

    /// Finish the run and build the final report.
    pub fn finish(self) -> AnalysisReport {
        self.orchestrator.finish()
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying orchestrator.
    pub fn orchestrator(&self) -> &FrameOrchestrator {
        &self.orchestrator
    }

    /// Get a mutable reference to the underlying orchestrator.
    pub fn orchestrator_mut(&mut self) -> &mut FrameOrchestrator {
        &mut self.orchestrator
    }
}
