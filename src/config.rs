//! Immutable configuration for the analysis components.
//!
//! Each component receives only the section it reads: the orchestrator never
//! hands zone thresholds to the group tracker, and vice versa. Defaults match
//! the tuning the analyzer ships with.

use serde::{Deserialize, Serialize};

/// Geometric filters applied to raw detections before tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum box width in pixels
    pub min_width: f32,
    /// Minimum box height in pixels
    pub min_height: f32,
    /// Minimum box area in square pixels
    pub min_area: f32,
    /// Maximum box area in square pixels
    pub max_area: f32,
    /// Minimum width/height aspect ratio
    pub min_aspect_ratio: f32,
    /// Maximum width/height aspect ratio
    pub max_aspect_ratio: f32,
    /// Maximum fraction of the frame a single box may cover
    pub max_frame_area_fraction: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_width: 20.0,
            min_height: 30.0,
            min_area: 800.0,
            max_area: 200_000.0,
            min_aspect_ratio: 0.25,
            max_aspect_ratio: 2.0,
            max_frame_area_fraction: 0.5,
        }
    }
}

/// Detection-to-track association parameters.
///
/// Staff tracks get a larger spatial radius and temporal gap than customers:
/// staff cover a larger area and are occluded more often behind counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Maximum centroid distance for customer candidates (px)
    pub max_distance_customer: f32,
    /// Maximum centroid distance for staff candidates (px)
    pub max_distance_staff: f32,
    /// Maximum time since last seen for customer candidates (s)
    pub max_time_gap_customer: f64,
    /// Maximum time since last seen for staff candidates (s)
    pub max_time_gap_staff: f64,
    /// Weight of box IoU in the combined score
    pub iou_weight: f32,
    /// Weight of the normalized distance term in the combined score
    pub distance_weight: f32,
    /// Multiplier applied to staff/ex-staff candidate scores
    pub staff_score_bias: f32,
    /// Score a non-staff best candidate must exceed to match
    pub match_threshold: f32,
    /// Score a staff/ex-staff best candidate must exceed to match
    pub staff_match_threshold: f32,
    /// Tracks seen fewer times than this are dropped from the report as noise
    pub min_appearances: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            max_distance_customer: 80.0,
            max_distance_staff: 150.0,
            max_time_gap_customer: 5.0,
            max_time_gap_staff: 30.0,
            iou_weight: 0.7,
            distance_weight: 0.3,
            staff_score_bias: 1.2,
            match_threshold: 0.3,
            staff_match_threshold: 0.2,
            min_appearances: 2,
        }
    }
}

/// Staff-zone geometry parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Fraction of the sampled body grid that must fall inside the zone
    pub coverage_threshold: f32,
    /// Side length of the sampling grid laid over each box
    pub coverage_grid: usize,
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            coverage_threshold: 0.75,
            coverage_grid: 10,
        }
    }
}

/// Staff/customer classification parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Consecutive high-coverage frames required to confirm staff
    pub staff_consistent_frames: u32,
    /// When true, a confirmed staff track never reverts to customer
    pub permanent_staff_classification: bool,
    /// Seconds at the start of the run during which nothing is reported
    pub startup_grace_period_secs: f64,
    /// Seconds after a track first appears before it may be classified
    pub person_grace_period_secs: f64,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            staff_consistent_frames: 3,
            permanent_staff_classification: true,
            startup_grace_period_secs: 0.3,
            person_grace_period_secs: 0.3,
        }
    }
}

/// Motion-based activity state machine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityConfig {
    /// Number of recent positions kept per track
    pub window_frames: usize,
    /// Per-frame movement (px) above which a frame counts as active
    pub movement_threshold: f32,
    /// Consecutive moving frames required to confirm `active`
    pub active_confirmation_frames: u32,
    /// Consecutive still frames required to confirm `inactive`
    pub inactive_confirmation_frames: u32,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window_frames: 15,
            movement_threshold: 3.0,
            active_confirmation_frames: 2,
            inactive_confirmation_frames: 8,
        }
    }
}

/// Customer group clustering and continuity parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupConfig {
    /// Maximum distance between linked neighbours (px)
    pub link_distance_px: f32,
    /// Each track links to at most this many nearest neighbours
    pub max_neighbors: usize,
    /// Seconds a track must have existed before it may cluster
    pub min_time_before_group_secs: f64,
    /// Maximum per-frame speed (px) for a track to cluster
    pub speed_threshold_px: f32,
    /// Consecutive clustered frames before membership is committed
    pub join_frames: u32,
    /// Consecutive unclustered frames before membership is cleared
    pub leave_frames: u32,
    /// Maximum centroid distance when matching groups across frames (px)
    pub match_distance_px: f32,
    /// Minimum component size that counts as a group
    pub min_size: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            link_distance_px: 80.0,
            max_neighbors: 2,
            min_time_before_group_secs: 4.5,
            speed_threshold_px: 6.0,
            join_frames: 12,
            leave_frames: 12,
            match_distance_px: 140.0,
            min_size: 2,
        }
    }
}

/// Top-level configuration bundling every component section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub validation: ValidationConfig,
    pub tracking: TrackingConfig,
    pub zone: ZoneConfig,
    pub classification: ClassificationConfig,
    pub activity: ActivityConfig,
    pub group: GroupConfig,
}
