//! Durable per-person identity record.

use serde::Serialize;

use crate::tracker::activity::ActivityClassifier;
use crate::tracker::rect::{Point, Rect};

/// Motion-derived activity label for a staff track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// Not enough observations to seed the state machine yet
    #[default]
    Initializing,
    /// Moving above the movement threshold
    Active,
    /// Confirmed still
    Inactive,
}

impl Activity {
    /// Lowercase label for overlays and reports.
    pub fn label(&self) -> &'static str {
        match self {
            Activity::Initializing => "initializing",
            Activity::Active => "active",
            Activity::Inactive => "inactive",
        }
    }
}

/// The durable identity record for one observed person.
///
/// A track id is assigned exactly once, at the first unmatched detection, and
/// never reused. `was_staff` is sticky: once set it is never cleared, and
/// under the permanent classification policy `is_staff` never reverts either.
#[derive(Debug, Clone)]
pub struct Track {
    /// Unique, monotonically increasing identifier
    pub track_id: u64,
    /// Time of the first observation (s)
    pub first_seen: f64,
    /// Time of the most recent observation (s)
    pub last_seen: f64,
    /// Number of observations folded into this track
    pub appearances: u32,
    /// Most recent detection box
    pub last_box: Rect,
    /// Most recent centroid
    pub last_position: Point,
    /// Centroid of the observation before the current one
    pub prev_position: Option<Point>,
    /// Instantaneous speed (px/frame)
    pub speed: f32,
    /// Total observations with sufficient zone coverage
    pub frames_in_zone: u32,
    /// Whether the latest observation was in the zone
    pub currently_in_zone: bool,
    /// Whether any observation was ever in the zone
    pub ever_in_zone: bool,
    /// Consecutive observations at or above the coverage threshold
    pub consecutive_high_coverage: u32,
    /// Consecutive observations below the coverage threshold
    pub consecutive_low_coverage: u32,
    /// Current staff classification
    pub is_staff: bool,
    /// Sticky staff flag, never cleared once set
    pub was_staff: bool,
    /// Whether the per-track grace period has elapsed
    pub classification_ready: bool,
    /// Inverse of `classification_ready`, kept for the per-frame view
    pub grace_period_active: bool,
    /// Whether the track is mature enough to report
    pub show_label: bool,
    /// Time staff classification was confirmed, if ever
    pub staff_confirmed_at: Option<f64>,
    /// Motion state machine, created on the first staff observation
    pub activity: Option<ActivityClassifier>,
    /// Latest activity label
    pub current_activity: Activity,
    /// Committed group membership
    pub group_id: Option<u64>,
    /// Size of the committed group (1 when single)
    pub group_size: usize,
    /// Consecutive frames clustered, pending commit
    pub group_join_count: u32,
    /// Consecutive frames unclustered, pending clear
    pub group_leave_count: u32,
    /// Total frames spent in a committed group
    pub group_frames_total: u32,
}

impl Track {
    /// Create a track from its first observation.
    pub fn new(track_id: u64, bbox: Rect, position: Point, time: f64) -> Self {
        Self {
            track_id,
            first_seen: time,
            last_seen: time,
            appearances: 0,
            last_box: bbox,
            last_position: position,
            prev_position: None,
            speed: 0.0,
            frames_in_zone: 0,
            currently_in_zone: false,
            ever_in_zone: false,
            consecutive_high_coverage: 0,
            consecutive_low_coverage: 0,
            is_staff: false,
            was_staff: false,
            classification_ready: false,
            grace_period_active: true,
            show_label: false,
            staff_confirmed_at: None,
            activity: None,
            current_activity: Activity::Initializing,
            group_id: None,
            group_size: 1,
            group_join_count: 0,
            group_leave_count: 0,
            group_frames_total: 0,
        }
    }

    /// Staff or ex-staff: the sticky class used by association and activity.
    #[inline]
    pub fn is_staff_like(&self) -> bool {
        self.is_staff || self.was_staff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_track_defaults() {
        let track = Track::new(7, Rect::from_tlbr(0.0, 0.0, 40.0, 80.0), (20.0, 40.0), 1.5);
        assert_eq!(track.track_id, 7);
        assert_eq!(track.first_seen, 1.5);
        assert!(track.grace_period_active);
        assert!(!track.is_staff_like());
        assert_eq!(track.group_size, 1);
        assert_eq!(track.current_activity, Activity::Initializing);
    }

    #[test]
    fn test_activity_labels() {
        assert_eq!(Activity::Active.label(), "active");
        assert_eq!(Activity::Inactive.label(), "inactive");
        assert_eq!(Activity::default().label(), "initializing");
    }
}
