//! Track ownership, detection association and staff/customer classification.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::{ActivityConfig, ClassificationConfig, TrackingConfig, ValidationConfig};
use crate::tracker::activity::ActivityClassifier;
use crate::tracker::rect::{Point, Rect, distance};
use crate::tracker::track::Track;

/// One person detection in a frame. Ephemeral, not owned by the core.
#[derive(Debug, Clone, Copy)]
pub struct Detection {
    /// Bounding box of the detected person
    pub bbox: Rect,
    /// Detector confidence score
    pub score: f32,
}

impl Detection {
    /// Create a detection from corner coordinates (x1, y1, x2, y2).
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self { bbox, score }
    }
}

/// Owns every [`Track`] for the lifetime of a run.
///
/// Association is greedy and per-detection: each detection independently
/// picks its best-scoring track, and matched tracks stay in the candidate
/// pool for the rest of the frame. Two detections in one frame can therefore
/// land on the same track, with the later observation winning. This mirrors
/// the single-pass, online nature of the algorithm; no globally optimal
/// assignment is attempted.
pub struct TrackStore {
    tracks: BTreeMap<u64, Track>,
    next_track_id: u64,
    tracking: TrackingConfig,
    validation: ValidationConfig,
    classification: ClassificationConfig,
    activity: ActivityConfig,
}

impl TrackStore {
    pub fn new(
        tracking: TrackingConfig,
        validation: ValidationConfig,
        classification: ClassificationConfig,
        activity: ActivityConfig,
    ) -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_track_id: 1,
            tracking,
            validation,
            classification,
            activity,
        }
    }

    /// Reject detector noise before it pollutes tracking: slivers, blobs far
    /// outside the plausible person area band, and oversized false boxes.
    pub fn is_valid_person_box(&self, bbox: &Rect, frame_width: f32, frame_height: f32) -> bool {
        let v = &self.validation;
        if bbox.width < v.min_width || bbox.height < v.min_height {
            return false;
        }
        let area = bbox.area();
        if area < v.min_area || area > v.max_area {
            return false;
        }
        if bbox.height > 0.0 {
            let aspect = bbox.aspect_ratio();
            if aspect < v.min_aspect_ratio || aspect > v.max_aspect_ratio {
                return false;
            }
        }
        if area > frame_width * frame_height * v.max_frame_area_fraction {
            return false;
        }
        true
    }

    /// Find the best-matching existing track for a detection, if any clears
    /// the acceptance threshold.
    ///
    /// Score is `0.7·IoU + 0.3·(1 − d/max_dist)` with the radius and time gap
    /// chosen per candidate by its staff status, and a 1.2 bias keeping staff
    /// identity sticky through merges and occlusions. Ties keep the lowest
    /// track id.
    pub fn associate(&self, bbox: &Rect, position: Point, time: f64) -> Option<u64> {
        let mut best: Option<(u64, f32)> = None;

        for (&id, track) in &self.tracks {
            let (max_dist, max_gap) = if track.is_staff_like() {
                (
                    self.tracking.max_distance_staff,
                    self.tracking.max_time_gap_staff,
                )
            } else {
                (
                    self.tracking.max_distance_customer,
                    self.tracking.max_time_gap_customer,
                )
            };

            if time - track.last_seen > max_gap {
                continue;
            }
            let dist = distance(position, track.last_position);
            if dist > max_dist {
                continue;
            }

            let iou = bbox.iou(&track.last_box);
            let dist_score = (1.0 - dist / max_dist).max(0.0);
            let mut score =
                iou * self.tracking.iou_weight + dist_score * self.tracking.distance_weight;
            if track.is_staff_like() {
                score *= self.tracking.staff_score_bias;
            }

            if best.is_none_or(|(_, s)| score > s) {
                best = Some((id, score));
            }
        }

        let (id, score) = best?;
        let threshold = if self.tracks.get(&id).is_some_and(Track::is_staff_like) {
            self.tracking.staff_match_threshold
        } else {
            self.tracking.match_threshold
        };
        (score > threshold).then_some(id)
    }

    /// Fold one validated detection into the store and return its track id.
    ///
    /// Performs association (minting a new id when nothing matches), then the
    /// classification, activity, zone and motion updates for that track.
    pub fn observe(
        &mut self,
        bbox: Rect,
        position: Point,
        in_zone: bool,
        time: f64,
        past_startup: bool,
    ) -> u64 {
        let track_id = match self.associate(&bbox, position, time) {
            Some(id) => id,
            None => self.spawn_track(bbox, position, time),
        };

        if let Some(track) = self.tracks.get_mut(&track_id) {
            // Readiness is judged against first_seen before this observation
            // is folded in: a brand-new track is never ready on its creation
            // frame.
            if time - track.first_seen >= self.classification.person_grace_period_secs {
                track.grace_period_active = false;
                track.classification_ready = true;
            }

            Self::update_classification(track, &self.classification, track_id, in_zone, time);

            if track.is_staff_like() {
                let activity_config = self.activity.clone();
                let classifier = track
                    .activity
                    .get_or_insert_with(|| ActivityClassifier::new(activity_config));
                track.current_activity = classifier.update(position, time);
            }

            if !track.is_staff && past_startup && track.classification_ready {
                track.show_label = true;
            }

            if in_zone {
                track.frames_in_zone += 1;
                track.currently_in_zone = true;
                track.ever_in_zone = true;
            } else {
                track.currently_in_zone = false;
            }

            Self::update_motion(track, position);

            track.appearances += 1;
            track.last_seen = time;
            track.last_position = position;
            track.last_box = bbox;
        }

        track_id
    }

    fn spawn_track(&mut self, bbox: Rect, position: Point, time: f64) -> u64 {
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.tracks.insert(id, Track::new(id, bbox, position, time));
        debug!(track_id = id, time, "new track");
        id
    }

    fn update_classification(
        track: &mut Track,
        config: &ClassificationConfig,
        track_id: u64,
        in_zone: bool,
        time: f64,
    ) {
        if in_zone {
            track.consecutive_high_coverage += 1;
            track.consecutive_low_coverage = 0;
        } else {
            track.consecutive_high_coverage = 0;
            track.consecutive_low_coverage += 1;
        }

        if track.consecutive_high_coverage >= config.staff_consistent_frames
            && !track.is_staff
            && track.classification_ready
        {
            track.is_staff = true;
            track.was_staff = true;
            track.show_label = true;
            track.staff_confirmed_at = Some(time);
            info!(track_id, time, "track confirmed as staff");
        }

        if track.is_staff && config.permanent_staff_classification {
            // Permanent policy: confirmed staff never revert.
        } else if track.was_staff
            && !track.is_staff
            && track.consecutive_high_coverage >= config.staff_consistent_frames
        {
            // Re-promotion path for a lapsed staff track; unreachable while
            // the permanent policy is active.
            track.is_staff = true;
        }
    }

    fn update_motion(track: &mut Track, position: Point) {
        track.speed = match track.prev_position {
            Some(prev) => distance(position, prev),
            None => 0.0,
        };
        track.prev_position = Some(position);
    }

    /// Look up a track by id.
    pub fn get(&self, track_id: u64) -> Option<&Track> {
        self.tracks.get(&track_id)
    }

    /// Mutable lookup, used by the group hysteresis commit.
    pub fn get_mut(&mut self, track_id: u64) -> Option<&mut Track> {
        self.tracks.get_mut(&track_id)
    }

    /// All tracks in ascending id order.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Mutable iteration in ascending id order.
    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerConfig;

    fn store() -> TrackStore {
        let config = AnalyzerConfig::default();
        TrackStore::new(
            config.tracking,
            config.validation,
            config.classification,
            config.activity,
        )
    }

    fn person_box(x: f32, y: f32) -> Rect {
        Rect::from_tlbr(x, y, x + 40.0, y + 80.0)
    }

    #[test]
    fn test_rejects_undersized_boxes() {
        let store = store();
        assert!(!store.is_valid_person_box(&Rect::from_tlbr(0.0, 0.0, 10.0, 80.0), 640.0, 480.0));
        assert!(!store.is_valid_person_box(&Rect::from_tlbr(0.0, 0.0, 40.0, 20.0), 640.0, 480.0));
    }

    #[test]
    fn test_rejects_bad_aspect_ratio() {
        let store = store();
        // Wider than tall beyond 2.0
        assert!(!store.is_valid_person_box(&Rect::from_tlbr(0.0, 0.0, 200.0, 40.0), 640.0, 480.0));
        // Far too narrow
        assert!(!store.is_valid_person_box(&Rect::from_tlbr(0.0, 0.0, 20.0, 120.0), 640.0, 480.0));
    }

    #[test]
    fn test_rejects_boxes_dominating_the_frame() {
        let store = store();
        let big = Rect::from_tlbr(0.0, 0.0, 300.0, 400.0);
        assert!(store.is_valid_person_box(&big, 1920.0, 1080.0));
        assert!(!store.is_valid_person_box(&big, 500.0, 400.0));
    }

    #[test]
    fn test_accepts_normal_person_box() {
        let store = store();
        assert!(store.is_valid_person_box(&person_box(100.0, 100.0), 640.0, 480.0));
    }

    #[test]
    fn test_track_ids_monotonic() {
        let mut store = store();
        let a = store.observe(person_box(0.0, 0.0), (20.0, 40.0), false, 0.1, false);
        let b = store.observe(person_box(300.0, 0.0), (320.0, 40.0), false, 0.1, false);
        let c = store.observe(person_box(0.0, 300.0), (20.0, 340.0), false, 0.1, false);
        assert_eq!((a, b, c), (1, 2, 3));
    }

    #[test]
    fn test_association_prefers_higher_score() {
        let mut store = store();
        let a = store.observe(person_box(80.0, 80.0), (100.0, 120.0), false, 0.1, false);
        let b = store.observe(person_box(380.0, 380.0), (400.0, 420.0), false, 0.1, false);
        assert_ne!(a, b);

        // Close to A, far from B: must land on A
        let matched = store.observe(person_box(85.0, 85.0), (105.0, 125.0), false, 0.2, false);
        assert_eq!(matched, a);
    }

    #[test]
    fn test_no_match_below_threshold_mints_new_id() {
        let mut store = store();
        store.observe(person_box(0.0, 0.0), (20.0, 40.0), false, 0.1, false);

        // Within the customer radius but with zero IoU and a weak distance
        // score: 0.3·(1 − 70/80) ≈ 0.04 < 0.3
        let id = store.observe(person_box(70.0, 0.0), (90.0, 40.0), false, 0.2, false);
        assert_eq!(id, 2);
    }

    #[test]
    fn test_staff_promotion_after_grace_and_streak() {
        let mut store = store();
        let bbox = person_box(100.0, 100.0);
        let center = bbox.center();

        let mut id = 0;
        for frame in 1..=12 {
            let time = frame as f64 / 30.0;
            id = store.observe(bbox, center, true, time, frame > 9);
        }
        let track = store.get(id).unwrap();
        assert!(track.is_staff);
        assert!(track.was_staff);
        assert!(track.show_label);
        assert!(track.staff_confirmed_at.is_some());
        assert_eq!(track.frames_in_zone, 12);
        assert!(track.ever_in_zone);
    }

    #[test]
    fn test_staff_classification_is_sticky() {
        let mut store = store();
        let bbox = person_box(100.0, 100.0);
        let center = bbox.center();

        let mut id = 0;
        for frame in 1..=12 {
            id = store.observe(bbox, center, true, frame as f64 / 30.0, frame > 9);
        }
        assert!(store.get(id).unwrap().is_staff);

        // Long stretch out of the zone: classification must not revert
        for frame in 13..=60 {
            let out = store.observe(bbox, center, false, frame as f64 / 30.0, true);
            assert_eq!(out, id);
        }
        let track = store.get(id).unwrap();
        assert!(track.is_staff);
        assert!(track.was_staff);
        assert_eq!(track.consecutive_low_coverage, 48);
    }

    #[test]
    fn test_no_promotion_during_grace_period() {
        let mut store = store();
        let bbox = person_box(100.0, 100.0);
        let center = bbox.center();

        // Three in-zone frames well inside the grace window
        let mut id = 0;
        for frame in 1..=3 {
            id = store.observe(bbox, center, true, frame as f64 / 30.0, false);
        }
        let track = store.get(id).unwrap();
        assert!(!track.is_staff);
        assert!(track.grace_period_active);
        assert_eq!(track.consecutive_high_coverage, 3);
    }

    #[test]
    fn test_customer_show_label_needs_startup_and_readiness() {
        let mut store = store();
        let bbox = person_box(100.0, 100.0);
        let center = bbox.center();

        let id = store.observe(bbox, center, false, 1.0 / 30.0, false);
        assert!(!store.get(id).unwrap().show_label);

        // Past startup but still within the per-track grace period
        store.observe(bbox, center, false, 2.0 / 30.0, true);
        assert!(!store.get(id).unwrap().show_label);

        // Grace elapsed
        store.observe(bbox, center, false, 0.4, true);
        assert!(store.get(id).unwrap().show_label);
    }

    #[test]
    fn test_speed_tracks_centroid_delta() {
        let mut store = store();
        let id = store.observe(person_box(0.0, 0.0), (20.0, 40.0), false, 0.1, false);
        assert_eq!(store.get(id).unwrap().speed, 0.0);

        store.observe(person_box(3.0, 4.0), (23.0, 44.0), false, 0.2, false);
        assert!((store.get(id).unwrap().speed - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_staff_gets_larger_association_radius() {
        let mut store = store();
        let bbox = person_box(100.0, 100.0);
        let center = bbox.center();
        let mut id = 0;
        for frame in 1..=12 {
            id = store.observe(bbox, center, true, frame as f64 / 30.0, frame > 9);
        }
        assert!(store.get(id).unwrap().is_staff);

        // A 40 px jump with zero IoU matches on the staff radius and bias
        // alone: 1.2·0.3·(1 − 40/150) ≈ 0.264 > 0.2. The same jump against a
        // customer track would score 0.3·(1 − 40/80) = 0.15 < 0.3 and miss.
        let jumped = store.observe(person_box(140.0, 100.0), (160.0, 140.0), true, 0.5, true);
        assert_eq!(jumped, id);
    }
}
