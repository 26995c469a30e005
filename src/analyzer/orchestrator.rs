//! Per-frame orchestration: drives geometry, tracking, activity and grouping
//! in order, and accumulates the timeline and end-of-run summary.

use std::collections::BTreeMap;

use tracing::info;

use crate::analyzer::report::{AnalysisReport, GroupReport, TimelineSample, format_clock, round1};
use crate::config::AnalyzerConfig;
use crate::error::Error;
use crate::tracker::{Activity, Detection, GroupTracker, Point, Rect, TrackStore, body_coverage};

/// Progress callback invoked at a fixed frame cadence with
/// `(current_frame, total_frames)`.
pub type ProgressSink = Box<dyn FnMut(u64, u64)>;

const PROGRESS_CADENCE: u64 = 30;

/// Render-facing view of one visible track in the current frame.
#[derive(Debug, Clone)]
pub struct TrackView {
    pub track_id: u64,
    pub bbox: Rect,
    pub is_staff: bool,
    /// Activity label; meaningful for staff tracks only
    pub activity: Activity,
    pub group_id: Option<u64>,
    pub group_size: usize,
}

impl TrackView {
    /// Overlay label for the track's group membership, e.g. `G3 (2)`.
    pub fn group_label(&self) -> String {
        match self.group_id {
            Some(gid) => format!("G{} ({})", gid, self.group_size),
            None => "Single".to_string(),
        }
    }
}

/// Everything a renderer or caller needs about one processed frame.
#[derive(Debug, Clone, Default)]
pub struct FrameSummary {
    /// Video time of this frame (s)
    pub time: f64,
    /// Visible tracks in ascending id order
    pub tracks: Vec<TrackView>,
    pub active_staff: u32,
    pub inactive_staff: u32,
    pub customers: u32,
}

/// Per-frame facts captured at observation time. Later detections matching
/// the same track overwrite earlier ones, like the greedy association allows.
struct FrameObservation {
    bbox: Rect,
    is_staff: bool,
    show_label: bool,
    in_grace: bool,
    activity: Activity,
}

/// Drives the per-frame sequence and owns all run state.
///
/// Strictly sequential: every state update for frame *n* completes before
/// frame *n+1* is accepted, since counters, hysteresis and speed all depend
/// on time-ordered deltas.
pub struct FrameOrchestrator {
    config: AnalyzerConfig,
    zone: Vec<Point>,
    fps: f64,
    startup_grace_frames: u64,
    store: TrackStore,
    groups: GroupTracker,
    timeline: Vec<TimelineSample>,
    frame_id: u64,
    last_time: f64,
    last_timeline_sec: i64,
    max_frames: Option<u64>,
    total_frames: u64,
    progress: Option<ProgressSink>,
}

impl FrameOrchestrator {
    /// Create an orchestrator for a run over a video with the given staff
    /// zone polygon and frame rate.
    pub fn new(zone: Vec<Point>, fps: f64, config: AnalyzerConfig) -> Result<Self, Error> {
        if zone.len() < 3 {
            return Err(Error::DegenerateZone(zone.len()));
        }
        if fps <= 0.0 {
            return Err(Error::InvalidFrameRate(fps));
        }

        let startup_grace_frames =
            (fps * config.classification.startup_grace_period_secs) as u64;
        let store = TrackStore::new(
            config.tracking.clone(),
            config.validation.clone(),
            config.classification.clone(),
            config.activity.clone(),
        );
        let groups = GroupTracker::new(config.group.clone());

        Ok(Self {
            config,
            zone,
            fps,
            startup_grace_frames,
            store,
            groups,
            timeline: Vec::new(),
            frame_id: 0,
            last_time: 0.0,
            last_timeline_sec: -1,
            max_frames: None,
            total_frames: 0,
            progress: None,
        })
    }

    /// Stop folding in frames past this count; extra frames are ignored.
    pub fn set_max_frames(&mut self, max_frames: u64) {
        self.max_frames = Some(max_frames);
        self.total_frames = max_frames;
    }

    /// Install a progress sink, invoked every 30 processed frames with
    /// `(current_frame, total_frames)`.
    pub fn set_progress(&mut self, total_frames: u64, sink: ProgressSink) {
        self.total_frames = total_frames;
        self.progress = Some(sink);
    }

    /// Process one frame of detections and return the render view.
    ///
    /// An empty detection list is a normal frame, and detections failing the
    /// geometric validity filter are silently dropped.
    pub fn process_frame(
        &mut self,
        detections: &[Detection],
        frame_width: f32,
        frame_height: f32,
    ) -> FrameSummary {
        if self.max_frames.is_some_and(|max| self.frame_id >= max) {
            return FrameSummary {
                time: self.last_time,
                ..FrameSummary::default()
            };
        }

        self.frame_id += 1;
        let time_now = self.frame_id as f64 / self.fps;
        self.last_time = time_now;
        let past_startup = self.frame_id > self.startup_grace_frames;

        if self.frame_id % PROGRESS_CADENCE == 0 {
            let (frame_id, total_frames) = (self.frame_id, self.total_frames);
            if let Some(sink) = self.progress.as_mut() {
                sink(frame_id, total_frames);
            }
        }

        // Validity filter, zone coverage, association and per-track updates
        let mut current: BTreeMap<u64, FrameObservation> = BTreeMap::new();
        for detection in detections {
            if !self
                .store
                .is_valid_person_box(&detection.bbox, frame_width, frame_height)
            {
                continue;
            }
            let position = detection.bbox.center();
            let coverage = body_coverage(
                &detection.bbox,
                &self.zone,
                self.config.zone.coverage_grid,
            );
            let in_zone = coverage >= self.config.zone.coverage_threshold;

            let track_id =
                self.store
                    .observe(detection.bbox, position, in_zone, time_now, past_startup);
            if let Some(track) = self.store.get(track_id) {
                current.insert(
                    track_id,
                    FrameObservation {
                        bbox: detection.bbox,
                        is_staff: track.is_staff,
                        show_label: track.show_label,
                        in_grace: track.grace_period_active,
                        activity: track.current_activity,
                    },
                );
            }
        }

        // Group eligibility: plausibly browsing customers only. The tenure
        // and speed filters gate clustering, not the hysteresis below.
        let mut eligible_centers: BTreeMap<u64, Point> = BTreeMap::new();
        for (&track_id, obs) in &current {
            if obs.in_grace || obs.is_staff || !obs.show_label {
                continue;
            }
            if let Some(track) = self.store.get(track_id) {
                if time_now - track.first_seen < self.config.group.min_time_before_group_secs {
                    continue;
                }
                if track.speed > self.config.group.speed_threshold_px {
                    continue;
                }
                eligible_centers.insert(track_id, obs.bbox.center());
            }
        }

        let assignment = self.groups.step(&eligible_centers);

        for (&track_id, obs) in &current {
            if obs.in_grace || obs.is_staff || !obs.show_label {
                continue;
            }
            if let Some(track) = self.store.get_mut(track_id) {
                self.groups
                    .commit(track, assignment.get(&track_id).copied());
            }
        }

        // Count visible people and assemble the render view
        let mut summary = FrameSummary {
            time: time_now,
            ..FrameSummary::default()
        };
        for (&track_id, obs) in &current {
            if obs.in_grace || !obs.show_label {
                continue;
            }
            if obs.is_staff {
                if obs.activity == Activity::Active {
                    summary.active_staff += 1;
                } else {
                    summary.inactive_staff += 1;
                }
            } else {
                summary.customers += 1;
            }
            let (group_id, group_size) = self
                .store
                .get(track_id)
                .map_or((None, 1), |t| (t.group_id, t.group_size));
            summary.tracks.push(TrackView {
                track_id,
                bbox: obs.bbox,
                is_staff: obs.is_staff,
                activity: obs.activity,
                group_id,
                group_size,
            });
        }

        // At most one timeline sample per elapsed whole second
        let current_sec = time_now as i64;
        if current_sec > self.last_timeline_sec {
            self.last_timeline_sec = current_sec;
            self.timeline.push(TimelineSample {
                time: format_clock(current_sec),
                staff: summary.active_staff + summary.inactive_staff,
                customers: summary.customers,
                active_staff: summary.active_staff,
                inactive_staff: summary.inactive_staff,
            });
        }

        summary
    }

    /// Finish the run and build the final report.
    ///
    /// Tracks with fewer than the minimum appearances are discarded as noise;
    /// the rest are partitioned by the sticky `was_staff` flag.
    pub fn finish(mut self) -> AnalysisReport {
        let min_appearances = self.config.tracking.min_appearances;

        let mut staff_count = 0usize;
        let mut total_active = 0.0f64;
        let mut total_inactive = 0.0f64;
        let mut customers: Vec<(u64, Option<u64>, usize)> = Vec::new();

        for track in self.store.tracks_mut() {
            if track.appearances < min_appearances {
                continue;
            }
            if track.was_staff {
                staff_count += 1;
                let last_seen = track.last_seen;
                if let Some(classifier) = track.activity.as_mut() {
                    let summary = classifier.summarize(last_seen);
                    total_active += summary.active.duration;
                    total_inactive += summary.inactive.duration;
                }
            } else {
                customers.push((track.track_id, track.group_id, track.group_size));
            }
        }

        let total_activity = total_active + total_inactive;
        let (active_percentage, inactive_percentage) = if total_activity > 0.0 {
            (
                round1(total_active / total_activity * 100.0),
                round1(total_inactive / total_activity * 100.0),
            )
        } else {
            (0.0, 0.0)
        };

        // Committed group memberships, sizes at their lifetime maximum.
        // Customers iterate in ascending track id, so group order is by the
        // lowest member id.
        let mut groups: Vec<GroupReport> = Vec::new();
        let mut group_index: BTreeMap<u64, usize> = BTreeMap::new();
        for (track_id, group_id, group_size) in &customers {
            let Some(gid) = group_id else { continue };
            let idx = *group_index.entry(*gid).or_insert_with(|| {
                groups.push(GroupReport {
                    group_id: *gid,
                    size: 0,
                    members: Vec::new(),
                });
                groups.len() - 1
            });
            groups[idx].members.push(*track_id);
            groups[idx].size = groups[idx].size.max(*group_size);
        }

        let report = AnalysisReport {
            staff_count,
            customer_count: customers.len(),
            total_people: staff_count + customers.len(),
            duration: format_clock(self.last_time as i64),
            active_percentage,
            inactive_percentage,
            timeline: std::mem::take(&mut self.timeline),
            groups,
        };
        info!(
            staff = report.staff_count,
            customers = report.customer_count,
            duration = %report.duration,
            "analysis complete"
        );
        report
    }

    /// Frames processed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_id
    }

    /// The track store, for inspection.
    pub fn store(&self) -> &TrackStore {
        &self.store
    }
}
