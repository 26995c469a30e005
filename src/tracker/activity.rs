//! Per-track active/inactive state machine with asymmetric hysteresis.

use std::collections::VecDeque;

use crate::config::ActivityConfig;
use crate::tracker::rect::{Point, distance};
use crate::tracker::track::Activity;

/// Duration and share of the run spent in one activity state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSummary {
    /// Seconds spent in the state
    pub duration: f64,
    /// Share of the summarized interval, in percent
    pub percentage: f64,
}

/// End-of-run activity breakdown for one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivitySummary {
    pub active: StateSummary,
    pub inactive: StateSummary,
}

/// Motion-based activity classifier for a single staff track.
///
/// Movement is the distance between the two most recent centroids. The first
/// movement sample seeds the state directly; afterwards a flip requires
/// consecutive confirming frames, with a much longer window towards
/// `inactive` since prolonged stillness is the signal that matters.
#[derive(Debug, Clone)]
pub struct ActivityClassifier {
    config: ActivityConfig,
    history: VecDeque<Point>,
    state: Activity,
    state_start: Option<f64>,
    active_duration: f64,
    inactive_duration: f64,
    active_streak: u32,
    inactive_streak: u32,
    initialized: bool,
}

impl ActivityClassifier {
    pub fn new(config: ActivityConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.window_frames),
            config,
            // Matches the reported label before the state machine seeds
            state: Activity::Active,
            state_start: None,
            active_duration: 0.0,
            inactive_duration: 0.0,
            active_streak: 0,
            inactive_streak: 0,
            initialized: false,
        }
    }

    /// Fold in one observation and return the (possibly unchanged) state.
    pub fn update(&mut self, position: Point, time: f64) -> Activity {
        self.history.push_back(position);
        if self.history.len() > self.config.window_frames {
            self.history.pop_front();
        }
        if self.history.len() < 2 {
            return Activity::Active;
        }

        let movement = self.recent_movement();

        if !self.initialized {
            // First movement sample: seed directly, there is no prior state
            // to protect from flicker.
            self.initialized = true;
            self.state = if movement > self.config.movement_threshold {
                Activity::Active
            } else {
                Activity::Inactive
            };
            self.state_start = Some(time);
            return self.state;
        }

        let next = self.confirmed_state(movement);
        if next != self.state {
            if let Some(start) = self.state_start {
                let elapsed = time - start;
                match self.state {
                    Activity::Active => self.active_duration += elapsed,
                    Activity::Inactive => self.inactive_duration += elapsed,
                    Activity::Initializing => {}
                }
            }
            self.state = next;
            self.state_start = Some(time);
        }
        self.state
    }

    fn recent_movement(&self) -> f32 {
        match (
            self.history.len().checked_sub(2).and_then(|i| self.history.get(i)),
            self.history.back(),
        ) {
            (Some(&a), Some(&b)) => distance(a, b),
            _ => 0.0,
        }
    }

    fn confirmed_state(&mut self, movement: f32) -> Activity {
        if movement > self.config.movement_threshold {
            self.active_streak += 1;
            self.inactive_streak = 0;
            if self.active_streak >= self.config.active_confirmation_frames {
                return Activity::Active;
            }
        } else {
            self.inactive_streak += 1;
            self.active_streak = 0;
            if self.inactive_streak >= self.config.inactive_confirmation_frames {
                return Activity::Inactive;
            }
        }
        self.state
    }

    /// Close out the current state up to `total_time` and report durations.
    ///
    /// Restamps the state start at `total_time`, so repeated calls with the
    /// same argument do not double-accumulate.
    pub fn summarize(&mut self, total_time: f64) -> ActivitySummary {
        if let Some(start) = self.state_start {
            if total_time > start {
                let elapsed = total_time - start;
                match self.state {
                    Activity::Active => self.active_duration += elapsed,
                    Activity::Inactive => self.inactive_duration += elapsed,
                    Activity::Initializing => {}
                }
                self.state_start = Some(total_time);
            }
        }

        let pct = |duration: f64| {
            if total_time > 0.0 {
                duration / total_time * 100.0
            } else {
                0.0
            }
        };
        ActivitySummary {
            active: StateSummary {
                duration: self.active_duration,
                percentage: pct(self.active_duration),
            },
            inactive: StateSummary {
                duration: self.inactive_duration,
                percentage: pct(self.inactive_duration),
            },
        }
    }

    /// Current state of the machine.
    pub fn state(&self) -> Activity {
        self.state
    }
}
