//! End-of-run report types, serialized to the JSON shape consumed by the
//! reporting frontend.

use serde::Serialize;

/// One per-second timeline sample.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSample {
    /// Wall-clock position in the video, formatted `H:MM:SS`
    pub time: String,
    /// Visible staff (active + inactive)
    pub staff: u32,
    /// Visible customers
    pub customers: u32,
    pub active_staff: u32,
    pub inactive_staff: u32,
}

/// One committed customer group.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub group_id: u64,
    /// Maximum observed member count over the group's lifetime
    pub size: usize,
    /// Member track ids in ascending order
    pub members: Vec<u64>,
}

/// Final account of the run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub staff_count: usize,
    pub customer_count: usize,
    pub total_people: usize,
    /// Video duration, formatted `H:MM:SS`
    pub duration: String,
    /// Share of aggregate staff time spent active, rounded to 1 decimal
    pub active_percentage: f64,
    /// Share of aggregate staff time spent inactive, rounded to 1 decimal
    pub inactive_percentage: f64,
    pub timeline: Vec<TimelineSample>,
    pub groups: Vec<GroupReport>,
}

/// Format whole seconds as `H:MM:SS`.
pub(crate) fn format_clock(total_seconds: i64) -> String {
    let seconds = total_seconds.max(0);
    format!(
        "{}:{:02}:{:02}",
        seconds / 3600,
        seconds % 3600 / 60,
        seconds % 60
    )
}

/// Round a percentage to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
