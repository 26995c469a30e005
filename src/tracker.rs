mod activity;
mod group;
mod rect;
mod store;
mod track;
mod zone;

pub use activity::{ActivityClassifier, ActivitySummary, StateSummary};
pub use group::{Group, GroupTracker};
pub use rect::{Point, Rect, centroid, distance, distance_matrix};
pub use store::{Detection, TrackStore};
pub use track::{Activity, Track};
pub use zone::{body_coverage, in_zone, point_in_polygon};
