//! Customer group clustering, cross-frame continuity and membership
//! hysteresis.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::config::GroupConfig;
use crate::tracker::rect::{Point, centroid, distance, distance_matrix};
use crate::tracker::track::Track;

/// A continuity-tracked cluster of customer tracks.
///
/// Groups are never destroyed: one that stops matching simply stops being
/// updated and falls out of reach of the 140 px matching radius.
#[derive(Debug, Clone)]
pub struct Group {
    /// Current member track ids
    pub members: BTreeSet<u64>,
    /// Mean of the member positions
    pub centroid: Point,
}

/// Tracks customer groups across frames.
///
/// Clustering is a degree-limited proximity graph: each track links to at
/// most its two nearest neighbours within the link radius, which keeps a long
/// line of nearby-but-distinct people from collapsing into one giant group.
pub struct GroupTracker {
    groups: BTreeMap<u64, Group>,
    next_group_id: u64,
    config: GroupConfig,
}

impl GroupTracker {
    pub fn new(config: GroupConfig) -> Self {
        Self {
            groups: BTreeMap::new(),
            next_group_id: 1,
            config,
        }
    }

    /// Connected components of the degree-limited proximity graph, keeping
    /// only components that meet the minimum group size.
    ///
    /// `centers` maps eligible track ids to centroids; iteration is in
    /// ascending id order so output is deterministic.
    pub fn cluster(&self, centers: &BTreeMap<u64, Point>) -> Vec<BTreeSet<u64>> {
        let ids: Vec<u64> = centers.keys().copied().collect();
        let points: Vec<Point> = ids.iter().map(|id| centers[id]).collect();
        let n = ids.len();
        if n == 0 {
            return Vec::new();
        }

        let dists = distance_matrix(&points);
        let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
        for i in 0..n {
            let mut near: Vec<(f32, usize)> = (0..n)
                .filter(|&j| j != i && dists[[i, j]] <= self.config.link_distance_px)
                .map(|j| (dists[[i, j]], j))
                .collect();
            near.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            for &(_, j) in near.iter().take(self.config.max_neighbors) {
                adj[i].push(j);
                adj[j].push(i);
            }
        }

        let mut visited = vec![false; n];
        let mut components = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut component = BTreeSet::from([ids[start]]);
            let mut stack = vec![start];
            while let Some(current) = stack.pop() {
                for &next in &adj[current] {
                    if !visited[next] {
                        visited[next] = true;
                        component.insert(ids[next]);
                        stack.push(next);
                    }
                }
            }
            if component.len() >= self.config.min_size {
                components.push(component);
            }
        }
        components
    }

    /// Cluster the eligible centers and match each cluster against tracked
    /// groups, reusing ids where continuity holds. Returns the per-frame
    /// track-to-group assignment.
    ///
    /// Matching is greedy in cluster order: score is
    /// `1.5·Jaccard + 0.5·(1 − d/match_dist)` over tracked groups within the
    /// matching radius, each usable once per frame; ties keep the oldest
    /// group id. Clusters with no candidate mint a fresh id.
    pub fn step(&mut self, centers: &BTreeMap<u64, Point>) -> BTreeMap<u64, u64> {
        let clusters = self.cluster(centers);
        let mut assignment = BTreeMap::new();
        let mut used: BTreeSet<u64> = BTreeSet::new();

        for members in clusters {
            let points: Vec<Point> = members.iter().map(|id| centers[id]).collect();
            let center = centroid(&points);

            let mut best: Option<(u64, f32)> = None;
            for (&gid, group) in &self.groups {
                if used.contains(&gid) {
                    continue;
                }
                let dist = distance(center, group.centroid);
                if dist > self.config.match_distance_px {
                    continue;
                }
                let overlap = jaccard(&members, &group.members);
                let score =
                    overlap * 1.5 + (1.0 - dist / self.config.match_distance_px).max(0.0) * 0.5;
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((gid, score));
                }
            }

            let gid = match best {
                Some((gid, _)) => gid,
                None => {
                    let gid = self.next_group_id;
                    self.next_group_id += 1;
                    debug!(group_id = gid, size = members.len(), "new group");
                    gid
                }
            };
            used.insert(gid);
            for &track_id in &members {
                assignment.insert(track_id, gid);
            }
            self.groups.insert(
                gid,
                Group {
                    members,
                    centroid: center,
                },
            );
        }
        assignment
    }

    /// Debounce one track's per-frame cluster assignment into its committed
    /// membership.
    ///
    /// Only after `join_frames` consecutive clustered frames does the track
    /// adopt the group id, and only after `leave_frames` consecutive
    /// unclustered frames does it fall back to single. This is the sole
    /// writer of `Track::group_id`.
    pub fn commit(&self, track: &mut Track, assignment: Option<u64>) {
        match assignment {
            Some(gid) => {
                track.group_join_count += 1;
                track.group_leave_count = 0;
                if track.group_join_count >= self.config.join_frames {
                    track.group_id = Some(gid);
                    track.group_size = self.groups.get(&gid).map_or(1, |g| g.members.len());
                    track.group_frames_total += 1;
                }
            }
            None => {
                track.group_leave_count += 1;
                track.group_join_count = 0;
                if track.group_leave_count >= self.config.leave_frames {
                    track.group_id = None;
                    track.group_size = 1;
                }
            }
        }
    }

    /// Look up a tracked group by id.
    pub fn group(&self, group_id: u64) -> Option<&Group> {
        self.groups.get(&group_id)
    }
}

fn jaccard(a: &BTreeSet<u64>, b: &BTreeSet<u64>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::rect::Rect;

    fn tracker() -> GroupTracker {
        GroupTracker::new(GroupConfig::default())
    }

    fn centers(entries: &[(u64, Point)]) -> BTreeMap<u64, Point> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_jaccard() {
        let a: BTreeSet<u64> = [1, 2, 3].into();
        let b: BTreeSet<u64> = [2, 3, 4].into();
        assert!((jaccard(&a, &b) - 0.5).abs() < 1e-6);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&BTreeSet::new(), &BTreeSet::new()), 0.0);
    }

    #[test]
    fn test_two_close_tracks_form_a_group() {
        let tracker = tracker();
        let clusters = tracker.cluster(&centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_distant_third_track_excluded() {
        let tracker = tracker();
        // 90 px from both members: outside the 80 px link radius
        let clusters = tracker.cluster(&centers(&[
            (1, (0.0, 0.0)),
            (2, (50.0, 0.0)),
            (3, (25.0, 86.6)),
        ]));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0], BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_isolated_tracks_form_no_group() {
        let tracker = tracker();
        let clusters = tracker.cluster(&centers(&[(1, (0.0, 0.0)), (2, (200.0, 0.0))]));
        assert!(clusters.is_empty());
    }

    #[test]
    fn test_degree_limit_bounds_chains() {
        let tracker = tracker();
        // Five people in a 60 px-spaced line still become one component via
        // chained neighbour links, but each node keeps at most two links.
        let line: Vec<(u64, Point)> = (0..5).map(|i| (i + 1, (i as f32 * 60.0, 0.0))).collect();
        let clusters = tracker.cluster(&centers(&line));
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 5);
    }

    #[test]
    fn test_group_id_persists_across_frames() {
        let mut tracker = tracker();
        let frame = centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]);

        let first = tracker.step(&frame);
        let second = tracker.step(&frame);
        assert_eq!(first[&1], 1);
        assert_eq!(second[&1], first[&1]);
        assert_eq!(second[&2], first[&1]);
    }

    #[test]
    fn test_moved_group_keeps_id_within_match_radius() {
        let mut tracker = tracker();
        let first = tracker.step(&centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]));
        // Same members drifted 100 px: centroid moved within 140 px
        let second = tracker.step(&centers(&[(1, (100.0, 0.0)), (2, (150.0, 0.0))]));
        assert_eq!(second[&1], first[&1]);
    }

    #[test]
    fn test_far_cluster_mints_new_id() {
        let mut tracker = tracker();
        let first = tracker.step(&centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]));
        let second = tracker.step(&centers(&[(3, (500.0, 500.0)), (4, (550.0, 500.0))]));
        assert_ne!(second[&3], first[&1]);
        assert_eq!(second[&3], 2);
    }

    #[test]
    fn test_commit_requires_twelve_consecutive_frames() {
        let mut tracker = tracker();
        let frame = centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]);
        let mut track = Track::new(1, Rect::from_tlbr(0.0, 0.0, 40.0, 80.0), (20.0, 40.0), 0.0);

        for _ in 0..11 {
            let assignment = tracker.step(&frame);
            tracker.commit(&mut track, assignment.get(&1).copied());
            assert_eq!(track.group_id, None);
        }
        let assignment = tracker.step(&frame);
        tracker.commit(&mut track, assignment.get(&1).copied());
        assert_eq!(track.group_id, Some(1));
        assert_eq!(track.group_size, 2);
        assert_eq!(track.group_frames_total, 1);
    }

    #[test]
    fn test_leave_hysteresis_clears_membership() {
        let mut tracker = tracker();
        let frame = centers(&[(1, (0.0, 0.0)), (2, (50.0, 0.0))]);
        let mut track = Track::new(1, Rect::from_tlbr(0.0, 0.0, 40.0, 80.0), (20.0, 40.0), 0.0);

        for _ in 0..12 {
            let assignment = tracker.step(&frame);
            tracker.commit(&mut track, assignment.get(&1).copied());
        }
        assert_eq!(track.group_id, Some(1));

        // One unclustered frame is not enough to clear
        tracker.commit(&mut track, None);
        assert_eq!(track.group_id, Some(1));

        for _ in 0..11 {
            tracker.commit(&mut track, None);
        }
        assert_eq!(track.group_id, None);
        assert_eq!(track.group_size, 1);
        assert_eq!(track.group_join_count, 0);
    }
}
