//! Staff zone geometry: polygon containment and body coverage.

use crate::tracker::rect::{Point, Rect};

/// Even-odd ray-casting containment test against a simple polygon.
///
/// Horizontal edges are resolved with the `y > min, y <= max` convention so
/// that a ray passing exactly through a vertex is not counted twice.
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    let (x, y) = point;
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    for i in 0..n {
        let (px1, py1) = polygon[i];
        let (px2, py2) = polygon[(i + 1) % n];

        if y > py1.min(py2) && y <= py1.max(py2) && x <= px1.max(px2) {
            if px1 == px2 {
                // Vertical edge: the crossing is at px1, already bounded by x <= px1
                inside = !inside;
            } else {
                let x_intersect = (y - py1) * (px2 - px1) / (py2 - py1) + px1;
                if x <= x_intersect {
                    inside = !inside;
                }
            }
        }
    }
    inside
}

/// Fraction of a uniform grid sampled over `rect` that falls inside `polygon`.
///
/// The grid spans both box edges inclusively. Sampling the whole silhouette
/// rectangle weighs feet-in-zone against head-out-of-zone proportionally,
/// which a single centroid test cannot.
pub fn body_coverage(rect: &Rect, polygon: &[Point], grid: usize) -> f32 {
    if grid < 2 {
        return if point_in_polygon(rect.center(), polygon) {
            1.0
        } else {
            0.0
        };
    }

    let step = (grid - 1) as f32;
    let mut inside = 0u32;
    let total = (grid * grid) as u32;
    for i in 0..grid {
        for j in 0..grid {
            let px = rect.x + rect.width * i as f32 / step;
            let py = rect.y + rect.height * j as f32 / step;
            if point_in_polygon((px, py), polygon) {
                inside += 1;
            }
        }
    }
    inside as f32 / total as f32
}

/// Whether the body coverage of `rect` meets the zone threshold.
pub fn in_zone(rect: &Rect, polygon: &[Point], grid: usize, threshold: f32) -> bool {
    body_coverage(rect, polygon, grid) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Point> {
        vec![(x1, y1), (x2, y1), (x2, y2), (x1, y2)]
    }

    #[test]
    fn test_point_in_polygon_square() {
        let poly = square(0.0, 0.0, 100.0, 100.0);
        assert!(point_in_polygon((50.0, 50.0), &poly));
        assert!(!point_in_polygon((150.0, 50.0), &poly));
        assert!(!point_in_polygon((-1.0, 50.0), &poly));
    }

    #[test]
    fn test_point_in_polygon_concave() {
        // L-shaped polygon with the notch at the top right
        let poly = vec![
            (0.0, 0.0),
            (50.0, 0.0),
            (50.0, 50.0),
            (100.0, 50.0),
            (100.0, 100.0),
            (0.0, 100.0),
        ];
        assert!(point_in_polygon((25.0, 25.0), &poly));
        assert!(point_in_polygon((75.0, 75.0), &poly));
        assert!(!point_in_polygon((75.0, 25.0), &poly));
    }

    #[test]
    fn test_degenerate_polygon_never_contains() {
        assert!(!point_in_polygon((0.0, 0.0), &[(1.0, 1.0), (2.0, 2.0)]));
    }

    #[test]
    fn test_body_coverage_full_and_none() {
        let poly = square(-10.0, -10.0, 110.0, 110.0);
        let rect = Rect::from_tlbr(0.0, 0.0, 100.0, 100.0);
        assert!((body_coverage(&rect, &poly, 10) - 1.0).abs() < 1e-6);

        let far = square(500.0, 500.0, 600.0, 600.0);
        assert_eq!(body_coverage(&rect, &far, 10), 0.0);
    }

    #[test]
    fn test_coverage_threshold_boundary() {
        let rect = Rect::from_tlbr(0.0, 0.0, 100.0, 100.0);

        // Polygon covers rows j = 0..=7 of the 10x10 grid (y up to 700/9 px),
        // 80 of 100 sample points: coverage 0.80, in zone at 0.75.
        let eighty = square(-10.0, -10.0, 110.0, 80.0);
        let cov = body_coverage(&rect, &eighty, 10);
        assert!((cov - 0.80).abs() < 1e-6);
        assert!(in_zone(&rect, &eighty, 10, 0.75));

        // Rows j = 0..=6 only: coverage 0.70, below threshold.
        let seventy = square(-10.0, -10.0, 110.0, 70.0);
        let cov = body_coverage(&rect, &seventy, 10);
        assert!((cov - 0.70).abs() < 1e-6);
        assert!(!in_zone(&rect, &seventy, 10, 0.75));
    }
}
