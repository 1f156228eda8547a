//! geometry.rs — Distance model and its derivative

use shot_types::{Meters, Point3};

/// Distances at or below this are treated as "estimate sits on the sensor":
/// the direction of the distance gradient is undefined there.
pub const DISTANCE_EPSILON: Meters = 1e-9;

/// Euclidean distance between two points in 3D space.
pub fn distance(p: &Point3, q: &Point3) -> Meters {
    p.dist(q)
}

/// Gradient of `distance(p, q)` with respect to `p`: ∂d/∂p_a = (p_a - q_a) / d.
///
/// Returns `None` when `p` and `q` coincide to within [`DISTANCE_EPSILON`].
pub fn distance_gradient(p: &Point3, q: &Point3) -> Option<Point3> {
    let d = distance(p, q);
    if d <= DISTANCE_EPSILON {
        return None;
    }
    Some(p.sub(q).scale(1.0 / d))
}

/// Mean position of a set of points; `None` if empty.
pub fn centroid(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold(Point3::origin(), |acc, p| acc.add(p));
    Some(sum.scale(1.0 / points.len() as f64))
}
