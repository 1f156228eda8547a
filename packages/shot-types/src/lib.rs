//! # shot-types
//!
//! Shared value types for the acoustic shot localization workspace.
//!
//! These types are used by:
//! - `shot-locator`: the gradient-descent multilateration solver
//! - `shot-simulator`: synthetic event generation and capture replay
//!
//! ## Coordinate Conventions
//!
//! - **Array frame**: right-hand Cartesian, meters, origin at the array mount point
//! - **X** = forward, **Y** = left, **Z** = up
//! - Times are seconds against an arbitrary common origin (not absolute wall time)

use serde::{Deserialize, Serialize};

/// A length in meters.
pub type Meters = f64;

/// A duration or instant in seconds.
pub type Seconds = f64;

/// Speed of sound in dry air at about 20 °C, meters per second.
pub const SPEED_OF_SOUND_MPS: f64 = 343.0;

/// Microphone count of the reference helmet array.
pub const DEFAULT_SENSOR_COUNT: usize = 8;

// ── 3D Point ──────────────────────────────────────────────────────────────────

/// 3D point or displacement in the array frame (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: Meters,
    pub y: Meters,
    pub z: Meters,
}

impl Point3 {
    pub const fn new(x: Meters, y: Meters, z: Meters) -> Self { Self { x, y, z } }
    pub const fn origin() -> Self { Self { x: 0.0, y: 0.0, z: 0.0 } }

    /// Euclidean distance to `other`
    pub fn dist(&self, other: &Point3) -> Meters {
        self.sub(other).norm()
    }

    pub fn add(&self, other: &Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn scale(&self, s: f64) -> Point3 {
        Point3::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn norm(&self) -> Meters {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Horizontal bearing of this point seen from the array origin, radians.
    /// 0 = +X (forward), π/2 = +Y (left).
    pub fn azimuth_rad(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn from_array(a: [Meters; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

impl From<[Meters; 3]> for Point3 {
    fn from(a: [Meters; 3]) -> Self { Self::from_array(a) }
}

/// Signed difference `a - b` between two angles, wrapped into [-π, π).
pub fn angular_difference(a: f64, b: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    (a - b + PI).rem_euclid(TAU) - PI
}

// ── Shot estimate ─────────────────────────────────────────────────────────────

/// A point in space and time where a shot came from.
///
/// Used both as the solver's working iterate and as its final answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShotEstimate {
    /// Where the shot occurred (array frame)
    pub position: Point3,
    /// When the shot occurred, on the same clock as the arrival times
    pub time: Seconds,
}

impl ShotEstimate {
    pub fn new(position: Point3, time: Seconds) -> Self { Self { position, time } }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.time.is_finite()
    }

    /// Bearing of the estimated source as seen from `observer`, radians
    pub fn azimuth_from(&self, observer: &Point3) -> f64 {
        self.position.sub(observer).azimuth_rad()
    }
}

/// Successful solve: the converged estimate plus how it got there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub estimate: ShotEstimate,
    /// Number of update steps applied before the loss met tolerance
    pub iterations: usize,
    /// Mean squared residual of `estimate`
    pub loss: f64,
}

// ── Sensor array ──────────────────────────────────────────────────────────────

/// Ordered microphone positions, fixed for a deployment.
///
/// Index `i` here pairs with index `i` of every arrival-time vector fed to the solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorArray {
    positions: Vec<Point3>,
}

impl SensorArray {
    pub fn new(positions: Vec<Point3>) -> Self { Self { positions } }

    pub fn len(&self) -> usize { self.positions.len() }
    pub fn is_empty(&self) -> bool { self.positions.is_empty() }
    pub fn positions(&self) -> &[Point3] { &self.positions }
    pub fn iter(&self) -> std::slice::Iter<'_, Point3> { self.positions.iter() }

    /// Reorder sensors: slot `k` of the result holds sensor `order[k]`.
    /// Returns `None` unless `order` is a permutation of `0..len`.
    pub fn permuted(&self, order: &[usize]) -> Option<SensorArray> {
        if order.len() != self.len() { return None; }
        let mut seen = vec![false; self.len()];
        for &i in order {
            if i >= self.len() || seen[i] { return None; }
            seen[i] = true;
        }
        Some(SensorArray::new(order.iter().map(|&i| self.positions[i]).collect()))
    }
}

impl From<Vec<Point3>> for SensorArray {
    fn from(positions: Vec<Point3>) -> Self { Self::new(positions) }
}

impl<'a> IntoIterator for &'a SensorArray {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;
    fn into_iter(self) -> Self::IntoIter { self.positions.iter() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_point_distance() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 6.0, 3.0);
        assert!((a.dist(&b) - 5.0).abs() < 1e-12);
        assert_eq!(a.dist(&a), 0.0);
    }

    #[test]
    fn test_azimuth_quadrants() {
        assert!((Point3::new(1.0, 0.0, 0.0).azimuth_rad()).abs() < 1e-12);
        assert!((Point3::new(0.0, 1.0, 0.0).azimuth_rad() - PI / 2.0).abs() < 1e-12);
        assert!((Point3::new(0.0, -1.0, 5.0).azimuth_rad() + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_angular_difference_wraps() {
        let d = angular_difference(PI - 0.1, -PI + 0.1);
        assert!((d + 0.2).abs() < 1e-12);
        let d = angular_difference(0.3, 0.1);
        assert!((d - 0.2).abs() < 1e-12);
        assert!(angular_difference(PI, -PI).abs() < 1e-12);
    }

    #[test]
    fn test_permuted_rejects_bad_orders() {
        let array = SensorArray::new(vec![
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        let p = array.permuted(&[2, 0, 1]).unwrap();
        assert_eq!(p.positions()[0].x, 3.0);
        assert_eq!(p.positions()[1].x, 1.0);
        assert!(array.permuted(&[0, 0, 1]).is_none());
        assert!(array.permuted(&[0, 1]).is_none());
        assert!(array.permuted(&[0, 1, 3]).is_none());
    }

    #[test]
    fn test_sensor_array_serializes_as_list() {
        let array = SensorArray::new(vec![Point3::new(1.0, 2.0, 3.0)]);
        let json = serde_json::to_string(&array).unwrap();
        assert_eq!(json, r#"[{"x":1.0,"y":2.0,"z":3.0}]"#);
    }

    #[test]
    fn test_estimate_azimuth_from_observer() {
        let est = ShotEstimate::new(Point3::new(5.0, 5.0, 0.0), 0.0);
        let az = est.azimuth_from(&Point3::new(5.0, 0.0, 0.0));
        assert!((az - PI / 2.0).abs() < 1e-12);
        assert!(est.is_finite());
        assert!(!ShotEstimate::new(Point3::new(f64::NAN, 0.0, 0.0), 0.0).is_finite());
    }
}
