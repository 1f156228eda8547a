//! layout.rs — Microphone array geometries
//!
//! Builds the fixed sensor positions a deployment would survey once:
//! - `ring`: N microphones evenly spaced around a circle (helmet array)
//! - `cross`: four microphones on the ±X / ±Y axes
//! - `cube`: eight microphones on the corners of a cube (full 3D coverage)

use serde::{Deserialize, Serialize};
use shot_types::{Meters, Point3, SensorArray, DEFAULT_SENSOR_COUNT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArrayLayout {
    Ring {
        #[serde(default = "default_ring_count")]
        count: usize,
        radius_m: Meters,
        /// Mount height of the ring plane
        #[serde(default)]
        height_m: Meters,
    },
    Cross {
        radius_m: Meters,
    },
    Cube {
        half_edge_m: Meters,
    },
}

fn default_ring_count() -> usize {
    DEFAULT_SENSOR_COUNT
}

impl Default for ArrayLayout {
    fn default() -> Self {
        ArrayLayout::Ring { count: DEFAULT_SENSOR_COUNT, radius_m: 10.0, height_m: 0.0 }
    }
}

impl ArrayLayout {
    /// Sensor positions in the array frame. Ring mic 0 sits on +X, then counter-clockwise.
    pub fn build(&self) -> SensorArray {
        let positions = match *self {
            ArrayLayout::Ring { count, radius_m, height_m } => (0..count)
                .map(|i| {
                    let a = std::f64::consts::TAU * i as f64 / count as f64;
                    Point3::new(radius_m * a.cos(), radius_m * a.sin(), height_m)
                })
                .collect(),
            ArrayLayout::Cross { radius_m } => vec![
                Point3::new(radius_m, 0.0, 0.0),
                Point3::new(-radius_m, 0.0, 0.0),
                Point3::new(0.0, radius_m, 0.0),
                Point3::new(0.0, -radius_m, 0.0),
            ],
            ArrayLayout::Cube { half_edge_m: h } => {
                let mut v = Vec::with_capacity(8);
                for &x in &[-h, h] {
                    for &y in &[-h, h] {
                        for &z in &[-h, h] {
                            v.push(Point3::new(x, y, z));
                        }
                    }
                }
                v
            }
        };
        SensorArray::new(positions)
    }

    /// True when every microphone lies in one horizontal plane; the solver
    /// cannot resolve source height from such an array.
    pub fn is_planar(&self) -> bool {
        !matches!(self, ArrayLayout::Cube { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_geometry() {
        let array = ArrayLayout::Ring { count: 8, radius_m: 10.0, height_m: 1.5 }.build();
        assert_eq!(array.len(), 8);
        for p in &array {
            assert!((p.sub(&Point3::new(0.0, 0.0, 1.5)).norm() - 10.0).abs() < 1e-9);
            assert_eq!(p.z, 1.5);
        }
        assert!((array.positions()[0].x - 10.0).abs() < 1e-12);
        assert!((array.positions()[2].y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_and_cube() {
        let cross = ArrayLayout::Cross { radius_m: 10.0 }.build();
        assert_eq!(cross.len(), 4);
        assert_eq!(cross.positions()[3], Point3::new(0.0, -10.0, 0.0));

        let cube = ArrayLayout::Cube { half_edge_m: 2.0 }.build();
        assert_eq!(cube.len(), 8);
        assert!(cube.iter().all(|p| p.x.abs() == 2.0 && p.y.abs() == 2.0 && p.z.abs() == 2.0));
        assert!(!ArrayLayout::Cube { half_edge_m: 1.0 }.is_planar());
    }

    #[test]
    fn test_layout_from_toml() {
        let layout: ArrayLayout = toml::from_str("kind = \"ring\"\nradius_m = 0.2\n").unwrap();
        assert_eq!(layout, ArrayLayout::Ring { count: 8, radius_m: 0.2, height_m: 0.0 });
        let layout: ArrayLayout = toml::from_str("kind = \"cube\"\nhalf_edge_m = 3.0\n").unwrap();
        assert_eq!(layout.build().len(), 8);
    }
}
