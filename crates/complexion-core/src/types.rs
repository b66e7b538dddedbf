//! Landmark, bounding box and color sample types shared by every stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of points in a face-mesh landmark set.
pub const MESH_LANDMARK_COUNT: usize = 468;

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("landmark set has {actual} points, provider contract requires at least {expected}")]
    Cardinality { expected: usize, actual: usize },
    #[error("landmark {index} has a non-finite coordinate")]
    NonFinite { index: usize },
    #[error("failed to read landmark file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed landmark file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Axis-aligned face bounding box in pixel coordinates.
///
/// Origin may be negative when the detector places landmarks partly outside
/// the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// A single landmark: x/y in pixels, z a relative depth proxy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Planar distance, ignoring depth.
    pub fn distance_2d(&self, other: &Point3) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Ordered landmark points for the single most prominent face.
///
/// Immutable once built; index meanings follow the face-mesh convention
/// documented in [`crate::landmarks`].
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point3>,
    bbox: BoundingBox,
}

impl LandmarkSet {
    /// Build a landmark set from pixel-space points.
    pub fn new(points: Vec<Point3>) -> Result<Self, LandmarkError> {
        if points.len() < MESH_LANDMARK_COUNT {
            return Err(LandmarkError::Cardinality {
                expected: MESH_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        if let Some(index) = points
            .iter()
            .position(|p| !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()))
        {
            return Err(LandmarkError::NonFinite { index });
        }

        let bbox = bounding_box(&points);
        Ok(Self { points, bbox })
    }

    /// Build a landmark set from detector output in normalized [0, 1] space.
    ///
    /// x scales by image width, y by height; z scales by width, matching the
    /// face-mesh depth convention.
    pub fn from_normalized(points: &[Point3], width: u32, height: u32) -> Result<Self, LandmarkError> {
        let w = width as f32;
        let h = height as f32;
        let scaled = points
            .iter()
            .map(|p| Point3::new(p.x * w, p.y * h, p.z * w))
            .collect();
        Self::new(scaled)
    }

    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&Point3> {
        self.points.get(index)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bbox
    }
}

/// Truncated integer min/max over x and y. Coordinates saturate at the
/// `i32` range and so do the extents.
fn bounding_box(points: &[Point3]) -> BoundingBox {
    if points.is_empty() {
        return BoundingBox { x: 0, y: 0, width: 0, height: 0 };
    }

    let mut x_min = i32::MAX;
    let mut y_min = i32::MAX;
    let mut x_max = i32::MIN;
    let mut y_max = i32::MIN;

    for p in points {
        let (x, y) = (p.x as i32, p.y as i32);
        x_min = x_min.min(x);
        y_min = y_min.min(y);
        x_max = x_max.max(x);
        y_max = y_max.max(y);
    }

    BoundingBox {
        x: x_min,
        y: y_min,
        width: x_max.saturating_sub(x_min),
        height: y_max.saturating_sub(y_min),
    }
}

/// A CIE L*a*b* triple. L* in [0, 100], a*/b* signed chromaticity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabColor {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl LabColor {
    pub fn new(l: f32, a: f32, b: f32) -> Self {
        Self { l, a, b }
    }
}

/// Perceptual-space samples pooled from masked skin pixels.
#[derive(Debug, Clone, Default)]
pub struct ColorSample {
    values: Vec<LabColor>,
}

impl ColorSample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, other: ColorSample) {
        self.values.extend(other.values);
    }

    pub fn push(&mut self, value: LabColor) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Arithmetic mean of each channel, or `None` for an empty sample.
    pub fn mean(&self) -> Option<LabColor> {
        if self.values.is_empty() {
            return None;
        }
        let (mut l, mut a, mut b) = (0.0f64, 0.0f64, 0.0f64);
        for v in &self.values {
            l += v.l as f64;
            a += v.a as f64;
            b += v.b as f64;
        }
        let n = self.values.len() as f64;
        Some(LabColor::new((l / n) as f32, (a / n) as f32, (b / n) as f32))
    }
}

impl FromIterator<LabColor> for ColorSample {
    fn from_iter<I: IntoIterator<Item = LabColor>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}
