//! Landmark provider boundary and face-mesh index conventions.
//!
//! The detection model is external. Anything that can turn an image into a
//! [`LandmarkSet`] (or report that no face was found) implements
//! [`LandmarkProvider`]; the rest of the crate only sees the points.

use crate::types::{LandmarkError, LandmarkSet, Point3};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Face-mesh landmark indices used for region extraction and measurements.
pub mod index {
    pub const FACE_TOP: usize = 10;
    pub const CHIN: usize = 152;
    pub const FACE_LEFT: usize = 234;
    pub const FACE_RIGHT: usize = 454;
    pub const FOREHEAD_LEFT: usize = 70;
    pub const FOREHEAD_RIGHT: usize = 300;
    pub const JAW_LEFT: usize = 172;
    pub const JAW_RIGHT: usize = 397;
    pub const CHEEKBONE_LEFT: usize = 234;
    pub const CHEEKBONE_RIGHT: usize = 454;

    /// Face oval, used as the forehead sampling region.
    pub const FOREHEAD: [usize; 36] = [
        10, 338, 297, 332, 284, 251, 389, 356, 454, 323, 361, 288, 397, 365, 379, 378, 400, 377,
        152, 148, 176, 149, 150, 136, 172, 58, 132, 93, 234, 127, 162, 21, 54, 103, 67, 109,
    ];

    pub const LEFT_CHEEK: [usize; 12] = [50, 101, 36, 205, 206, 207, 187, 123, 116, 117, 118, 119];

    pub const RIGHT_CHEEK: [usize; 12] =
        [280, 330, 266, 425, 426, 427, 411, 352, 345, 346, 347, 348];
}

/// Capability interface for the external landmark model.
///
/// Returns landmarks for the most prominent face, or `None` if no face was
/// found. Implementations decide their own thread-safety; the analyzer only
/// needs `&self`.
pub trait LandmarkProvider {
    fn detect(&self, image: &RgbImage) -> Option<LandmarkSet>;
}

impl<F> LandmarkProvider for F
where
    F: Fn(&RgbImage) -> Option<LandmarkSet>,
{
    fn detect(&self, image: &RgbImage) -> Option<LandmarkSet> {
        self(image)
    }
}

/// Provider that ignores the image and returns a fixed result.
///
/// Used for precomputed landmark files and as a test stub.
#[derive(Debug, Clone, Default)]
pub struct StaticLandmarks {
    landmarks: Option<LandmarkSet>,
}

impl StaticLandmarks {
    pub fn new(landmarks: LandmarkSet) -> Self {
        Self {
            landmarks: Some(landmarks),
        }
    }

    /// A provider that never finds a face.
    pub fn none() -> Self {
        Self { landmarks: None }
    }

    /// Load from a landmark JSON file. See [`LandmarkFile`].
    pub fn from_file(path: &Path, width: u32, height: u32) -> Result<Self, LandmarkError> {
        let landmarks = LandmarkFile::load(path)?.into_landmarks(width, height)?;
        tracing::debug!(
            path = %path.display(),
            found = landmarks.is_some(),
            "loaded landmark file"
        );
        Ok(Self { landmarks })
    }
}

impl LandmarkProvider for StaticLandmarks {
    fn detect(&self, _image: &RgbImage) -> Option<LandmarkSet> {
        self.landmarks.clone()
    }
}

/// On-disk landmark dump produced by an external detector.
///
/// ```json
/// {"points": [[x, y, z], ...], "normalized": false}
/// ```
///
/// An empty `points` array means no face was found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkFile {
    pub points: Vec<[f32; 3]>,
    #[serde(default)]
    pub normalized: bool,
}

impl LandmarkFile {
    pub fn load(path: &Path) -> Result<Self, LandmarkError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, LandmarkError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Convert to a pixel-space landmark set for an image of the given size.
    pub fn into_landmarks(self, width: u32, height: u32) -> Result<Option<LandmarkSet>, LandmarkError> {
        if self.points.is_empty() {
            return Ok(None);
        }
        let points: Vec<Point3> = self
            .points
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        let set = if self.normalized {
            LandmarkSet::from_normalized(&points, width, height)?
        } else {
            LandmarkSet::new(points)?
        };
        Ok(Some(set))
    }
}
