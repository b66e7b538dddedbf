//! complexion-core: rule-based facial attribute classification.
//!
//! Turns face-mesh landmarks and pixel colors into a skin tone level and
//! undertone, a face shape, a hair coverage level and a color season. Landmark
//! detection itself is external and enters through [`LandmarkProvider`].

pub mod analyzer;
pub mod color;
pub mod face_shape;
pub mod hair;
pub mod landmarks;
pub mod regions;
pub mod report;
pub mod skin_tone;
pub mod types;

pub use analyzer::{FaceAnalysisResult, FaceAnalyzer};
pub use face_shape::{FaceShape, FaceShapeClassifier, FaceShapeResult};
pub use hair::{CoverageLevel, HairCoverageClassifier, HairCoverageResult};
pub use landmarks::{LandmarkFile, LandmarkProvider, StaticLandmarks};
pub use regions::{FaceMeasurements, Measure, RegionExtractor};
pub use report::AnalysisReport;
pub use skin_tone::{Season, SkinToneClassifier, SkinToneResult, ToneLevel, Undertone};
pub use types::{BoundingBox, LabColor, LandmarkError, LandmarkSet, Point3};
