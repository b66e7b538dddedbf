//! Landmark region extraction and facial geometry.
//!
//! Turns a landmark set into pixel crops (cheeks, forehead, scalp) and a
//! named set of scalar measurements. Crops that clip to nothing come back
//! empty (0×0); callers treat that as "no data".

use crate::landmarks::index;
use crate::types::{BoundingBox, LandmarkSet};
use image::{imageops, RgbImage};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- Named constants ---
const REGION_PADDING: i32 = 5;
const SCALP_HEIGHT_FRACTION: f32 = 0.5;
const SCALP_WIDEN_FRACTION: f32 = 0.1;
const SCALP_MIN_SIZE: i64 = 10;

/// Named geometric quantities derived from a landmark set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Measure {
    FaceLength,
    FaceWidth,
    ForeheadWidth,
    JawWidth,
    CheekboneWidth,
    /// Degrees, at the chin between the two jaw points.
    JawlineAngle,
    LengthWidthRatio,
    ForeheadJawRatio,
}

/// Mapping from [`Measure`] to value.
///
/// Distances are ≥ 0. Ratios are 0 when their denominator is 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceMeasurements(BTreeMap<Measure, f32>);

impl FaceMeasurements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, measure: Measure) -> Option<f32> {
        self.0.get(&measure).copied()
    }

    pub fn insert(&mut self, measure: Measure, value: f32) {
        self.0.insert(measure, value);
    }

    /// Builder-style insert.
    pub fn with(mut self, measure: Measure, value: f32) -> Self {
        self.insert(measure, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Measure, f32)> + '_ {
        self.0.iter().map(|(&k, &v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pixel rectangle, already clipped to the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Derives crops and measurements from landmarks. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionExtractor;

impl RegionExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Padded bounding rectangle of the given landmark indices, clipped to
    /// a `width`×`height` image. `None` when nothing is left after clipping.
    ///
    /// Indices missing from the set are skipped.
    pub fn region_rect(
        &self,
        landmarks: &LandmarkSet,
        indices: &[usize],
        width: u32,
        height: u32,
    ) -> Option<Rect> {
        let mut pts = indices.iter().filter_map(|&i| landmarks.get(i));
        let first = pts.next()?;
        let (mut x_min, mut y_min) = (first.x as i32, first.y as i32);
        let (mut x_max, mut y_max) = (x_min, y_min);
        for p in pts {
            x_min = x_min.min(p.x as i32);
            y_min = y_min.min(p.y as i32);
            x_max = x_max.max(p.x as i32);
            y_max = y_max.max(p.y as i32);
        }

        // Inclusive pixel extent, padded, then clipped.
        let left = x_min.saturating_sub(REGION_PADDING).max(0) as i64;
        let top = y_min.saturating_sub(REGION_PADDING).max(0) as i64;
        let right = (x_max as i64 + 1 + REGION_PADDING as i64).min(width as i64);
        let bottom = (y_max as i64 + 1 + REGION_PADDING as i64).min(height as i64);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rect {
            x: left as u32,
            y: top as u32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        })
    }

    /// Crop the padded bounding rectangle of `indices`. Returns a 0×0 image
    /// when the rectangle clips away entirely.
    pub fn extract_region(
        &self,
        image: &RgbImage,
        landmarks: &LandmarkSet,
        indices: &[usize],
    ) -> RgbImage {
        match self.region_rect(landmarks, indices, image.width(), image.height()) {
            Some(r) => imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image(),
            None => RgbImage::new(0, 0),
        }
    }

    /// Left and right cheek crops.
    pub fn cheek_regions(&self, image: &RgbImage, landmarks: &LandmarkSet) -> (RgbImage, RgbImage) {
        (
            self.extract_region(image, landmarks, &index::LEFT_CHEEK),
            self.extract_region(image, landmarks, &index::RIGHT_CHEEK),
        )
    }

    pub fn forehead_region(&self, image: &RgbImage, landmarks: &LandmarkSet) -> RgbImage {
        self.extract_region(image, landmarks, &index::FOREHEAD)
    }

    /// Non-empty skin sampling regions: left cheek, right cheek, forehead.
    pub fn skin_regions(&self, image: &RgbImage, landmarks: &LandmarkSet) -> Vec<RgbImage> {
        let (left, right) = self.cheek_regions(image, landmarks);
        let forehead = self.forehead_region(image, landmarks);
        [left, right, forehead]
            .into_iter()
            .filter(|r| r.width() > 0 && r.height() > 0)
            .collect()
    }

    /// Geometric measurements for face-shape classification.
    pub fn measurements(&self, landmarks: &LandmarkSet) -> FaceMeasurements {
        let distance = |a: usize, b: usize| match (landmarks.get(a), landmarks.get(b)) {
            (Some(p), Some(q)) => p.distance_2d(q),
            _ => 0.0,
        };

        let face_length = distance(index::FACE_TOP, index::CHIN);
        let face_width = distance(index::FACE_LEFT, index::FACE_RIGHT);
        let forehead_width = distance(index::FOREHEAD_LEFT, index::FOREHEAD_RIGHT);
        let jaw_width = distance(index::JAW_LEFT, index::JAW_RIGHT);
        let cheekbone_width = distance(index::CHEEKBONE_LEFT, index::CHEEKBONE_RIGHT);
        let jawline_angle = jawline_angle(landmarks);

        FaceMeasurements::new()
            .with(Measure::FaceLength, face_length)
            .with(Measure::FaceWidth, face_width)
            .with(Measure::ForeheadWidth, forehead_width)
            .with(Measure::JawWidth, jaw_width)
            .with(Measure::CheekboneWidth, cheekbone_width)
            .with(Measure::JawlineAngle, jawline_angle)
            .with(Measure::LengthWidthRatio, ratio(face_length, face_width))
            .with(Measure::ForeheadJawRatio, ratio(forehead_width, jaw_width))
    }

    /// Rectangle above the face box: half the face height tall, widened by
    /// 10% of the face width on each side. `None` if either side is < 10px.
    pub fn scalp_rect(&self, bbox: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
        let (img_w, img_h) = (width as i64, height as i64);
        let (x, y) = (bbox.x as i64, bbox.y as i64);

        let scalp_height = (bbox.height as f32 * SCALP_HEIGHT_FRACTION) as i64;
        let top = (y - scalp_height).max(0);
        let bottom = y.min(img_h);
        let h = bottom - top;

        let left = (x - (bbox.width as f32 * SCALP_WIDEN_FRACTION) as i64).max(0);
        let widened = (bbox.width as f32 * (1.0 + 2.0 * SCALP_WIDEN_FRACTION)) as i64;
        let w = (img_w - left).min(widened);

        if h < SCALP_MIN_SIZE || w < SCALP_MIN_SIZE {
            return None;
        }

        Some(Rect {
            x: left as u32,
            y: top as u32,
            width: w as u32,
            height: h as u32,
        })
    }

    pub fn scalp_region(&self, image: &RgbImage, bbox: &BoundingBox) -> Option<RgbImage> {
        let r = self.scalp_rect(bbox, image.width(), image.height())?;
        Some(imageops::crop_imm(image, r.x, r.y, r.width, r.height).to_image())
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Angle at the chin between the chin→left-jaw and chin→right-jaw vectors,
/// in degrees. 0 when either vector is degenerate.
fn jawline_angle(landmarks: &LandmarkSet) -> f32 {
    let (Some(left), Some(right), Some(chin)) = (
        landmarks.get(index::JAW_LEFT),
        landmarks.get(index::JAW_RIGHT),
        landmarks.get(index::CHIN),
    ) else {
        return 0.0;
    };

    let (v1x, v1y) = (left.x - chin.x, left.y - chin.y);
    let (v2x, v2y) = (right.x - chin.x, right.y - chin.y);
    let norms = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
    if norms <= 0.0 {
        return 0.0;
    }

    // Clip into the arccos domain; rounding can push |cos| just past 1.
    let cos = ((v1x * v2x + v1y * v2y) / norms).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Point3, MESH_LANDMARK_COUNT};
    use image::Rgb;

    fn mesh_with(overrides: &[(usize, f32, f32)]) -> LandmarkSet {
        let mut points = vec![Point3::new(100.0, 100.0, 0.0); MESH_LANDMARK_COUNT];
        for &(i, x, y) in overrides {
            points[i] = Point3::new(x, y, 0.0);
        }
        LandmarkSet::new(points).unwrap()
    }

    #[test]
    fn test_region_rect_pads_and_clips() {
        let lm = mesh_with(&[(0, 2.0, 3.0), (1, 20.0, 30.0)]);
        let r = RegionExtractor.region_rect(&lm, &[0, 1], 200, 200).unwrap();
        // min clipped to 0, max 20/30 inclusive plus 5px
        assert_eq!(r, Rect { x: 0, y: 0, width: 26, height: 36 });
    }

    #[test]
    fn test_region_rect_interior() {
        let lm = mesh_with(&[(0, 50.0, 60.0), (1, 70.0, 90.0)]);
        let r = RegionExtractor.region_rect(&lm, &[0, 1], 200, 200).unwrap();
        assert_eq!(r, Rect { x: 45, y: 55, width: 31, height: 41 });
    }

    #[test]
    fn test_region_outside_image_is_empty() {
        let lm = mesh_with(&[(0, 500.0, 500.0), (1, 520.0, 530.0)]);
        let image = RgbImage::new(100, 100);
        let crop = RegionExtractor.extract_region(&image, &lm, &[0, 1]);
        assert_eq!((crop.width(), crop.height()), (0, 0));
    }

    #[test]
    fn test_extract_region_copies_pixels() {
        let mut image = RgbImage::new(100, 100);
        image.put_pixel(40, 40, Rgb([9, 8, 7]));
        let lm = mesh_with(&[(0, 40.0, 40.0)]);
        let crop = RegionExtractor.extract_region(&image, &lm, &[0]);
        assert_eq!((crop.width(), crop.height()), (11, 11));
        assert_eq!(crop.get_pixel(5, 5), &Rgb([9, 8, 7]));
    }

    #[test]
    fn test_measurements_distances_and_ratios() {
        let lm = mesh_with(&[
            (index::FACE_TOP, 100.0, 0.0),
            (index::CHIN, 100.0, 240.0),
            (index::FACE_LEFT, 0.0, 100.0),
            (index::FACE_RIGHT, 200.0, 100.0),
            (index::FOREHEAD_LEFT, 30.0, 40.0),
            (index::FOREHEAD_RIGHT, 170.0, 40.0),
            (index::JAW_LEFT, 40.0, 200.0),
            (index::JAW_RIGHT, 160.0, 200.0),
        ]);
        let m = RegionExtractor.measurements(&lm);
        assert!((m.get(Measure::FaceLength).unwrap() - 240.0).abs() < 1e-4);
        assert!((m.get(Measure::FaceWidth).unwrap() - 200.0).abs() < 1e-4);
        assert!((m.get(Measure::CheekboneWidth).unwrap() - 200.0).abs() < 1e-4);
        assert!((m.get(Measure::ForeheadWidth).unwrap() - 140.0).abs() < 1e-4);
        assert!((m.get(Measure::JawWidth).unwrap() - 120.0).abs() < 1e-4);
        assert!((m.get(Measure::LengthWidthRatio).unwrap() - 1.2).abs() < 1e-5);
        assert!((m.get(Measure::ForeheadJawRatio).unwrap() - 140.0 / 120.0).abs() < 1e-5);
        assert_eq!(m.len(), 8);
    }

    #[test]
    fn test_jawline_angle_right_angle() {
        // Chin at origin-ish, jaw points at 45 degrees either side -> 90
        let lm = mesh_with(&[
            (index::CHIN, 100.0, 100.0),
            (index::JAW_LEFT, 50.0, 50.0),
            (index::JAW_RIGHT, 150.0, 50.0),
        ]);
        let angle = RegionExtractor.measurements(&lm).get(Measure::JawlineAngle).unwrap();
        assert!((angle - 90.0).abs() < 1e-3, "angle = {angle}");
    }

    #[test]
    fn test_jawline_angle_collinear_stays_in_domain() {
        let lm = mesh_with(&[
            (index::CHIN, 100.0, 100.0),
            (index::JAW_LEFT, 0.0, 100.0),
            (index::JAW_RIGHT, 200.0, 100.0),
        ]);
        let angle = RegionExtractor.measurements(&lm).get(Measure::JawlineAngle).unwrap();
        assert!((angle - 180.0).abs() < 1e-3);
        assert!(angle.is_finite());
    }

    #[test]
    fn test_degenerate_measurements_report_zero() {
        // All points coincide: every distance, ratio and the angle are 0
        let lm = mesh_with(&[]);
        let m = RegionExtractor.measurements(&lm);
        for (measure, value) in m.iter() {
            assert_eq!(value, 0.0, "{measure:?}");
        }
    }

    #[test]
    fn test_scalp_rect_above_face() {
        let bbox = BoundingBox { x: 100, y: 200, width: 200, height: 240 };
        let r = RegionExtractor.scalp_rect(&bbox, 640, 640).unwrap();
        assert_eq!(r, Rect { x: 80, y: 80, width: 240, height: 120 });
    }

    #[test]
    fn test_scalp_rect_clips_to_image() {
        let bbox = BoundingBox { x: 5, y: 50, width: 200, height: 300 };
        let r = RegionExtractor.scalp_rect(&bbox, 150, 400).unwrap();
        assert_eq!(r.y, 0);
        assert_eq!(r.height, 50);
        assert_eq!(r.x, 0);
        assert_eq!(r.width, 150);
    }

    #[test]
    fn test_scalp_rect_too_small() {
        // Face touches the top edge: no room above
        let bbox = BoundingBox { x: 100, y: 4, width: 200, height: 240 };
        assert!(RegionExtractor.scalp_rect(&bbox, 640, 640).is_none());
        let image = RgbImage::new(640, 640);
        assert!(RegionExtractor.scalp_region(&image, &bbox).is_none());
    }

    #[test]
    fn test_scalp_rect_extreme_boxes() {
        // Far above the frame with a huge height
        let bbox = BoundingBox { x: 100, y: -2_000_000_000, width: 200, height: 2_000_000_100 };
        assert!(RegionExtractor.scalp_rect(&bbox, 640, 640).is_none());

        // Saturated extents on both axes
        let bbox = BoundingBox { x: i32::MIN, y: i32::MIN, width: i32::MAX, height: i32::MAX };
        assert!(RegionExtractor.scalp_rect(&bbox, 640, 640).is_none());

        // Spans the whole frame horizontally, face top at y = 300
        let bbox = BoundingBox { x: i32::MIN, y: 300, width: i32::MAX, height: 200 };
        let r = RegionExtractor.scalp_rect(&bbox, 640, 640).unwrap();
        assert_eq!(r, Rect { x: 0, y: 200, width: 640, height: 100 });
    }

    #[test]
    fn test_measurements_serialize_as_named_map() {
        let m = FaceMeasurements::new().with(Measure::JawlineAngle, 140.0);
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["jawline_angle"], 140.0);
    }
}
