//! Single-image pipeline from landmarks to a combined analysis result.

use crate::face_shape::{FaceShapeClassifier, FaceShapeResult};
use crate::hair::{HairCoverageClassifier, HairCoverageResult};
use crate::landmarks::LandmarkProvider;
use crate::regions::RegionExtractor;
use crate::skin_tone::{Season, SkinToneClassifier, SkinToneResult};
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Everything known about one analyzed face.
///
/// `overall_confidence` is the mean of the sub-confidences that are present,
/// 0.0 when none are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceAnalysisResult {
    pub detected: bool,
    pub skin_tone: Option<SkinToneResult>,
    pub face_shape: Option<FaceShapeResult>,
    pub hair_coverage: Option<HairCoverageResult>,
    pub color_season: Option<Season>,
    pub overall_confidence: f32,
}

impl FaceAnalysisResult {
    /// Result for an image with no detectable face.
    pub fn undetected() -> Self {
        Self {
            detected: false,
            skin_tone: None,
            face_shape: None,
            hair_coverage: None,
            color_season: None,
            overall_confidence: 0.0,
        }
    }

    fn detected(
        skin_tone: Option<SkinToneResult>,
        face_shape: Option<FaceShapeResult>,
        hair_coverage: Option<HairCoverageResult>,
    ) -> Self {
        let confidences: Vec<f32> = [
            skin_tone.as_ref().map(|r| r.confidence),
            face_shape.as_ref().map(|r| r.confidence),
            hair_coverage.as_ref().map(|r| r.confidence),
        ]
        .into_iter()
        .flatten()
        .collect();
        let overall_confidence = if confidences.is_empty() {
            0.0
        } else {
            confidences.iter().sum::<f32>() / confidences.len() as f32
        };

        Self {
            detected: true,
            color_season: skin_tone.as_ref().map(SkinToneResult::season),
            skin_tone,
            face_shape,
            hair_coverage,
            overall_confidence,
        }
    }
}

/// Single-image analysis pipeline.
///
/// Holds no mutable state; one instance can be shared across threads and
/// reused for any number of images.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceAnalyzer {
    regions: RegionExtractor,
    skin_tone: SkinToneClassifier,
    face_shape: FaceShapeClassifier,
    hair: HairCoverageClassifier,
}

impl FaceAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full pipeline on one image.
    ///
    /// Landmark detection is delegated to `provider`. When it finds no face
    /// the result is [`FaceAnalysisResult::undetected`].
    pub fn analyze<P>(&self, image: &RgbImage, provider: &P) -> FaceAnalysisResult
    where
        P: LandmarkProvider + ?Sized,
    {
        let span = tracing::debug_span!("face_analysis", width = image.width(), height = image.height());
        let _guard = span.enter();

        let Some(landmarks) = provider.detect(image) else {
            tracing::info!("no face detected");
            return FaceAnalysisResult::undetected();
        };
        let bbox = landmarks.bounding_box();
        tracing::info!(points = landmarks.len(), ?bbox, "face detected");

        let skin_regions = self.regions.skin_regions(image, &landmarks);
        let skin_tone = self.skin_tone.analyze(&skin_regions);
        if skin_tone.is_none() {
            tracing::warn!("no usable skin region, skin tone omitted");
        }

        let measurements = self.regions.measurements(&landmarks);
        let face_shape = self.face_shape.classify(&measurements);

        let hair_coverage = self.hair.analyze(image, &bbox);

        let result = FaceAnalysisResult::detected(skin_tone, Some(face_shape), Some(hair_coverage));
        tracing::info!(
            tone = result.skin_tone.as_ref().map(|r| r.tone.name()),
            shape = result.face_shape.as_ref().map(|r| r.shape.as_str()),
            hair = result.hair_coverage.as_ref().map(|r| r.level.as_str()),
            season = result.color_season.map(Season::as_str),
            overall_confidence = result.overall_confidence,
            "analysis complete"
        );
        result
    }
}
