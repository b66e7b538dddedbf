//! Flat, caller-facing view of a [`FaceAnalysisResult`].
//!
//! Sub-objects are omitted when the corresponding result is absent.

use crate::analyzer::FaceAnalysisResult;
use crate::face_shape::{FaceShape, FaceShapeResult};
use crate::hair::{CoverageLevel, HairCoverageResult};
use crate::skin_tone::{Season, SkinToneResult, Undertone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub detected: bool,
    pub overall_confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skin_tone: Option<SkinToneReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_shape: Option<FaceShapeReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hair_coverage: Option<HairCoverageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_season: Option<Season>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinToneReport {
    /// `TYPE_I` .. `TYPE_VI`
    pub fitzpatrick_type: String,
    pub fitzpatrick_value: u8,
    pub undertone: Undertone,
    pub confidence: f32,
    pub hex_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceShapeReport {
    pub shape: FaceShape,
    pub confidence: f32,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HairCoverageReport {
    pub level: CoverageLevel,
    pub percentage: f32,
    pub confidence: f32,
    pub requires_alternative_styling: bool,
}

impl From<&SkinToneResult> for SkinToneReport {
    fn from(r: &SkinToneResult) -> Self {
        Self {
            fitzpatrick_type: r.tone.name().to_string(),
            fitzpatrick_value: r.tone.value(),
            undertone: r.undertone,
            confidence: r.confidence,
            hex_color: r.hex_color.clone(),
        }
    }
}

impl From<&FaceShapeResult> for FaceShapeReport {
    fn from(r: &FaceShapeResult) -> Self {
        Self {
            shape: r.shape,
            confidence: r.confidence,
            reasoning: r.reasoning.clone(),
        }
    }
}

impl From<&HairCoverageResult> for HairCoverageReport {
    fn from(r: &HairCoverageResult) -> Self {
        Self {
            level: r.level,
            percentage: r.percentage,
            confidence: r.confidence,
            requires_alternative_styling: r.requires_alternative_styling,
        }
    }
}

impl From<&FaceAnalysisResult> for AnalysisReport {
    fn from(r: &FaceAnalysisResult) -> Self {
        Self {
            detected: r.detected,
            overall_confidence: r.overall_confidence,
            skin_tone: r.skin_tone.as_ref().map(Into::into),
            face_shape: r.face_shape.as_ref().map(Into::into),
            hair_coverage: r.hair_coverage.as_ref().map(Into::into),
            color_season: r.color_season,
        }
    }
}

impl FaceAnalysisResult {
    pub fn to_report(&self) -> AnalysisReport {
        self.into()
    }
}
