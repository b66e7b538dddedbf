//! Rule-based face shape classification from facial proportions.
//!
//! Each shape owns an independent scoring function over the same five
//! quantities. The highest score wins; a winner below [`MIN_WINNING_SCORE`]
//! is replaced by oval.

use crate::regions::{FaceMeasurements, Measure};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Named constants ---
const DEFAULT_RATIO: f32 = 1.0;
const DEFAULT_JAWLINE_ANGLE: f32 = 140.0;
const DEFAULT_WIDTH: f32 = 1.0;

const ROUND_LENGTH_WIDTH: f32 = 1.1;
const OBLONG_LENGTH_WIDTH: f32 = 1.3;
const HEART_FOREHEAD_JAW: f32 = 1.1;
const TRIANGLE_FOREHEAD_JAW: f32 = 0.9;
const SQUARE_JAWLINE_ANGLE: f32 = 150.0;
const DIAMOND_CHEEKBONE: f32 = 1.05;

pub const MIN_WINNING_SCORE: f32 = 0.3;
const FALLBACK_CONFIDENCE: f32 = 0.6;
const MAX_CONFIDENCE: f32 = 0.98;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    Oval,
    Round,
    Square,
    Heart,
    Oblong,
    Diamond,
    Triangle,
}

/// Scoring order. On an exact tie the earlier shape wins.
pub const SCORING_ORDER: [FaceShape; 7] = [
    FaceShape::Round,
    FaceShape::Oblong,
    FaceShape::Heart,
    FaceShape::Triangle,
    FaceShape::Square,
    FaceShape::Diamond,
    FaceShape::Oval,
];

impl FaceShape {
    pub fn as_str(self) -> &'static str {
        match self {
            FaceShape::Oval => "oval",
            FaceShape::Round => "round",
            FaceShape::Square => "square",
            FaceShape::Heart => "heart",
            FaceShape::Oblong => "oblong",
            FaceShape::Diamond => "diamond",
            FaceShape::Triangle => "triangle",
        }
    }

    /// Match score for this shape, roughly in [0, 1].
    pub fn score(self, f: &ShapeFeatures) -> f32 {
        match self {
            FaceShape::Round => score_round(f),
            FaceShape::Oblong => score_oblong(f),
            FaceShape::Heart => score_heart(f),
            FaceShape::Triangle => score_triangle(f),
            FaceShape::Square => score_square(f),
            FaceShape::Diamond => score_diamond(f),
            FaceShape::Oval => score_oval(f),
        }
    }

    fn reasoning(self, f: &ShapeFeatures) -> String {
        match self {
            FaceShape::Oval => format!(
                "Balanced proportions with length-to-width ratio of {:.2}",
                f.length_width
            ),
            FaceShape::Round => format!(
                "Face length approximately equals width (ratio: {:.2})",
                f.length_width
            ),
            FaceShape::Square => format!(
                "Angular jawline ({:.0}°) with balanced proportions",
                f.jawline_angle
            ),
            FaceShape::Heart => format!("Forehead wider than jaw (ratio: {:.2})", f.forehead_jaw),
            FaceShape::Oblong => format!(
                "Face length significantly exceeds width (ratio: {:.2})",
                f.length_width
            ),
            FaceShape::Diamond => "Prominent cheekbones with narrower forehead and jaw".to_string(),
            FaceShape::Triangle => format!("Jaw wider than forehead (ratio: {:.2})", f.forehead_jaw),
        }
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five quantities every shape is scored on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeFeatures {
    pub length_width: f32,
    pub forehead_jaw: f32,
    pub jawline_angle: f32,
    pub cheekbone_forehead: f32,
    pub cheekbone_jaw: f32,
}

impl ShapeFeatures {
    /// Missing measurements take neutral defaults: ratios 1.0, angle 140°,
    /// widths 1.0.
    pub fn from_measurements(m: &FaceMeasurements) -> Self {
        let forehead = m.get(Measure::ForeheadWidth).unwrap_or(DEFAULT_WIDTH);
        let jaw = m.get(Measure::JawWidth).unwrap_or(DEFAULT_WIDTH);
        let cheekbone = m.get(Measure::CheekboneWidth).unwrap_or(DEFAULT_WIDTH);

        Self {
            length_width: m.get(Measure::LengthWidthRatio).unwrap_or(DEFAULT_RATIO),
            forehead_jaw: m.get(Measure::ForeheadJawRatio).unwrap_or(DEFAULT_RATIO),
            jawline_angle: m.get(Measure::JawlineAngle).unwrap_or(DEFAULT_JAWLINE_ANGLE),
            cheekbone_forehead: if forehead > 0.0 { cheekbone / forehead } else { 1.0 },
            cheekbone_jaw: if jaw > 0.0 { cheekbone / jaw } else { 1.0 },
        }
    }
}

fn when(condition: bool, weight: f32) -> f32 {
    if condition {
        weight
    } else {
        0.0
    }
}

fn between(value: f32, low: f32, high: f32) -> bool {
    low < value && value < high
}

fn score_round(f: &ShapeFeatures) -> f32 {
    when(f.length_width < ROUND_LENGTH_WIDTH, 0.4)
        + when(between(f.forehead_jaw, 0.95, 1.05), 0.3)
        + when(f.jawline_angle < 145.0, 0.3)
}

fn score_oblong(f: &ShapeFeatures) -> f32 {
    let long = f.length_width > OBLONG_LENGTH_WIDTH;
    when(long, 0.6)
        + when(long, ((f.length_width - OBLONG_LENGTH_WIDTH) * 0.5).min(0.4))
        + when(between(f.forehead_jaw, 0.9, 1.1), 0.2)
}

fn score_heart(f: &ShapeFeatures) -> f32 {
    let wide_forehead = f.forehead_jaw > HEART_FOREHEAD_JAW;
    when(wide_forehead, 0.5)
        + when(wide_forehead, ((f.forehead_jaw - HEART_FOREHEAD_JAW) * 0.3).min(0.3))
        + when(f.length_width > 1.0, 0.2)
}

fn score_triangle(f: &ShapeFeatures) -> f32 {
    let wide_jaw = f.forehead_jaw < TRIANGLE_FOREHEAD_JAW;
    when(wide_jaw, 0.5) + when(wide_jaw, ((TRIANGLE_FOREHEAD_JAW - f.forehead_jaw) * 0.3).min(0.3))
}

fn score_square(f: &ShapeFeatures) -> f32 {
    when(f.jawline_angle > SQUARE_JAWLINE_ANGLE, 0.4)
        + when(f.length_width < 1.15, 0.3)
        + when(between(f.forehead_jaw, 0.9, 1.1), 0.3)
}

fn score_diamond(f: &ShapeFeatures) -> f32 {
    when(f.cheekbone_forehead > DIAMOND_CHEEKBONE, 0.4)
        + when(f.cheekbone_jaw > DIAMOND_CHEEKBONE, 0.4)
        + when(between(f.length_width, 1.1, 1.3), 0.2)
}

fn score_oval(f: &ShapeFeatures) -> f32 {
    when(between(f.length_width, 1.1, 1.3), 0.4)
        + when(between(f.forehead_jaw, 0.9, 1.1), 0.3)
        + when(between(f.jawline_angle, 130.0, 150.0), 0.3)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceShapeResult {
    pub shape: FaceShape,
    pub confidence: f32,
    /// Measurements the classification was made from.
    pub measurements: FaceMeasurements,
    pub reasoning: String,
}

/// Stateless face shape classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaceShapeClassifier;

impl FaceShapeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a measurement set. Never fails.
    pub fn classify(&self, measurements: &FaceMeasurements) -> FaceShapeResult {
        let features = ShapeFeatures::from_measurements(measurements);
        let scores = SCORING_ORDER.map(|shape| (shape, shape.score(&features)));

        let mut best = scores[0];
        for &candidate in &scores[1..] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }
        let runner_up = scores
            .iter()
            .filter(|(shape, _)| *shape != best.0)
            .map(|&(_, score)| score)
            .fold(f32::NEG_INFINITY, f32::max);

        let (shape, confidence) = if best.1 < MIN_WINNING_SCORE {
            tracing::warn!(best = ?best.0, score = best.1, "no shape cleared minimum score, using oval");
            (FaceShape::Oval, FALLBACK_CONFIDENCE)
        } else {
            let gap = best.1 - runner_up;
            (best.0, (0.7 + gap * 0.5).min(MAX_CONFIDENCE))
        };

        tracing::debug!(
            shape = shape.as_str(),
            confidence,
            length_width = features.length_width,
            forehead_jaw = features.forehead_jaw,
            jawline_angle = features.jawline_angle,
            ?scores,
            "face shape classified"
        );

        FaceShapeResult {
            shape,
            confidence,
            measurements: measurements.clone(),
            reasoning: shape.reasoning(&features),
        }
    }
}
