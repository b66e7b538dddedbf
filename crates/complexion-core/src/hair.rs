//! Hair coverage estimation over the scalp strip above the face.

use crate::color::to_hsv8;
use crate::regions::RegionExtractor;
use crate::types::BoundingBox;
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::{edges, morphology};
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Named constants ---
const FULL_COVERAGE_PERCENT: f32 = 80.0;
const THINNING_COVERAGE_PERCENT: f32 = 40.0;

const DARK_THRESHOLD_FLOOR: f32 = 50.0;
const DARK_THRESHOLD_FRACTION: f32 = 0.6;
const LOW_SATURATION: u8 = 80;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
/// Two passes of a 3×3 cross.
const TEXTURE_DILATION: u8 = 2;

const CONFIDENCE_BASE: f32 = 0.7;
const CONFIDENCE_MAX: f32 = 0.95;
const NO_SCALP_CONFIDENCE: f32 = 0.5;

/// Coverage level, ordered `Bald < Thinning < Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageLevel {
    Bald,
    Thinning,
    Full,
}

impl CoverageLevel {
    pub fn from_percentage(percentage: f32) -> Self {
        if percentage >= FULL_COVERAGE_PERCENT {
            CoverageLevel::Full
        } else if percentage >= THINNING_COVERAGE_PERCENT {
            CoverageLevel::Thinning
        } else {
            CoverageLevel::Bald
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CoverageLevel::Bald => "bald",
            CoverageLevel::Thinning => "thinning",
            CoverageLevel::Full => "full",
        }
    }

    pub fn requires_alternative_styling(self) -> bool {
        self != CoverageLevel::Full
    }
}

impl fmt::Display for CoverageLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HairCoverageResult {
    pub level: CoverageLevel,
    /// Hair pixels over scalp pixels, 0–100.
    pub percentage: f32,
    pub confidence: f32,
    pub requires_alternative_styling: bool,
}

impl HairCoverageResult {
    fn new(level: CoverageLevel, percentage: f32, confidence: f32) -> Self {
        Self {
            level,
            percentage,
            confidence,
            requires_alternative_styling: level.requires_alternative_styling(),
        }
    }

    /// Result used when no scalp is visible. Missing data is not evidence
    /// of baldness.
    pub fn unobserved() -> Self {
        Self::new(CoverageLevel::Full, 100.0, NO_SCALP_CONFIDENCE)
    }
}

/// Hair pixel estimate for one scalp crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub percentage: f32,
    /// Fraction of pixels on a Canny edge, before dilation.
    pub edge_density: f32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HairCoverageClassifier {
    extractor: RegionExtractor,
}

impl HairCoverageClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&self, image: &RgbImage, face: &BoundingBox) -> HairCoverageResult {
        let Some(scalp) = self.extractor.scalp_region(image, face) else {
            tracing::warn!(?face, "scalp region too small, assuming full coverage");
            return HairCoverageResult::unobserved();
        };

        let Coverage {
            percentage,
            edge_density,
        } = coverage(&scalp);
        let level = CoverageLevel::from_percentage(percentage);
        let confidence = coverage_confidence(edge_density);

        tracing::debug!(
            width = scalp.width(),
            height = scalp.height(),
            percentage,
            edge_density,
            level = level.as_str(),
            "hair coverage classified"
        );

        HairCoverageResult::new(level, percentage, confidence)
    }
}

/// Confidence grows with scalp texture: `0.7 + 0.5 × edge_density`, capped at 0.95.
pub fn coverage_confidence(edge_density: f32) -> f32 {
    (CONFIDENCE_BASE + edge_density * 0.5).min(CONFIDENCE_MAX)
}

/// Estimate hair coverage of a scalp crop.
///
/// A pixel is hair when it is dark relative to the crop and either
/// unsaturated or near an edge.
pub fn coverage(scalp: &RgbImage) -> Coverage {
    let total = scalp.width() as usize * scalp.height() as usize;
    if total == 0 {
        return Coverage {
            percentage: 100.0,
            edge_density: 0.0,
        };
    }

    let gray = imageops::grayscale(scalp);
    let mean = gray.pixels().map(|p| p[0] as f64).sum::<f64>() / total as f64;
    let dark_threshold = DARK_THRESHOLD_FLOOR.max(mean as f32 * DARK_THRESHOLD_FRACTION);

    let edge_map = edges::canny(&gray, CANNY_LOW, CANNY_HIGH);
    let edge_pixels = edge_map.pixels().filter(|p| p[0] > 0).count();
    let texture = morphology::dilate(&edge_map, Norm::L1, TEXTURE_DILATION);

    let mut hair = GrayImage::new(scalp.width(), scalp.height());
    for (x, y, px) in scalp.enumerate_pixels() {
        let dark = (gray.get_pixel(x, y)[0] as f32) < dark_threshold;
        let low_saturation = to_hsv8(px).s < LOW_SATURATION;
        let textured = texture.get_pixel(x, y)[0] > 0;
        if dark && (low_saturation || textured) {
            hair.put_pixel(x, y, Luma([255]));
        }
    }
    let hair = morphology::close(&hair, Norm::L1, 1);
    let hair = morphology::open(&hair, Norm::L1, 1);

    let hair_pixels = hair.pixels().filter(|p| p[0] > 0).count();
    Coverage {
        percentage: (hair_pixels as f32 / total as f32 * 100.0).clamp(0.0, 100.0),
        edge_density: edge_pixels as f32 / total as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const DARK_HAIR: Rgb<u8> = Rgb([20, 20, 20]);
    const SKIN: Rgb<u8> = Rgb([224, 172, 140]);

    fn face_box() -> BoundingBox {
        BoundingBox {
            x: 40,
            y: 60,
            width: 80,
            height: 100,
        }
    }

    #[test]
    fn test_level_thresholds() {
        assert_eq!(CoverageLevel::from_percentage(100.0), CoverageLevel::Full);
        assert_eq!(CoverageLevel::from_percentage(80.0), CoverageLevel::Full);
        assert_eq!(CoverageLevel::from_percentage(79.9), CoverageLevel::Thinning);
        assert_eq!(CoverageLevel::from_percentage(40.0), CoverageLevel::Thinning);
        assert_eq!(CoverageLevel::from_percentage(39.9), CoverageLevel::Bald);
        assert_eq!(CoverageLevel::from_percentage(0.0), CoverageLevel::Bald);
    }

    #[test]
    fn test_level_ordering() {
        assert!(CoverageLevel::Full > CoverageLevel::Thinning);
        assert!(CoverageLevel::Thinning > CoverageLevel::Bald);
        assert!(!CoverageLevel::Full.requires_alternative_styling());
        assert!(CoverageLevel::Thinning.requires_alternative_styling());
        assert!(CoverageLevel::Bald.requires_alternative_styling());
    }

    #[test]
    fn test_no_scalp_defaults_to_full() {
        // Face touches the top edge: nothing above it
        let image = RgbImage::from_pixel(200, 200, SKIN);
        let face = BoundingBox {
            x: 40,
            y: 0,
            width: 80,
            height: 100,
        };
        let result = HairCoverageClassifier::new().analyze(&image, &face);
        assert_eq!(result, HairCoverageResult::unobserved());
        assert_eq!(result.level, CoverageLevel::Full);
        assert_eq!(result.percentage, 100.0);
        assert_eq!(result.confidence, 0.5);
        assert!(!result.requires_alternative_styling);
    }

    #[test]
    fn test_uniform_dark_scalp_is_full() {
        let image = RgbImage::from_pixel(200, 200, DARK_HAIR);
        let result = HairCoverageClassifier::new().analyze(&image, &face_box());
        assert_eq!(result.level, CoverageLevel::Full);
        assert!((result.percentage - 100.0).abs() < 1e-3);
        // No edges in a flat crop
        assert!((result.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_skin_scalp_is_bald() {
        let image = RgbImage::from_pixel(200, 200, SKIN);
        let result = HairCoverageClassifier::new().analyze(&image, &face_box());
        assert_eq!(result.level, CoverageLevel::Bald);
        assert_eq!(result.percentage, 0.0);
        assert!((result.confidence - 0.7).abs() < 1e-6);
        assert!(result.requires_alternative_styling);
    }

    #[test]
    fn test_confidence_tracks_edge_density_up_to_cap() {
        assert!((coverage_confidence(0.0) - 0.7).abs() < 1e-6);
        assert!((coverage_confidence(0.2) - 0.8).abs() < 1e-6);
        assert!((coverage_confidence(0.5) - 0.95).abs() < 1e-6);
        assert_eq!(coverage_confidence(0.8), 0.95);
        assert_eq!(coverage_confidence(1.0), 0.95);
    }

    #[test]
    fn test_textured_scalp_raises_confidence() {
        // Vertical strands, 6 px wide
        let image = RgbImage::from_fn(200, 200, |x, _| {
            if (x / 6) % 2 == 0 {
                DARK_HAIR
            } else {
                SKIN
            }
        });
        let face = face_box();
        let result = HairCoverageClassifier::new().analyze(&image, &face);

        let scalp = RegionExtractor::default()
            .scalp_region(&image, &face)
            .expect("scalp above face");
        let density = coverage(&scalp).edge_density;
        assert!(density > 0.0);
        assert!(result.confidence > 0.7, "confidence {}", result.confidence);
        let expected = (0.7 + 0.5 * density).min(0.95);
        assert!((result.confidence - expected).abs() < 1e-6);
    }

    #[test]
    fn test_half_covered_scalp_is_thinning() {
        let scalp = RgbImage::from_fn(60, 40, |_, y| if y < 20 { DARK_HAIR } else { SKIN });
        let c = coverage(&scalp);
        assert!((c.percentage - 50.0).abs() < 0.01, "coverage {}", c.percentage);
        assert!(c.edge_density > 0.0 && c.edge_density < 0.2);
        assert_eq!(CoverageLevel::from_percentage(c.percentage), CoverageLevel::Thinning);
    }

    #[test]
    fn test_percentage_bounded_for_any_size() {
        for (w, h) in [(3, 3), (10, 10), (33, 17)] {
            let scalp = RgbImage::from_fn(w, h, |x, y| {
                if (x + y) % 2 == 0 {
                    DARK_HAIR
                } else {
                    SKIN
                }
            });
            let c = coverage(&scalp);
            assert!((0.0..=100.0).contains(&c.percentage), "{w}x{h}: {}", c.percentage);
            assert!((0.0..=1.0).contains(&c.edge_density));
        }
        assert_eq!(coverage(&RgbImage::new(0, 0)).percentage, 100.0);
    }
}
