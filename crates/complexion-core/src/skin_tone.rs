//! Skin tone and undertone classification in CIE L*a*b*.
//!
//! Skin pixels are isolated with two HSV ranges, cleaned with a morphological
//! open/close, converted to Lab and pooled across regions. Mean L* selects one
//! of six Fitzpatrick-style tone levels; the shifted b*/a* ratio selects the
//! undertone.

use crate::color::{lab_to_hex, to_hsv8, to_lab};
use crate::types::{ColorSample, LabColor};
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::morphology;
use serde::{Deserialize, Serialize};
use std::fmt;

// --- Named constants ---
/// Primary skin range (lighter skin), inclusive HSV bounds on the 8-bit scale.
const SKIN_HSV_LOWER: [u8; 3] = [0, 20, 70];
const SKIN_HSV_UPPER: [u8; 3] = [20, 255, 255];
/// Secondary range reaching darker, less saturated skin.
const SKIN_HSV_LOWER_DARK: [u8; 3] = [0, 10, 60];
const SKIN_HSV_UPPER_DARK: [u8; 3] = [25, 255, 255];
const MIN_SKIN_PIXELS: usize = 10;

/// L* bands, `[low, high)`, lightest first.
const TONE_BANDS: [(ToneLevel, f32, f32); 6] = [
    (ToneLevel::TypeI, 75.0, 100.0),
    (ToneLevel::TypeII, 65.0, 75.0),
    (ToneLevel::TypeIII, 55.0, 65.0),
    (ToneLevel::TypeIV, 45.0, 55.0),
    (ToneLevel::TypeV, 35.0, 45.0),
    (ToneLevel::TypeVI, 0.0, 35.0),
];
const TONE_CONFIDENCE_MIN: f32 = 0.7;
const TONE_CONFIDENCE_MAX: f32 = 0.98;
const TONE_SNAP_CONFIDENCE: f32 = 0.85;

const LAB_CHROMA_SHIFT: f32 = 128.0;
const RATIO_EPSILON: f32 = 0.01;
const WARM_RATIO: f32 = 1.1;
const COOL_RATIO: f32 = 0.9;
const UNDERTONE_CONFIDENCE_MAX: f32 = 0.95;

/// Six-level skin lightness scale, 1 (lightest) to 6 (darkest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToneLevel {
    #[serde(rename = "TYPE_I")]
    TypeI = 1,
    #[serde(rename = "TYPE_II")]
    TypeII = 2,
    #[serde(rename = "TYPE_III")]
    TypeIII = 3,
    #[serde(rename = "TYPE_IV")]
    TypeIV = 4,
    #[serde(rename = "TYPE_V")]
    TypeV = 5,
    #[serde(rename = "TYPE_VI")]
    TypeVI = 6,
}

impl ToneLevel {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// Scale name as reported to callers, e.g. `TYPE_III`.
    pub fn name(self) -> &'static str {
        match self {
            ToneLevel::TypeI => "TYPE_I",
            ToneLevel::TypeII => "TYPE_II",
            ToneLevel::TypeIII => "TYPE_III",
            ToneLevel::TypeIV => "TYPE_IV",
            ToneLevel::TypeV => "TYPE_V",
            ToneLevel::TypeVI => "TYPE_VI",
        }
    }

    pub fn from_value(value: u8) -> Option<Self> {
        TONE_BANDS
            .iter()
            .map(|&(level, _, _)| level)
            .find(|level| level.value() == value)
    }

    pub fn is_light(self) -> bool {
        self.value() <= 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Cool,
    Warm,
    Neutral,
}

impl Undertone {
    pub fn as_str(self) -> &'static str {
        match self {
            Undertone::Cool => "cool",
            Undertone::Warm => "warm",
            Undertone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Undertone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Four-way color season derived from tone level and undertone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Autumn => "autumn",
            Season::Winter => "winter",
        }
    }

    /// Light (levels 1–3) + warm is spring, light + cool summer, dark + warm
    /// autumn, dark + cool winter. Neutral resolves to warm when light and
    /// cool when dark.
    pub fn derive(tone: ToneLevel, undertone: Undertone) -> Self {
        let light = tone.is_light();
        let warm = match undertone {
            Undertone::Warm => true,
            Undertone::Cool => false,
            // Heuristic tie-break, flagged for recalibration.
            Undertone::Neutral => light,
        };
        match (light, warm) {
            (true, true) => Season::Spring,
            (true, false) => Season::Summer,
            (false, true) => Season::Autumn,
            (false, false) => Season::Winter,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinToneResult {
    pub tone: ToneLevel,
    pub undertone: Undertone,
    /// Mean of the tone and undertone confidences.
    pub confidence: f32,
    /// Averaged L*, a*, b* over all pooled skin pixels.
    pub lab: LabColor,
    /// Representative color as `#RRGGBB`.
    pub hex_color: String,
}

impl SkinToneResult {
    pub fn season(&self) -> Season {
        Season::derive(self.tone, self.undertone)
    }
}

/// Stateless skin tone classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinToneClassifier;

impl SkinToneClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify skin tone from one or more skin crops.
    ///
    /// Empty (0-pixel) regions are skipped. Returns `None` when every region
    /// is empty.
    pub fn analyze(&self, regions: &[RgbImage]) -> Option<SkinToneResult> {
        let mut pooled = ColorSample::new();
        for region in regions.iter().filter(|r| r.width() > 0 && r.height() > 0) {
            pooled.extend(skin_sample(region));
        }

        let Some(mean) = pooled.mean() else {
            tracing::debug!(regions = regions.len(), "no skin data in any region");
            return None;
        };

        let result = self.classify_lab(mean);
        tracing::debug!(
            pixels = pooled.len(),
            l = mean.l,
            a = mean.a,
            b = mean.b,
            tone = result.tone.name(),
            undertone = %result.undertone,
            confidence = result.confidence,
            "skin tone classified"
        );
        Some(result)
    }

    /// Classify an already-averaged Lab triple.
    pub fn classify_lab(&self, lab: LabColor) -> SkinToneResult {
        let (tone, tone_confidence) = classify_tone(lab.l);
        let (undertone, undertone_confidence) = classify_undertone(lab.a, lab.b);
        SkinToneResult {
            tone,
            undertone,
            confidence: (tone_confidence + undertone_confidence) / 2.0,
            lab,
            hex_color: lab_to_hex(lab),
        }
    }
}

/// Tone level and confidence for a mean L* value.
///
/// Confidence falls off linearly from the band center and is clamped to
/// [0.7, 0.98]. Values outside every band snap to the nearest end level at
/// 0.85.
pub fn classify_tone(l: f32) -> (ToneLevel, f32) {
    for &(level, low, high) in &TONE_BANDS {
        if (low..high).contains(&l) {
            let center = (low + high) / 2.0;
            let half_width = (high - low) / 2.0;
            let confidence = 1.0 - (l - center).abs() / half_width;
            return (level, confidence.clamp(TONE_CONFIDENCE_MIN, TONE_CONFIDENCE_MAX));
        }
    }

    let level = if l >= TONE_BANDS[0].1 {
        ToneLevel::TypeI
    } else {
        ToneLevel::TypeVI
    };
    tracing::warn!(l, tone = level.name(), "L* outside all tone bands, snapping");
    (level, TONE_SNAP_CONFIDENCE)
}

/// Undertone and confidence from Lab chromaticity.
///
/// a* and b* are shifted by +128 into a non-negative range before taking
/// the b/a ratio.
pub fn classify_undertone(a: f32, b: f32) -> (Undertone, f32) {
    let mut a_shifted = a + LAB_CHROMA_SHIFT;
    let b_shifted = b + LAB_CHROMA_SHIFT;
    if a_shifted == 0.0 {
        a_shifted = RATIO_EPSILON;
    }
    undertone_from_ratio(b_shifted / a_shifted)
}

/// Undertone and confidence for a shifted b/a ratio.
pub fn undertone_from_ratio(ratio: f32) -> (Undertone, f32) {
    if ratio > WARM_RATIO {
        let confidence = 0.7 + (ratio - WARM_RATIO) * 0.1;
        (Undertone::Warm, confidence.min(UNDERTONE_CONFIDENCE_MAX))
    } else if ratio < COOL_RATIO {
        let confidence = 0.7 + (COOL_RATIO - ratio) * 0.1;
        (Undertone::Cool, confidence.min(UNDERTONE_CONFIDENCE_MAX))
    } else {
        let confidence = 0.8 + (1.0 - (ratio - 1.0).abs()) * 0.15;
        (Undertone::Neutral, confidence.min(UNDERTONE_CONFIDENCE_MAX))
    }
}

/// Binary skin mask (255 = skin) after open + close with a 3×3 cross.
pub fn skin_mask(region: &RgbImage) -> GrayImage {
    let mut mask = GrayImage::new(region.width(), region.height());
    for (x, y, px) in region.enumerate_pixels() {
        let hsv = to_hsv8(px);
        let skin = hsv.within(SKIN_HSV_LOWER, SKIN_HSV_UPPER)
            || hsv.within(SKIN_HSV_LOWER_DARK, SKIN_HSV_UPPER_DARK);
        if skin {
            mask.put_pixel(x, y, Luma([255]));
        }
    }
    let mask = morphology::open(&mask, Norm::L1, 1);
    morphology::close(&mask, Norm::L1, 1)
}

/// Lab values of the masked skin pixels in one region.
///
/// With fewer than 10 skin pixels, falls back to the unmasked center
/// 50%×50% of the region.
fn skin_sample(region: &RgbImage) -> ColorSample {
    let mask = skin_mask(region);
    let sample: ColorSample = region
        .enumerate_pixels()
        .filter(|&(x, y, _)| mask.get_pixel(x, y)[0] > 0)
        .map(|(_, _, px)| to_lab(px))
        .collect();

    if sample.len() >= MIN_SKIN_PIXELS {
        return sample;
    }

    let (w, h) = region.dimensions();
    let (x0, y0) = (w / 4, h / 4);
    let (x1, y1) = (3 * w / 4, 3 * h / 4);
    tracing::warn!(
        skin_pixels = sample.len(),
        width = w,
        height = h,
        "too few skin pixels, sampling region center"
    );
    imageops::crop_imm(region, x0, y0, x1 - x0, y1 - y0)
        .to_image()
        .pixels()
        .map(to_lab)
        .collect()
}
