//! Per-pixel color space conversions.
//!
//! HSV is reported on the 8-bit scale used by the skin and hair thresholds:
//! hue 0–180 (degrees / 2), saturation and value 0–255. L*a*b* is true CIE
//! (D65), L* in 0–100.

use crate::types::LabColor;
use image::Rgb;
use palette::{FromColor, Hsv, Lab, Srgb};

/// 8-bit HSV triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv8 {
    pub h: u8,
    pub s: u8,
    pub v: u8,
}

impl Hsv8 {
    /// Inclusive range test on all three channels.
    pub fn within(&self, lower: [u8; 3], upper: [u8; 3]) -> bool {
        (lower[0]..=upper[0]).contains(&self.h)
            && (lower[1]..=upper[1]).contains(&self.s)
            && (lower[2]..=upper[2]).contains(&self.v)
    }
}

fn srgb(px: &Rgb<u8>) -> Srgb {
    Srgb::new(px[0], px[1], px[2]).into_format::<f32>()
}

pub fn to_hsv8(px: &Rgb<u8>) -> Hsv8 {
    let hsv: Hsv = Hsv::from_color(srgb(px));
    let hue = hsv.hue.into_positive_degrees();
    Hsv8 {
        h: (hue / 2.0).round().clamp(0.0, 180.0) as u8,
        s: (hsv.saturation * 255.0).round().clamp(0.0, 255.0) as u8,
        v: (hsv.value * 255.0).round().clamp(0.0, 255.0) as u8,
    }
}

pub fn to_lab(px: &Rgb<u8>) -> LabColor {
    let lab: Lab = Lab::from_color(srgb(px));
    LabColor::new(lab.l, lab.a, lab.b)
}

/// Nearest 8-bit sRGB pixel for a Lab value. Out-of-gamut channels clip.
pub fn lab_to_rgb(lab: LabColor) -> Rgb<u8> {
    let rgb: Srgb = Srgb::from_color(Lab::new(lab.l, lab.a, lab.b));
    let channel = |c: f32| (c * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb([channel(rgb.red), channel(rgb.green), channel(rgb.blue)])
}

/// Render a Lab value as an uppercase `#RRGGBB` string.
pub fn lab_to_hex(lab: LabColor) -> String {
    let Rgb([r, g, b]) = lab_to_rgb(lab);
    format!("#{r:02X}{g:02X}{b:02X}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_pure_red() {
        let hsv = to_hsv8(&Rgb([255, 0, 0]));
        assert_eq!(hsv, Hsv8 { h: 0, s: 255, v: 255 });
    }

    #[test]
    fn test_hsv_pure_blue_uses_half_degrees() {
        // 240 degrees -> 120 on the 8-bit scale
        let hsv = to_hsv8(&Rgb([0, 0, 255]));
        assert_eq!(hsv.h, 120);
    }

    #[test]
    fn test_hsv_grey_has_no_saturation() {
        let hsv = to_hsv8(&Rgb([128, 128, 128]));
        assert_eq!(hsv.s, 0);
        assert_eq!(hsv.v, 128);
    }

    #[test]
    fn test_hsv_within_is_inclusive() {
        let hsv = Hsv8 { h: 20, s: 20, v: 70 };
        assert!(hsv.within([0, 20, 70], [20, 255, 255]));
        assert!(!hsv.within([0, 21, 70], [20, 255, 255]));
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = to_lab(&Rgb([255, 255, 255]));
        assert!((white.l - 100.0).abs() < 0.1, "L = {}", white.l);
        assert!(white.a.abs() < 0.1 && white.b.abs() < 0.1);

        let black = to_lab(&Rgb([0, 0, 0]));
        assert!(black.l.abs() < 0.1);
    }

    #[test]
    fn test_lab_roundtrip_skin_color() {
        let px = Rgb([224, 172, 140]);
        let back = lab_to_rgb(to_lab(&px));
        for c in 0..3 {
            assert!((back[c] as i32 - px[c] as i32).abs() <= 1, "{back:?} vs {px:?}");
        }
    }

    #[test]
    fn test_lab_to_hex_format() {
        assert_eq!(lab_to_hex(LabColor::new(100.0, 0.0, 0.0)), "#FFFFFF");
        assert_eq!(lab_to_hex(LabColor::new(0.0, 0.0, 0.0)), "#000000");
    }
}
