use super::{ReferenceColor, ThresholdMask};
use image::{GrayImage, Luma, RgbImage};

/// Per-pixel similarity to `reference`: 255 for an exact match, falling
/// linearly with Euclidean RGB distance to 0 at the cube diagonal (255·√3).
pub fn compute_distance_map(image: &RgbImage, reference: ReferenceColor) -> GrayImage {
    let [r, g, b] = reference.channels().map(i32::from);
    let sqrt3 = 3f64.sqrt();
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [pr, pg, pb] = image.get_pixel(x, y).0.map(i32::from);
        let (dr, dg, db) = (pr - r, pg - g, pb - b);
        let dist = f64::from(dr * dr + dg * dg + db * db).sqrt();
        Luma([(255.0 - dist / sqrt3) as u8])
    })
}

/// Result of comparing a distance map against a cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholded {
    pub mask: ThresholdMask,
    /// Share of true pixels, 0..=100.
    pub percent: f64,
}

impl Thresholded {
    pub fn rounded_percent(&self) -> f64 {
        (self.percent * 100.0).round() / 100.0
    }

    /// Readout text with at least one decimal, e.g. `"100.0 %"` or `"42.17 %"`.
    pub fn label(&self) -> String {
        let percent = self.rounded_percent();
        if percent.fract() == 0.0 {
            format!("{percent:.1} %")
        } else {
            format!("{percent} %")
        }
    }
}

/// Snaps a cutoff to the two decimals the slider offers, so the value
/// compared against `distance / 255` is the same one the user sees.
pub fn round_cutoff(cutoff: f64) -> f64 {
    (cutoff * 100.0).round() / 100.0
}

/// Marks pixels whose normalized similarity is at least `cutoff` (clamped to
/// 0..=1).
pub fn threshold(distance: &GrayImage, cutoff: f64) -> Thresholded {
    let cutoff = if cutoff.is_nan() { 0.0 } else { cutoff.clamp(0.0, 1.0) };
    let mask = ThresholdMask::from_fn(distance.width(), distance.height(), |x, y| {
        f64::from(distance.get_pixel(x, y).0[0]) / 255.0 >= cutoff
    });
    let percent = if mask.is_empty() {
        0.0
    } else {
        mask.count_true() as f64 / mask.len() as f64 * 100.0
    };
    Thresholded { mask, percent }
}
