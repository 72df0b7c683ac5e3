use super::ThresholdMask;
use image::{Rgb, RgbImage};
use std::borrow::Cow;

/// What gets laid over the original image.
#[derive(Debug, Clone, Copy)]
pub enum Derived<'a> {
    None,
    Filtered(&'a RgbImage),
    Mask(&'a ThresholdMask),
}

/// Factor applied to pixels outside the mask.
const DIM: f32 = 0.25;

/// Builds the overlay image for display.
pub fn compose<'a>(original: &'a RgbImage, derived: Derived<'_>) -> Cow<'a, RgbImage> {
    match derived {
        Derived::None => Cow::Borrowed(original),
        Derived::Mask(mask) => {
            if mask.dimensions() != original.dimensions() {
                log::warn!(
                    "Overlay mask is {:?} but image is {:?}; showing original",
                    mask.dimensions(),
                    original.dimensions()
                );
                return Cow::Borrowed(original);
            }
            Cow::Owned(RgbImage::from_fn(original.width(), original.height(), |x, y| {
                let px = *original.get_pixel(x, y);
                if mask.get(x, y) {
                    px
                } else {
                    Rgb(px.0.map(|c| (f32::from(c) * DIM) as u8))
                }
            }))
        }
        Derived::Filtered(filtered) => {
            if filtered.dimensions() != original.dimensions() {
                log::warn!(
                    "Overlay image is {:?} but original is {:?}; showing original",
                    filtered.dimensions(),
                    original.dimensions()
                );
                return Cow::Borrowed(original);
            }
            if std::ptr::eq(filtered, original) || filtered == original {
                return Cow::Borrowed(original);
            }
            Cow::Owned(RgbImage::from_fn(original.width(), original.height(), |x, y| {
                let o = original.get_pixel(x, y).0;
                let d = filtered.get_pixel(x, y).0;
                Rgb([0, 1, 2].map(|c| (f64::from(o[c]) / 2.0 + f64::from(d[c]) / 2.0) as u8))
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RgbImage {
        RgbImage::from_fn(6, 5, |x, y| Rgb([(x * 40 + 3) as u8, (y * 50 + 1) as u8, 255]))
    }

    #[test]
    fn nothing_to_overlay_returns_original() {
        let img = sample();
        let out = compose(&img, Derived::None);
        assert!(matches!(out, Cow::Borrowed(_)));
        assert_eq!(*out, img);
    }

    #[test]
    fn pixels_outside_the_mask_are_dimmed() {
        let img = sample();
        let mask = ThresholdMask::from_fn(6, 5, |x, _| x < 3);
        let out = compose(&img, Derived::Mask(&mask));
        for (x, y, p) in out.enumerate_pixels() {
            let o = img.get_pixel(x, y);
            if mask.get(x, y) {
                assert_eq!(p, o);
            } else {
                for c in 0..3 {
                    assert_eq!(p.0[c], o.0[c] / 4);
                }
            }
        }
    }

    #[test]
    fn filtered_image_is_averaged_in() {
        let img = RgbImage::from_pixel(2, 2, Rgb([10, 101, 255]));
        let filtered = RgbImage::from_pixel(2, 2, Rgb([20, 100, 0]));
        let out = compose(&img, Derived::Filtered(&filtered));
        // 100.5 and 127.5 truncate
        assert!(out.pixels().all(|p| *p == Rgb([15, 100, 127])));
    }

    #[test]
    fn identical_filtered_image_is_not_blended() {
        let img = sample();
        let copy = img.clone();
        assert!(matches!(compose(&img, Derived::Filtered(&copy)), Cow::Borrowed(_)));
        assert!(matches!(compose(&img, Derived::Filtered(&img)), Cow::Borrowed(_)));
    }

    #[test]
    fn mismatched_shapes_fall_back_to_original() {
        let img = sample();
        let mask = ThresholdMask::from_fn(2, 2, |_, _| false);
        assert_eq!(*compose(&img, Derived::Mask(&mask)), img);
    }
}
