use super::ThresholdMask;
use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use std::borrow::Cow;

/// An image fitted to the display together with the factor that maps source
/// pixel coordinates onto it.
#[derive(Debug, Clone)]
pub struct Scaled<T> {
    pub image: T,
    pub scale: f64,
}

/// Factor that brings the long edge within `max_pixels`; never enlarges.
pub fn fit_scale(width: u32, height: u32, max_pixels: u32) -> f64 {
    let max_dim = width.max(height);
    if max_dim > max_pixels {
        f64::from(max_pixels) / f64::from(max_dim)
    } else {
        1.0
    }
}

fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

fn resolve_scale(width: u32, height: u32, scale: Option<f64>, max_pixels: u32) -> f64 {
    match scale {
        Some(s) if s.is_finite() && s > 0.0 => s,
        _ => fit_scale(width, height, max_pixels),
    }
}

/// Resizes an RGB image with a cubic filter. At scale 1 the input is handed
/// back untouched.
pub fn scale_rgb(
    img: &RgbImage,
    scale: Option<f64>,
    max_pixels: u32,
) -> Scaled<Cow<'_, RgbImage>> {
    let scale = resolve_scale(img.width(), img.height(), scale, max_pixels);
    if scale == 1.0 {
        return Scaled { image: Cow::Borrowed(img), scale };
    }
    let (w, h) = scaled_dimensions(img.width(), img.height(), scale);
    log::debug!("Scaling image by {scale:.4} to {w}x{h}");
    Scaled {
        image: Cow::Owned(imageops::resize(img, w, h, FilterType::CatmullRom)),
        scale,
    }
}

/// Renders a mask as grayscale (true = 255) and resizes it with linear
/// interpolation. Edge pixels keep their intermediate gray values.
pub fn scale_mask(
    mask: &ThresholdMask,
    scale: Option<f64>,
    max_pixels: u32,
) -> Scaled<GrayImage> {
    let (width, height) = mask.dimensions();
    let scale = resolve_scale(width, height, scale, max_pixels);
    if scale == 1.0 {
        let image = GrayImage::from_fn(width, height, |x, y| {
            Luma([if mask.get(x, y) { 255 } else { 0 }])
        });
        return Scaled { image, scale };
    }

    // Interpolate in 0..=1 and stretch afterwards; the resampler clamps
    // float samples to that range.
    let unit: ImageBuffer<Luma<f32>, Vec<f32>> = ImageBuffer::from_fn(width, height, |x, y| {
        Luma([if mask.get(x, y) { 1.0 } else { 0.0 }])
    });
    let (w, h) = scaled_dimensions(width, height, scale);
    log::debug!("Scaling mask by {scale:.4} to {w}x{h}");
    let resized = imageops::resize(&unit, w, h, FilterType::Triangle);
    let image = GrayImage::from_fn(w, h, |x, y| {
        Luma([(resized.get_pixel(x, y).0[0] * 255.0) as u8])
    });
    Scaled { image, scale }
}
