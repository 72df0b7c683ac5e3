use crate::error::{Error, Result};
use image::{DynamicImage, RgbImage};
use std::path::Path;

/// File extensions offered by the open dialog.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff", "tif", "webp"];

/// Decodes `path` into an 8-bit RGB image.
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let decoded = image::open(path).map_err(|source| Error::Decode {
        path: path.to_owned(),
        source,
    })?;
    log::debug!(
        "Decoded {} as {:?} ({}x{})",
        path.display(),
        decoded.color(),
        decoded.width(),
        decoded.height()
    );
    Ok(normalize(decoded))
}

/// Float samples are scaled by 255 and truncated; every other layout goes
/// through the regular 8-bit conversion. Alpha is dropped.
pub fn normalize(decoded: DynamicImage) -> RgbImage {
    match decoded {
        DynamicImage::ImageRgb32F(buf) => {
            log::info!("Converting float samples to u8");
            RgbImage::from_fn(buf.width(), buf.height(), |x, y| {
                image::Rgb(buf.get_pixel(x, y).0.map(float_to_u8))
            })
        }
        DynamicImage::ImageRgba32F(buf) => {
            log::info!("Converting float samples to u8");
            RgbImage::from_fn(buf.width(), buf.height(), |x, y| {
                let [r, g, b, _] = buf.get_pixel(x, y).0;
                image::Rgb([r, g, b].map(float_to_u8))
            })
        }
        DynamicImage::ImageRgb8(buf) => buf,
        other => other.to_rgb8(),
    }
}

fn float_to_u8(v: f32) -> u8 {
    (v * 255.0) as u8
}
