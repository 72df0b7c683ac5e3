use image::RgbImage;

/// Mean color under a disc drawn on the display.
///
/// `center` and `radius` are in display pixels and are mapped back to source
/// pixels by dividing by `scale` and truncating. The disc covers offsets with
/// `dx² + dy² <= r²`; whatever part of it falls outside the image is clipped
/// away side by side. Returns `None` when no pixel remains.
pub fn sample_mean(
    image: &RgbImage,
    center: (f32, f32),
    radius: f32,
    scale: f64,
) -> Option<[f64; 3]> {
    if scale.is_nan() || scale <= 0.0 {
        return None;
    }
    let x = (f64::from(center.0) / scale) as i64;
    let y = (f64::from(center.1) / scale) as i64;
    let r = (f64::from(radius) / scale).max(0.0) as i64;
    log::debug!("Color mask: center ({x}, {y}), radius {r}");

    let (width, height) = (i64::from(image.width()), i64::from(image.height()));
    let y_min = (y - r).max(0);
    let y_max = (y + r + 1).min(height);
    let x_min = (x - r).max(0);
    let x_max = (x + r + 1).min(width);
    log::debug!("Color mask bounds: rows {y_min}..{y_max}, cols {x_min}..{x_max}");

    let mut sum = [0u64; 3];
    let mut count = 0u64;
    for py in y_min..y_max {
        let dy = py - y;
        for px in x_min..x_max {
            let dx = px - x;
            if dx * dx + dy * dy > r * r {
                continue;
            }
            let pixel = image.get_pixel(px as u32, py as u32);
            for (acc, &c) in sum.iter_mut().zip(pixel.0.iter()) {
                *acc += u64::from(c);
            }
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }
    Some(sum.map(|s| s as f64 / count as f64))
}
