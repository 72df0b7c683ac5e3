use image::RgbImage;
use serde::{Deserialize, Serialize};

/// Median filter window sizes offered in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MedianWindow {
    #[default]
    W3,
    W5,
    W7,
    W9,
    W11,
    W13,
}

impl MedianWindow {
    /// Side length of the square window.
    pub fn size(self) -> u32 {
        match self {
            MedianWindow::W3 => 3,
            MedianWindow::W5 => 5,
            MedianWindow::W7 => 7,
            MedianWindow::W9 => 9,
            MedianWindow::W11 => 11,
            MedianWindow::W13 => 13,
        }
    }

    /// Half-width excluding the center pixel.
    pub fn radius(self) -> u32 {
        (self.size() - 1) / 2
    }

    pub fn label(self) -> &'static str {
        match self {
            MedianWindow::W3 => "3 × 3",
            MedianWindow::W5 => "5 × 5",
            MedianWindow::W7 => "7 × 7",
            MedianWindow::W9 => "9 × 9",
            MedianWindow::W11 => "11 × 11",
            MedianWindow::W13 => "13 × 13",
        }
    }

    pub fn all() -> &'static [MedianWindow] {
        &[
            MedianWindow::W3,
            MedianWindow::W5,
            MedianWindow::W7,
            MedianWindow::W9,
            MedianWindow::W11,
            MedianWindow::W13,
        ]
    }
}

/// Square median filter applied to each channel on its own. Borders are
/// padded by repeating the edge pixels.
pub fn median_filter(image: &RgbImage, window: MedianWindow) -> RgbImage {
    log::info!("Median filter: {}", window.label());
    let r = window.radius();
    imageproc::filter::median_filter(image, r, r)
}
