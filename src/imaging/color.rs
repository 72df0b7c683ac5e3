use std::fmt;

/// The color every pixel is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceColor(pub [u8; 3]);

impl Default for ReferenceColor {
    fn default() -> Self {
        ReferenceColor([255, 255, 255])
    }
}

impl ReferenceColor {
    /// Rounds a sampled mean to the nearest representable color.
    pub fn from_mean(mean: [f64; 3]) -> Self {
        ReferenceColor(mean.map(|c| c.round().clamp(0.0, 255.0) as u8))
    }

    pub fn channels(self) -> [u8; 3] {
        self.0
    }

    pub fn hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl fmt::Display for ReferenceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "({r}, {g}, {b})")
    }
}
