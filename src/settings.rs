use crate::error::{Error, Result};
pub use crate::imaging::MedianWindow;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MAX_DISPLAY_PIXELS: u32 = 1000;

/// User preferences exposed in the settings tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Long-edge budget for the displayed image, in pixels
    pub max_display_pixels: u32,
    /// Median window selected after an image is loaded
    pub default_median_window: MedianWindow,
    /// Threshold cutoff used until the user moves the slider
    pub default_cutoff: f64,
    /// Log processing steps at info level
    pub verbose: bool,
    /// Directory the open dialog starts in
    pub last_directory: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_display_pixels: DEFAULT_MAX_DISPLAY_PIXELS,
            default_median_window: MedianWindow::W3,
            default_cutoff: 0.0,
            verbose: true,
            last_directory: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs_config().map(|mut p| {
            p.push("gccp-color-picker");
            p.push("settings.json");
            p
        })
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| Self::from_json(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or(Error::ConfigDir)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.to_json()?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn from_json(s: &str) -> Result<Self> {
        let mut settings: Settings = serde_json::from_str(s)?;
        settings.sanitize();
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Pulls hand-edited values back into their valid ranges.
    fn sanitize(&mut self) {
        self.max_display_pixels = self.max_display_pixels.clamp(100, 4000);
        self.default_cutoff = if self.default_cutoff.is_finite() {
            self.default_cutoff.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }
}

fn dirs_config() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library").join("Application Support"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
    }
}
