//! Loaded-image state and the chain of images derived from it.
//!
//! A [`Session`] only exists while an image is loaded, so nothing downstream
//! has to check for a missing image. Every setter names the [`Input`] it
//! touched; the stage graph then recomputes exactly the stages that depend on
//! it, in order, and reports which ones ran.

use crate::imaging::{
    compose, compute_distance_map, median_filter, round_cutoff, sample_mean, scale_mask, scale_rgb,
    threshold, Derived, MedianWindow, ReferenceColor, Thresholded,
};
use crate::settings::Settings;
use image::{GrayImage, RgbImage};
use std::time::{Duration, Instant};

/// User-facing switches and values that feed the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Controls {
    pub median_enabled: bool,
    pub median_window: MedianWindow,
    pub threshold_enabled: bool,
    /// Similarity cutoff in 0..=1.
    pub cutoff: f64,
    pub overlay_enabled: bool,
    pub reference: ReferenceColor,
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            median_enabled: false,
            median_window: MedianWindow::W3,
            threshold_enabled: false,
            cutoff: 0.0,
            overlay_enabled: false,
            reference: ReferenceColor::default(),
        }
    }
}

impl Controls {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            median_window: settings.default_median_window,
            cutoff: round_cutoff(settings.default_cutoff),
            ..Self::default()
        }
    }

    /// State after a new file is opened: filters off, color and cutoff kept.
    pub fn after_load(&self) -> Self {
        Self {
            median_enabled: false,
            threshold_enabled: false,
            overlay_enabled: false,
            ..self.clone()
        }
    }
}

/// Something the user can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    Image,
    Median,
    Reference,
    Cutoff,
    Threshold,
    Overlay,
    DisplayBudget,
    /// A color pick started or ended.
    Picking,
}

/// A derived value, listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Original image, median filtered when enabled.
    Working,
    /// Similarity of the working image to the reference color.
    Distance,
    /// Thresholded distance map, only while thresholding is enabled.
    Mask,
    /// Scaled image shown on the canvas.
    Display,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Working, Stage::Distance, Stage::Mask, Stage::Display];

    /// Inputs read directly by this stage.
    pub fn inputs(self) -> &'static [Input] {
        match self {
            Stage::Working => &[Input::Image, Input::Median],
            Stage::Distance => &[Input::Reference],
            Stage::Mask => &[Input::Cutoff, Input::Threshold],
            Stage::Display => &[Input::Overlay, Input::DisplayBudget, Input::Picking],
        }
    }

    /// Stages whose output this stage reads.
    pub fn upstream(self) -> &'static [Stage] {
        match self {
            Stage::Working => &[],
            Stage::Distance => &[Stage::Working],
            Stage::Mask => &[Stage::Distance],
            Stage::Display => &[Stage::Working, Stage::Mask],
        }
    }
}

/// Which stages ran for one change, and how long they took.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recomputed {
    pub stages: Vec<Stage>,
    pub elapsed: Duration,
}

impl Recomputed {
    pub fn contains(&self, stage: Stage) -> bool {
        self.stages.contains(&stage)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Folds a later report into this one.
    pub fn merge(mut self, later: Recomputed) -> Recomputed {
        for stage in later.stages {
            if !self.stages.contains(&stage) {
                self.stages.push(stage);
            }
        }
        self.elapsed += later.elapsed;
        self
    }
}

/// Pixels ready to upload to the canvas.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Color(RgbImage),
    Gray(GrayImage),
}

impl Frame {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Frame::Color(img) => img.dimensions(),
            Frame::Gray(img) => img.dimensions(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Display {
    pub frame: Frame,
    /// Display pixels per source pixel.
    pub scale: f64,
}

pub struct Session {
    original: RgbImage,
    controls: Controls,
    max_display_pixels: u32,
    filtered: Option<RgbImage>,
    distance: GrayImage,
    thresholded: Option<Thresholded>,
    /// While set, the display shows colors instead of the mask.
    picking: bool,
    display: Display,
}

impl Session {
    pub fn new(original: RgbImage, controls: Controls, max_display_pixels: u32) -> Self {
        let mut session = Self {
            original,
            controls,
            max_display_pixels,
            filtered: None,
            distance: GrayImage::new(0, 0),
            thresholded: None,
            picking: false,
            display: Display {
                frame: Frame::Color(RgbImage::new(0, 0)),
                scale: 1.0,
            },
        };
        let report = session.propagate(Input::Image);
        log::info!(
            "Loaded {}x{} image in {:.1?}",
            session.original.width(),
            session.original.height(),
            report.elapsed
        );
        session
    }

    pub fn original(&self) -> &RgbImage {
        &self.original
    }

    /// The image thresholding runs on: filtered if the median filter is on.
    pub fn working(&self) -> &RgbImage {
        self.filtered.as_ref().unwrap_or(&self.original)
    }

    pub fn distance_map(&self) -> &GrayImage {
        &self.distance
    }

    pub fn thresholded(&self) -> Option<&Thresholded> {
        self.thresholded.as_ref()
    }

    pub fn controls(&self) -> &Controls {
        &self.controls
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn scale(&self) -> f64 {
        self.display.scale
    }

    pub fn set_reference(&mut self, reference: ReferenceColor) -> Recomputed {
        if self.controls.reference == reference {
            return Recomputed::default();
        }
        self.controls.reference = reference;
        self.propagate(Input::Reference)
    }

    pub fn set_cutoff(&mut self, cutoff: f64) -> Recomputed {
        let cutoff = if cutoff.is_nan() { 0.0 } else { cutoff.clamp(0.0, 1.0) };
        if self.controls.cutoff == cutoff {
            return Recomputed::default();
        }
        self.controls.cutoff = cutoff;
        if !self.controls.threshold_enabled {
            return Recomputed::default();
        }
        self.propagate(Input::Cutoff)
    }

    pub fn set_threshold(&mut self, enabled: bool) -> Recomputed {
        if self.controls.threshold_enabled == enabled {
            return Recomputed::default();
        }
        self.controls.threshold_enabled = enabled;
        self.propagate(Input::Threshold)
    }

    /// The window only matters while the filter is on.
    pub fn set_median(&mut self, enabled: bool, window: MedianWindow) -> Recomputed {
        let before = (self.controls.median_enabled, self.controls.median_window);
        self.controls.median_enabled = enabled;
        self.controls.median_window = window;
        let unchanged = before == (enabled, window) || (!before.0 && !enabled);
        if unchanged {
            return Recomputed::default();
        }
        self.propagate(Input::Median)
    }

    pub fn set_overlay(&mut self, enabled: bool) -> Recomputed {
        if self.controls.overlay_enabled == enabled {
            return Recomputed::default();
        }
        self.controls.overlay_enabled = enabled;
        self.propagate(Input::Overlay)
    }

    pub fn is_picking(&self) -> bool {
        self.picking
    }

    /// Shows the working image (overlaid if enabled) in place of the mask,
    /// so a color can be picked from real pixels.
    pub fn set_picking(&mut self, picking: bool) -> Recomputed {
        if self.picking == picking {
            return Recomputed::default();
        }
        log::info!("Color selector: {}", if picking { "enabled" } else { "disabled" });
        self.picking = picking;
        self.propagate(Input::Picking)
    }

    pub fn set_display_budget(&mut self, max_display_pixels: u32) -> Recomputed {
        if self.max_display_pixels == max_display_pixels {
            return Recomputed::default();
        }
        self.max_display_pixels = max_display_pixels;
        self.propagate(Input::DisplayBudget)
    }

    /// Averages the working image under a disc given in display coordinates
    /// and makes the result the new reference color. An empty disc leaves the
    /// reference alone and returns `None`.
    pub fn sample(
        &mut self,
        center: (f32, f32),
        radius: f32,
    ) -> Option<(ReferenceColor, Recomputed)> {
        let Some(mean) = sample_mean(self.working(), center, radius, self.display.scale) else {
            log::warn!("Color selector: selection at {center:?} r={radius} covers no pixels");
            return None;
        };
        log::info!("Color selector: {mean:.2?}");
        let color = ReferenceColor::from_mean(mean);
        let report = self.set_reference(color);
        Some((color, report))
    }

    fn propagate(&mut self, input: Input) -> Recomputed {
        let started = Instant::now();
        let mut ran = Vec::new();
        let mut changed: Vec<Stage> = Vec::new();
        for stage in Stage::ALL {
            let direct = stage.inputs().contains(&input);
            let upstream = stage.upstream().iter().any(|s| changed.contains(s));
            if !direct && !upstream {
                continue;
            }
            let stage_started = Instant::now();
            let did_change = self.evaluate(stage);
            log::debug!("{stage:?} recomputed in {:.1?}", stage_started.elapsed());
            ran.push(stage);
            if did_change {
                changed.push(stage);
            }
        }
        Recomputed {
            stages: ran,
            elapsed: started.elapsed(),
        }
    }

    /// Recomputes one stage; returns false when its output provably did not
    /// change.
    fn evaluate(&mut self, stage: Stage) -> bool {
        match stage {
            Stage::Working => {
                self.filtered = self
                    .controls
                    .median_enabled
                    .then(|| median_filter(&self.original, self.controls.median_window));
                true
            }
            Stage::Distance => {
                log::debug!("RGB distance to {}", self.controls.reference);
                self.distance = compute_distance_map(self.working(), self.controls.reference);
                true
            }
            Stage::Mask => {
                let was_some = self.thresholded.is_some();
                self.thresholded = self.controls.threshold_enabled.then(|| {
                    let result = threshold(self.distance_map(), self.controls.cutoff);
                    log::info!(
                        "Threshold: {:.2}, percent = {}",
                        self.controls.cutoff,
                        result.rounded_percent()
                    );
                    result
                });
                was_some || self.thresholded.is_some()
            }
            Stage::Display => {
                self.display = self.render();
                true
            }
        }
    }

    fn render(&self) -> Display {
        let budget = self.max_display_pixels;

        let mask = self.thresholded.as_ref().filter(|_| !self.picking);

        if self.controls.overlay_enabled {
            let subject = match mask {
                Some(t) => Derived::Mask(&t.mask),
                None => Derived::Filtered(self.working()),
            };
            let composed = compose(&self.original, subject);
            let scaled = scale_rgb(&composed, None, budget);
            return Display {
                frame: Frame::Color(scaled.image.into_owned()),
                scale: scaled.scale,
            };
        }

        match mask {
            Some(t) => {
                let scaled = scale_mask(&t.mask, None, budget);
                Display {
                    frame: Frame::Gray(scaled.image),
                    scale: scaled.scale,
                }
            }
            None => {
                let scaled = scale_rgb(self.working(), None, budget);
                Display {
                    frame: Frame::Color(scaled.image.into_owned()),
                    scale: scaled.scale,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn two_tone() -> RgbImage {
        // left half red, right half blue, with one noisy pixel in the red part
        let mut img = RgbImage::from_fn(8, 4, |x, _| {
            if x < 4 {
                Rgb([200, 20, 20])
            } else {
                Rgb([20, 20, 200])
            }
        });
        img.put_pixel(1, 1, Rgb([0, 255, 0]));
        img
    }

    fn session() -> Session {
        Session::new(two_tone(), Controls::default(), 1000)
    }

    #[test]
    fn new_session_computes_every_stage() {
        let s = session();
        assert_eq!(s.distance_map().dimensions(), (8, 4));
        assert!(s.thresholded().is_none());
        assert_eq!(s.display().frame, Frame::Color(two_tone()));
        assert_eq!(s.scale(), 1.0);
    }

    #[test]
    fn uniform_image_matching_reference_is_fully_selected() {
        let img = RgbImage::from_pixel(4, 4, Rgb([100, 150, 200]));
        let controls = Controls {
            reference: ReferenceColor([100, 150, 200]),
            cutoff: 0.5,
            threshold_enabled: true,
            ..Controls::default()
        };
        let s = Session::new(img, controls, 1000);
        assert!(s.distance_map().pixels().all(|p| p.0[0] == 255));
        let t = s.thresholded().unwrap();
        assert_eq!(t.mask.count_true(), 16);
        assert_eq!(t.percent, 100.0);
    }

    #[test]
    fn cutoff_change_skips_the_distance_map() {
        let mut s = session();
        s.set_threshold(true);
        let report = s.set_cutoff(0.9);
        assert_eq!(report.stages, vec![Stage::Mask, Stage::Display]);
    }

    #[test]
    fn cutoff_change_while_disabled_is_stored_only() {
        let mut s = session();
        assert!(s.set_cutoff(0.4).is_empty());
        assert_eq!(s.controls().cutoff, 0.4);
        let report = s.set_threshold(true);
        assert!(report.contains(Stage::Mask));
        assert!(!report.contains(Stage::Distance));
    }

    #[test]
    fn reference_change_recomputes_distance_and_mask() {
        let mut s = session();
        s.set_threshold(true);
        let report = s.set_reference(ReferenceColor([200, 20, 20]));
        assert_eq!(report.stages, vec![Stage::Distance, Stage::Mask, Stage::Display]);
        assert_eq!(s.distance_map().get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn reference_change_without_threshold_leaves_display() {
        let mut s = session();
        let report = s.set_reference(ReferenceColor([1, 2, 3]));
        assert!(report.contains(Stage::Distance));
        assert!(!report.contains(Stage::Display));
    }

    #[test]
    fn same_value_is_a_no_op() {
        let mut s = session();
        assert!(s.set_reference(ReferenceColor::default()).is_empty());
        assert!(s.set_overlay(false).is_empty());
        assert!(s.set_median(false, MedianWindow::W9).is_empty());
        assert_eq!(s.controls().median_window, MedianWindow::W9);
    }

    #[test]
    fn median_round_trip_restores_original() {
        let mut s = session();
        s.set_median(true, MedianWindow::W3);
        assert_ne!(s.working(), s.original());
        assert_eq!(s.working().get_pixel(1, 1), &Rgb([200, 20, 20]));

        let report = s.set_median(false, MedianWindow::W3);
        assert!(report.contains(Stage::Working));
        assert_eq!(s.working(), &two_tone());
        assert_eq!(s.display().frame, Frame::Color(two_tone()));
    }

    #[test]
    fn threshold_without_overlay_shows_the_mask() {
        let mut s = session();
        s.set_reference(ReferenceColor([20, 20, 200]));
        s.set_cutoff(0.9);
        s.set_threshold(true);
        let Frame::Gray(frame) = &s.display().frame else {
            panic!("expected grayscale mask");
        };
        assert_eq!(frame.get_pixel(0, 0).0[0], 0);
        assert_eq!(frame.get_pixel(7, 3).0[0], 255);
        assert_eq!(s.thresholded().unwrap().percent, 50.0);
    }

    #[test]
    fn threshold_with_overlay_dims_unselected_pixels() {
        let mut s = session();
        s.set_reference(ReferenceColor([20, 20, 200]));
        s.set_cutoff(0.9);
        s.set_threshold(true);
        s.set_overlay(true);
        let Frame::Color(frame) = &s.display().frame else {
            panic!("expected color overlay");
        };
        assert_eq!(frame.get_pixel(0, 0), &Rgb([50, 5, 5]));
        assert_eq!(frame.get_pixel(7, 0), &Rgb([20, 20, 200]));
    }

    #[test]
    fn median_overlay_blends_with_original() {
        let mut s = session();
        s.set_median(true, MedianWindow::W3);
        s.set_overlay(true);
        let Frame::Color(frame) = &s.display().frame else {
            panic!("expected color overlay");
        };
        // (0 + 200) / 2, (255 + 20) / 2 truncated, (0 + 20) / 2
        assert_eq!(frame.get_pixel(1, 1), &Rgb([100, 137, 10]));
        assert_eq!(frame.get_pixel(6, 2), &Rgb([20, 20, 200]));
    }

    #[test]
    fn sampling_updates_reference() {
        let mut s = session();
        let (color, report) = s.sample((6.0, 2.0), 1.0).unwrap();
        assert_eq!(color, ReferenceColor([20, 20, 200]));
        assert!(report.contains(Stage::Distance));
        assert_eq!(s.controls().reference, color);
    }

    #[test]
    fn empty_sample_keeps_reference() {
        let mut s = session();
        assert!(s.sample((500.0, 500.0), 3.0).is_none());
        assert_eq!(s.controls().reference, ReferenceColor::default());
    }

    #[test]
    fn large_images_are_displayed_scaled() {
        let img = RgbImage::from_pixel(400, 200, Rgb([9, 9, 9]));
        let mut s = Session::new(img, Controls::default(), 100);
        assert_eq!(s.scale(), 0.25);
        assert_eq!(s.display().frame.dimensions(), (100, 50));

        let report = s.set_display_budget(200);
        assert_eq!(report.stages, vec![Stage::Display]);
        assert_eq!(s.display().frame.dimensions(), (200, 100));
    }

    #[test]
    fn load_keeps_color_and_cutoff() {
        let controls = Controls {
            median_enabled: true,
            threshold_enabled: true,
            overlay_enabled: true,
            cutoff: 0.3,
            reference: ReferenceColor([1, 2, 3]),
            ..Controls::default()
        };
        let reset = controls.after_load();
        assert!(!reset.median_enabled && !reset.threshold_enabled && !reset.overlay_enabled);
        assert_eq!(reset.cutoff, 0.3);
        assert_eq!(reset.reference, ReferenceColor([1, 2, 3]));
    }

    #[test]
    fn default_cutoff_matches_its_boundary() {
        let settings = Settings {
            default_cutoff: f64::from(0.2f32),
            ..Settings::default()
        };
        let controls = Controls {
            threshold_enabled: true,
            reference: ReferenceColor([0, 0, 0]),
            ..Controls::from_settings(&settings)
        };
        assert_eq!(controls.cutoff, 0.2);
        // 255 - 249·√2/√3 = 51.69, which truncates to exactly 51 / 255 = 0.2
        let img = RgbImage::from_pixel(2, 1, Rgb([249, 249, 0]));
        let s = Session::new(img, controls, 1000);
        assert_eq!(s.distance_map().get_pixel(0, 0).0[0], 51);
        assert_eq!(s.thresholded().unwrap().percent, 100.0);
    }

    #[test]
    fn picking_shows_colors_instead_of_the_mask() {
        let mut s = session();
        s.set_reference(ReferenceColor([20, 20, 200]));
        s.set_cutoff(0.9);
        s.set_threshold(true);
        assert!(matches!(s.display().frame, Frame::Gray(_)));

        let report = s.set_picking(true);
        assert_eq!(report.stages, vec![Stage::Display]);
        assert_eq!(s.display().frame, Frame::Color(two_tone()));
        assert!(s.thresholded().is_some());

        s.set_picking(false);
        assert!(matches!(s.display().frame, Frame::Gray(_)));
    }

    #[test]
    fn picking_keeps_the_overlay() {
        let mut s = session();
        s.set_median(true, MedianWindow::W3);
        s.set_threshold(true);
        s.set_overlay(true);
        s.set_picking(true);
        let Frame::Color(frame) = &s.display().frame else {
            panic!("expected color overlay");
        };
        assert_eq!(frame.get_pixel(1, 1), &Rgb([100, 137, 10]));
    }

    #[test]
    fn merged_reports_list_each_stage_once() {
        let first = Recomputed {
            stages: vec![Stage::Distance, Stage::Display],
            elapsed: Duration::from_millis(2),
        };
        let second = Recomputed {
            stages: vec![Stage::Display],
            elapsed: Duration::from_millis(3),
        };
        let merged = first.merge(second);
        assert_eq!(merged.stages, vec![Stage::Distance, Stage::Display]);
        assert_eq!(merged.elapsed, Duration::from_millis(5));
    }
}
