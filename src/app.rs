use crate::imaging::loader::IMAGE_EXTENSIONS;
use crate::imaging::{load_image, round_cutoff, MedianWindow, ReferenceColor};
use crate::session::{Controls, Frame, Recomputed, Session, Stage};
use crate::settings::Settings;
use egui::{
    Color32, ColorImage, Pos2, Rect, RichText, Rounding, Sense, Stroke, TextureHandle, Vec2,
};
use std::collections::VecDeque;
use std::path::PathBuf;

#[derive(PartialEq, Clone, Copy)]
enum Tab {
    Picker,
    Settings,
}

/// Circle drawn on the canvas, in display pixels relative to the image's
/// top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Selection {
    center: Pos2,
    radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PickState {
    Idle,
    /// "Choose Color" was pressed; the next gesture on the canvas samples.
    Armed,
    Dragging(Selection),
}

/// Pointer facts for one frame, in image-local display coordinates.
#[derive(Debug, Default, Clone, Copy)]
struct Gesture {
    /// Where the button went down, even if the drag was only recognized later.
    press: Option<Pos2>,
    pointer: Option<Pos2>,
    drag_started: bool,
    clicked: bool,
    drag_stopped: bool,
}

impl PickState {
    /// Press sets the center, dragging sets the radius, release yields the
    /// finished selection.
    fn advance(self, g: &Gesture) -> (PickState, Option<Selection>) {
        let mut sel = match self {
            PickState::Idle => return (self, None),
            PickState::Armed if g.drag_started || g.clicked => {
                let Some(center) = g.press.or(g.pointer) else {
                    return (self, None);
                };
                let sel = Selection { center, radius: 0.0 };
                if !g.drag_started {
                    return (PickState::Idle, Some(sel));
                }
                log::debug!("Selection started at {center:?}");
                sel
            }
            PickState::Armed => return (self, None),
            PickState::Dragging(sel) => sel,
        };
        if let Some(p) = g.pointer {
            sel.radius = sel.center.distance(p).round();
        }
        if g.drag_stopped {
            (PickState::Idle, Some(sel))
        } else {
            (PickState::Dragging(sel), None)
        }
    }
}

/// Work requested by a widget. It runs at the start of the next frame so the
/// "Processing…" status is on screen while it does.
#[derive(Debug, Clone)]
enum Action {
    Load(PathBuf),
    Edit(Edit),
}

/// Changes applied to the loaded session.
#[derive(Debug, Clone, Copy)]
enum Edit {
    Median(bool, MedianWindow),
    Threshold(bool),
    Cutoff(f64),
    Overlay(bool),
    Reference(ReferenceColor),
    Picking(bool),
    Sample(Selection),
    DisplayBudget(u32),
}

pub struct ColorPickerApp {
    tab: Tab,
    settings: Settings,
    settings_save_msg: Option<(String, bool)>, // (message, is_error)
    session: Option<Session>,
    /// Values shown in the controls panel. Mirrors the session after every
    /// applied action.
    controls: Controls,
    cutoff_edit: f64,
    reference_edit: [u8; 3],
    file_name: Option<String>,
    texture: Option<TextureHandle>,
    pick: PickState,
    selection: Option<Selection>,
    pending: VecDeque<Action>,
    status_message: String,
}

impl ColorPickerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, settings: Settings) -> Self {
        Self::with_settings(settings)
    }

    fn with_settings(settings: Settings) -> Self {
        let controls = Controls::from_settings(&settings);
        Self {
            tab: Tab::Picker,
            cutoff_edit: controls.cutoff,
            reference_edit: controls.reference.channels(),
            controls,
            settings,
            settings_save_msg: None,
            session: None,
            file_name: None,
            texture: None,
            pick: PickState::Idle,
            selection: None,
            pending: VecDeque::new(),
            status_message: "Open an image to start.".into(),
        }
    }

    fn busy(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Actions run one per frame in the order they were requested.
    fn queue(&mut self, action: Action) {
        log::debug!("Queued {action:?}");
        self.pending.push_back(action);
        self.status_message = "Processing…".into();
    }

    // ── actions ──────────────────────────────────────────────────────────────

    fn action_open_file(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .set_title("Open image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .add_filter("All files", &["*"]);
        if let Some(dir) = &self.settings.last_directory {
            dialog = dialog.set_directory(dir);
        }
        log::info!("Open file: waiting for system dialog");
        match dialog.pick_file() {
            Some(path) => self.queue(Action::Load(path)),
            None => {
                log::info!("Open file: user canceled");
                if self.session.is_none() {
                    self.clear();
                }
            }
        }
    }

    fn run_pending(&mut self, ctx: &egui::Context) {
        match self.pending.pop_front() {
            None => {}
            Some(Action::Load(path)) => self.load(path, ctx),
            Some(Action::Edit(edit)) => self.apply(edit, ctx),
        }
    }

    fn apply(&mut self, edit: Edit, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            self.status_message = "Open an image first.".into();
            return;
        };
        let report = match edit {
            Edit::Median(enabled, window) => session.set_median(enabled, window),
            Edit::Threshold(enabled) => session.set_threshold(enabled),
            Edit::Cutoff(cutoff) => session.set_cutoff(cutoff),
            Edit::Overlay(enabled) => session.set_overlay(enabled),
            Edit::Reference(color) => session.set_reference(color),
            Edit::DisplayBudget(pixels) => session.set_display_budget(pixels),
            Edit::Picking(picking) => session.set_picking(picking),
            Edit::Sample(sel) => {
                let sampled = session.sample((sel.center.x, sel.center.y), sel.radius);
                let restored = session.set_picking(false);
                let Some((_, report)) = sampled else {
                    self.after_update(&restored, ctx);
                    self.status_message =
                        "Selection is outside the image; color unchanged.".into();
                    return;
                };
                report.merge(restored)
            }
        };
        self.after_update(&report, ctx);
    }

    fn load(&mut self, path: PathBuf, ctx: &egui::Context) {
        log::info!("Loading {}", path.display());
        match load_image(&path) {
            Ok(img) => {
                let (w, h) = img.dimensions();
                let controls = self.controls.after_load();
                self.session = Some(Session::new(img, controls, self.settings.max_display_pixels));
                self.selection = None;
                self.pick = PickState::Idle;
                self.file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                self.sync_controls();
                self.upload_texture(ctx);
                self.status_message = format!(
                    "Loaded {} ({w}×{h}).",
                    self.file_name.as_deref().unwrap_or("image")
                );
                self.remember_directory(&path);
            }
            Err(e) => {
                log::error!("{e}");
                self.status_message = format!("Failed to load image: {e}");
                if self.session.is_none() {
                    self.clear();
                }
            }
        }
    }

    fn remember_directory(&mut self, path: &std::path::Path) {
        let Some(dir) = path.parent() else { return };
        if self.settings.last_directory.as_deref() == Some(dir) {
            return;
        }
        self.settings.last_directory = Some(dir.to_owned());
        if let Err(e) = self.settings.save() {
            log::warn!("Could not remember directory: {e}");
        }
    }

    /// Back to the no-image state with every control at its default.
    fn clear(&mut self) {
        self.session = None;
        self.texture = None;
        self.file_name = None;
        self.selection = None;
        self.pick = PickState::Idle;
        self.controls = Controls::from_settings(&self.settings);
        self.cutoff_edit = self.controls.cutoff;
        self.reference_edit = self.controls.reference.channels();
        self.status_message = "No file selected.".into();
    }

    fn after_update(&mut self, report: &Recomputed, ctx: &egui::Context) {
        self.sync_controls();
        if report.contains(Stage::Display) {
            self.upload_texture(ctx);
        }
        self.status_message = if report.is_empty() {
            "Done".into()
        } else {
            format!("Done ({:.0?})", report.elapsed)
        };
    }

    fn sync_controls(&mut self) {
        if let Some(session) = &self.session {
            self.controls = session.controls().clone();
            self.cutoff_edit = self.controls.cutoff;
            self.reference_edit = self.controls.reference.channels();
        }
    }

    fn upload_texture(&mut self, ctx: &egui::Context) {
        let Some(session) = &self.session else {
            self.texture = None;
            return;
        };
        let image = frame_to_color_image(&session.display().frame);
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture("display_image", image, egui::TextureOptions::NEAREST));
            }
        }
    }

    // ── UI helpers ───────────────────────────────────────────────────────────

    fn draw_tab_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 0.0;
            tab_button(ui, "🎨  Picker", self.tab == Tab::Picker, || {
                self.tab = Tab::Picker
            });
            tab_button(ui, "⚙  Settings", self.tab == Tab::Settings, || {
                self.tab = Tab::Settings
            });
        });
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        ui.add_space(8.0);
        ui.add_enabled_ui(!self.busy(), |ui| {
            if toolbar_button(ui, "📂 Open Image").clicked() {
                self.action_open_file();
            }
        });
        ui.label(
            RichText::new(self.file_name.as_deref().unwrap_or("No file selected"))
                .color(Color32::GRAY)
                .small(),
        );
        ui.add_space(8.0);
        ui.separator();

        let enabled = self.session.is_some() && !self.busy();
        ui.add_enabled_ui(enabled, |ui| {
            section_header(ui, "Median Filter");
            let mut median = self.controls.median_enabled;
            let mut window = self.controls.median_window;
            let toggled = ui.checkbox(&mut median, "Median Filter").changed();
            let mut picked = false;
            ui.add_enabled_ui(median, |ui| {
                ui.horizontal(|ui| {
                    egui::ComboBox::from_id_salt("median_window")
                        .selected_text(window.label())
                        .show_ui(ui, |ui| {
                            for w in MedianWindow::all() {
                                picked |= ui.selectable_value(&mut window, *w, w.label()).changed();
                            }
                        });
                    ui.label("Neighbors");
                });
            });
            if toggled || picked {
                self.queue(Action::Edit(Edit::Median(median, window)));
            }
            ui.add_space(12.0);

            section_header(ui, "Threshold");
            let mut thresh = self.controls.threshold_enabled;
            if ui.checkbox(&mut thresh, "Threshold").changed() {
                self.queue(Action::Edit(Edit::Threshold(thresh)));
            }
            ui.add_enabled_ui(thresh, |ui| {
                let resp = ui.add(
                    egui::Slider::new(&mut self.cutoff_edit, 0.0..=1.0)
                        .fixed_decimals(2)
                        .text("Cutoff"),
                );
                if committed(&resp) {
                    let cutoff = round_cutoff(self.cutoff_edit);
                    self.cutoff_edit = cutoff;
                    self.queue(Action::Edit(Edit::Cutoff(cutoff)));
                }
            });
            ui.add_space(12.0);

            section_header(ui, "Display");
            let mut overlay = self.controls.overlay_enabled;
            if ui.checkbox(&mut overlay, "Overlay").changed() {
                self.queue(Action::Edit(Edit::Overlay(overlay)));
            }
            ui.add_space(12.0);

            section_header(ui, "Reference Color");
            ui.horizontal(|ui| {
                let armed = self.pick != PickState::Idle;
                if ui
                    .add_enabled(
                        !armed,
                        egui::Button::new("Choose Color")
                            .rounding(Rounding::same(4.0))
                            .min_size(Vec2::new(110.0, 28.0)),
                    )
                    .on_hover_text("Then drag a circle on the image")
                    .clicked()
                {
                    self.pick = PickState::Armed;
                    self.queue(Action::Edit(Edit::Picking(true)));
                }
                if armed {
                    ui.label(RichText::new("Drag on the image…").color(Color32::GRAY).small());
                }
            });
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                let [r, g, b] = self.reference_edit;
                let (swatch, _) = ui.allocate_exact_size(Vec2::splat(50.0), Sense::hover());
                ui.painter()
                    .rect_filled(swatch, Rounding::same(4.0), Color32::from_rgb(r, g, b));
                ui.painter()
                    .rect_stroke(swatch, Rounding::same(4.0), Stroke::new(1.0, Color32::GRAY));

                ui.vertical(|ui| {
                    let mut commit = false;
                    for (value, label) in self.reference_edit.iter_mut().zip(["R", "G", "B"]) {
                        ui.horizontal(|ui| {
                            let resp = ui.add(egui::DragValue::new(value).range(0..=255));
                            commit |= committed(&resp);
                            ui.label(label);
                        });
                    }
                    if commit {
                        let color = ReferenceColor(self.reference_edit);
                        self.queue(Action::Edit(Edit::Reference(color)));
                    }
                });
            });
            ui.label(
                RichText::new(ReferenceColor(self.reference_edit).hex())
                    .monospace()
                    .color(Color32::GRAY)
                    .small(),
            );
            ui.add_space(12.0);

            section_header(ui, "Result");
            let percent = self
                .session
                .as_ref()
                .and_then(Session::thresholded)
                .map(|t| t.label())
                .unwrap_or_else(|| "0.0 %".into());
            ui.horizontal(|ui| {
                ui.label("Percent:");
                ui.label(RichText::new(percent).strong().size(16.0));
            });
        });
    }

    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        egui::Frame::dark_canvas(ui.style())
            .rounding(Rounding::same(6.0))
            .show(ui, |ui| {
                ui.set_min_size(ui.available_size());
                let Some(texture) = &self.texture else {
                    ui.centered_and_justified(|ui| {
                        ui.label(
                            RichText::new("Drop an image here\nor use Open Image")
                                .color(Color32::GRAY)
                                .size(16.0),
                        );
                    });
                    return;
                };
                let texture_id = texture.id();
                let size = texture.size_vec2();

                egui::ScrollArea::both()
                    .id_salt("canvas_scroll")
                    .show(ui, |ui| {
                        let (rect, response) =
                            ui.allocate_exact_size(size, Sense::click_and_drag());
                        let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
                        ui.painter().image(texture_id, rect, uv, Color32::WHITE);

                        let local = |p: Pos2| (p - rect.min).to_pos2();
                        let gesture = Gesture {
                            press: ui.input(|i| i.pointer.press_origin()).map(local),
                            pointer: response.interact_pointer_pos().map(local),
                            drag_started: response.drag_started(),
                            clicked: response.clicked(),
                            drag_stopped: response.drag_stopped(),
                        };
                        self.handle_gesture(&gesture);

                        let circle = match self.pick {
                            PickState::Dragging(sel) => Some(sel),
                            _ => self.selection,
                        };
                        if let Some(sel) = circle {
                            let center = rect.min + sel.center.to_vec2();
                            let painter = ui.painter_at(rect);
                            let outline = Stroke::new(3.0, Color32::BLACK);
                            painter.circle_stroke(center, sel.radius, outline);
                            painter.circle_stroke(center, sel.radius, (1.0, Color32::WHITE));
                        }
                        if self.pick != PickState::Idle && response.hovered() {
                            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
                        }
                    });
            });
    }

    fn handle_gesture(&mut self, gesture: &Gesture) {
        let (next, finished) = self.pick.advance(gesture);
        self.pick = next;
        if let Some(sel) = finished {
            self.finish_selection(sel);
        }
    }

    fn finish_selection(&mut self, sel: Selection) {
        log::debug!("Selection finished: {sel:?}");
        self.pick = PickState::Idle;
        self.selection = Some(sel);
        self.queue(Action::Edit(Edit::Sample(sel)));
    }

    fn draw_picker_tab(&mut self, ui: &mut egui::Ui) {
        let panel_height = ui.available_height() - 40.0; // reserve status bar
        ui.horizontal(|ui| {
            ui.allocate_ui(Vec2::new(240.0, panel_height), |ui| {
                ui.vertical(|ui| {
                    ui.set_width(240.0);
                    egui::ScrollArea::vertical()
                        .id_salt("controls_scroll")
                        .show(ui, |ui| self.draw_controls(ui));
                });
            });
            ui.add_space(8.0);
            ui.allocate_ui(Vec2::new(ui.available_width(), panel_height), |ui| {
                self.draw_canvas(ui);
            });
        });

        // ── Status bar ───────────────────────────────────────────────────────
        ui.separator();
        ui.horizontal(|ui| {
            if self.busy() {
                ui.spinner();
                ui.add_space(4.0);
            }
            ui.label(
                RichText::new(&self.status_message)
                    .color(Color32::LIGHT_GRAY)
                    .small(),
            );
            if let Some(session) = &self.session {
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(
                        RichText::new(format!(
                            "{}×{} px · scale {:.3}",
                            session.original().width(),
                            session.original().height(),
                            session.scale()
                        ))
                        .color(Color32::GRAY)
                        .small(),
                    );
                });
            }
        });
    }

    fn draw_settings_tab(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.add_space(12.0);
            section_header(ui, "Display");
            ui.horizontal(|ui| {
                ui.label("Long edge budget:");
                let resp = ui.add(
                    egui::DragValue::new(&mut self.settings.max_display_pixels)
                        .range(100..=4000)
                        .suffix(" px"),
                );
                if committed(&resp) && self.session.is_some() {
                    let pixels = self.settings.max_display_pixels;
                    self.queue(Action::Edit(Edit::DisplayBudget(pixels)));
                }
                ui.label(
                    RichText::new("Larger images are scaled down to fit.")
                        .color(Color32::GRAY)
                        .small(),
                );
            });
            ui.add_space(12.0);

            section_header(ui, "Defaults");
            ui.horizontal(|ui| {
                ui.label("Median window:");
                egui::ComboBox::from_id_salt("default_median_window")
                    .selected_text(self.settings.default_median_window.label())
                    .show_ui(ui, |ui| {
                        for w in MedianWindow::all() {
                            ui.selectable_value(
                                &mut self.settings.default_median_window,
                                *w,
                                w.label(),
                            );
                        }
                    });
            });
            ui.horizontal(|ui| {
                ui.label("Threshold cutoff:");
                ui.add(
                    egui::Slider::new(&mut self.settings.default_cutoff, 0.0..=1.0)
                        .fixed_decimals(2),
                );
            });
            ui.add_space(12.0);

            section_header(ui, "Logging");
            ui.checkbox(&mut self.settings.verbose, "Verbose console output");
            ui.label(
                RichText::new("Applies on next start. --verbose and --debug override it.")
                    .color(Color32::GRAY)
                    .small(),
            );
            ui.add_space(12.0);

            section_header(ui, "Files");
            ui.horizontal(|ui| {
                ui.label("Open dialog starts in:");
                let dir = self
                    .settings
                    .last_directory
                    .as_ref()
                    .map(|d| d.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "(system default)".into());
                ui.label(RichText::new(dir).monospace());
                if ui.small_button("Browse…").clicked() {
                    if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                        self.settings.last_directory = Some(dir);
                    }
                }
                if ui.small_button("Clear").clicked() {
                    self.settings.last_directory = None;
                }
            });
            ui.add_space(16.0);

            ui.horizontal(|ui| {
                if ui
                    .add(
                        egui::Button::new(
                            RichText::new("💾  Save Settings")
                                .color(Color32::WHITE)
                                .strong(),
                        )
                        .fill(Color32::from_rgb(37, 99, 235))
                        .min_size(Vec2::new(140.0, 32.0)),
                    )
                    .clicked()
                {
                    match self.settings.save() {
                        Ok(()) => {
                            self.settings_save_msg =
                                Some(("Settings saved successfully.".into(), false));
                        }
                        Err(e) => {
                            log::error!("Failed to save settings: {e}");
                            self.settings_save_msg =
                                Some((format!("Failed to save: {}", e), true));
                        }
                    }
                }

                if ui.button("↺  Reset to Defaults").clicked() {
                    self.settings = Settings::default();
                    self.settings_save_msg = None;
                    if self.session.is_some() {
                        let pixels = self.settings.max_display_pixels;
                        self.queue(Action::Edit(Edit::DisplayBudget(pixels)));
                    }
                }

                if let Some((msg, is_err)) = &self.settings_save_msg {
                    ui.label(
                        RichText::new(msg.as_str()).color(if *is_err {
                            Color32::from_rgb(248, 113, 113)
                        } else {
                            Color32::from_rgb(74, 222, 128)
                        }),
                    );
                }
            });
            ui.add_space(20.0);
        });
    }
}

impl eframe::App for ColorPickerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Run whatever the previous frame queued; its status is already shown.
        self.run_pending(ctx);

        // Handle file drag-and-drop; a drop while busy waits its turn.
        if let Some(file) = ctx.input(|i| i.raw.dropped_files.first().cloned()) {
            if let Some(path) = file.path {
                self.queue(Action::Load(path));
            }
        }

        // Esc cancels an armed color pick.
        if self.pick != PickState::Idle && ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.pick = PickState::Idle;
            self.queue(Action::Edit(Edit::Picking(false)));
        }

        // ── Top panel: title + tabs ──────────────────────────────────────────
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label(
                    RichText::new("Color Picker")
                        .strong()
                        .size(20.0)
                        .color(Color32::from_rgb(96, 165, 250)),
                );
                ui.add_space(16.0);
                self.draw_tab_bar(ui);
            });
            ui.add_space(4.0);
        });

        // ── Central panel: content ───────────────────────────────────────────
        egui::CentralPanel::default().show(ctx, |ui| match self.tab {
            Tab::Picker => self.draw_picker_tab(ui),
            Tab::Settings => self.draw_settings_tab(ui),
        });

        if self.busy() {
            ctx.request_repaint();
        }
    }
}

// ── widget helpers ────────────────────────────────────────────────────────────

fn tab_button(ui: &mut egui::Ui, label: &str, active: bool, on_click: impl FnOnce()) {
    let fill = if active {
        Color32::from_rgb(37, 99, 235)
    } else {
        Color32::TRANSPARENT
    };
    let text_color = if active {
        Color32::WHITE
    } else {
        Color32::LIGHT_GRAY
    };
    let btn = egui::Button::new(RichText::new(label).color(text_color))
        .fill(fill)
        .stroke(Stroke::NONE)
        .rounding(Rounding::same(4.0))
        .min_size(Vec2::new(110.0, 28.0));
    if ui.add(btn).clicked() {
        on_click();
    }
}

fn toolbar_button(ui: &mut egui::Ui, label: &str) -> egui::Response {
    ui.add(
        egui::Button::new(label)
            .rounding(Rounding::same(4.0))
            .min_size(Vec2::new(130.0, 32.0)),
    )
}

fn section_header(ui: &mut egui::Ui, title: &str) {
    ui.label(RichText::new(title).strong().size(14.0));
    ui.separator();
    ui.add_space(4.0);
}

/// True once a slider or drag value settles: on release, or on a click or
/// typed edit that involved no dragging.
fn committed(resp: &egui::Response) -> bool {
    resp.drag_stopped() || (resp.changed() && !resp.dragged())
}

// ── image utilities ───────────────────────────────────────────────────────────

fn frame_to_color_image(frame: &Frame) -> ColorImage {
    let (w, h) = frame.dimensions();
    let size = [w as usize, h as usize];
    match frame {
        Frame::Color(img) => ColorImage::from_rgb(size, img.as_raw()),
        Frame::Gray(img) => ColorImage::from_gray(size, img.as_raw()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn gray_frames_expand_to_opaque_pixels() {
        let frame = Frame::Gray(GrayImage::from_pixel(3, 2, Luma([128])));
        let img = frame_to_color_image(&frame);
        assert_eq!(img.size, [3, 2]);
        assert!(img.pixels.iter().all(|p| *p == Color32::from_gray(128)));
    }

    #[test]
    fn color_frames_keep_channel_order() {
        let frame = Frame::Color(RgbImage::from_pixel(2, 2, Rgb([10, 20, 30])));
        let img = frame_to_color_image(&frame);
        assert_eq!(img.pixels[3], Color32::from_rgb(10, 20, 30));
    }

    fn missing_path() -> PathBuf {
        std::env::temp_dir().join(format!("gccp_app_{}_missing.png", std::process::id()))
    }

    fn core_sample() -> RgbImage {
        RgbImage::from_fn(4, 2, |x, _| {
            if x < 2 {
                Rgb([10, 20, 30])
            } else {
                Rgb([240, 240, 240])
            }
        })
    }

    fn app_with_image() -> ColorPickerApp {
        let mut app = ColorPickerApp::with_settings(Settings::default());
        let controls = Controls {
            threshold_enabled: true,
            cutoff: 0.9,
            reference: ReferenceColor([10, 20, 30]),
            ..Controls::default()
        };
        app.session = Some(Session::new(core_sample(), controls, 1000));
        app.file_name = Some("core.png".into());
        app.sync_controls();
        app
    }

    #[test]
    fn failed_load_keeps_the_open_image() {
        let ctx = egui::Context::default();
        let mut app = app_with_image();
        let before = app.controls.clone();

        app.load(missing_path(), &ctx);

        let session = app.session.as_ref().unwrap();
        assert_eq!(session.original(), &core_sample());
        assert_eq!(session.controls(), &before);
        assert_eq!(app.controls, before);
        assert_eq!(app.file_name.as_deref(), Some("core.png"));
        assert!(app.status_message.starts_with("Failed to load image"));
    }

    #[test]
    fn failed_first_load_resets_controls() {
        let ctx = egui::Context::default();
        let mut app = ColorPickerApp::with_settings(Settings::default());
        app.controls.threshold_enabled = true;
        app.controls.reference = ReferenceColor([1, 2, 3]);
        app.reference_edit = [1, 2, 3];
        app.cutoff_edit = 0.7;

        app.load(missing_path(), &ctx);

        assert!(app.session.is_none());
        assert!(app.texture.is_none());
        assert_eq!(app.controls, Controls::from_settings(&Settings::default()));
        assert_eq!(app.reference_edit, [255, 255, 255]);
        assert_eq!(app.cutoff_edit, 0.0);
    }

    #[test]
    fn queued_actions_all_run_in_order() {
        let ctx = egui::Context::default();
        let mut app = app_with_image();
        app.queue(Action::Edit(Edit::Overlay(true)));
        app.queue(Action::Load(missing_path()));
        assert_eq!(app.pending.len(), 2);

        app.run_pending(&ctx);
        assert!(app.controls.overlay_enabled);
        assert!(app.busy());

        app.run_pending(&ctx);
        assert!(!app.busy());
        assert!(app.status_message.starts_with("Failed to load image"));
        assert!(app.session.is_some());
    }

    #[test]
    fn drag_centers_on_the_press_point() {
        let press = Pos2::new(100.0, 100.0);
        let (state, done) = PickState::Armed.advance(&Gesture {
            press: Some(press),
            pointer: Some(Pos2::new(106.0, 100.0)),
            drag_started: true,
            ..Gesture::default()
        });
        assert_eq!(state, PickState::Dragging(Selection { center: press, radius: 6.0 }));
        assert!(done.is_none());

        let (state, done) = state.advance(&Gesture {
            pointer: Some(Pos2::new(100.0, 108.0)),
            drag_stopped: true,
            ..Gesture::default()
        });
        assert_eq!(state, PickState::Idle);
        assert_eq!(done, Some(Selection { center: press, radius: 8.0 }));
    }

    #[test]
    fn click_samples_a_single_point() {
        let press = Pos2::new(3.0, 4.0);
        let (state, done) = PickState::Armed.advance(&Gesture {
            press: Some(press),
            pointer: Some(press),
            clicked: true,
            ..Gesture::default()
        });
        assert_eq!(state, PickState::Idle);
        assert_eq!(done, Some(Selection { center: press, radius: 0.0 }));

        let idle = Gesture { clicked: true, pointer: Some(press), ..Gesture::default() };
        assert_eq!(PickState::Idle.advance(&idle), (PickState::Idle, None));
    }

    #[test]
    fn picking_shows_colors_until_the_sample_lands() {
        let ctx = egui::Context::default();
        let mut app = app_with_image();
        let shows_mask = |app: &ColorPickerApp| {
            matches!(app.session.as_ref().unwrap().display().frame, Frame::Gray(_))
        };
        assert!(shows_mask(&app));

        app.apply(Edit::Picking(true), &ctx);
        assert!(!shows_mask(&app));

        let sel = Selection { center: Pos2::new(3.0, 1.0), radius: 0.0 };
        app.apply(Edit::Sample(sel), &ctx);
        assert!(shows_mask(&app));
        assert_eq!(app.controls.reference, ReferenceColor([240, 240, 240]));
    }

    #[test]
    fn sample_outside_the_image_still_ends_picking() {
        let ctx = egui::Context::default();
        let mut app = app_with_image();
        app.apply(Edit::Picking(true), &ctx);

        let sel = Selection { center: Pos2::new(50.0, 50.0), radius: 2.0 };
        app.apply(Edit::Sample(sel), &ctx);

        let session = app.session.as_ref().unwrap();
        assert!(!session.is_picking());
        assert_eq!(session.controls().reference, ReferenceColor([10, 20, 30]));
        assert!(app.status_message.starts_with("Selection is outside"));
    }
}
