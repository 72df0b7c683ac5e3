mod app;
mod cli;
mod error;
mod imaging;
mod session;
mod settings;

use clap::Parser;

fn main() -> eframe::Result<()> {
    let cli = cli::Cli::parse();
    let settings = settings::Settings::load();
    cli::init_logging(cli.log_level(&settings));
    log::debug!("Starting with {settings:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Geochemist's Color Picker")
            .with_inner_size([1300.0, 800.0])
            .with_min_inner_size([700.0, 500.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Geochemist's Color Picker",
        options,
        Box::new(move |cc| Ok(Box::new(app::ColorPickerApp::new(cc, settings)))),
    )
}
