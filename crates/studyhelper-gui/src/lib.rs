//! Study Helper desktop UI built on eframe/egui.

pub mod app;
pub mod async_bridge;
pub mod dialogs;
pub mod state;
pub mod ui_state;
pub mod views;

/// Main entry point for the GUI.
pub fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([960.0, 640.0])
            .with_resizable(true)
            .with_title("Study Helper"),
        ..Default::default()
    };

    eframe::run_native(
        "Study Helper",
        native_options,
        Box::new(|cc| Ok(Box::new(app::StudyApp::new(cc)))),
    )
    .map_err(|e| {
        Box::new(std::io::Error::other(format!("{e:?}")))
            as Box<dyn std::error::Error + Send + Sync>
    })?;

    Ok(())
}
