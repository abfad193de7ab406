//! Feature views. Each view is a self-contained controller binding API
//! calls to its own inputs and result display; views share nothing mutable
//! and resynchronize only by re-fetching after mutation.

pub mod chat;
pub mod essays;
pub mod scores;
pub mod settings;
pub mod tasks;

use studyhelper_core::client::ApiClient;

use crate::async_bridge::AsyncBridge;

/// What a view needs to dispatch requests.
pub struct ViewEnv<'a> {
    pub client: &'a ApiClient,
    pub bridge: &'a AsyncBridge,
    /// Page size for listings, from the persisted UI preferences.
    pub page_size: u32,
}

/// Decode fetched image bytes into an egui texture.
pub fn texture_from_bytes(
    ctx: &egui::Context,
    name: &str,
    bytes: &[u8],
) -> Result<egui::TextureHandle, String> {
    let decoded = image::load_from_memory(bytes).map_err(|err| err.to_string())?;
    let rgba = decoded.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let color = egui::ColorImage::from_rgba_unmultiplied(size, rgba.as_raw());
    Ok(ctx.load_texture(name, color, egui::TextureOptions::LINEAR))
}

/// Inline error line under a form or result area.
pub fn error_label(ui: &mut egui::Ui, message: &str) {
    ui.colored_label(egui::Color32::from_rgb(200, 60, 60), message);
}

/// Dimmed single-line hint.
pub fn hint_label(ui: &mut egui::Ui, message: &str) {
    ui.label(egui::RichText::new(message).italics().weak());
}
