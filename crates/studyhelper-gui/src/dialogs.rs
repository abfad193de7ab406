//! Native file dialogs.

use std::path::PathBuf;

use rfd::FileDialog;

/// Pick an image (essay photos, topic images, chat attachments).
pub fn pick_image() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("选择图片")
        .add_filter("Images", &["png", "jpg", "jpeg"])
        .pick_file()
}

/// Pick the daily_tasks.xlsx seed file.
pub fn pick_xlsx() -> Option<PathBuf> {
    FileDialog::new()
        .set_title("选择 daily_tasks.xlsx")
        .add_filter("Excel", &["xlsx"])
        .pick_file()
}
