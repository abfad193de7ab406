//! System configuration: status, AI API keys, the daily-tasks seed upload,
//! and temp-file cleanup.

use std::path::Path;

use studyhelper_core::client::Attachment;
use studyhelper_core::models::{ApiKeys, SystemStatus};

use crate::dialogs;
use crate::state::{ResponseSlot, ViewState};
use crate::views::{ViewEnv, error_label, hint_label};

pub struct SettingsView {
    modelscope_key: String,
    dashscope_key: String,
    keys_state: ViewState<String>,
    keys_slot: ResponseSlot<String>,
    upload_state: ViewState<String>,
    upload_slot: ResponseSlot<String>,
    cleanup_state: ViewState<String>,
    cleanup_slot: ResponseSlot<String>,
    refresh_needed: bool,
}

impl Default for SettingsView {
    fn default() -> Self {
        Self {
            modelscope_key: String::new(),
            dashscope_key: String::new(),
            keys_state: ViewState::Idle,
            keys_slot: ResponseSlot::new(),
            upload_state: ViewState::Idle,
            upload_slot: ResponseSlot::new(),
            cleanup_state: ViewState::Idle,
            cleanup_slot: ResponseSlot::new(),
            refresh_needed: false,
        }
    }
}

impl SettingsView {
    /// Returns true when the system status should be re-fetched (after a
    /// configuration action, or on explicit request). Status is otherwise
    /// fetched once on startup and never invalidated automatically.
    pub fn ui(
        &mut self,
        ui: &mut egui::Ui,
        env: &ViewEnv<'_>,
        status: &ViewState<SystemStatus>,
        log_path: Option<&Path>,
    ) -> bool {
        if let Some(result) = self.keys_slot.take() {
            if result.is_ok() {
                self.modelscope_key.clear();
                self.dashscope_key.clear();
                self.refresh_needed = true;
            }
            self.keys_state = result.into();
        }
        if let Some(result) = self.upload_slot.take() {
            if result.is_ok() {
                self.refresh_needed = true;
            }
            self.upload_state = result.into();
        }
        if let Some(result) = self.cleanup_slot.take() {
            self.cleanup_state = result.into();
        }

        let mut refresh = std::mem::take(&mut self.refresh_needed);

        ui.group(|ui| {
            ui.strong("系统状态");
            match status {
                ViewState::Loading => {
                    ui.spinner();
                }
                ViewState::Ready(status) => {
                    ui.label(format!(
                        "AI API 密钥: {}",
                        if status.api_configured {
                            "已配置"
                        } else {
                            "未配置"
                        }
                    ));
                    ui.label(format!(
                        "daily_tasks.xlsx: {}",
                        if status.daily_tasks_exists {
                            "已上传"
                        } else {
                            "未上传"
                        }
                    ));
                }
                ViewState::Failed(message) => error_label(ui, message),
                ViewState::Idle => {}
            }
            if ui.button("刷新状态").clicked() {
                refresh = true;
            }
        });

        ui.add_space(8.0);
        ui.group(|ui| {
            ui.strong("AI API 密钥");
            ui.horizontal(|ui| {
                ui.label("ModelScope:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.modelscope_key)
                        .password(true)
                        .desired_width(260.0),
                );
            });
            ui.horizontal(|ui| {
                ui.label("DashScope:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.dashscope_key)
                        .password(true)
                        .desired_width(260.0),
                );
            });

            let busy = self.keys_state.is_loading();
            if ui.add_enabled(!busy, egui::Button::new("保存密钥")).clicked() {
                self.keys_state = ViewState::Loading;
                let client = env.client.clone();
                let keys = ApiKeys {
                    modelscope_api_key: self.modelscope_key.trim().to_string(),
                    dashscope_api_key: self.dashscope_key.trim().to_string(),
                };
                env.bridge.spawn(self.keys_slot.clone(), async move {
                    client
                        .save_api_keys(&keys)
                        .await
                        .map(|ack| ack.message)
                        .map_err(|err| err.to_string())
                });
            }
            match &self.keys_state {
                ViewState::Ready(message) => {
                    ui.label(egui::RichText::new(message).color(egui::Color32::DARK_GREEN));
                }
                ViewState::Failed(message) => error_label(ui, message),
                _ => {}
            }
        });

        ui.add_space(8.0);
        ui.group(|ui| {
            ui.strong("每日任务模板");
            hint_label(ui, "上传 daily_tasks.xlsx 作为每天自动生成任务的模板。");
            let busy = self.upload_state.is_loading();
            if ui
                .add_enabled(!busy, egui::Button::new("上传 daily_tasks.xlsx…"))
                .clicked()
            {
                if let Some(path) = dialogs::pick_xlsx() {
                    match Attachment::read(&path) {
                        Ok(file) => {
                            self.upload_state = ViewState::Loading;
                            let client = env.client.clone();
                            env.bridge.spawn(self.upload_slot.clone(), async move {
                                client
                                    .upload_daily_tasks(file)
                                    .await
                                    .map(|ack| ack.message)
                                    .map_err(|err| err.to_string())
                            });
                        }
                        Err(err) => self.upload_state = ViewState::Failed(err.to_string()),
                    }
                }
            }
            match &self.upload_state {
                ViewState::Ready(message) => {
                    ui.label(egui::RichText::new(message).color(egui::Color32::DARK_GREEN));
                }
                ViewState::Failed(message) => error_label(ui, message),
                _ => {}
            }
        });

        ui.add_space(8.0);
        ui.group(|ui| {
            ui.strong("维护");
            let busy = self.cleanup_state.is_loading();
            if ui
                .add_enabled(!busy, egui::Button::new("清理临时文件"))
                .clicked()
            {
                self.cleanup_state = ViewState::Loading;
                let client = env.client.clone();
                env.bridge.spawn(self.cleanup_slot.clone(), async move {
                    client
                        .cleanup_temp()
                        .await
                        .map(|ack| ack.message)
                        .map_err(|err| err.to_string())
                });
            }
            match &self.cleanup_state {
                ViewState::Ready(message) => {
                    ui.label(egui::RichText::new(message).color(egui::Color32::DARK_GREEN));
                }
                ViewState::Failed(message) => error_label(ui, message),
                _ => {}
            }
        });

        ui.add_space(8.0);
        ui.group(|ui| {
            ui.strong("后端");
            ui.label(format!("API 地址: {}", env.client.base_url()));
            if let Some(path) = log_path {
                ui.label(format!("日志文件: {}", path.display()));
            }
        });

        refresh
    }
}
