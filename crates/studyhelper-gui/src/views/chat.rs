//! AI study assistant chat. The transcript lives only in view memory until
//! the explicit save action writes it to a backend-side file.

use std::collections::HashMap;

use studyhelper_core::client::Attachment;
use studyhelper_core::models::{ChatMessage, ChatRole, SavedChat};

use crate::dialogs;
use crate::state::{ResponseSlot, ViewState};
use crate::views::{ViewEnv, error_label, hint_label, texture_from_bytes};

pub struct ChatView {
    transcript: Vec<ChatMessage>,
    /// Textures for image attachments, keyed by transcript index.
    textures: HashMap<usize, egui::TextureHandle>,
    input: String,
    attachment: Option<Attachment>,
    attachment_texture: Option<egui::TextureHandle>,
    reply: ViewState<String>,
    reply_slot: ResponseSlot<String>,
    saved: ViewState<SavedChat>,
    save_slot: ResponseSlot<SavedChat>,
}

impl Default for ChatView {
    fn default() -> Self {
        Self {
            transcript: Vec::new(),
            textures: HashMap::new(),
            input: String::new(),
            attachment: None,
            attachment_texture: None,
            reply: ViewState::Idle,
            reply_slot: ResponseSlot::new(),
            saved: ViewState::Idle,
            save_slot: ResponseSlot::new(),
        }
    }
}

impl ChatView {
    pub fn ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        if let Some(result) = self.reply_slot.take() {
            if let Ok(ref response) = result {
                self.transcript.push(ChatMessage::assistant(response.clone()));
            }
            self.reply = result.into();
        }
        if let Some(result) = self.save_slot.take() {
            self.saved = result.into();
        }

        ui.horizontal(|ui| {
            let can_save = !self.transcript.is_empty() && !self.saved.is_loading();
            if ui
                .add_enabled(can_save, egui::Button::new("保存聊天记录"))
                .clicked()
            {
                self.saved = ViewState::Loading;
                let client = env.client.clone();
                let transcript = self.transcript.clone();
                env.bridge.spawn(self.save_slot.clone(), async move {
                    client
                        .save_chat(&transcript)
                        .await
                        .map_err(|err| err.to_string())
                });
            }
            if ui.button("清空对话").clicked() {
                self.transcript.clear();
                self.textures.clear();
                self.reply = ViewState::Idle;
                self.saved = ViewState::Idle;
            }

            match &self.saved {
                ViewState::Ready(saved) => {
                    ui.label(
                        egui::RichText::new(&saved.message).color(egui::Color32::DARK_GREEN),
                    );
                    if ui.button("打开文件").clicked() {
                        if let Err(err) = open::that(&saved.file_path) {
                            tracing::warn!(error = %err, "Failed to open chat transcript");
                        }
                    }
                }
                ViewState::Failed(message) => error_label(ui, message),
                _ => {}
            }
        });
        ui.separator();

        let input_height = 90.0;
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .max_height(ui.available_height() - input_height)
            .show(ui, |ui| {
                if self.transcript.is_empty() {
                    hint_label(ui, "向AI学习助手提问，比如“帮我制定今天的复习计划”。");
                }
                for (index, message) in self.transcript.iter().enumerate() {
                    let who = match message.role {
                        ChatRole::User => "👤 我",
                        ChatRole::Assistant => "🤖 AI助手",
                    };
                    ui.strong(who);
                    if let Some(texture) = self.textures.get(&index) {
                        ui.add(egui::Image::new(texture).max_width(240.0));
                    } else if message.image_url.is_some() {
                        hint_label(ui, "[图片]");
                    }
                    ui.label(&message.content);
                    ui.add_space(8.0);
                }
                if self.reply.is_loading() {
                    ui.spinner();
                }
                if let Some(message) = self.reply.error() {
                    error_label(ui, message);
                }
            });

        ui.separator();
        ui.horizontal(|ui| {
            if ui.button("📎").on_hover_text("附加图片").clicked() {
                if let Some(path) = dialogs::pick_image() {
                    match Attachment::read(&path) {
                        Ok(attachment) => {
                            self.attachment_texture =
                                texture_from_bytes(ui.ctx(), "chat_attachment", &attachment.bytes)
                                    .ok();
                            self.attachment = Some(attachment);
                        }
                        Err(err) => self.reply = ViewState::Failed(err.to_string()),
                    }
                }
            }
            if let Some(ref attachment) = self.attachment {
                ui.label(&attachment.filename);
                if ui.small_button("✕").clicked() {
                    self.attachment = None;
                    self.attachment_texture = None;
                }
            }
        });

        ui.horizontal(|ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.input)
                    .hint_text("输入消息…")
                    .desired_width(ui.available_width() - 80.0),
            );

            let busy = self.reply.is_loading();
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if (ui.add_enabled(!busy, egui::Button::new("发送")).clicked() || (submitted && !busy))
                && !self.input.trim().is_empty()
            {
                self.send(env);
            }
        });
    }

    fn send(&mut self, env: &ViewEnv<'_>) {
        let text = self.input.trim().to_string();
        self.input.clear();

        let attachment = self.attachment.take();
        let history = self.transcript.clone();

        let mut user = ChatMessage::user(text.clone());
        user.image_url = attachment.as_ref().map(Attachment::to_data_url);
        let index = self.transcript.len();
        if let Some(texture) = self.attachment_texture.take() {
            self.textures.insert(index, texture);
        }
        self.transcript.push(user);

        self.reply = ViewState::Loading;
        self.saved = ViewState::Idle;
        let client = env.client.clone();
        env.bridge.spawn(self.reply_slot.clone(), async move {
            client
                .chat(&text, attachment, &history)
                .await
                .map(|reply| reply.response)
                .map_err(|err| err.to_string())
        });
    }
}
