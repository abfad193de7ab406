//! Main application structure: navigation frame plus the feature views.

use chrono::Local;
use studyhelper_core::models::SystemStatus;

use crate::async_bridge::AsyncBridge;
use crate::state::{AppState, ResponseSlot, ViewState};
use crate::ui_state::{LogEntry, LogLevel, Theme, UiState};
use crate::views::chat::ChatView;
use crate::views::essays::EssaysView;
use crate::views::scores::ScoresView;
use crate::views::settings::SettingsView;
use crate::views::tasks::TasksView;
use crate::views::{ViewEnv, hint_label};

/// Navigation sections, the persistent frame the views live in.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Scores,
    Essays,
    Tasks,
    Chat,
    Settings,
}

impl Section {
    const ALL: [Section; 5] = [
        Section::Scores,
        Section::Essays,
        Section::Tasks,
        Section::Chat,
        Section::Settings,
    ];

    fn label(self) -> &'static str {
        match self {
            Section::Scores => "📊 分数统计",
            Section::Essays => "✍ 英语作文",
            Section::Tasks => "📅 每日任务",
            Section::Chat => "💬 AI助手",
            Section::Settings => "⚙ 设置",
        }
    }
}

pub struct StudyApp {
    state: AppState,
    ui_state: UiState,
    async_bridge: AsyncBridge,
    section: Section,

    /// Bootstrap status, fetched once on startup to gate the configuration
    /// hint; re-fetched only on explicit request.
    status: ViewState<SystemStatus>,
    status_slot: ResponseSlot<SystemStatus>,

    scores: ScoresView,
    essays: EssaysView,
    tasks: TasksView,
    chat: ChatView,
    settings: SettingsView,
}

impl StudyApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let state = AppState::new();
        let ui_state = UiState::new(state.config.ui.theme);

        let mut app = Self {
            state,
            ui_state,
            async_bridge: AsyncBridge::new(),
            section: Section::Scores,
            status: ViewState::Idle,
            status_slot: ResponseSlot::new(),
            scores: ScoresView::default(),
            essays: EssaysView::default(),
            tasks: TasksView::default(),
            chat: ChatView::default(),
            settings: SettingsView::default(),
        };

        app.add_log(LogLevel::Info, "Application started");
        app.fetch_status();
        app
    }

    fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.ui_state.add_log_entry(LogEntry {
            timestamp: Local::now().format("%H:%M:%S").to_string(),
            level,
            message: message.into(),
        });
    }

    fn fetch_status(&mut self) {
        self.status = ViewState::Loading;
        let client = self.state.client.clone();
        self.async_bridge
            .spawn(self.status_slot.clone(), async move {
                client.system_status().await.map_err(|err| err.to_string())
            });
    }

    fn apply_theme(&self, ctx: &egui::Context) {
        let visuals = match self.ui_state.theme {
            Theme::Dark => egui::Visuals::dark(),
            Theme::Light => egui::Visuals::light(),
        };
        ctx.set_visuals(visuals);
    }

    fn render_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Study Helper");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let theme_label = match self.ui_state.theme {
                        Theme::Dark => "☀ Light",
                        Theme::Light => "🌙 Dark",
                    };
                    if ui.button(theme_label).clicked() {
                        self.ui_state.theme = match self.ui_state.theme {
                            Theme::Dark => Theme::Light,
                            Theme::Light => Theme::Dark,
                        };
                        self.state.config.ui.theme = self.ui_state.theme.into();
                        if let Err(err) = self.state.save_config() {
                            self.add_log(
                                LogLevel::Error,
                                format!("Failed to save config: {err}"),
                            );
                        }
                    }
                });
            });
        });
    }

    fn render_nav(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("nav_panel")
            .resizable(false)
            .default_width(150.0)
            .show(ctx, |ui| {
                ui.add_space(8.0);
                for section in Section::ALL {
                    if ui
                        .selectable_label(self.section == section, section.label())
                        .clicked()
                    {
                        self.section = section;
                    }
                }

                if let Some(status) = self.status.ready() {
                    if !status.api_configured {
                        ui.add_space(12.0);
                        ui.label(
                            egui::RichText::new("⚠ 尚未配置 AI API 密钥")
                                .color(egui::Color32::from_rgb(200, 140, 0)),
                        );
                        hint_label(ui, "请在“设置”中完成配置。");
                    }
                }
            });
    }

    fn render_technical_log(&mut self, ctx: &egui::Context) {
        if !self.state.config.ui.show_technical_log {
            return;
        }
        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for entry in &self.ui_state.technical_log {
                            let color = match entry.level {
                                LogLevel::Info => ui.visuals().text_color(),
                                LogLevel::Error => egui::Color32::from_rgb(200, 60, 60),
                            };
                            ui.colored_label(
                                color,
                                format!("[{}] {}", entry.timestamp, entry.message),
                            );
                        }
                    });
            });
    }
}

impl eframe::App for StudyApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.apply_theme(ctx);

        if let Some(result) = self.status_slot.take() {
            match &result {
                Ok(status) => {
                    self.add_log(
                        LogLevel::Info,
                        format!(
                            "System status: api_configured={}, daily_tasks_exists={}",
                            status.api_configured, status.daily_tasks_exists
                        ),
                    );
                }
                Err(message) => {
                    self.add_log(LogLevel::Error, format!("Status check failed: {message}"));
                }
            }
            self.status = result.into();
        }

        self.render_top_panel(ctx);
        self.render_nav(ctx);
        self.render_technical_log(ctx);

        let mut refresh_status = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            let env = ViewEnv {
                client: &self.state.client,
                bridge: &self.async_bridge,
                page_size: self.state.config.ui.page_size,
            };
            match self.section {
                Section::Scores => self.scores.ui(ui, &env),
                Section::Essays => self.essays.ui(ui, &env),
                Section::Tasks => self.tasks.ui(ui, &env),
                Section::Chat => self.chat.ui(ui, &env),
                Section::Settings => {
                    refresh_status = self.settings.ui(
                        ui,
                        &env,
                        &self.status,
                        studyhelper_core::current_log_path().map(|path| path.as_path()),
                    );
                }
            }
        });
        if refresh_status {
            self.fetch_status();
        }

        // Keep polling response slots even while no input arrives.
        ctx.request_repaint_after(std::time::Duration::from_millis(100));
    }
}
