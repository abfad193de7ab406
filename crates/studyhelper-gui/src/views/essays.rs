//! Essay review and topic management.
//!
//! The review screen walks the strict two-step sequence: recognize (OCR)
//! first, then optimize against the recognized text. The OCR result stays on
//! screen between the steps, and a failed optimize can be retried without
//! re-uploading the image.

use chrono::{Datelike, Local};
use studyhelper_core::client::Attachment;
use studyhelper_core::models::{EssayType, SavedReport, TopicCatalog, TopicDetail};
use studyhelper_core::workflow::EssayReview;

use crate::dialogs;
use crate::state::{ResponseSlot, ViewState};
use crate::views::{ViewEnv, error_label, hint_label, texture_from_bytes};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Analyze,
    Topics,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Busy {
    Idle,
    Recognizing,
    Analyzing,
    Saving,
}

pub struct EssaysView {
    tab: Tab,

    catalog: ViewState<TopicCatalog>,
    catalog_slot: ResponseSlot<TopicCatalog>,

    // analysis flow
    year: i32,
    essay_type: EssayType,
    essay_image: Option<Attachment>,
    busy: Busy,
    review: Option<EssayReview>,
    review_slot: ResponseSlot<(EssayReview, Option<String>)>,
    review_error: Option<String>,
    saved: ViewState<SavedReport>,
    save_slot: ResponseSlot<SavedReport>,

    // topic management
    manage_year: i32,
    manage_type: EssayType,
    detail: ViewState<TopicDetail>,
    detail_slot: ResponseSlot<TopicDetail>,
    image_slot: ResponseSlot<Vec<u8>>,
    pending_image: Option<Vec<u8>>,
    image_texture: Option<egui::TextureHandle>,
    add_image: Option<Attachment>,
    add_reference: String,
    topic_action: ViewState<String>,
    topic_action_slot: ResponseSlot<String>,
}

impl Default for EssaysView {
    fn default() -> Self {
        let year = Local::now().date_naive().year();
        Self {
            tab: Tab::Analyze,
            catalog: ViewState::Idle,
            catalog_slot: ResponseSlot::new(),
            year,
            essay_type: EssayType::Large,
            essay_image: None,
            busy: Busy::Idle,
            review: None,
            review_slot: ResponseSlot::new(),
            review_error: None,
            saved: ViewState::Idle,
            save_slot: ResponseSlot::new(),
            manage_year: year,
            manage_type: EssayType::Large,
            detail: ViewState::Idle,
            detail_slot: ResponseSlot::new(),
            image_slot: ResponseSlot::new(),
            pending_image: None,
            image_texture: None,
            add_image: None,
            add_reference: String::new(),
            topic_action: ViewState::Idle,
            topic_action_slot: ResponseSlot::new(),
        }
    }
}

impl EssaysView {
    pub fn ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        self.poll(env);

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Analyze, "作文分析");
            ui.selectable_value(&mut self.tab, Tab::Topics, "题目管理");
        });
        ui.separator();

        match self.tab {
            Tab::Analyze => self.analyze_ui(ui, env),
            Tab::Topics => self.topics_ui(ui, env),
        }
    }

    fn poll(&mut self, env: &ViewEnv<'_>) {
        if let Some(result) = self.catalog_slot.take() {
            self.catalog = result.into();
        }
        if let Some(result) = self.review_slot.take() {
            match result {
                Ok((review, error)) => {
                    self.review = Some(review);
                    self.review_error = error;
                }
                Err(message) => self.review_error = Some(message),
            }
            self.busy = Busy::Idle;
        }
        if let Some(result) = self.save_slot.take() {
            self.saved = result.into();
            self.busy = Busy::Idle;
        }
        if let Some(result) = self.detail_slot.take() {
            self.detail = result.into();
        }
        if let Some(result) = self.image_slot.take() {
            match result {
                Ok(bytes) => self.pending_image = Some(bytes),
                Err(_) => self.image_texture = None,
            }
        }
        if let Some(result) = self.topic_action_slot.take() {
            if result.is_ok() {
                self.fetch_catalog(env);
                self.detail = ViewState::Idle;
                self.image_texture = None;
            }
            self.topic_action = result.into();
        }

        if matches!(self.catalog, ViewState::Idle) {
            self.fetch_catalog(env);
        }
    }

    fn fetch_catalog(&mut self, env: &ViewEnv<'_>) {
        self.catalog = ViewState::Loading;
        let client = env.client.clone();
        env.bridge.spawn(self.catalog_slot.clone(), async move {
            client.topic_catalog().await.map_err(|err| err.to_string())
        });
    }

    fn year_type_selectors(
        ui: &mut egui::Ui,
        id: &str,
        catalog: &ViewState<TopicCatalog>,
        year: &mut i32,
        essay_type: &mut EssayType,
    ) {
        ui.label("年份:");
        match catalog.ready() {
            Some(catalog) if !catalog.years.is_empty() => {
                egui::ComboBox::from_id_salt(format!("{id}_year"))
                    .selected_text(year.to_string())
                    .show_ui(ui, |ui| {
                        for candidate in &catalog.years {
                            ui.selectable_value(year, *candidate, candidate.to_string());
                        }
                    });
            }
            _ => {
                ui.add(egui::DragValue::new(year).range(2000..=2100));
            }
        }

        ui.label("类型:");
        egui::ComboBox::from_id_salt(format!("{id}_type"))
            .selected_text(essay_type.label())
            .show_ui(ui, |ui| {
                for candidate in EssayType::ALL {
                    ui.selectable_value(essay_type, candidate, candidate.label());
                }
            });
    }

    // -- analysis -----------------------------------------------------------

    fn analyze_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        ui.horizontal(|ui| {
            Self::year_type_selectors(
                ui,
                "analyze",
                &self.catalog,
                &mut self.year,
                &mut self.essay_type,
            );

            if ui.button("选择作文图片…").clicked() {
                if let Some(path) = dialogs::pick_image() {
                    match Attachment::read(&path) {
                        Ok(attachment) => self.essay_image = Some(attachment),
                        Err(err) => self.review_error = Some(err.to_string()),
                    }
                }
            }
            if let Some(ref image) = self.essay_image {
                ui.label(&image.filename);
            }
        });

        let idle = self.busy == Busy::Idle;
        ui.horizontal(|ui| {
            let can_recognize = idle && self.essay_image.is_some();
            if ui
                .add_enabled(can_recognize, egui::Button::new("第一步：识别原文"))
                .clicked()
            {
                self.start_recognize(env);
            }

            let can_analyze = idle
                && self
                    .review
                    .as_ref()
                    .and_then(|review| review.recognized())
                    .is_some();
            if ui
                .add_enabled(can_analyze, egui::Button::new("第二步：优化作文"))
                .clicked()
            {
                self.start_analyze(env);
            }

            match self.busy {
                Busy::Recognizing => {
                    ui.spinner();
                    ui.label("正在识别…");
                }
                Busy::Analyzing => {
                    ui.spinner();
                    ui.label("正在优化…");
                }
                Busy::Saving => {
                    ui.spinner();
                    ui.label("正在保存…");
                }
                Busy::Idle => {}
            }
        });

        if let Some(ref message) = self.review_error {
            error_label(ui, message);
        }

        let review = self.review.clone();
        egui::ScrollArea::vertical().show(ui, |ui| {
            if let Some(ref review) = review {
                if let Some(recognized) = review.recognized() {
                    ui.add_space(8.0);
                    ui.group(|ui| {
                        ui.strong(format!("识别结果 — {}", recognized.topic));
                        ui.label(&recognized.original_text);
                    });
                }

                if let Some(analysis) = review.analysis() {
                    ui.add_space(8.0);
                    if let Some(ref score) = analysis.score {
                        ui.group(|ui| {
                            ui.strong("AI评分");
                            ui.label(format!(
                                "{} 分 / {} ({})",
                                score.points,
                                review.essay_type().max_points(),
                                score.level
                            ));
                        });
                    }

                    ui.add_space(8.0);
                    ui.columns(2, |columns| {
                        columns[0].group(|ui| {
                            ui.strong("原文");
                            ui.label(&analysis.original_text);
                        });
                        columns[1].group(|ui| {
                            ui.strong("优化后");
                            ui.label(&analysis.optimized_text);
                        });
                    });

                    ui.add_space(8.0);
                    ui.group(|ui| {
                        ui.strong("修改建议");
                        suggestion_section(ui, "题意符合度", &analysis.suggestions.topic_compliance);
                        suggestion_section(ui, "拼写错误", &analysis.suggestions.spelling_errors);
                        suggestion_section(ui, "语法错误", &analysis.suggestions.grammar_errors);
                        suggestion_section(ui, "单词优化", &analysis.suggestions.word_optimization);
                        suggestion_section(ui, "句式优化", &analysis.suggestions.sentence_optimization);
                        suggestion_section(ui, "结构优化", &analysis.suggestions.structure_optimization);
                    });

                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui
                            .add_enabled(idle, egui::Button::new("保存为Markdown"))
                            .clicked()
                        {
                            self.start_save(env);
                        }
                        match &self.saved {
                            ViewState::Ready(saved) => {
                                ui.label(
                                    egui::RichText::new(&saved.message)
                                        .color(egui::Color32::DARK_GREEN),
                                );
                                if ui.button("打开报告").clicked() {
                                    if let Err(err) = open::that(&saved.file_path) {
                                        tracing::warn!(error = %err, "Failed to open saved report");
                                    }
                                }
                            }
                            ViewState::Failed(message) => error_label(ui, message),
                            _ => {}
                        }
                    });
                }
            }
        });
    }

    fn start_recognize(&mut self, env: &ViewEnv<'_>) {
        let Some(image) = self.essay_image.clone() else {
            return;
        };
        self.busy = Busy::Recognizing;
        self.review_error = None;
        self.saved = ViewState::Idle;

        let client = env.client.clone();
        let year = self.year;
        let essay_type = self.essay_type;
        env.bridge.spawn(self.review_slot.clone(), async move {
            let mut review = EssayReview::new(client, year, essay_type);
            let error = review
                .recognize(image)
                .await
                .err()
                .map(|err| err.to_string());
            Ok((review, error))
        });
    }

    fn start_analyze(&mut self, env: &ViewEnv<'_>) {
        let Some(review) = self.review.clone() else {
            return;
        };
        self.busy = Busy::Analyzing;
        self.review_error = None;
        self.saved = ViewState::Idle;

        env.bridge.spawn(self.review_slot.clone(), async move {
            let mut review = review;
            // A failure leaves the review at the recognized stage, ready to
            // be retried.
            let error = review.analyze().await.err().map(|err| err.to_string());
            Ok((review, error))
        });
    }

    fn start_save(&mut self, env: &ViewEnv<'_>) {
        let Some(review) = self.review.clone() else {
            return;
        };
        self.busy = Busy::Saving;
        env.bridge.spawn(self.save_slot.clone(), async move {
            review.save().await.map_err(|err| err.to_string())
        });
    }

    // -- topic management ---------------------------------------------------

    fn topics_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        match &self.catalog {
            ViewState::Loading => {
                ui.spinner();
            }
            ViewState::Failed(message) => error_label(ui, message),
            ViewState::Ready(catalog) if catalog.years.is_empty() => {
                hint_label(ui, "还没有录入任何作文题目。");
            }
            _ => {}
        }

        ui.horizontal(|ui| {
            Self::year_type_selectors(
                ui,
                "manage",
                &self.catalog,
                &mut self.manage_year,
                &mut self.manage_type,
            );

            if ui.button("查看").clicked() {
                self.fetch_detail(env);
            }
            if ui.button("删除该题目").clicked() {
                self.delete_topic(env);
            }
        });

        match &self.topic_action {
            ViewState::Ready(message) => {
                ui.label(egui::RichText::new(message).color(egui::Color32::DARK_GREEN));
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }

        if let Some(bytes) = self.pending_image.take() {
            match texture_from_bytes(ui.ctx(), "topic_image", &bytes) {
                Ok(texture) => self.image_texture = Some(texture),
                Err(err) => tracing::warn!(error = %err, "Failed to decode topic image"),
            }
        }

        match &self.detail {
            ViewState::Loading => {
                ui.spinner();
            }
            ViewState::Failed(message) => error_label(ui, message),
            ViewState::Ready(detail) => {
                ui.add_space(8.0);
                ui.group(|ui| {
                    ui.strong(format!("{}年{}", detail.year, detail.essay_type));
                    if let Some(ref texture) = self.image_texture {
                        ui.add(egui::Image::new(texture).max_width(420.0));
                    }
                    ui.label("参考范文:");
                    ui.label(&detail.reference_essay);
                });
            }
            ViewState::Idle => {}
        }

        ui.add_space(12.0);
        ui.separator();
        ui.strong("添加新题目");
        ui.horizontal(|ui| {
            if ui.button("选择题目图片…").clicked() {
                if let Some(path) = dialogs::pick_image() {
                    match Attachment::read(&path) {
                        Ok(attachment) => self.add_image = Some(attachment),
                        Err(err) => self.topic_action = ViewState::Failed(err.to_string()),
                    }
                }
            }
            if let Some(ref image) = self.add_image {
                ui.label(&image.filename);
            }
        });
        ui.label("参考范文:");
        ui.add(
            egui::TextEdit::multiline(&mut self.add_reference)
                .desired_rows(5)
                .desired_width(f32::INFINITY),
        );

        let busy = self.topic_action.is_loading();
        let can_submit = !busy && self.add_image.is_some() && !self.add_reference.trim().is_empty();
        if ui
            .add_enabled(can_submit, egui::Button::new("添加题目"))
            .clicked()
        {
            let client = env.client.clone();
            let year = self.manage_year;
            let essay_type = self.manage_type;
            let Some(image) = self.add_image.take() else {
                return;
            };
            let reference = self.add_reference.trim().to_string();
            self.add_reference.clear();
            self.topic_action = ViewState::Loading;
            env.bridge.spawn(self.topic_action_slot.clone(), async move {
                client
                    .add_topic(year, essay_type, image, &reference)
                    .await
                    .map(|reply| reply.message)
                    .map_err(|err| err.to_string())
            });
        }
        if busy {
            ui.spinner();
        }
    }

    fn fetch_detail(&mut self, env: &ViewEnv<'_>) {
        self.detail = ViewState::Loading;
        self.image_texture = None;

        let client = env.client.clone();
        let year = self.manage_year;
        let essay_type = self.manage_type;
        env.bridge.spawn(self.detail_slot.clone(), async move {
            client
                .topic_detail(year, essay_type)
                .await
                .map_err(|err| err.to_string())
        });

        let client = env.client.clone();
        env.bridge.spawn(self.image_slot.clone(), async move {
            client
                .topic_image(year, essay_type)
                .await
                .map_err(|err| err.to_string())
        });
    }

    fn delete_topic(&mut self, env: &ViewEnv<'_>) {
        self.topic_action = ViewState::Loading;
        let client = env.client.clone();
        let year = self.manage_year;
        let essay_type = self.manage_type;
        env.bridge.spawn(self.topic_action_slot.clone(), async move {
            client
                .delete_topic(year, essay_type)
                .await
                .map(|reply| reply.message)
                .map_err(|err| err.to_string())
        });
    }
}

fn suggestion_section(ui: &mut egui::Ui, title: &str, items: &[String]) {
    ui.label(egui::RichText::new(title).underline());
    if items.is_empty() {
        ui.label("无");
    } else {
        for item in items {
            ui.label(format!("• {item}"));
        }
    }
    ui.add_space(4.0);
}
