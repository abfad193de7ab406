//! Score tracking: entry form, paginated listing with edit/delete, and the
//! per-subject trend chart.

use chrono::{Datelike, Local};
use egui_plot::{Line, Plot, PlotPoints};
use studyhelper_core::models::{
    NewScore, Score, ScorePage, ScoreQuery, ScoreSeries, ScoreUpdate, Subject, parse_date,
};

use crate::state::{ResponseSlot, ViewState};
use crate::views::{ViewEnv, error_label, hint_label};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Entry,
    List,
    Chart,
}

struct ScoreForm {
    subject: Subject,
    year: i32,
    paper_type: String,
    score: f64,
    date: String,
}

impl Default for ScoreForm {
    fn default() -> Self {
        let today = Local::now().date_naive();
        Self {
            subject: Subject::Math,
            year: today.year(),
            paper_type: String::new(),
            score: 0.0,
            date: today.format("%Y-%m-%d").to_string(),
        }
    }
}

pub struct ScoresView {
    tab: Tab,

    form: ScoreForm,
    /// Row under edit; `None` means the form creates a new score.
    editing: Option<Score>,
    validation: Option<String>,

    paper_types: ViewState<Vec<String>>,
    paper_types_slot: ResponseSlot<Vec<String>>,
    /// Subject the fetched paper types belong to.
    paper_types_for: Option<Subject>,

    submit: ViewState<String>,
    submit_slot: ResponseSlot<String>,

    page: u32,
    filter_subject: Option<Subject>,
    list: ViewState<ScorePage>,
    list_slot: ResponseSlot<ScorePage>,
    delete_slot: ResponseSlot<String>,
    needs_refresh: bool,

    chart_subject: Subject,
    chart_paper_type: String,
    chart: ViewState<ScoreSeries>,
    chart_slot: ResponseSlot<ScoreSeries>,
}

impl Default for ScoresView {
    fn default() -> Self {
        Self {
            tab: Tab::Entry,
            form: ScoreForm::default(),
            editing: None,
            validation: None,
            paper_types: ViewState::Idle,
            paper_types_slot: ResponseSlot::new(),
            paper_types_for: None,
            submit: ViewState::Idle,
            submit_slot: ResponseSlot::new(),
            page: 1,
            filter_subject: None,
            list: ViewState::Idle,
            list_slot: ResponseSlot::new(),
            delete_slot: ResponseSlot::new(),
            needs_refresh: false,
            chart_subject: Subject::Math,
            chart_paper_type: String::new(),
            chart: ViewState::Idle,
            chart_slot: ResponseSlot::new(),
        }
    }
}

impl ScoresView {
    pub fn ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        self.poll(env);

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Entry, "录入");
            ui.selectable_value(&mut self.tab, Tab::List, "列表");
            ui.selectable_value(&mut self.tab, Tab::Chart, "走势");
        });
        ui.separator();

        match self.tab {
            Tab::Entry => self.entry_ui(ui, env),
            Tab::List => self.list_ui(ui, env),
            Tab::Chart => self.chart_ui(ui, env),
        }
    }

    fn poll(&mut self, env: &ViewEnv<'_>) {
        if let Some(result) = self.paper_types_slot.take() {
            self.paper_types = result.into();
        }
        if let Some(result) = self.submit_slot.take() {
            if result.is_ok() {
                self.editing = None;
                self.form = ScoreForm::default();
                self.needs_refresh = true;
            }
            self.submit = result.into();
        }
        if let Some(result) = self.list_slot.take() {
            self.list = result.into();
        }
        if let Some(result) = self.delete_slot.take() {
            match result {
                Ok(_) => self.needs_refresh = true,
                Err(message) => self.list = ViewState::Failed(message),
            }
        }
        if let Some(result) = self.chart_slot.take() {
            self.chart = result.into();
        }

        if self.paper_types_for != Some(self.form.subject) {
            self.fetch_paper_types(env);
        }
        if self.needs_refresh && !self.list.is_loading() {
            self.needs_refresh = false;
            self.fetch_list(env);
        }
    }

    fn fetch_paper_types(&mut self, env: &ViewEnv<'_>) {
        let subject = self.form.subject;
        self.paper_types_for = Some(subject);
        self.paper_types = ViewState::Loading;
        let client = env.client.clone();
        env.bridge.spawn(self.paper_types_slot.clone(), async move {
            client
                .paper_types(subject)
                .await
                .map_err(|err| err.to_string())
        });
    }

    fn fetch_list(&mut self, env: &ViewEnv<'_>) {
        self.list = ViewState::Loading;
        let client = env.client.clone();
        let query = ScoreQuery {
            subject: self.filter_subject,
            paper_type: None,
            page: self.page,
            page_size: env.page_size,
        };
        env.bridge.spawn(self.list_slot.clone(), async move {
            client.scores(&query).await.map_err(|err| err.to_string())
        });
    }

    fn entry_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        if let Some(ref editing) = self.editing {
            hint_label(ui, &format!("正在编辑记录 #{}", editing.id));
        }

        ui.horizontal(|ui| {
            ui.label("科目:");
            egui::ComboBox::from_id_salt("score_subject")
                .selected_text(self.form.subject.label())
                .show_ui(ui, |ui| {
                    for subject in Subject::ALL {
                        ui.selectable_value(&mut self.form.subject, subject, subject.label());
                    }
                });

            ui.label("年份:");
            ui.add(egui::DragValue::new(&mut self.form.year).range(2000..=2100));
        });

        ui.horizontal(|ui| {
            ui.label("试卷类型:");
            match &self.paper_types {
                ViewState::Ready(types) => {
                    egui::ComboBox::from_id_salt("score_paper_type")
                        .selected_text(if self.form.paper_type.is_empty() {
                            "选择试卷类型"
                        } else {
                            self.form.paper_type.as_str()
                        })
                        .show_ui(ui, |ui| {
                            for paper_type in types {
                                ui.selectable_value(
                                    &mut self.form.paper_type,
                                    paper_type.clone(),
                                    paper_type,
                                );
                            }
                        });
                }
                ViewState::Loading => {
                    ui.spinner();
                }
                ViewState::Failed(message) => {
                    error_label(ui, message);
                }
                ViewState::Idle => {}
            }
        });

        ui.horizontal(|ui| {
            ui.label(format!("分数 (0-{}):", self.form.subject.max_score()));
            ui.add(
                egui::DragValue::new(&mut self.form.score)
                    .speed(0.5)
                    .range(0.0..=200.0),
            );

            ui.label("日期:");
            ui.add(egui::TextEdit::singleline(&mut self.form.date).desired_width(110.0));
        });

        if let Some(ref message) = self.validation {
            error_label(ui, message);
        }

        let busy = self.submit.is_loading();
        ui.horizontal(|ui| {
            let label = if self.editing.is_some() {
                "保存修改"
            } else {
                "添加记录"
            };
            // The loading flag disabling this button is the only
            // double-submit guard.
            if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                self.submit_form(env);
            }
            if self.editing.is_some() && ui.button("取消编辑").clicked() {
                self.editing = None;
                self.form = ScoreForm::default();
                self.validation = None;
            }
            if busy {
                ui.spinner();
            }
        });

        match &self.submit {
            ViewState::Ready(message) => {
                ui.label(egui::RichText::new(message).color(egui::Color32::DARK_GREEN));
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }
    }

    fn submit_form(&mut self, env: &ViewEnv<'_>) {
        self.validation = None;

        let input_date = match parse_date(&self.form.date) {
            Ok(date) => date,
            Err(err) => {
                self.validation = Some(err.to_string());
                return;
            }
        };

        let client = env.client.clone();
        match self.editing {
            None => {
                let score = NewScore {
                    subject: self.form.subject,
                    year: self.form.year,
                    paper_type: self.form.paper_type.clone(),
                    score: self.form.score,
                    input_date,
                };
                // Rejected input never reaches the network.
                if let Err(err) = score.validate() {
                    self.validation = Some(err.to_string());
                    return;
                }
                self.submit = ViewState::Loading;
                env.bridge.spawn(self.submit_slot.clone(), async move {
                    client
                        .create_score(&score)
                        .await
                        .map(|created| created.message)
                        .map_err(|err| err.to_string())
                });
            }
            Some(ref row) => {
                let update = ScoreUpdate {
                    subject: Some(self.form.subject),
                    year: Some(self.form.year),
                    paper_type: Some(self.form.paper_type.clone()),
                    score: Some(self.form.score),
                    input_date: Some(input_date),
                };
                // Same bound check as the add form.
                if let Err(err) = update.validate(row.subject) {
                    self.validation = Some(err.to_string());
                    return;
                }
                let id = row.id;
                self.submit = ViewState::Loading;
                env.bridge.spawn(self.submit_slot.clone(), async move {
                    client
                        .update_score(id, &update)
                        .await
                        .map(|reply| reply.message)
                        .map_err(|err| err.to_string())
                });
            }
        }
    }

    fn list_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        ui.horizontal(|ui| {
            ui.label("科目筛选:");
            let selected = self
                .filter_subject
                .map(Subject::label)
                .unwrap_or("全部");
            let mut changed = false;
            egui::ComboBox::from_id_salt("score_filter_subject")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    changed |= ui
                        .selectable_value(&mut self.filter_subject, None, "全部")
                        .changed();
                    for subject in Subject::ALL {
                        changed |= ui
                            .selectable_value(&mut self.filter_subject, Some(subject), subject.label())
                            .changed();
                    }
                });
            if changed {
                self.page = 1;
                self.fetch_list(env);
            }
            if ui.button("刷新").clicked() {
                self.fetch_list(env);
            }
        });

        if matches!(self.list, ViewState::Idle) {
            self.fetch_list(env);
        }

        let mut edit_request: Option<Score> = None;
        let mut delete_request: Option<i64> = None;

        match &self.list {
            ViewState::Loading => {
                ui.spinner();
            }
            ViewState::Failed(message) => error_label(ui, message),
            ViewState::Ready(page) => {
                if page.data.is_empty() {
                    hint_label(ui, "本页没有记录。");
                } else {
                    egui::Grid::new("score_rows")
                        .striped(true)
                        .num_columns(7)
                        .show(ui, |ui| {
                            ui.strong("ID");
                            ui.strong("科目");
                            ui.strong("年份");
                            ui.strong("试卷类型");
                            ui.strong("分数");
                            ui.strong("日期");
                            ui.strong("");
                            ui.end_row();

                            for row in &page.data {
                                ui.label(row.id.to_string());
                                ui.label(row.subject.label());
                                ui.label(row.year.to_string());
                                ui.label(&row.paper_type);
                                ui.label(format!("{:.1}", row.score));
                                ui.label(row.input_date.to_string());
                                ui.horizontal(|ui| {
                                    if ui.button("编辑").clicked() {
                                        edit_request = Some(row.clone());
                                    }
                                    if ui.button("删除").clicked() {
                                        delete_request = Some(row.id);
                                    }
                                });
                                ui.end_row();
                            }
                        });
                }

                let total_pages =
                    (page.total.max(1) as u32).div_ceil(page.page_size.max(1));
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(self.page > 1, egui::Button::new("上一页"))
                        .clicked()
                    {
                        self.page -= 1;
                        self.needs_refresh = true;
                    }
                    ui.label(format!(
                        "第 {} / {} 页 (共 {} 条)",
                        page.page, total_pages, page.total
                    ));
                    if ui
                        .add_enabled(
                            (self.page as u64) * (page.page_size as u64) < page.total,
                            egui::Button::new("下一页"),
                        )
                        .clicked()
                    {
                        self.page += 1;
                        self.needs_refresh = true;
                    }
                });
            }
            ViewState::Idle => {}
        }

        if let Some(row) = edit_request {
            self.form = ScoreForm {
                subject: row.subject,
                year: row.year,
                paper_type: row.paper_type.clone(),
                score: row.score,
                date: row.input_date.format("%Y-%m-%d").to_string(),
            };
            self.editing = Some(row);
            self.submit = ViewState::Idle;
            self.validation = None;
            self.tab = Tab::Entry;
        }
        if let Some(id) = delete_request {
            let client = env.client.clone();
            env.bridge.spawn(self.delete_slot.clone(), async move {
                client
                    .delete_score(id)
                    .await
                    .map(|reply| reply.message)
                    .map_err(|err| err.to_string())
            });
        }
    }

    fn chart_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        ui.horizontal(|ui| {
            ui.label("科目:");
            egui::ComboBox::from_id_salt("chart_subject")
                .selected_text(self.chart_subject.label())
                .show_ui(ui, |ui| {
                    for subject in Subject::ALL {
                        ui.selectable_value(&mut self.chart_subject, subject, subject.label());
                    }
                });

            ui.label("试卷类型 (可选):");
            ui.add(egui::TextEdit::singleline(&mut self.chart_paper_type).desired_width(140.0));

            let busy = self.chart.is_loading();
            if ui.add_enabled(!busy, egui::Button::new("查询")).clicked() {
                self.chart = ViewState::Loading;
                let client = env.client.clone();
                let subject = self.chart_subject;
                let paper_type = if self.chart_paper_type.trim().is_empty() {
                    None
                } else {
                    Some(self.chart_paper_type.trim().to_string())
                };
                env.bridge.spawn(self.chart_slot.clone(), async move {
                    client
                        .score_chart(subject, paper_type.as_deref())
                        .await
                        .map_err(|err| err.to_string())
                });
            }
            if busy {
                ui.spinner();
            }
        });

        match &self.chart {
            ViewState::Ready(series) if series.is_empty() => {
                hint_label(
                    ui,
                    series.message.as_deref().unwrap_or("未查询到相关数据"),
                );
            }
            ViewState::Ready(series) => {
                let points: PlotPoints = series
                    .scores
                    .iter()
                    .enumerate()
                    .map(|(index, score)| [index as f64, *score])
                    .collect();
                Plot::new("score_trend")
                    .height(280.0)
                    .allow_drag(false)
                    .allow_scroll(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new(self.chart_subject.label(), points));
                    });

                egui::CollapsingHeader::new("数据点")
                    .default_open(false)
                    .show(ui, |ui| {
                        for (date, score) in series.dates.iter().zip(series.scores.iter()) {
                            ui.label(format!("{date}  {score:.1}"));
                        }
                    });
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }
    }
}
