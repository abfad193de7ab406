//! Daily tasks and study records: today's entry screen, the history screen,
//! and the study-time chart.
//!
//! The entry screen always creates a record (`POST /tasks/save`) and the
//! history screen always updates one (`PUT /tasks/record`). The endpoint is
//! chosen by the screen, never by probing the server first.

use std::collections::HashSet;

use chrono::Local;
use egui_plot::{Line, Plot, PlotPoints};
use studyhelper_core::models::{
    ChartView, DailySummary, RecordReceipt, StudyRecordInput, TaskChartPoint, TaskCreate,
    parse_date,
};
use studyhelper_core::workflow::{RecordMode, submit_record};

use crate::state::{ResponseSlot, ViewState};
use crate::views::{ViewEnv, error_label, hint_label};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Today,
    History,
    Chart,
}

struct DayPanel {
    date: String,
    summary: ViewState<DailySummary>,
    summary_slot: ResponseSlot<DailySummary>,
    hours: u32,
    minutes: u32,
    completed: HashSet<i64>,
    new_task: String,
    task_slot: ResponseSlot<String>,
    record: ViewState<RecordReceipt>,
    record_slot: ResponseSlot<RecordReceipt>,
    validation: Option<String>,
    needs_refresh: bool,
}

impl DayPanel {
    fn new(date: String) -> Self {
        Self {
            date,
            summary: ViewState::Idle,
            summary_slot: ResponseSlot::new(),
            hours: 0,
            minutes: 0,
            completed: HashSet::new(),
            new_task: String::new(),
            task_slot: ResponseSlot::new(),
            record: ViewState::Idle,
            record_slot: ResponseSlot::new(),
            validation: None,
            needs_refresh: false,
        }
    }

    fn poll(&mut self, env: &ViewEnv<'_>) {
        if let Some(result) = self.summary_slot.take() {
            if let Ok(ref summary) = result {
                let (hours, minutes) = summary.hours_minutes();
                self.hours = hours;
                self.minutes = minutes;
                self.completed = summary.completed_ids().into_iter().collect();
            }
            self.summary = result.into();
        }
        if let Some(result) = self.task_slot.take() {
            match result {
                Ok(_) => self.needs_refresh = true,
                Err(message) => self.validation = Some(message),
            }
        }
        if let Some(result) = self.record_slot.take() {
            if result.is_ok() {
                self.needs_refresh = true;
            }
            self.record = result.into();
        }
        if self.needs_refresh && !self.summary.is_loading() {
            self.needs_refresh = false;
            self.fetch(env);
        }
    }

    fn fetch(&mut self, env: &ViewEnv<'_>) {
        self.validation = None;
        let date = match parse_date(&self.date) {
            Ok(date) => date,
            Err(err) => {
                self.validation = Some(err.to_string());
                return;
            }
        };
        self.summary = ViewState::Loading;
        let client = env.client.clone();
        env.bridge.spawn(self.summary_slot.clone(), async move {
            client.tasks_by_date(date).await.map_err(|err| err.to_string())
        });
    }

    fn add_task(&mut self, env: &ViewEnv<'_>) {
        self.validation = None;
        let date = match parse_date(&self.date) {
            Ok(date) => date,
            Err(err) => {
                self.validation = Some(err.to_string());
                return;
            }
        };
        let task = TaskCreate {
            date,
            task_name: self.new_task.trim().to_string(),
        };
        if let Err(err) = task.validate() {
            self.validation = Some(err.to_string());
            return;
        }
        self.new_task.clear();
        let client = env.client.clone();
        env.bridge.spawn(self.task_slot.clone(), async move {
            client
                .add_task(&task)
                .await
                .map(|created| created.message)
                .map_err(|err| err.to_string())
        });
    }

    fn delete_task(&mut self, env: &ViewEnv<'_>, id: i64) {
        let client = env.client.clone();
        env.bridge.spawn(self.task_slot.clone(), async move {
            client
                .delete_task(id)
                .await
                .map(|reply| reply.message)
                .map_err(|err| err.to_string())
        });
    }

    fn save_record(&mut self, env: &ViewEnv<'_>, mode: RecordMode) {
        self.validation = None;
        let date = match parse_date(&self.date) {
            Ok(date) => date,
            Err(err) => {
                self.validation = Some(err.to_string());
                return;
            }
        };
        let record = StudyRecordInput {
            date,
            study_hours: self.hours,
            study_minutes: self.minutes,
            completed_task_ids: self.completed.iter().copied().collect(),
        };
        if let Err(err) = record.validate() {
            self.validation = Some(err.to_string());
            return;
        }

        self.record = ViewState::Loading;
        let client = env.client.clone();
        env.bridge.spawn(self.record_slot.clone(), async move {
            submit_record(&client, mode, &record)
                .await
                .map_err(|err| err.to_string())
        });
    }

    /// Task list plus the record form. The caller decides which record
    /// endpoint the save button maps to.
    fn tasks_and_record_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>, mode: RecordMode) {
        let Some(summary) = self.summary.ready().cloned() else {
            return;
        };

        ui.label(format!(
            "共 {} 项任务，已完成 {} 项 ({:.0}%)",
            summary.total_tasks, summary.completed_tasks, summary.completion_rate
        ));

        let mut delete_request = None;
        for task in &summary.tasks {
            ui.horizontal(|ui| {
                let mut checked = self.completed.contains(&task.id);
                if ui.checkbox(&mut checked, &task.task_name).changed() {
                    if checked {
                        self.completed.insert(task.id);
                    } else {
                        self.completed.remove(&task.id);
                    }
                }
                if ui.small_button("删除").clicked() {
                    delete_request = Some(task.id);
                }
            });
        }
        if let Some(id) = delete_request {
            self.delete_task(env, id);
        }

        ui.horizontal(|ui| {
            ui.add(
                egui::TextEdit::singleline(&mut self.new_task)
                    .hint_text("新任务名称")
                    .desired_width(220.0),
            );
            if ui.button("添加任务").clicked() {
                self.add_task(env);
            }
        });

        ui.separator();
        ui.horizontal(|ui| {
            ui.label("学习时长:");
            ui.add(egui::DragValue::new(&mut self.hours).range(0..=24).suffix(" 小时"));
            ui.add(egui::DragValue::new(&mut self.minutes).range(0..=59).suffix(" 分钟"));

            let busy = self.record.is_loading();
            let label = match mode {
                RecordMode::Create => "保存记录",
                RecordMode::Update => "更新记录",
            };
            if ui.add_enabled(!busy, egui::Button::new(label)).clicked() {
                self.save_record(env, mode);
            }
            if busy {
                ui.spinner();
            }
        });

        match &self.record {
            ViewState::Ready(receipt) => {
                ui.label(
                    egui::RichText::new(format!(
                        "{} ({:.2}h, {:.0}%)",
                        receipt.message, receipt.study_hours, receipt.completion_rate
                    ))
                    .color(egui::Color32::DARK_GREEN),
                );
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }
    }
}

pub struct TasksView {
    tab: Tab,
    today: DayPanel,
    history: DayPanel,
    chart_window: ChartView,
    chart: ViewState<Vec<TaskChartPoint>>,
    chart_slot: ResponseSlot<Vec<TaskChartPoint>>,
}

impl Default for TasksView {
    fn default() -> Self {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        Self {
            tab: Tab::Today,
            today: DayPanel::new(today.clone()),
            history: DayPanel::new(today),
            chart_window: ChartView::Week,
            chart: ViewState::Idle,
            chart_slot: ResponseSlot::new(),
        }
    }
}

impl TasksView {
    pub fn ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        self.today.poll(env);
        self.history.poll(env);
        if let Some(result) = self.chart_slot.take() {
            self.chart = result.into();
        }

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, Tab::Today, "今日任务");
            ui.selectable_value(&mut self.tab, Tab::History, "历史记录");
            ui.selectable_value(&mut self.tab, Tab::Chart, "统计图表");
        });
        ui.separator();

        match self.tab {
            Tab::Today => self.today_ui(ui, env),
            Tab::History => self.history_ui(ui, env),
            Tab::Chart => self.chart_ui(ui, env),
        }
    }

    fn today_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        if matches!(self.today.summary, ViewState::Idle) {
            self.today.fetch(env);
        }

        ui.horizontal(|ui| {
            ui.label("日期:");
            ui.add(egui::TextEdit::singleline(&mut self.today.date).desired_width(110.0));
            if ui.button("加载").clicked() {
                self.today.fetch(env);
            }
        });
        if let Some(ref message) = self.today.validation {
            error_label(ui, message);
        }

        match &self.today.summary {
            ViewState::Loading => {
                ui.spinner();
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }
        self.today.tasks_and_record_ui(ui, env, RecordMode::Create);
    }

    fn history_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        ui.horizontal(|ui| {
            ui.label("日期:");
            ui.add(egui::TextEdit::singleline(&mut self.history.date).desired_width(110.0));
            let busy = self.history.summary.is_loading();
            if ui.add_enabled(!busy, egui::Button::new("查询")).clicked() {
                self.history.fetch(env);
            }
            if busy {
                ui.spinner();
            }
        });
        if let Some(ref message) = self.history.validation {
            error_label(ui, message);
        }

        let show_panel = match &self.history.summary {
            ViewState::Failed(message) => {
                error_label(ui, message);
                false
            }
            ViewState::Ready(summary) if !summary.has_tasks() => {
                // No statistics panel for an empty day, just the notice.
                ui.label(
                    egui::RichText::new("该日期还没有任务记录")
                        .color(egui::Color32::from_rgb(200, 140, 0)),
                );
                false
            }
            ViewState::Ready(_) => true,
            _ => false,
        };
        if show_panel {
            self.history.tasks_and_record_ui(ui, env, RecordMode::Update);
        }
    }

    fn chart_ui(&mut self, ui: &mut egui::Ui, env: &ViewEnv<'_>) {
        ui.horizontal(|ui| {
            for (window, label) in [
                (ChartView::Week, "最近7天"),
                (ChartView::Month, "最近30天"),
                (ChartView::All, "全部"),
            ] {
                ui.selectable_value(&mut self.chart_window, window, label);
            }

            let busy = self.chart.is_loading();
            if ui.add_enabled(!busy, egui::Button::new("查询")).clicked() {
                self.chart = ViewState::Loading;
                let client = env.client.clone();
                let window = self.chart_window;
                env.bridge.spawn(self.chart_slot.clone(), async move {
                    client.task_chart(window).await.map_err(|err| err.to_string())
                });
            }
            if busy {
                ui.spinner();
            }
        });

        match &self.chart {
            ViewState::Ready(points) if points.is_empty() => {
                hint_label(ui, "该时间段内没有学习记录。");
            }
            ViewState::Ready(points) => {
                let hours: PlotPoints = points
                    .iter()
                    .enumerate()
                    .map(|(index, point)| [index as f64, point.study_hours])
                    .collect();
                ui.label("学习时长 (小时)");
                Plot::new("task_hours")
                    .height(180.0)
                    .allow_drag(false)
                    .allow_scroll(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new("学习时长", hours));
                    });

                let completion: PlotPoints = points
                    .iter()
                    .enumerate()
                    .map(|(index, point)| [index as f64, point.completion_rate])
                    .collect();
                ui.label("完成率 (%)");
                Plot::new("task_completion")
                    .height(180.0)
                    .allow_drag(false)
                    .allow_scroll(false)
                    .show(ui, |plot_ui| {
                        plot_ui.line(Line::new("完成率", completion));
                    });
            }
            ViewState::Failed(message) => error_label(ui, message),
            _ => {}
        }
    }
}
