//! Typed data model for the study backend's wire contract.
//!
//! The backend owns persistence; everything here is a request/response
//! snapshot. Loose shapes coming off the wire (string-or-list suggestion
//! fields, legacy field aliases, storage-dialect keys) are normalized once,
//! at this boundary, so the rest of the crate never re-checks them.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const MIN_YEAR: i32 = 2000;
pub const MAX_YEAR: i32 = 2100;

/// Client-side validation failures, caught before any request is dispatched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("score for {subject} must be between 0 and {max}")]
    ScoreOutOfRange { subject: &'static str, max: u32 },
    #[error("year {0} must be between 2000 and 2100")]
    YearOutOfRange(i32),
    #[error("date '{0}' must use the YYYY-MM-DD format")]
    BadDate(String),
    #[error("study minutes must be below 60 (got {0})")]
    MinutesOutOfRange(u32),
    #[error("paper type cannot be empty")]
    EmptyPaperType,
    #[error("task name cannot be empty")]
    EmptyTaskName,
    #[error("subject '{0}' is not recognized")]
    UnknownSubject(String),
    #[error("essay type '{0}' is not recognized")]
    UnknownEssayType(String),
    #[error("chart view '{0}' is not recognized (expected week, month, or all)")]
    UnknownChartView(String),
    #[error("'{0}' is not an .xlsx file")]
    NotXlsx(String),
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Exam subject. Serialized with the labels the backend stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "数学")]
    Math,
    #[serde(rename = "专业课")]
    Major,
    #[serde(rename = "英语")]
    English,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Major, Subject::English];

    pub fn label(self) -> &'static str {
        match self {
            Subject::Math => "数学",
            Subject::Major => "专业课",
            Subject::English => "英语",
        }
    }

    /// Upper score bound for the subject (lower bound is always 0).
    pub fn max_score(self) -> u32 {
        match self {
            Subject::English => 100,
            Subject::Math | Subject::Major => 150,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Subject {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "数学" | "math" => Ok(Subject::Math),
            "专业课" | "major" => Ok(Subject::Major),
            "英语" | "english" => Ok(Subject::English),
            other => Err(ValidationError::UnknownSubject(other.to_string())),
        }
    }
}

/// Shared bound check used by both the add form and the edit form.
pub fn validate_score(subject: Subject, score: f64) -> Result<(), ValidationError> {
    let max = subject.max_score();
    if !score.is_finite() || score < 0.0 || score > max as f64 {
        return Err(ValidationError::ScoreOutOfRange {
            subject: subject.label(),
            max,
        });
    }
    Ok(())
}

pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ValidationError::YearOutOfRange(year));
    }
    Ok(())
}

/// Parse a user-supplied `YYYY-MM-DD` date, rejecting any other shape.
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    static DATE_SHAPE: OnceLock<Regex> = OnceLock::new();
    let shape = DATE_SHAPE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date regex"));
    let trimmed = value.trim();
    if !shape.is_match(trimmed) {
        return Err(ValidationError::BadDate(value.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .map_err(|_| ValidationError::BadDate(value.to_string()))
}

/// A persisted score row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub subject: Subject,
    pub year: i32,
    pub paper_type: String,
    pub score: f64,
    pub input_date: NaiveDate,
}

/// Payload for creating a score. Validated before dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct NewScore {
    pub subject: Subject,
    pub year: i32,
    pub paper_type: String,
    pub score: f64,
    pub input_date: NaiveDate,
}

impl NewScore {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_year(self.year)?;
        validate_score(self.subject, self.score)?;
        if self.paper_type.trim().is_empty() {
            return Err(ValidationError::EmptyPaperType);
        }
        Ok(())
    }
}

/// Partial update for an existing score. The edit form applies the same
/// bound check as the add form, resolving the subject from the row under
/// edit when the update itself does not change it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScoreUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Subject>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_date: Option<NaiveDate>,
}

impl ScoreUpdate {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.year.is_none()
            && self.paper_type.is_none()
            && self.score.is_none()
            && self.input_date.is_none()
    }

    pub fn validate(&self, current_subject: Subject) -> Result<(), ValidationError> {
        if let Some(year) = self.year {
            validate_year(year)?;
        }
        if let Some(score) = self.score {
            let subject = self.subject.unwrap_or(current_subject);
            validate_score(subject, score)?;
        }
        if let Some(ref paper_type) = self.paper_type {
            if paper_type.trim().is_empty() {
                return Err(ValidationError::EmptyPaperType);
            }
        }
        Ok(())
    }
}

/// Listing filters and pagination. The backend caps `page_size` at 100.
#[derive(Debug, Clone)]
pub struct ScoreQuery {
    pub subject: Option<Subject>,
    pub paper_type: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for ScoreQuery {
    fn default() -> Self {
        Self {
            subject: None,
            paper_type: None,
            page: 1,
            page_size: 10,
        }
    }
}

/// One page of the score listing. A page past the end comes back with an
/// empty `data` set and the unchanged `total`, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct ScorePage {
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub data: Vec<Score>,
}

/// Time series for the score trend chart. An empty result carries a
/// backend-supplied `message` instead of data.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoreSeries {
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub scores: Vec<f64>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl ScoreSeries {
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedScore {
    pub message: String,
    pub id: i64,
}

/// Generic `{message}` acknowledgement used by update/delete endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerMessage {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Essays
// ---------------------------------------------------------------------------

/// Essay category, keyed together with the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EssayType {
    #[serde(rename = "小作文")]
    Small,
    #[serde(rename = "大作文")]
    Large,
}

impl EssayType {
    pub const ALL: [EssayType; 2] = [EssayType::Small, EssayType::Large];

    pub fn label(self) -> &'static str {
        match self {
            EssayType::Small => "小作文",
            EssayType::Large => "大作文",
        }
    }

    /// Maximum attainable points on the grading scale.
    pub fn max_points(self) -> u32 {
        match self {
            EssayType::Small => 10,
            EssayType::Large => 20,
        }
    }
}

impl fmt::Display for EssayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EssayType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "小作文" | "small" => Ok(EssayType::Small),
            "大作文" | "large" => Ok(EssayType::Large),
            other => Err(ValidationError::UnknownEssayType(other.to_string())),
        }
    }
}

/// Years and essay types that have a stored topic.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicCatalog {
    #[serde(default)]
    pub years: Vec<i32>,
    #[serde(default)]
    pub essay_types: Vec<String>,
}

/// Topic detail, normalized from the backend's storage-dialect keys.
#[derive(Debug, Clone, Deserialize)]
pub struct TopicDetail {
    #[serde(alias = "年份")]
    pub year: i32,
    #[serde(alias = "作文类型")]
    pub essay_type: String,
    #[serde(alias = "题目图片路径")]
    pub image_path: String,
    #[serde(alias = "参考范文")]
    pub reference_essay: String,
}

/// Output of the OCR step. This is addressable state: the optimize step
/// consumes `original_text` exactly as returned here, and a failed optimize
/// leaves this value intact for retry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEssay {
    pub original_text: String,
    #[serde(default)]
    pub essay_image_path: String,
    pub topic: String,
    #[serde(default)]
    pub topic_image_path: String,
    pub reference_essay: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EssayScore {
    pub level: String,
    pub points: f64,
}

/// Body of the optimize call.
#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequest {
    pub year: i32,
    pub essay_type: EssayType,
    pub original_text: String,
    pub topic_image_path: String,
    pub reference_essay: String,
}

/// Result of the optimize step.
#[derive(Debug, Clone, Deserialize)]
pub struct EssayAnalysis {
    pub topic: String,
    #[serde(default)]
    pub topic_image_path: Option<String>,
    pub reference_essay: String,
    pub original_text: String,
    pub optimized_text: String,
    #[serde(default)]
    pub score: Option<EssayScore>,
    #[serde(default)]
    pub suggestions: Suggestions,
}

impl EssayAnalysis {
    /// Package the analysis for the save endpoint.
    pub fn to_report(&self, essay_type: EssayType) -> AnalysisReport {
        AnalysisReport {
            topic: self.topic.clone(),
            essay_type,
            reference_essay: self.reference_essay.clone(),
            original_text: self.original_text.clone(),
            optimized_text: self.optimized_text.clone(),
            score: self.score.clone(),
            suggestions: self.suggestions.clone(),
        }
    }
}

/// The `data` object persisted by the save-analysis endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub topic: String,
    pub essay_type: EssayType,
    pub reference_essay: String,
    pub original_text: String,
    pub optimized_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<EssayScore>,
    pub suggestions: Suggestions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedReport {
    pub message: String,
    pub file_path: String,
}

/// Normalized improvement suggestions. The backend emits these fields
/// sometimes as a string, sometimes as a list, and older payloads use
/// `topic_relevance` instead of `topic_compliance`; all of that is resolved
/// here during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Suggestions {
    pub topic_compliance: Vec<String>,
    pub spelling_errors: Vec<String>,
    pub grammar_errors: Vec<String>,
    pub word_optimization: Vec<String>,
    pub sentence_optimization: Vec<String>,
    pub structure_optimization: Vec<String>,
}

impl Suggestions {
    pub fn is_empty(&self) -> bool {
        self.topic_compliance.is_empty()
            && self.spelling_errors.is_empty()
            && self.grammar_errors.is_empty()
            && self.word_optimization.is_empty()
            && self.sentence_optimization.is_empty()
            && self.structure_optimization.is_empty()
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TextOrList {
    One(String),
    Many(Vec<String>),
}

impl TextOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            TextOrList::One(text) => {
                if text.trim().is_empty() {
                    Vec::new()
                } else {
                    vec![text]
                }
            }
            TextOrList::Many(items) => items,
        }
    }
}

fn field(value: Option<TextOrList>) -> Vec<String> {
    value.map(TextOrList::into_vec).unwrap_or_default()
}

impl<'de> Deserialize<'de> for Suggestions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Default, Deserialize)]
        struct Raw {
            #[serde(default)]
            topic_compliance: Option<TextOrList>,
            /// Legacy alias for `topic_compliance`.
            #[serde(default)]
            topic_relevance: Option<TextOrList>,
            #[serde(default)]
            spelling_errors: Option<TextOrList>,
            #[serde(default)]
            grammar_errors: Option<TextOrList>,
            #[serde(default)]
            word_optimization: Option<TextOrList>,
            #[serde(default)]
            sentence_optimization: Option<TextOrList>,
            #[serde(default)]
            structure_optimization: Option<TextOrList>,
        }

        let raw = Raw::deserialize(deserializer)?;
        let topic_compliance = match raw.topic_compliance {
            Some(value) => value.into_vec(),
            None => field(raw.topic_relevance),
        };
        Ok(Suggestions {
            topic_compliance,
            spelling_errors: field(raw.spelling_errors),
            grammar_errors: field(raw.grammar_errors),
            word_optimization: field(raw.word_optimization),
            sentence_optimization: field(raw.sentence_optimization),
            structure_optimization: field(raw.structure_optimization),
        })
    }
}

// ---------------------------------------------------------------------------
// Daily tasks and study records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyTask {
    pub id: i64,
    pub date: String,
    pub task_name: String,
    #[serde(default)]
    pub completed: bool,
}

/// Tasks plus the study record for one date.
#[derive(Debug, Clone, Deserialize)]
pub struct DailySummary {
    pub date: String,
    #[serde(default)]
    pub study_hours: f64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    #[serde(default)]
    pub completion_rate: f64,
    #[serde(default)]
    pub tasks: Vec<DailyTask>,
}

impl DailySummary {
    /// A date with zero tasks means "no record yet" to the history view.
    pub fn has_tasks(&self) -> bool {
        self.total_tasks > 0
    }

    pub fn completed_ids(&self) -> Vec<i64> {
        self.tasks
            .iter()
            .filter(|task| task.completed)
            .map(|task| task.id)
            .collect()
    }

    /// The stored fractional hours as the displayed `(hours, minutes)` pair.
    pub fn hours_minutes(&self) -> (u32, u32) {
        split_study_hours(self.study_hours)
    }
}

/// Split fractional hours the way the record form displays them: whole hours
/// by floor, remainder rounded to minutes. Saving `(h, m)` with `m < 60` and
/// splitting the stored `h + m/60` round-trips exactly.
pub fn split_study_hours(total: f64) -> (u32, u32) {
    if !total.is_finite() || total <= 0.0 {
        return (0, 0);
    }
    let hours = total.floor();
    let minutes = ((total - hours) * 60.0).round();
    (hours as u32, minutes as u32)
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskCreate {
    pub date: NaiveDate,
    pub task_name: String,
}

impl TaskCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_name.trim().is_empty() {
            return Err(ValidationError::EmptyTaskName);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTask {
    pub message: String,
    pub task_id: i64,
}

/// One day's study record as entered in the form. The same payload goes to
/// the create and the update endpoint; which one is called is the screen's
/// choice, not an existence check.
#[derive(Debug, Clone, Serialize)]
pub struct StudyRecordInput {
    pub date: NaiveDate,
    pub study_hours: u32,
    pub study_minutes: u32,
    pub completed_task_ids: Vec<i64>,
}

impl StudyRecordInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.study_minutes >= 60 {
            return Err(ValidationError::MinutesOutOfRange(self.study_minutes));
        }
        Ok(())
    }

    pub fn total_hours(&self) -> f64 {
        self.study_hours as f64 + self.study_minutes as f64 / 60.0
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordReceipt {
    pub message: String,
    #[serde(default)]
    pub study_hours: f64,
    #[serde(default)]
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskChartPoint {
    pub date: String,
    #[serde(default)]
    pub study_hours: f64,
    #[serde(default)]
    pub completion_rate: f64,
}

/// Window selector for the tasks chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartView {
    Week,
    Month,
    All,
}

impl ChartView {
    pub const ALL_VIEWS: [ChartView; 3] = [ChartView::Week, ChartView::Month, ChartView::All];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartView::Week => "week",
            ChartView::Month => "month",
            ChartView::All => "all",
        }
    }
}

impl fmt::Display for ChartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartView {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "week" => Ok(ChartView::Week),
            "month" => Ok(ChartView::Month),
            "all" => Ok(ChartView::All),
            other => Err(ValidationError::UnknownChartView(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the conversation, held in view memory until an explicit save.
/// Image attachments are carried as `data:image/...` URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image_url: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            image_url: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SavedChat {
    pub message: String,
    pub file_path: String,
    pub filename: String,
    #[serde(default)]
    pub images_saved: u32,
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// Bootstrap status, fetched once on load to gate configuration prompts.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SystemStatus {
    pub api_configured: bool,
    pub daily_tasks_exists: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeys {
    pub modelscope_api_key: String,
    pub dashscope_api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ack {
    pub success: bool,
    pub message: String,
}

/// The daily-tasks upload only accepts `.xlsx`; reject anything else before
/// building the request, matching the backend's own rule.
pub fn validate_xlsx_name(name: &str) -> Result<(), ValidationError> {
    if name.to_ascii_lowercase().ends_with(".xlsx") {
        Ok(())
    } else {
        Err(ValidationError::NotXlsx(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn english_bound_is_100_everywhere_else_150() {
        assert_eq!(Subject::English.max_score(), 100);
        assert_eq!(Subject::Math.max_score(), 150);
        assert_eq!(Subject::Major.max_score(), 150);
    }

    #[test]
    fn english_105_rejected_math_105_accepted() {
        assert!(validate_score(Subject::English, 105.0).is_err());
        assert!(validate_score(Subject::Math, 105.0).is_ok());
    }

    #[test]
    fn add_and_edit_share_the_same_bound() {
        let new = NewScore {
            subject: Subject::English,
            year: 2024,
            paper_type: "真题".to_string(),
            score: 105.0,
            input_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        };
        assert_eq!(
            new.validate(),
            Err(ValidationError::ScoreOutOfRange {
                subject: "英语",
                max: 100,
            })
        );

        let update = ScoreUpdate {
            score: Some(105.0),
            ..ScoreUpdate::default()
        };
        assert_eq!(
            update.validate(Subject::English),
            Err(ValidationError::ScoreOutOfRange {
                subject: "英语",
                max: 100,
            })
        );
        assert!(update.validate(Subject::Math).is_ok());
    }

    #[test]
    fn edit_changing_subject_revalidates_against_the_new_subject() {
        let update = ScoreUpdate {
            subject: Some(Subject::English),
            score: Some(120.0),
            ..ScoreUpdate::default()
        };
        // Row was 数学, but the update moves it to 英语 where 120 is invalid.
        assert!(update.validate(Subject::Math).is_err());
    }

    #[test]
    fn year_bounds() {
        assert!(validate_year(2000).is_ok());
        assert!(validate_year(2100).is_ok());
        assert!(validate_year(1999).is_err());
        assert!(validate_year(2101).is_err());
    }

    #[test]
    fn date_shape_is_strict() {
        assert!(parse_date("2026-08-07").is_ok());
        assert!(parse_date(" 2026-08-07 ").is_ok());
        assert!(parse_date("2026-8-7").is_err());
        assert!(parse_date("07/08/2026").is_err());
        assert!(parse_date("2026-13-01").is_err());
    }

    #[test]
    fn subject_parses_labels_and_aliases() {
        assert_eq!("数学".parse::<Subject>().unwrap(), Subject::Math);
        assert_eq!("english".parse::<Subject>().unwrap(), Subject::English);
        assert!("物理".parse::<Subject>().is_err());
    }

    #[test]
    fn subject_serializes_with_chinese_label() {
        assert_eq!(serde_json::to_string(&Subject::Major).unwrap(), "\"专业课\"");
        let parsed: Subject = serde_json::from_str("\"英语\"").unwrap();
        assert_eq!(parsed, Subject::English);
    }

    #[test]
    fn essay_type_points() {
        assert_eq!(EssayType::Small.max_points(), 10);
        assert_eq!(EssayType::Large.max_points(), 20);
        assert_eq!("小作文".parse::<EssayType>().unwrap(), EssayType::Small);
        assert_eq!("large".parse::<EssayType>().unwrap(), EssayType::Large);
    }

    #[test]
    fn suggestions_normalize_new_list_shape() {
        let raw = serde_json::json!({
            "topic_compliance": ["on topic", "covers both points"],
            "spelling_errors": [],
            "grammar_errors": ["tense slip in sentence 2"],
            "word_optimization": [],
            "sentence_optimization": [],
            "structure_optimization": ["merge paragraphs 2 and 3"],
        });
        let parsed: Suggestions = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.topic_compliance.len(), 2);
        assert_eq!(parsed.grammar_errors, vec!["tense slip in sentence 2"]);
        assert_eq!(
            parsed.structure_optimization,
            vec!["merge paragraphs 2 and 3"]
        );
    }

    #[test]
    fn suggestions_normalize_legacy_string_shape() {
        let raw = serde_json::json!({
            "topic_relevance": "mostly on topic",
            "spelling_errors": ["recieve -> receive"],
            "grammar_errors": [],
            "word_optimization": [],
            "sentence_optimization": [],
            "structure_optimization": "add a closing sentence",
        });
        let parsed: Suggestions = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.topic_compliance, vec!["mostly on topic"]);
        assert_eq!(parsed.spelling_errors, vec!["recieve -> receive"]);
        assert_eq!(
            parsed.structure_optimization,
            vec!["add a closing sentence"]
        );
    }

    #[test]
    fn suggestions_prefer_new_field_over_legacy() {
        let raw = serde_json::json!({
            "topic_compliance": ["new"],
            "topic_relevance": "old",
        });
        let parsed: Suggestions = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.topic_compliance, vec!["new"]);
    }

    #[test]
    fn suggestions_empty_strings_normalize_to_empty() {
        let raw = serde_json::json!({
            "topic_relevance": "",
            "structure_optimization": "",
        });
        let parsed: Suggestions = serde_json::from_value(raw).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn missing_suggestions_default_to_empty() {
        let parsed: Suggestions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn topic_detail_accepts_storage_dialect_keys() {
        let raw = serde_json::json!({
            "年份": 2024,
            "作文类型": "大作文",
            "题目图片路径": "data/topics/topic_2024_large.jpg",
            "参考范文": "Dear Sir or Madam, ...",
        });
        let parsed: TopicDetail = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.year, 2024);
        assert_eq!(parsed.essay_type, "大作文");
        assert_eq!(parsed.image_path, "data/topics/topic_2024_large.jpg");
    }

    #[test]
    fn split_hours_round_trips_form_input() {
        for (hours, minutes) in [(0u32, 0u32), (1, 0), (2, 30), (1, 59), (10, 1)] {
            let total = hours as f64 + minutes as f64 / 60.0;
            assert_eq!(split_study_hours(total), (hours, minutes));
        }
    }

    #[test]
    fn split_hours_clamps_nonsense() {
        assert_eq!(split_study_hours(-1.0), (0, 0));
        assert_eq!(split_study_hours(f64::NAN), (0, 0));
    }

    #[test]
    fn record_minutes_below_sixty() {
        let record = StudyRecordInput {
            date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            study_hours: 2,
            study_minutes: 60,
            completed_task_ids: vec![],
        };
        assert_eq!(
            record.validate(),
            Err(ValidationError::MinutesOutOfRange(60))
        );
    }

    #[test]
    fn record_total_hours() {
        let record = StudyRecordInput {
            date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            study_hours: 2,
            study_minutes: 30,
            completed_task_ids: vec![1, 3],
        };
        assert!((record.total_hours() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn summary_completed_ids_match_flags() {
        let summary = DailySummary {
            date: "2026-08-07".to_string(),
            study_hours: 2.5,
            total_tasks: 3,
            completed_tasks: 2,
            completion_rate: 66.7,
            tasks: vec![
                DailyTask {
                    id: 1,
                    date: "2026-08-07".into(),
                    task_name: "背单词".into(),
                    completed: true,
                },
                DailyTask {
                    id: 2,
                    date: "2026-08-07".into(),
                    task_name: "数学真题".into(),
                    completed: false,
                },
                DailyTask {
                    id: 3,
                    date: "2026-08-07".into(),
                    task_name: "英语阅读".into(),
                    completed: true,
                },
            ],
        };
        assert!(summary.has_tasks());
        assert_eq!(summary.completed_ids(), vec![1, 3]);
        assert_eq!(summary.hours_minutes(), (2, 30));
    }

    #[test]
    fn empty_summary_has_no_tasks() {
        let summary = DailySummary {
            date: "2026-08-08".to_string(),
            study_hours: 0.0,
            total_tasks: 0,
            completed_tasks: 0,
            completion_rate: 0.0,
            tasks: vec![],
        };
        assert!(!summary.has_tasks());
    }

    #[test]
    fn chart_view_strings() {
        assert_eq!(ChartView::Week.as_str(), "week");
        assert_eq!("month".parse::<ChartView>().unwrap(), ChartView::Month);
        assert!("year".parse::<ChartView>().is_err());
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let message = ChatMessage::user("你好");
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("image_url").is_none());
    }

    #[test]
    fn xlsx_name_check() {
        assert!(validate_xlsx_name("daily_tasks.xlsx").is_ok());
        assert!(validate_xlsx_name("Daily_Tasks.XLSX").is_ok());
        assert!(validate_xlsx_name("daily_tasks.xls").is_err());
        assert!(validate_xlsx_name("notes.csv").is_err());
    }
}
