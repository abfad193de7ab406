//! Typed HTTP client for the study backend.
//!
//! One function per endpoint, grouped by feature area, all against a single
//! configured base URL. No retry, backoff, caching, or circuit breaking;
//! callers own their own error presentation.

use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::{
    Ack, AnalyzeRequest, AnalysisReport, ApiKeys, ChartView, ChatMessage, ChatReply, CreatedScore,
    CreatedTask, DailySummary, EssayAnalysis, EssayType, NewScore, RecognizedEssay, RecordReceipt,
    SavedChat, SavedReport, ScorePage, ScoreQuery, ScoreSeries, ScoreUpdate, ServerMessage,
    StudyRecordInput, Subject, SystemStatus, TaskChartPoint, TaskCreate, TopicCatalog,
    TopicDetail, ValidationError, validate_xlsx_name,
};

/// Failures surfaced by the API client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API base URL '{0}'")]
    BaseUrl(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
    /// Non-2xx response carrying the server's own message where one was
    /// present in the payload.
    #[error("{message}")]
    Server { status: u16, message: String },
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A file selected for upload, with the bytes already read.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Read a file from disk, taking its file name as the upload name.
    pub fn read(path: &Path) -> io::Result<Self> {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = std::fs::read(path)?;
        Ok(Self { filename, bytes })
    }

    /// Content type guessed from the file extension.
    pub fn mime(&self) -> &'static str {
        let lower = self.filename.to_ascii_lowercase();
        if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            "image/jpeg"
        } else if lower.ends_with(".png") {
            "image/png"
        } else if lower.ends_with(".xlsx") {
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        } else {
            "application/octet-stream"
        }
    }

    /// Encode as a `data:` URL for embedding in chat transcripts.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime(), STANDARD.encode(&self.bytes))
    }

    fn into_part(self) -> Result<Part, ApiError> {
        let mime = self.mime();
        let part = Part::bytes(self.bytes)
            .file_name(self.filename)
            .mime_str(mime)?;
        Ok(part)
    }
}

/// Client bound to one backend base URL (`/api/v1` prefix included).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let base =
            Url::parse(trimmed).map_err(|_| ApiError::BaseUrl(base_url.to_string()))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ApiError::BaseUrl(base_url.to_string()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path)
    }

    /// URL for a backend-served static file (topic images, previews). The
    /// origin is derived from the configured base so no call site carries
    /// its own host or port.
    pub fn file_url(&self, relative: &str) -> String {
        let origin = self.base.origin().ascii_serialization();
        format!("{}/{}", origin, relative.trim_start_matches('/'))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Server {
                status: status.as_u16(),
                message: server_message(status.as_u16(), &body),
            })
        }
    }

    // -- scores -------------------------------------------------------------

    pub async fn paper_types(&self, subject: Subject) -> Result<Vec<String>, ApiError> {
        #[derive(Deserialize)]
        struct PaperTypes {
            paper_types: Vec<String>,
        }

        let response = self
            .http
            .get(self.url("/paper-types"))
            .query(&[("subject", subject.label())])
            .send()
            .await?;
        let body: PaperTypes = Self::decode(response).await?;
        Ok(body.paper_types)
    }

    pub async fn create_score(&self, score: &NewScore) -> Result<CreatedScore, ApiError> {
        let response = self
            .http
            .post(self.url("/scores"))
            .json(score)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn scores(&self, query: &ScoreQuery) -> Result<ScorePage, ApiError> {
        let mut params: Vec<(&str, String)> = vec![
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        if let Some(subject) = query.subject {
            params.push(("subject", subject.label().to_string()));
        }
        if let Some(ref paper_type) = query.paper_type {
            params.push(("paper_type", paper_type.clone()));
        }

        let response = self
            .http
            .get(self.url("/scores"))
            .query(&params)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn update_score(
        &self,
        id: i64,
        update: &ScoreUpdate,
    ) -> Result<ServerMessage, ApiError> {
        let response = self
            .http
            .put(self.url(&format!("/scores/{id}")))
            .json(update)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_score(&self, id: i64) -> Result<ServerMessage, ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/scores/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn score_chart(
        &self,
        subject: Subject,
        paper_type: Option<&str>,
    ) -> Result<ScoreSeries, ApiError> {
        let mut params: Vec<(&str, String)> = vec![("subject", subject.label().to_string())];
        if let Some(paper_type) = paper_type {
            params.push(("paper_type", paper_type.to_string()));
        }

        let response = self
            .http
            .get(self.url("/scores/chart-data"))
            .query(&params)
            .send()
            .await?;
        Self::decode(response).await
    }

    // -- essays -------------------------------------------------------------

    pub async fn topic_catalog(&self) -> Result<TopicCatalog, ApiError> {
        let response = self.http.get(self.url("/essays/topics")).send().await?;
        Self::decode(response).await
    }

    fn topic_path(&self, year: i32, essay_type: EssayType) -> String {
        format!(
            "/essays/topics/{year}/{}",
            urlencoding::encode(essay_type.label())
        )
    }

    pub async fn topic_detail(
        &self,
        year: i32,
        essay_type: EssayType,
    ) -> Result<TopicDetail, ApiError> {
        let response = self
            .http
            .get(self.url(&self.topic_path(year, essay_type)))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub fn topic_image_url(&self, year: i32, essay_type: EssayType) -> String {
        self.url(&format!(
            "/essays/topics/image/{year}/{}",
            urlencoding::encode(essay_type.label())
        ))
    }

    /// Fetch the topic image bytes for in-app preview.
    pub async fn topic_image(
        &self,
        year: i32,
        essay_type: EssayType,
    ) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(self.topic_image_url(year, essay_type))
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(response.bytes().await?.to_vec())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Server {
                status: status.as_u16(),
                message: server_message(status.as_u16(), &body),
            })
        }
    }

    pub async fn add_topic(
        &self,
        year: i32,
        essay_type: EssayType,
        image: Attachment,
        reference: &str,
    ) -> Result<ServerMessage, ApiError> {
        let form = Form::new()
            .text("year", year.to_string())
            .text("essay_type", essay_type.label())
            .text("reference", reference.to_string())
            .part("topic_image", image.into_part()?);

        let response = self
            .http
            .post(self.url("/essays/topics"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_topic(
        &self,
        year: i32,
        essay_type: EssayType,
    ) -> Result<ServerMessage, ApiError> {
        let response = self
            .http
            .delete(self.url(&self.topic_path(year, essay_type)))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// OCR step of the essay review. The returned value is the addressable
    /// input of [`analyze_essay`](Self::analyze_essay).
    pub async fn recognize_essay(
        &self,
        year: i32,
        essay_type: EssayType,
        image: Attachment,
    ) -> Result<RecognizedEssay, ApiError> {
        let form = Form::new()
            .text("year", year.to_string())
            .text("essay_type", essay_type.label())
            .part("image", image.into_part()?);

        let response = self
            .http
            .post(self.url("/essays/ocr"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Optimize step of the essay review.
    pub async fn analyze_essay(
        &self,
        request: &AnalyzeRequest,
    ) -> Result<EssayAnalysis, ApiError> {
        let response = self
            .http
            .post(self.url("/essays/analyze"))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn save_analysis(
        &self,
        year: i32,
        report: &AnalysisReport,
    ) -> Result<SavedReport, ApiError> {
        #[derive(serde::Serialize)]
        struct Envelope<'a> {
            year: i32,
            data: &'a AnalysisReport,
        }

        let response = self
            .http
            .post(self.url("/essays/save"))
            .json(&Envelope { year, data: report })
            .send()
            .await?;
        Self::decode(response).await
    }

    // -- daily tasks --------------------------------------------------------

    pub async fn tasks_by_date(&self, date: NaiveDate) -> Result<DailySummary, ApiError> {
        let response = self
            .http
            .get(self.url("/tasks/by-date"))
            .query(&[("date", date.format("%Y-%m-%d").to_string())])
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn add_task(&self, task: &TaskCreate) -> Result<CreatedTask, ApiError> {
        let response = self
            .http
            .post(self.url("/tasks/add"))
            .json(task)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn delete_task(&self, id: i64) -> Result<ServerMessage, ApiError> {
        let response = self
            .http
            .delete(self.url(&format!("/tasks/{id}")))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Create a day's study record (the screen that has not queried one).
    pub async fn save_record(
        &self,
        record: &StudyRecordInput,
    ) -> Result<RecordReceipt, ApiError> {
        let response = self
            .http
            .post(self.url("/tasks/save"))
            .json(record)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Update a day's study record. A date with no prior record comes back
    /// as the backend's 404, surfaced verbatim.
    pub async fn update_record(
        &self,
        record: &StudyRecordInput,
    ) -> Result<RecordReceipt, ApiError> {
        let response = self
            .http
            .put(self.url("/tasks/record"))
            .json(record)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn task_chart(&self, view: ChartView) -> Result<Vec<TaskChartPoint>, ApiError> {
        #[derive(Deserialize)]
        struct ChartData {
            #[serde(default)]
            data: Vec<TaskChartPoint>,
        }

        let response = self
            .http
            .get(self.url("/tasks/chart-data"))
            .query(&[("view", view.as_str())])
            .send()
            .await?;
        let body: ChartData = Self::decode(response).await?;
        Ok(body.data)
    }

    // -- chat ---------------------------------------------------------------

    /// One chat turn: the message, an optional image, and the running
    /// history (sent as a JSON string, matching the backend's form field).
    pub async fn chat(
        &self,
        message: &str,
        image: Option<Attachment>,
        history: &[ChatMessage],
    ) -> Result<ChatReply, ApiError> {
        let mut form = Form::new().text("message", message.to_string());
        if let Some(image) = image {
            form = form.part("image", image.into_part()?);
        }
        if !history.is_empty() {
            form = form.text("history", serde_json::to_string(history)?);
        }

        let response = self
            .http
            .post(self.url("/chat"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn save_chat(&self, messages: &[ChatMessage]) -> Result<SavedChat, ApiError> {
        #[derive(serde::Serialize)]
        struct Envelope<'a> {
            messages: &'a [ChatMessage],
        }

        let response = self
            .http
            .post(self.url("/chat/save"))
            .json(&Envelope { messages })
            .send()
            .await?;
        Self::decode(response).await
    }

    // -- system -------------------------------------------------------------

    pub async fn system_status(&self) -> Result<SystemStatus, ApiError> {
        let response = self.http.get(self.url("/system/status")).send().await?;
        Self::decode(response).await
    }

    pub async fn save_api_keys(&self, keys: &ApiKeys) -> Result<Ack, ApiError> {
        let response = self
            .http
            .post(self.url("/system/api-keys"))
            .json(keys)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Upload the `daily_tasks.xlsx` seed file. Non-`.xlsx` names are
    /// rejected before any request is built, matching the backend's rule.
    pub async fn upload_daily_tasks(&self, file: Attachment) -> Result<Ack, ApiError> {
        validate_xlsx_name(&file.filename)?;
        let form = Form::new().part("file", file.into_part()?);

        let response = self
            .http
            .post(self.url("/system/upload-daily-tasks"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn cleanup_temp(&self) -> Result<Ack, ApiError> {
        let response = self
            .http
            .delete(self.url("/system/cleanup-temp"))
            .send()
            .await?;
        Self::decode(response).await
    }
}

const MESSAGE_PREVIEW_LIMIT: usize = 200;

/// Extract the server's error message from a non-2xx payload: the FastAPI
/// `detail` field, then `message`, then `error`, then the raw body.
fn server_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(text)) if !text.is_empty() => {
                    return text.clone();
                }
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("request failed with status {status}")
    } else {
        let mut preview: String = trimmed.chars().take(MESSAGE_PREVIEW_LIMIT).collect();
        if preview.len() < trimmed.len() {
            preview.push('…');
        }
        preview
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_accepts_http_and_trims_slash() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/v1/").unwrap();
        assert_eq!(client.url("/scores"), "http://127.0.0.1:8000/api/v1/scores");
    }

    #[test]
    fn base_url_rejects_garbage_and_non_http() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ApiError::BaseUrl(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://127.0.0.1/api/v1"),
            Err(ApiError::BaseUrl(_))
        ));
    }

    #[test]
    fn file_url_derives_from_configured_origin() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/v1").unwrap();
        assert_eq!(
            client.file_url("data/topics/topic_2024_large.jpg"),
            "http://127.0.0.1:8000/data/topics/topic_2024_large.jpg"
        );
        assert_eq!(
            client.file_url("/data/x.png"),
            "http://127.0.0.1:8000/data/x.png"
        );
    }

    #[test]
    fn topic_paths_percent_encode_labels() {
        let client = ApiClient::new("http://127.0.0.1:8000/api/v1").unwrap();
        let url = client.topic_image_url(2024, EssayType::Large);
        assert!(url.starts_with("http://127.0.0.1:8000/api/v1/essays/topics/image/2024/"));
        assert!(!url.contains("大作文"), "label must be percent-encoded");
    }

    #[test]
    fn server_message_prefers_detail() {
        assert_eq!(
            server_message(400, r#"{"detail": "无效的科目"}"#),
            "无效的科目"
        );
        assert_eq!(
            server_message(500, r#"{"message": "boom"}"#),
            "boom"
        );
        assert_eq!(server_message(500, r#"{"error": "nope"}"#), "nope");
    }

    #[test]
    fn server_message_stringifies_structured_detail() {
        let message = server_message(422, r#"{"detail": [{"loc": ["year"]}]}"#);
        assert!(message.contains("year"));
    }

    #[test]
    fn server_message_falls_back_to_body_then_status() {
        assert_eq!(server_message(502, "Bad Gateway"), "Bad Gateway");
        assert_eq!(
            server_message(503, "   "),
            "request failed with status 503"
        );
    }

    #[test]
    fn attachment_mime_guessing() {
        assert_eq!(Attachment::new("essay.JPG", vec![]).mime(), "image/jpeg");
        assert_eq!(Attachment::new("topic.png", vec![]).mime(), "image/png");
        assert_eq!(
            Attachment::new("daily_tasks.xlsx", vec![]).mime(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(
            Attachment::new("notes.txt", vec![]).mime(),
            "application/octet-stream"
        );
    }

    #[test]
    fn attachment_data_url() {
        let attachment = Attachment::new("a.png", vec![1, 2, 3]);
        assert_eq!(attachment.to_data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn not_found_helper() {
        let err = ApiError::Server {
            status: 404,
            message: "2026-08-07 没有学习记录".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
    }
}
