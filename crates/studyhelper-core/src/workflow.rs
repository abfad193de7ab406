//! Client-orchestrated multi-step workflows.
//!
//! The backend exposes essay review as two independent calls (OCR, then
//! optimize). The sequencing lives here, with the intermediate OCR result
//! held as explicit, inspectable state so a failed optimize can be retried
//! without redoing recognition.

use thiserror::Error;

use crate::client::{ApiClient, ApiError, Attachment};
use crate::models::{
    AnalysisReport, AnalyzeRequest, EssayAnalysis, EssayType, RecognizedEssay, RecordReceipt,
    SavedReport, StudyRecordInput,
};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("essay must be recognized before it can be analyzed")]
    NotRecognized,
    #[error("no analysis available to save")]
    NotAnalyzed,
}

/// Where an essay review currently stands.
#[derive(Debug, Clone)]
pub enum ReviewStage {
    NotStarted,
    /// OCR finished; the optimize step can run (and re-run) from here.
    Recognized(RecognizedEssay),
    /// Both steps finished. The OCR result is kept alongside so the review
    /// remains re-analyzable.
    Analyzed {
        ocr: RecognizedEssay,
        analysis: EssayAnalysis,
    },
}

/// One essay review against a `(year, essay_type)` topic.
#[derive(Debug, Clone)]
pub struct EssayReview {
    client: ApiClient,
    year: i32,
    essay_type: EssayType,
    stage: ReviewStage,
}

impl EssayReview {
    pub fn new(client: ApiClient, year: i32, essay_type: EssayType) -> Self {
        Self {
            client,
            year,
            essay_type,
            stage: ReviewStage::NotStarted,
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn essay_type(&self) -> EssayType {
        self.essay_type
    }

    pub fn stage(&self) -> &ReviewStage {
        &self.stage
    }

    pub fn recognized(&self) -> Option<&RecognizedEssay> {
        match &self.stage {
            ReviewStage::NotStarted => None,
            ReviewStage::Recognized(ocr) | ReviewStage::Analyzed { ocr, .. } => Some(ocr),
        }
    }

    pub fn analysis(&self) -> Option<&EssayAnalysis> {
        match &self.stage {
            ReviewStage::Analyzed { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    /// Step 1: OCR the handwritten essay image. Always allowed; running it
    /// again restarts the review from a fresh recognition.
    pub async fn recognize(
        &mut self,
        image: Attachment,
    ) -> Result<&RecognizedEssay, WorkflowError> {
        let ocr = self
            .client
            .recognize_essay(self.year, self.essay_type, image)
            .await?;
        self.stage = ReviewStage::Recognized(ocr);
        match &self.stage {
            ReviewStage::Recognized(ocr) => Ok(ocr),
            _ => unreachable!("stage was just set"),
        }
    }

    /// Step 2: optimize against the recognized text. The request carries
    /// `original_text` exactly as step 1 returned it. On failure the stage
    /// stays at `Recognized`, so the step can simply be retried.
    pub async fn analyze(&mut self) -> Result<&EssayAnalysis, WorkflowError> {
        let ocr = match &self.stage {
            ReviewStage::NotStarted => return Err(WorkflowError::NotRecognized),
            ReviewStage::Recognized(ocr) | ReviewStage::Analyzed { ocr, .. } => ocr.clone(),
        };

        let request = AnalyzeRequest {
            year: self.year,
            essay_type: self.essay_type,
            original_text: ocr.original_text.clone(),
            topic_image_path: ocr.topic_image_path.clone(),
            reference_essay: ocr.reference_essay.clone(),
        };

        let analysis = self.client.analyze_essay(&request).await?;
        self.stage = ReviewStage::Analyzed {
            ocr,
            analysis,
        };
        match &self.stage {
            ReviewStage::Analyzed { analysis, .. } => Ok(analysis),
            _ => unreachable!("stage was just set"),
        }
    }

    /// The finished analysis packaged for the save endpoint.
    pub fn report(&self) -> Option<AnalysisReport> {
        self.analysis()
            .map(|analysis| analysis.to_report(self.essay_type))
    }

    /// Persist the finished analysis as a backend-side document.
    pub async fn save(&self) -> Result<SavedReport, WorkflowError> {
        let report = self.report().ok_or(WorkflowError::NotAnalyzed)?;
        Ok(self.client.save_analysis(self.year, &report).await?)
    }
}

/// Which study-record endpoint the calling screen wants. The choice is the
/// screen's, never an existence probe against the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// `POST /tasks/save`, used by the entry screen.
    Create,
    /// `PUT /tasks/record`, used by the history screen. A date with no
    /// prior record surfaces the backend's 404.
    Update,
}

/// Validate and submit a day's study record through the endpoint the mode
/// selects.
pub async fn submit_record(
    client: &ApiClient,
    mode: RecordMode,
    record: &StudyRecordInput,
) -> Result<RecordReceipt, ApiError> {
    record.validate()?;
    match mode {
        RecordMode::Create => client.save_record(record).await,
        RecordMode::Update => client.update_record(record).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn client() -> ApiClient {
        // Never actually contacted by these tests.
        ApiClient::new("http://127.0.0.1:1/api/v1").unwrap()
    }

    #[tokio::test]
    async fn analyze_before_recognize_is_rejected_without_network() {
        let mut review = EssayReview::new(client(), 2024, EssayType::Large);
        match review.analyze().await {
            Err(WorkflowError::NotRecognized) => {}
            other => panic!("expected NotRecognized, got {other:?}"),
        }
        assert!(matches!(review.stage(), ReviewStage::NotStarted));
    }

    #[tokio::test]
    async fn save_before_analyze_is_rejected() {
        let review = EssayReview::new(client(), 2024, EssayType::Small);
        match review.save().await {
            Err(WorkflowError::NotAnalyzed) => {}
            other => panic!("expected NotAnalyzed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_analyze_keeps_the_recognition() {
        let mut review = EssayReview::new(client(), 2024, EssayType::Large);
        review.stage = ReviewStage::Recognized(RecognizedEssay {
            original_text: "My original essay".to_string(),
            essay_image_path: "temp/essay.jpg".to_string(),
            topic: "2024年大作文".to_string(),
            topic_image_path: "data/topics/t.jpg".to_string(),
            reference_essay: "Reference".to_string(),
        });

        // The client points at a closed port, so the optimize call fails at
        // the transport layer.
        assert!(review.analyze().await.is_err());
        let recognized = review.recognized().expect("recognition retained");
        assert_eq!(recognized.original_text, "My original essay");
        assert!(matches!(review.stage(), ReviewStage::Recognized(_)));
    }

    #[tokio::test]
    async fn submit_record_validates_before_dispatch() {
        let record = StudyRecordInput {
            date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
            study_hours: 1,
            study_minutes: 75,
            completed_task_ids: vec![],
        };
        // Invalid minutes fail before any request is attempted, even though
        // the client points at a closed port.
        match submit_record(&client(), RecordMode::Create, &record).await {
            Err(ApiError::Invalid(_)) => {}
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
