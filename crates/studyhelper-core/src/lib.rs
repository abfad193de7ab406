//! Core library crate for the Study Helper desktop client: configuration,
//! logging, the typed HTTP API contract against the study backend, the
//! client-orchestrated workflows, and the backend process supervisor.

pub mod client;
pub mod config;
pub mod logging;
pub mod models;
pub mod supervisor;
pub mod workflow;

pub use client::{ApiClient, ApiError, Attachment};
pub use config::{
    BackendSettings, ConfigError, ConfigLoadResult, ConfigSource, DEFAULT_API_BASE_URL,
    FileConfig, UiPreferences, config_directory, config_path, load_config, save_config,
};
pub use logging::{LoggingDestination, LoggingError, current_log_path, init_logging};
pub use models::{
    ChatMessage, ChatRole, DailySummary, EssayAnalysis, EssayType, NewScore, RecognizedEssay,
    Score, ScorePage, ScoreUpdate, StudyRecordInput, Subject, SystemStatus, ValidationError,
};
pub use supervisor::{
    BackendSupervisor, DATA_ROOT_ENV, DEV_SERVER_ENV, ReadinessError, StartOutcome,
    SupervisorPlan, wait_for_backend,
};
pub use workflow::{EssayReview, RecordMode, ReviewStage, WorkflowError, submit_record};
