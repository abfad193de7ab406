use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use studyhelper_core::models::{ChartView, EssayType, Subject};

/// Top-level CLI entrypoint.
#[derive(Parser, Debug, Clone)]
#[command(name = "studyhelper", version, about = "Study Helper command-line client", long_about = None)]
pub struct Cli {
    /// Override the backend API base URL (defaults to the configured value).
    #[arg(long = "base-url", global = true, value_name = "URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Feature areas, one subcommand each.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Exam score tracking.
    #[command(subcommand)]
    Score(ScoreCommand),
    /// Essay topic management.
    #[command(subcommand)]
    Topic(TopicCommand),
    /// AI-assisted essay review.
    #[command(subcommand)]
    Essay(EssayCommand),
    /// Daily tasks and study records.
    #[command(subcommand)]
    Task(TaskCommand),
    /// AI study assistant.
    #[command(subcommand)]
    Chat(ChatCommand),
    /// Backend configuration and bootstrapping.
    #[command(subcommand)]
    System(SystemCommand),
}

#[derive(Debug, Clone, Subcommand)]
pub enum ScoreCommand {
    /// Record a new exam score.
    Add(ScoreAddArgs),
    /// List recorded scores with optional filters.
    List(ScoreListArgs),
    /// Update fields of an existing score.
    Update(ScoreUpdateArgs),
    /// Delete a score by ID.
    Delete(ScoreDeleteArgs),
    /// Print the score trend for a subject.
    Chart(ScoreChartArgs),
    /// List the valid paper types for a subject.
    PaperTypes(PaperTypesArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ScoreAddArgs {
    /// Subject (数学, 专业课, 英语; math/major/english also accepted).
    #[arg(long)]
    pub subject: Subject,
    /// Exam year (2000-2100).
    #[arg(long)]
    pub year: i32,
    /// Paper type as listed by `score paper-types`.
    #[arg(long = "paper-type")]
    pub paper_type: String,
    /// Score (0-100 for 英语, 0-150 otherwise).
    #[arg(long)]
    pub score: f64,
    /// Entry date, YYYY-MM-DD; defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
pub struct ScoreListArgs {
    /// Filter by subject.
    #[arg(long)]
    pub subject: Option<Subject>,
    /// Filter by paper type.
    #[arg(long = "paper-type")]
    pub paper_type: Option<String>,
    /// Page number, starting at 1.
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    /// Rows per page (backend caps this at 100).
    #[arg(long = "page-size", default_value_t = 10)]
    pub page_size: u32,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreUpdateArgs {
    /// ID of the score to update.
    pub id: i64,
    /// Subject of the row (also the context for the score bound check).
    #[arg(long)]
    pub subject: Option<Subject>,
    /// New exam year.
    #[arg(long)]
    pub year: Option<i32>,
    /// New paper type.
    #[arg(long = "paper-type")]
    pub paper_type: Option<String>,
    /// New score; requires --subject so the bound can be checked.
    #[arg(long, requires = "subject")]
    pub score: Option<f64>,
    /// New entry date, YYYY-MM-DD.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreDeleteArgs {
    /// ID of the score to delete.
    pub id: i64,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreChartArgs {
    /// Subject to chart.
    #[arg(long)]
    pub subject: Subject,
    /// Restrict to one paper type.
    #[arg(long = "paper-type")]
    pub paper_type: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PaperTypesArgs {
    /// Subject to look up.
    #[arg(long)]
    pub subject: Subject,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TopicCommand {
    /// List the years and essay types that have a stored topic.
    List,
    /// Show one topic's reference essay and image path.
    Show(TopicKeyArgs),
    /// Add a topic (image plus reference essay) for a year and type.
    Add(TopicAddArgs),
    /// Delete a topic.
    #[command(alias = "remove")]
    Delete(TopicKeyArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TopicKeyArgs {
    /// Topic year.
    #[arg(long)]
    pub year: i32,
    /// Essay type (小作文 or 大作文; small/large also accepted).
    #[arg(long = "type")]
    pub essay_type: EssayType,
}

#[derive(Debug, Clone, Args)]
pub struct TopicAddArgs {
    /// Topic year.
    #[arg(long)]
    pub year: i32,
    /// Essay type (小作文 or 大作文; small/large also accepted).
    #[arg(long = "type")]
    pub essay_type: EssayType,
    /// Path to the topic image.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub image: String,
    /// Reference essay text, inline.
    #[arg(long, conflicts_with = "reference_file")]
    pub reference: Option<String>,
    /// Read the reference essay from a file instead.
    #[arg(long = "reference-file", value_hint = ValueHint::FilePath)]
    pub reference_file: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum EssayCommand {
    /// Run the two-step review (OCR, then optimize) on an essay image.
    Analyze(EssayAnalyzeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct EssayAnalyzeArgs {
    /// Topic year.
    #[arg(long)]
    pub year: i32,
    /// Essay type (小作文 or 大作文; small/large also accepted).
    #[arg(long = "type")]
    pub essay_type: EssayType,
    /// Path to the handwritten essay image.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub image: String,
    /// Persist the analysis as a backend-side Markdown report.
    #[arg(long, action = ArgAction::SetTrue)]
    pub save: bool,
    /// Skip the original-vs-optimized diff rendering.
    #[arg(long = "no-diff", action = ArgAction::SetTrue)]
    pub no_diff: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TaskCommand {
    /// Show the tasks and study record for a date.
    List(TaskDateArgs),
    /// Add a task to a date.
    Add(TaskAddArgs),
    /// Delete a task by ID.
    Delete(TaskDeleteArgs),
    /// Save or update a day's study record.
    Record(TaskRecordArgs),
    /// Print study hours and completion rate over a window.
    Chart(TaskChartArgs),
}

#[derive(Debug, Clone, Args)]
pub struct TaskDateArgs {
    /// Date, YYYY-MM-DD; defaults to today.
    #[arg(long)]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TaskAddArgs {
    /// Date, YYYY-MM-DD; defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    /// Task name.
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct TaskDeleteArgs {
    /// ID of the task to delete.
    pub id: i64,
}

#[derive(Debug, Clone, Args)]
pub struct TaskRecordArgs {
    /// Date, YYYY-MM-DD; defaults to today.
    #[arg(long)]
    pub date: Option<String>,
    /// Whole study hours.
    #[arg(long, default_value_t = 0)]
    pub hours: u32,
    /// Study minutes (0-59).
    #[arg(long, default_value_t = 0)]
    pub minutes: u32,
    /// Completed task IDs, comma separated.
    #[arg(long = "completed", value_delimiter = ',')]
    pub completed: Vec<i64>,
    /// Update an existing record instead of creating one.
    #[arg(long, action = ArgAction::SetTrue)]
    pub update: bool,
}

#[derive(Debug, Clone, Args)]
pub struct TaskChartArgs {
    /// Window: week, month, or all.
    #[arg(long, default_value = "week")]
    pub view: ChartView,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ChatCommand {
    /// Send one message to the AI study assistant.
    Send(ChatSendArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ChatSendArgs {
    /// Message text.
    #[arg(long)]
    pub message: String,
    /// Attach an image to the message.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub image: Option<String>,
    /// Persist this exchange as a transcript on the backend.
    #[arg(long, action = ArgAction::SetTrue)]
    pub save: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum SystemCommand {
    /// Show whether API keys and the daily-tasks seed are configured.
    Status,
    /// Save the AI service API keys (prompts for any not passed).
    SetApiKeys(SetApiKeysArgs),
    /// Upload the daily_tasks.xlsx seed file.
    UploadTasks(UploadTasksArgs),
    /// Delete the backend's temporary files.
    CleanupTemp,
}

#[derive(Debug, Clone, Args, Default)]
pub struct SetApiKeysArgs {
    /// ModelScope API key.
    #[arg(long = "modelscope-key")]
    pub modelscope_key: Option<String>,
    /// DashScope API key.
    #[arg(long = "dashscope-key")]
    pub dashscope_key: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct UploadTasksArgs {
    /// Path to the .xlsx file.
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub file: String,
}
