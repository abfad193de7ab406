//! Command-line surface for the Study Helper backend.
//!
//! Every subcommand validates its input client-side before dispatching the
//! corresponding API call, mirroring the GUI forms.

pub mod cli_args;

use chrono::{Local, NaiveDate};
use clap::Parser;

use cli_args::{
    ChatCommand, Cli, Command, EssayCommand, ScoreCommand, SystemCommand, TaskCommand,
    TopicCommand,
};
use studyhelper_core::client::{ApiClient, Attachment};
use studyhelper_core::models::{
    ApiKeys, ChatMessage, NewScore, ScoreQuery, ScoreUpdate, StudyRecordInput, Subject,
    TaskCreate, parse_date,
};
use studyhelper_core::workflow::{EssayReview, RecordMode, submit_record};
use studyhelper_core::{LoggingDestination, init_logging, load_config};

/// The launcher runs the CLI whenever arguments were given, and the GUI
/// otherwise.
pub fn should_run_cli_mode() -> bool {
    std::env::args().len() > 1
}

pub async fn run() -> Result<(), String> {
    if let Err(err) = init_logging(LoggingDestination::FileAndStderr) {
        eprintln!("Warning: failed to initialize logging: {err}");
    }

    let cli = Cli::parse();
    dispatch(cli).await
}

async fn dispatch(cli: Cli) -> Result<(), String> {
    let client = build_client(cli.base_url.as_deref())?;

    match cli.command {
        Command::Score(cmd) => handle_score(&client, cmd).await,
        Command::Topic(cmd) => handle_topic(&client, cmd).await,
        Command::Essay(cmd) => handle_essay(&client, cmd).await,
        Command::Task(cmd) => handle_task(&client, cmd).await,
        Command::Chat(cmd) => handle_chat(&client, cmd).await,
        Command::System(cmd) => handle_system(&client, cmd).await,
    }
}

fn build_client(base_override: Option<&str>) -> Result<ApiClient, String> {
    let base = match base_override {
        Some(url) => url.to_string(),
        None => {
            let load = load_config();
            for warning in load.warnings {
                eprintln!("Warning: {warning}");
            }
            load.config.backend.api_base_url
        }
    };
    ApiClient::new(&base).map_err(|err| err.to_string())
}

fn resolve_date(value: Option<&str>) -> Result<NaiveDate, String> {
    match value {
        Some(text) => parse_date(text).map_err(|err| err.to_string()),
        None => Ok(Local::now().date_naive()),
    }
}

async fn handle_score(client: &ApiClient, command: ScoreCommand) -> Result<(), String> {
    match command {
        ScoreCommand::Add(args) => {
            let score = NewScore {
                subject: args.subject,
                year: args.year,
                paper_type: args.paper_type,
                score: args.score,
                input_date: resolve_date(args.date.as_deref())?,
            };
            score.validate().map_err(|err| err.to_string())?;
            let created = client
                .create_score(&score)
                .await
                .map_err(|err| err.to_string())?;
            println!("{} (id {})", created.message, created.id);
            Ok(())
        }
        ScoreCommand::List(args) => {
            let page = client
                .scores(&ScoreQuery {
                    subject: args.subject,
                    paper_type: args.paper_type,
                    page: args.page,
                    page_size: args.page_size,
                })
                .await
                .map_err(|err| err.to_string())?;

            if page.data.is_empty() {
                println!("No scores on page {} ({} total).", page.page, page.total);
                return Ok(());
            }

            println!("{:>4}  {:<6}  {:>4}  {:<14}  {:>6}  日期", "ID", "科目", "年份", "试卷类型", "分数");
            for row in &page.data {
                println!(
                    "{:>4}  {:<6}  {:>4}  {:<14}  {:>6.1}  {}",
                    row.id, row.subject, row.year, row.paper_type, row.score, row.input_date
                );
            }
            println!(
                "Page {} of {} rows total (page size {}).",
                page.page, page.total, page.page_size
            );
            Ok(())
        }
        ScoreCommand::Update(args) => {
            let update = ScoreUpdate {
                subject: args.subject,
                year: args.year,
                paper_type: args.paper_type,
                score: args.score,
                input_date: match args.date.as_deref() {
                    Some(text) => Some(parse_date(text).map_err(|err| err.to_string())?),
                    None => None,
                },
            };
            if update.is_empty() {
                return Err("Nothing to update; pass at least one field.".into());
            }
            // When --score is given, clap has required --subject; the
            // fallback below is only reached for score-less updates where
            // the subject context is irrelevant.
            let context = args.subject.unwrap_or(Subject::Math);
            update.validate(context).map_err(|err| err.to_string())?;

            let reply = client
                .update_score(args.id, &update)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.message);
            Ok(())
        }
        ScoreCommand::Delete(args) => {
            let reply = client
                .delete_score(args.id)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.message);
            Ok(())
        }
        ScoreCommand::Chart(args) => {
            let series = client
                .score_chart(args.subject, args.paper_type.as_deref())
                .await
                .map_err(|err| err.to_string())?;

            if series.is_empty() {
                println!(
                    "{}",
                    series
                        .message
                        .unwrap_or_else(|| "No chart data for this selection.".to_string())
                );
                return Ok(());
            }

            println!("分数走势 — {}", args.subject);
            for (date, score) in series.dates.iter().zip(series.scores.iter()) {
                println!("{date}  {score:>6.1}");
            }
            Ok(())
        }
        ScoreCommand::PaperTypes(args) => {
            let types = client
                .paper_types(args.subject)
                .await
                .map_err(|err| err.to_string())?;
            for paper_type in types {
                println!("{paper_type}");
            }
            Ok(())
        }
    }
}

async fn handle_topic(client: &ApiClient, command: TopicCommand) -> Result<(), String> {
    match command {
        TopicCommand::List => {
            let catalog = client
                .topic_catalog()
                .await
                .map_err(|err| err.to_string())?;
            if catalog.years.is_empty() {
                println!("No essay topics stored yet.");
                return Ok(());
            }
            println!(
                "Years: {}",
                catalog
                    .years
                    .iter()
                    .map(|year| year.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            println!("Types: {}", catalog.essay_types.join(", "));
            Ok(())
        }
        TopicCommand::Show(args) => {
            let detail = client
                .topic_detail(args.year, args.essay_type)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}年{}", detail.year, detail.essay_type);
            println!("Image: {}", client.file_url(&detail.image_path));
            println!("\n参考范文:\n{}", detail.reference_essay);
            Ok(())
        }
        TopicCommand::Add(args) => {
            let reference = match (args.reference, args.reference_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .map_err(|err| format!("failed to read {path}: {err}"))?,
                (None, None) => {
                    return Err("Pass --reference or --reference-file.".into());
                }
            };
            let image = Attachment::read(std::path::Path::new(&args.image))
                .map_err(|err| format!("failed to read {}: {err}", args.image))?;
            let reply = client
                .add_topic(args.year, args.essay_type, image, &reference)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.message);
            Ok(())
        }
        TopicCommand::Delete(args) => {
            let reply = client
                .delete_topic(args.year, args.essay_type)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.message);
            Ok(())
        }
    }
}

async fn handle_essay(client: &ApiClient, command: EssayCommand) -> Result<(), String> {
    match command {
        EssayCommand::Analyze(args) => {
            let image = Attachment::read(std::path::Path::new(&args.image))
                .map_err(|err| format!("failed to read {}: {err}", args.image))?;

            let mut review = EssayReview::new(client.clone(), args.year, args.essay_type);

            eprintln!("Recognizing essay text...");
            let recognized = review
                .recognize(image)
                .await
                .map_err(|err| err.to_string())?;
            eprintln!(
                "Recognized {} characters; optimizing...",
                recognized.original_text.chars().count()
            );

            let analysis = review.analyze().await.map_err(|err| err.to_string())?;

            println!("题目: {}", analysis.topic);
            if let Some(ref score) = analysis.score {
                println!(
                    "评分: {}分 / {} ({})",
                    score.points,
                    args.essay_type.max_points(),
                    score.level
                );
            }

            if args.no_diff {
                println!("\n原文:\n{}", analysis.original_text);
                println!("\n优化后:\n{}", analysis.optimized_text);
            } else {
                println!();
                let mut stdout = std::io::stdout();
                let theme = termdiff::SignsColorTheme {};
                if let Err(err) = termdiff::diff(
                    &mut stdout,
                    &analysis.original_text,
                    &analysis.optimized_text,
                    &theme,
                ) {
                    eprintln!("Warning: failed to render diff: {err}");
                    println!("原文:\n{}", analysis.original_text);
                    println!("\n优化后:\n{}", analysis.optimized_text);
                }
            }

            print_suggestions("题意符合度", &analysis.suggestions.topic_compliance);
            print_suggestions("拼写错误", &analysis.suggestions.spelling_errors);
            print_suggestions("语法错误", &analysis.suggestions.grammar_errors);
            print_suggestions("单词优化", &analysis.suggestions.word_optimization);
            print_suggestions("句式优化", &analysis.suggestions.sentence_optimization);
            print_suggestions("结构优化", &analysis.suggestions.structure_optimization);

            if args.save {
                let saved = review.save().await.map_err(|err| err.to_string())?;
                println!("\n{} ({})", saved.message, saved.file_path);
            }
            Ok(())
        }
    }
}

fn print_suggestions(title: &str, items: &[String]) {
    println!("\n{title}:");
    if items.is_empty() {
        println!("  (无)");
    } else {
        for item in items {
            println!("  - {item}");
        }
    }
}

async fn handle_task(client: &ApiClient, command: TaskCommand) -> Result<(), String> {
    match command {
        TaskCommand::List(args) => {
            let date = resolve_date(args.date.as_deref())?;
            let summary = client
                .tasks_by_date(date)
                .await
                .map_err(|err| err.to_string())?;

            if !summary.has_tasks() {
                println!("{}: no task record yet.", summary.date);
                return Ok(());
            }

            let (hours, minutes) = summary.hours_minutes();
            println!(
                "{} — {}h{:02}m studied, {}/{} tasks done ({:.0}%)",
                summary.date,
                hours,
                minutes,
                summary.completed_tasks,
                summary.total_tasks,
                summary.completion_rate
            );
            for task in &summary.tasks {
                let mark = if task.completed { "x" } else { " " };
                println!("  [{mark}] {:>4}  {}", task.id, task.task_name);
            }
            Ok(())
        }
        TaskCommand::Add(args) => {
            let task = TaskCreate {
                date: resolve_date(args.date.as_deref())?,
                task_name: args.name,
            };
            task.validate().map_err(|err| err.to_string())?;
            let created = client.add_task(&task).await.map_err(|err| err.to_string())?;
            println!("{} (id {})", created.message, created.task_id);
            Ok(())
        }
        TaskCommand::Delete(args) => {
            let reply = client
                .delete_task(args.id)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.message);
            Ok(())
        }
        TaskCommand::Record(args) => {
            let record = StudyRecordInput {
                date: resolve_date(args.date.as_deref())?,
                study_hours: args.hours,
                study_minutes: args.minutes,
                completed_task_ids: args.completed,
            };
            record.validate().map_err(|err| err.to_string())?;

            let mode = if args.update {
                RecordMode::Update
            } else {
                RecordMode::Create
            };
            let receipt = submit_record(client, mode, &record)
                .await
                .map_err(|err| err.to_string())?;
            println!(
                "{} ({:.2}h, {:.0}% complete)",
                receipt.message, receipt.study_hours, receipt.completion_rate
            );
            Ok(())
        }
        TaskCommand::Chart(args) => {
            let points = client
                .task_chart(args.view)
                .await
                .map_err(|err| err.to_string())?;
            if points.is_empty() {
                println!("No study records in this window.");
                return Ok(());
            }
            println!("{:<12}  {:>7}  {:>6}", "日期", "学习时长", "完成率");
            for point in points {
                println!(
                    "{:<12}  {:>6.1}h  {:>5.0}%",
                    point.date, point.study_hours, point.completion_rate
                );
            }
            Ok(())
        }
    }
}

async fn handle_chat(client: &ApiClient, command: ChatCommand) -> Result<(), String> {
    match command {
        ChatCommand::Send(args) => {
            let image = match args.image.as_deref() {
                Some(path) => Some(
                    Attachment::read(std::path::Path::new(path))
                        .map_err(|err| format!("failed to read {path}: {err}"))?,
                ),
                None => None,
            };

            let image_url = image.as_ref().map(Attachment::to_data_url);
            let reply = client
                .chat(&args.message, image.clone(), &[])
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", reply.response);

            if args.save {
                let mut user = ChatMessage::user(args.message);
                user.image_url = image_url;
                let transcript = vec![user, ChatMessage::assistant(reply.response)];
                let saved = client
                    .save_chat(&transcript)
                    .await
                    .map_err(|err| err.to_string())?;
                eprintln!("{} ({})", saved.message, saved.file_path);
            }
            Ok(())
        }
    }
}

async fn handle_system(client: &ApiClient, command: SystemCommand) -> Result<(), String> {
    match command {
        SystemCommand::Status => {
            let status = client
                .system_status()
                .await
                .map_err(|err| err.to_string())?;
            println!(
                "API keys configured: {}",
                if status.api_configured { "yes" } else { "no" }
            );
            println!(
                "daily_tasks.xlsx present: {}",
                if status.daily_tasks_exists { "yes" } else { "no" }
            );
            Ok(())
        }
        SystemCommand::SetApiKeys(args) => {
            let modelscope = match args.modelscope_key {
                Some(key) => key,
                None => rpassword::prompt_password("ModelScope API key (blank to skip): ")
                    .map_err(|err| format!("failed to read key: {err}"))?,
            };
            let dashscope = match args.dashscope_key {
                Some(key) => key,
                None => rpassword::prompt_password("DashScope API key (blank to skip): ")
                    .map_err(|err| format!("failed to read key: {err}"))?,
            };

            let ack = client
                .save_api_keys(&ApiKeys {
                    modelscope_api_key: modelscope.trim().to_string(),
                    dashscope_api_key: dashscope.trim().to_string(),
                })
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", ack.message);
            Ok(())
        }
        SystemCommand::UploadTasks(args) => {
            let file = Attachment::read(std::path::Path::new(&args.file))
                .map_err(|err| format!("failed to read {}: {err}", args.file))?;
            let ack = client
                .upload_daily_tasks(file)
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", ack.message);
            Ok(())
        }
        SystemCommand::CleanupTemp => {
            let ack = client
                .cleanup_temp()
                .await
                .map_err(|err| err.to_string())?;
            println!("{}", ack.message);
            Ok(())
        }
    }
}
