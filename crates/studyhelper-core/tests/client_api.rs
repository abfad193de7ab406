//! API client integration tests against a mocked backend.

use std::time::Duration;

use chrono::NaiveDate;
use mockito::Matcher;
use serde_json::json;

use studyhelper_core::client::{ApiClient, ApiError, Attachment};
use studyhelper_core::models::{
    ChartView, ChatMessage, EssayType, NewScore, ScoreQuery, StudyRecordInput, Subject,
};
use studyhelper_core::supervisor::{ReadinessError, wait_for_backend};
use studyhelper_core::workflow::{EssayReview, RecordMode, submit_record};

async fn server_and_client() -> (mockito::ServerGuard, ApiClient) {
    let server = mockito::Server::new_async().await;
    let client = ApiClient::new(&format!("{}/api/v1", server.url())).unwrap();
    (server, client)
}

#[tokio::test]
async fn create_score_posts_payload_and_decodes_id() {
    let (mut server, client) = server_and_client().await;
    let mock = server
        .mock("POST", "/api/v1/scores")
        .match_body(Matcher::PartialJson(json!({
            "subject": "数学",
            "year": 2024,
            "paper_type": "真题",
            "score": 118.0,
            "input_date": "2024-12-01",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"message": "分数记录添加成功", "id": 7}"#)
        .create_async()
        .await;

    let created = client
        .create_score(&NewScore {
            subject: Subject::Math,
            year: 2024,
            paper_type: "真题".to_string(),
            score: 118.0,
            input_date: NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(),
        })
        .await
        .unwrap();

    assert_eq!(created.id, 7);
    mock.assert_async().await;
}

#[tokio::test]
async fn listing_a_page_past_the_end_is_empty_not_an_error() {
    let (mut server, client) = server_and_client().await;
    let mock = server
        .mock("GET", "/api/v1/scores")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("page".into(), "9".into()),
            Matcher::UrlEncoded("page_size".into(), "10".into()),
            Matcher::UrlEncoded("subject".into(), "英语".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"total": 3, "page": 9, "page_size": 10, "data": []}"#)
        .create_async()
        .await;

    let page = client
        .scores(&ScoreQuery {
            subject: Some(Subject::English),
            paper_type: None,
            page: 9,
            page_size: 10,
        })
        .await
        .unwrap();

    assert_eq!(page.total, 3);
    assert!(page.data.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn scores_decode_typed_rows() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/scores")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "total": 1,
                "page": 1,
                "page_size": 10,
                "data": [{
                    "id": 3,
                    "subject": "专业课",
                    "year": 2025,
                    "paper_type": "模拟题",
                    "score": 131.5,
                    "input_date": "2025-11-02"
                }]
            }"#,
        )
        .create_async()
        .await;

    let page = client.scores(&ScoreQuery::default()).await.unwrap();
    let row = &page.data[0];
    assert_eq!(row.subject, Subject::Major);
    assert_eq!(row.input_date, NaiveDate::from_ymd_opt(2025, 11, 2).unwrap());
}

#[tokio::test]
async fn server_detail_message_is_surfaced_verbatim() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/paper-types")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "无效的科目"}"#)
        .create_async()
        .await;

    match client.paper_types(Subject::Math).await {
        Err(ApiError::Server { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "无效的科目");
        }
        other => panic!("expected server error, got {other:?}"),
    }
}

#[tokio::test]
async fn paper_types_unwrap_the_list() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/paper-types")
        .match_query(Matcher::UrlEncoded("subject".into(), "数学".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"paper_types": ["真题", "合工大超越卷", "其他"]}"#)
        .create_async()
        .await;

    let types = client.paper_types(Subject::Math).await.unwrap();
    assert_eq!(types.len(), 3);
    assert_eq!(types[0], "真题");
}

#[tokio::test]
async fn tasks_by_date_with_zero_tasks_reads_as_no_record() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/tasks/by-date")
        .match_query(Matcher::UrlEncoded("date".into(), "2026-08-07".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "date": "2026-08-07",
                "study_hours": 0.0,
                "total_tasks": 0,
                "completed_tasks": 0,
                "completion_rate": 0.0,
                "tasks": []
            }"#,
        )
        .create_async()
        .await;

    let summary = client
        .tasks_by_date(NaiveDate::from_ymd_opt(2026, 8, 7).unwrap())
        .await
        .unwrap();
    assert_eq!(summary.total_tasks, 0);
    assert!(!summary.has_tasks());
}

#[tokio::test]
async fn record_modes_hit_their_own_endpoints() {
    let (mut server, client) = server_and_client().await;
    let create = server
        .mock("POST", "/api/v1/tasks/save")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"message": "学习记录保存成功", "study_hours": 2.5, "completion_rate": 50.0}"#,
        )
        .create_async()
        .await;
    let update = server
        .mock("PUT", "/api/v1/tasks/record")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"message": "学习记录更新成功", "study_hours": 2.5, "completion_rate": 50.0}"#,
        )
        .create_async()
        .await;

    let record = StudyRecordInput {
        date: NaiveDate::from_ymd_opt(2026, 8, 7).unwrap(),
        study_hours: 2,
        study_minutes: 30,
        completed_task_ids: vec![1, 3],
    };

    submit_record(&client, RecordMode::Create, &record)
        .await
        .unwrap();
    submit_record(&client, RecordMode::Update, &record)
        .await
        .unwrap();

    create.assert_async().await;
    update.assert_async().await;
}

#[tokio::test]
async fn updating_an_absent_record_surfaces_the_backend_404() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("PUT", "/api/v1/tasks/record")
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"detail": "2026-08-08 没有学习记录"}"#)
        .create_async()
        .await;

    let record = StudyRecordInput {
        date: NaiveDate::from_ymd_opt(2026, 8, 8).unwrap(),
        study_hours: 1,
        study_minutes: 0,
        completed_task_ids: vec![],
    };

    match submit_record(&client, RecordMode::Update, &record).await {
        Err(err) => {
            assert!(err.is_not_found());
            assert!(err.to_string().contains("没有学习记录"));
        }
        Ok(_) => panic!("expected a 404"),
    }
}

#[tokio::test]
async fn task_chart_unwraps_the_data_envelope() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/tasks/chart-data")
        .match_query(Matcher::UrlEncoded("view".into(), "week".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data": [
                {"date": "2026-08-01", "study_hours": 3.0, "completion_rate": 80.0},
                {"date": "2026-08-02", "study_hours": 1.5, "completion_rate": 40.0}
            ]}"#,
        )
        .create_async()
        .await;

    let points = client.task_chart(ChartView::Week).await.unwrap();
    assert_eq!(points.len(), 2);
    assert!((points[1].study_hours - 1.5).abs() < f64::EPSILON);
}

#[tokio::test]
async fn essay_review_passes_ocr_text_to_analyze_verbatim() {
    let (mut server, client) = server_and_client().await;
    let ocr_text = "My handwriten essay text, exactly as recognized.";

    let ocr = server
        .mock("POST", "/api/v1/essays/ocr")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "original_text": ocr_text,
                "essay_image_path": "temp/essay_2024_large.jpg",
                "topic": "2024年大作文",
                "topic_image_path": "data/topics/topic_2024_large.jpg",
                "reference_essay": "Dear Sir or Madam, ..."
            })
            .to_string(),
        )
        .create_async()
        .await;

    let analyze = server
        .mock("POST", "/api/v1/essays/analyze")
        .match_body(Matcher::PartialJson(json!({
            "year": 2024,
            "essay_type": "大作文",
            "original_text": ocr_text,
            "topic_image_path": "data/topics/topic_2024_large.jpg",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "topic": "2024年大作文",
                "topic_image_path": "data/topics/topic_2024_large.jpg",
                "reference_essay": "Dear Sir or Madam, ...",
                "original_text": ocr_text,
                "optimized_text": "My handwritten essay text, polished.",
                "score": {"level": "第三档", "points": 14},
                "suggestions": {
                    "topic_relevance": "on topic",
                    "spelling_errors": ["handwriten -> handwritten"],
                    "structure_optimization": []
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut review = EssayReview::new(client, 2024, EssayType::Large);
    review
        .recognize(Attachment::new("essay.jpg", vec![0xFF, 0xD8]))
        .await
        .unwrap();
    assert_eq!(review.recognized().unwrap().original_text, ocr_text);

    let analysis = review.analyze().await.unwrap();
    assert_eq!(analysis.original_text, ocr_text);
    assert_eq!(analysis.score.as_ref().unwrap().points, 14.0);
    // Legacy suggestion field normalized at the boundary.
    assert_eq!(analysis.suggestions.topic_compliance, vec!["on topic"]);

    ocr.assert_async().await;
    analyze.assert_async().await;
}

#[tokio::test]
async fn save_analysis_wraps_the_report_in_a_year_envelope() {
    let (mut server, client) = server_and_client().await;
    let ocr = server
        .mock("POST", "/api/v1/essays/ocr")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "original_text": "text",
                "topic": "2023年小作文",
                "topic_image_path": "data/topics/t.jpg",
                "reference_essay": "ref"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let analyze = server
        .mock("POST", "/api/v1/essays/analyze")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "topic": "2023年小作文",
                "reference_essay": "ref",
                "original_text": "text",
                "optimized_text": "better text",
                "suggestions": {}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let save = server
        .mock("POST", "/api/v1/essays/save")
        .match_body(Matcher::PartialJson(json!({
            "year": 2023,
            "data": {
                "essay_type": "小作文",
                "original_text": "text",
                "optimized_text": "better text",
            }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"message": "分析报告已保存", "file_path": "output/essays/essay_analysis_2023.md"}"#,
        )
        .create_async()
        .await;

    let mut review = EssayReview::new(client, 2023, EssayType::Small);
    review
        .recognize(Attachment::new("essay.png", vec![1]))
        .await
        .unwrap();
    review.analyze().await.unwrap();
    let saved = review.save().await.unwrap();
    assert!(saved.file_path.ends_with(".md"));

    ocr.assert_async().await;
    analyze.assert_async().await;
    save.assert_async().await;
}

#[tokio::test]
async fn topic_detail_normalizes_storage_keys() {
    let (mut server, client) = server_and_client().await;
    server
        .mock(
            "GET",
            "/api/v1/essays/topics/2024/%E5%A4%A7%E4%BD%9C%E6%96%87",
        )
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "年份": 2024,
                "作文类型": "大作文",
                "题目图片路径": "data/topics/topic_2024_large.jpg",
                "参考范文": "Dear Sir or Madam, ..."
            })
            .to_string(),
        )
        .create_async()
        .await;

    let detail = client.topic_detail(2024, EssayType::Large).await.unwrap();
    assert_eq!(detail.year, 2024);
    assert_eq!(detail.image_path, "data/topics/topic_2024_large.jpg");
}

#[tokio::test]
async fn chat_round_trip_and_history_field() {
    let (mut server, client) = server_and_client().await;
    let mock = server
        .mock("POST", "/api/v1/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response": "先复习高数第三章。"}"#)
        .create_async()
        .await;

    let history = vec![
        ChatMessage::user("今天复习什么？"),
        ChatMessage::assistant("昨天你做了数学真题。"),
    ];
    let reply = client
        .chat("那今天呢？", None, &history)
        .await
        .unwrap();
    assert_eq!(reply.response, "先复习高数第三章。");
    mock.assert_async().await;
}

#[tokio::test]
async fn save_chat_reports_the_written_file() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("POST", "/api/v1/chat/save")
        .match_body(Matcher::PartialJson(json!({
            "messages": [{"role": "user", "content": "hi"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "message": "聊天记录已保存",
                "file_path": "output/chat_history/chat_history_20260807.md",
                "filename": "chat_history_20260807.md",
                "images_saved": 0
            }"#,
        )
        .create_async()
        .await;

    let saved = client
        .save_chat(&[ChatMessage::user("hi")])
        .await
        .unwrap();
    assert_eq!(saved.images_saved, 0);
    assert!(saved.filename.starts_with("chat_history_"));
}

#[tokio::test]
async fn system_status_decodes_both_flags() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/system/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"api_configured": true, "daily_tasks_exists": false}"#)
        .create_async()
        .await;

    let status = client.system_status().await.unwrap();
    assert!(status.api_configured);
    assert!(!status.daily_tasks_exists);
}

#[tokio::test]
async fn upload_rejects_non_xlsx_before_any_request() {
    let (_server, client) = server_and_client().await;
    // No mock is registered: a dispatched request would fail the test with
    // an unmatched-request error rather than this validation error.
    match client
        .upload_daily_tasks(Attachment::new("daily_tasks.csv", vec![1, 2]))
        .await
    {
        Err(ApiError::Invalid(_)) => {}
        other => panic!("expected validation rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn readiness_probe_returns_once_the_backend_answers() {
    let (mut server, client) = server_and_client().await;
    server
        .mock("GET", "/api/v1/system/status")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"api_configured": false, "daily_tasks_exists": false}"#)
        .create_async()
        .await;

    wait_for_backend(
        &client,
        Duration::from_secs(5),
        Duration::from_millis(50),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn readiness_probe_times_out_when_nothing_listens() {
    let client = ApiClient::new("http://127.0.0.1:1/api/v1").unwrap();
    match wait_for_backend(
        &client,
        Duration::from_millis(300),
        Duration::from_millis(50),
    )
    .await
    {
        Err(ReadinessError::TimedOut(_)) => {}
        Ok(()) => panic!("probe should not succeed against a closed port"),
    }
}
