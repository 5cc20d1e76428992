use std::sync::Arc;

use async_trait::async_trait;
use driveflow_backend::dto::drive_dto::{CreateCodingQuestion, CreateDriveRequest, CreateRound};
use driveflow_backend::error::{Error, Result};
use driveflow_backend::models::coding_question::{TestCase, TestCaseVisibility};
use driveflow_backend::models::submission::{
    JudgeStatus, SubmissionResult, SubmissionStatus, HIDDEN_MARKER,
};
use driveflow_backend::services::judge_service::{Judge, JudgeResponse};
use driveflow_backend::store::MemoryStore;
use driveflow_backend::AppState;
use rust_decimal::Decimal;
use uuid::Uuid;

/// Judge double: doubles the numeric stdin, so test cases expecting
/// `2 * input` pass and anything else fails.
struct DoublingJudge;

#[async_trait]
impl Judge for DoublingJudge {
    async fn submit_and_wait(&self, _: &str, _: i32, stdin: &str) -> Result<JudgeResponse> {
        let n: i64 = stdin.trim().parse().unwrap_or(0);
        Ok(JudgeResponse {
            status: JudgeStatus {
                id: 3,
                description: "Accepted".into(),
            },
            stdout: Some(format!("{}\n", n * 2)),
            stderr: None,
            time: Some(0.012),
            memory: Some(2048.0),
        })
    }
}

/// Judge double reporting a runtime error on every case.
struct CrashingJudge;

#[async_trait]
impl Judge for CrashingJudge {
    async fn submit_and_wait(&self, _: &str, _: i32, _: &str) -> Result<JudgeResponse> {
        Ok(JudgeResponse {
            status: JudgeStatus {
                id: 11,
                description: "Runtime Error (NZEC)".into(),
            },
            stdout: None,
            stderr: Some("segfault".into()),
            time: Some(0.001),
            memory: Some(1024.0),
        })
    }
}

fn question(test_cases: Vec<TestCase>) -> CreateCodingQuestion {
    CreateCodingQuestion {
        title: "Double the number".into(),
        description: "Print twice the input.".into(),
        test_cases,
        constraints: String::new(),
        difficulty: "easy".into(),
        tags: vec!["math".into()],
        time_limit: Some(2),
        memory_limit: Some(128),
    }
}

fn tc(input: &str, output: &str, visibility: TestCaseVisibility) -> TestCase {
    TestCase {
        input: input.into(),
        expected_output: output.into(),
        visibility,
    }
}

async fn drive_with_questions(
    state: &AppState,
    job_id: &str,
    questions: Vec<CreateCodingQuestion>,
) -> (Uuid, Vec<Uuid>) {
    let drive = state
        .drive_service
        .create_drive(CreateDriveRequest {
            company_id: "acme".into(),
            job_id: job_id.into(),
            role: "Backend Engineer".into(),
            location: None,
            candidates_to_hire: 1,
            job_type: None,
            internship_duration: None,
            skills: vec!["rust".into()],
            rounds: vec![CreateRound {
                round_type: "coding".into(),
                description: None,
                deadline: None,
            }],
            coding_questions: questions,
        })
        .await
        .expect("create drive");
    let question_ids = drive.coding_question_ids.clone();
    (drive.id, question_ids)
}

fn state_with(judge: Arc<dyn Judge>) -> AppState {
    AppState::new(
        Arc::new(MemoryStore::new()),
        judge,
        "http://localhost/webhook".to_string(),
        2,
    )
}

#[tokio::test]
async fn accepted_run_masks_private_cases_but_keeps_true_result() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-b",
        vec![question(vec![
            tc("1", "2", TestCaseVisibility::Public),
            tc("2", "4", TestCaseVisibility::Public),
            tc("3", "6", TestCaseVisibility::Private),
        ])],
    )
    .await;

    let summary = state
        .submission_service
        .submit_question(
            "cand-1",
            drive_id,
            question_ids[0],
            "print(int(input())*2)",
            "python",
            120,
        )
        .await
        .expect("grade");

    assert_eq!(summary.result, SubmissionResult::Accepted);
    assert_eq!(summary.test_cases_passed, 3);

    let hidden = &summary.results[2];
    assert_eq!(hidden.stdin, HIDDEN_MARKER);
    assert_eq!(hidden.expected, HIDDEN_MARKER);
    assert_eq!(hidden.stdout, HIDDEN_MARKER);
    assert_eq!(hidden.result, SubmissionResult::Accepted);
    assert!(hidden.time.is_some());

    // The stored document carries the same masked view.
    let submission = state
        .submission_service
        .submissions_by_candidate("cand-1")
        .await
        .unwrap()
        .remove(0);
    let qs = submission.question_submission(question_ids[0]).unwrap();
    assert_eq!(qs.status, SubmissionStatus::Completed);
    assert_eq!(qs.test_case_results[2].stdin, HIDDEN_MARKER);
    assert_eq!(qs.test_case_results[0].stdin, "1");
    assert_eq!(submission.questions_solved, 1);
    assert_eq!(submission.score_percentage, Decimal::from(100));
}

#[tokio::test]
async fn one_failing_case_yields_wrong_answer() {
    let state = state_with(Arc::new(DoublingJudge));
    // Case 2 expects an output the doubling judge will not produce.
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-c",
        vec![question(vec![
            tc("1", "2", TestCaseVisibility::Public),
            tc("2", "5", TestCaseVisibility::Public),
            tc("3", "6", TestCaseVisibility::Public),
        ])],
    )
    .await;

    let summary = state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "code", "python", 60)
        .await
        .expect("grade");

    assert_eq!(summary.result, SubmissionResult::WrongAnswer);
    assert_eq!(summary.test_cases_passed, 2);
    assert_eq!(summary.results[1].result, SubmissionResult::WrongAnswer);
}

#[tokio::test]
async fn zero_passes_reports_first_case_classification() {
    let state = state_with(Arc::new(CrashingJudge));
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-d",
        vec![question(vec![
            tc("1", "2", TestCaseVisibility::Public),
            tc("2", "4", TestCaseVisibility::Public),
        ])],
    )
    .await;

    let summary = state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "code", "python", 60)
        .await
        .expect("grade");

    assert_eq!(summary.test_cases_passed, 0);
    // Not a generic error constant: the first case's own classification.
    assert_eq!(summary.results[0].result, SubmissionResult::RuntimeError);
    assert_eq!(summary.result, SubmissionResult::RuntimeError);

    let stats = state
        .submission_service
        .submissions_by_drive(drive_id)
        .await
        .unwrap();
    assert_eq!(stats[0].questions_solved, 0);
    assert_eq!(stats[0].score_percentage, Decimal::ZERO);
}

#[tokio::test]
async fn resubmission_overwrites_in_place_and_keeps_question_number() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-e",
        vec![
            question(vec![tc("1", "2", TestCaseVisibility::Public)]),
            question(vec![tc("2", "4", TestCaseVisibility::Public)]),
        ],
    )
    .await;

    state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "first try", "python", 30)
        .await
        .expect("first run");
    state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[1], "other question", "python", 40)
        .await
        .expect("second question");
    state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "second try", "python", 50)
        .await
        .expect("re-run");

    let submission = state
        .submission_service
        .submissions_by_candidate("cand-1")
        .await
        .unwrap()
        .remove(0);

    assert_eq!(submission.question_submissions.len(), 2);
    let qs = submission.question_submission(question_ids[0]).unwrap();
    assert_eq!(qs.question_number, 1);
    assert_eq!(qs.source_code, "second try");
    assert_eq!(qs.time_taken, 50);
}

#[tokio::test]
async fn get_or_create_is_idempotent() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, _) = drive_with_questions(
        &state,
        "job-f",
        vec![question(vec![tc("1", "2", TestCaseVisibility::Public)])],
    )
    .await;

    let (first, created_first) = state
        .submission_service
        .get_or_create("cand-1", drive_id)
        .await
        .unwrap();
    let (second, created_second) = state
        .submission_service
        .get_or_create("cand-1", drive_id)
        .await
        .unwrap();

    assert!(created_first);
    assert!(!created_second);
    assert_eq!(first.id, second.id);
    assert_eq!(first.total_questions, 1);

    let all = state
        .submission_service
        .submissions_by_drive(drive_id)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn final_submit_accepts_partial_attempts() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-g",
        vec![
            question(vec![tc("1", "2", TestCaseVisibility::Public)]),
            question(vec![tc("2", "4", TestCaseVisibility::Public)]),
        ],
    )
    .await;

    state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "code", "python", 90)
        .await
        .expect("grade");

    let stats = state
        .submission_service
        .final_submit("cand-1", drive_id)
        .await
        .expect("final submit");

    assert_eq!(stats.status, SubmissionStatus::Completed);
    assert!(stats.submitted_at.is_some());
    assert_eq!(stats.total_questions, 2);
    assert_eq!(stats.problems_attempted, 1);
    assert_eq!(stats.questions_solved, 1);
    assert_eq!(stats.score_percentage, Decimal::from(50));
    assert_eq!(stats.total_time_taken, 90);
    assert_eq!(stats.question_breakdown.len(), 1);
}

#[tokio::test]
async fn unknown_language_fails_fast_without_side_effects() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, question_ids) = drive_with_questions(
        &state,
        "job-h",
        vec![question(vec![tc("1", "2", TestCaseVisibility::Public)])],
    )
    .await;

    let err = state
        .submission_service
        .submit_question("cand-1", drive_id, question_ids[0], "code", "brainfuck", 10)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));

    // Rejected before the submission document was even created.
    let all = state
        .submission_service
        .submissions_by_drive(drive_id)
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn drive_without_questions_rejects_submission() {
    let state = state_with(Arc::new(DoublingJudge));
    let (drive_id, _) = drive_with_questions(&state, "job-i", vec![]).await;

    let err = state
        .submission_service
        .get_or_create("cand-1", drive_id)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadRequest(_)));
}
