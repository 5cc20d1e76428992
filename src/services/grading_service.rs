use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::coding_question::TestCase;
use crate::models::submission::{
    JudgeStatus, SubmissionResult, SubmissionStatus, TestCaseResult, HIDDEN_MARKER,
};
use crate::services::judge_service::Judge;
use crate::services::statistics::StatisticsAggregator;
use crate::store::{QuestionGradePatch, Store};

/// Client-facing outcome of grading one question. `results` is already
/// masked for private cases.
#[derive(Debug, Clone, Serialize)]
pub struct GradeSummary {
    pub result: SubmissionResult,
    pub test_cases_passed: i32,
    pub total_test_cases: i32,
    pub results: Vec<TestCaseResult>,
}

struct CaseOutcome {
    record: TestCaseResult,
    execution_ms: f64,
    memory_mb: f64,
    log_line: Option<String>,
}

#[derive(Clone)]
pub struct GradingService {
    store: Arc<dyn Store>,
    judge: Arc<dyn Judge>,
    stats: StatisticsAggregator,
    concurrency: usize,
}

impl GradingService {
    pub fn new(store: Arc<dyn Store>, judge: Arc<dyn Judge>, concurrency: usize) -> Self {
        let stats = StatisticsAggregator::new(store.clone());
        Self {
            store,
            judge,
            stats,
            concurrency: concurrency.max(1),
        }
    }

    /// Grade one question submission against its ordered test cases and
    /// persist the outcome. A failure before any case runs marks the
    /// question `error` and is surfaced to the caller; per-case judge
    /// failures are recorded as that case's outcome and never abort the
    /// batch.
    pub async fn grade_question(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        source_code: &str,
        language_id: i32,
        test_cases: &[TestCase],
    ) -> Result<GradeSummary> {
        match self
            .run(submission_id, question_id, source_code, language_id, test_cases)
            .await
        {
            Ok(summary) => Ok(summary),
            Err(err) => {
                tracing::error!(
                    submission_id = %submission_id,
                    question_id = %question_id,
                    error = %err,
                    "grading failed before completion"
                );
                if let Err(mark_err) = self
                    .store
                    .mark_question_error(submission_id, question_id, &err.to_string())
                    .await
                {
                    tracing::warn!(error = %mark_err, "could not record grading failure");
                }
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        submission_id: Uuid,
        question_id: Uuid,
        source_code: &str,
        language_id: i32,
        test_cases: &[TestCase],
    ) -> Result<GradeSummary> {
        let found = self
            .store
            .set_question_status(submission_id, question_id, SubmissionStatus::Running)
            .await?;
        if !found {
            return Err(Error::NotFound(
                "Question submission not found".to_string(),
            ));
        }

        let mut case_futures = Vec::with_capacity(test_cases.len());
        for (idx, tc) in test_cases.iter().enumerate() {
            case_futures.push(self.run_case(idx, tc, source_code, language_id));
        }
        let mut outcomes: Vec<CaseOutcome> = stream::iter(case_futures)
            .buffered(self.concurrency)
            .collect()
            .await;
        // The overall decision depends on input order; make it explicit
        // regardless of how the fan-out resolved.
        outcomes.sort_by_key(|o| o.record.test_case_number);

        let total_test_cases = test_cases.len() as i32;
        let test_cases_passed = outcomes
            .iter()
            .filter(|o| o.record.result == SubmissionResult::Accepted)
            .count() as i32;

        let overall = if total_test_cases > 0 && test_cases_passed == total_test_cases {
            SubmissionResult::Accepted
        } else if test_cases_passed > 0 {
            SubmissionResult::WrongAnswer
        } else {
            // Zero passes: the first case's own classification wins.
            outcomes
                .first()
                .map(|o| o.record.result)
                .unwrap_or(SubmissionResult::Error)
        };

        let execution_time_ms = outcomes.iter().map(|o| o.execution_ms).sum::<f64>() as i64;
        let memory_used_mb = outcomes
            .iter()
            .map(|o| o.memory_mb)
            .fold(0.0f64, f64::max);
        let memory_used_mb = (memory_used_mb * 100.0).round() / 100.0;

        let log_lines: Vec<String> = outcomes.iter().filter_map(|o| o.log_line.clone()).collect();
        let error_message = if log_lines.is_empty() {
            None
        } else {
            Some(log_lines.join("\n"))
        };

        let results: Vec<TestCaseResult> = outcomes.into_iter().map(|o| o.record).collect();

        let grade = QuestionGradePatch {
            status: SubmissionStatus::Completed,
            result: overall,
            test_cases_passed,
            total_test_cases,
            execution_time_ms,
            memory_used_mb,
            error_message,
            test_case_results: results.clone(),
        };
        self.store
            .apply_question_grade(submission_id, question_id, &grade)
            .await?;

        self.stats.recompute(submission_id).await?;

        tracing::info!(
            submission_id = %submission_id,
            question_id = %question_id,
            result = ?overall,
            passed = test_cases_passed,
            total = total_test_cases,
            "question graded"
        );

        Ok(GradeSummary {
            result: overall,
            test_cases_passed,
            total_test_cases,
            results,
        })
    }

    async fn run_case(
        &self,
        idx: usize,
        tc: &TestCase,
        source_code: &str,
        language_id: i32,
    ) -> CaseOutcome {
        let number = idx as i32 + 1;
        let private = tc.is_private();
        let input = tc.input.clone();
        let expected = tc.expected_output.trim().to_string();

        let mask = |value: String| -> String {
            if private {
                HIDDEN_MARKER.to_string()
            } else {
                value
            }
        };

        // Nothing to compare against: the case cannot be graded and counts
        // toward neither passed nor failed.
        if expected.is_empty() {
            return CaseOutcome {
                record: TestCaseResult {
                    test_case_number: number,
                    visibility: tc.visibility,
                    status: JudgeStatus::invalid_test_case(),
                    stdin: mask(input),
                    expected: mask(String::new()),
                    stdout: mask(String::new()),
                    stderr: None,
                    time: None,
                    memory: None,
                    result: SubmissionResult::Invalid,
                },
                execution_ms: 0.0,
                memory_mb: 0.0,
                log_line: None,
            };
        }

        match self
            .judge
            .submit_and_wait(source_code, language_id, &input)
            .await
        {
            Ok(response) => {
                let actual = response
                    .stdout
                    .as_deref()
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                let result = SubmissionResult::classify(&response.status, &expected, &actual);
                let execution_ms = response.time.unwrap_or(0.0) * 1000.0;
                let memory_mb = response.memory.unwrap_or(0.0) / 1024.0;

                let log_line = response
                    .stderr
                    .as_deref()
                    .filter(|s| !s.is_empty())
                    .map(|s| format!("TC {} Error: {}", number, s));

                let stderr = match response.stderr {
                    Some(s) if !s.is_empty() && private => Some(HIDDEN_MARKER.to_string()),
                    other => other,
                };

                CaseOutcome {
                    record: TestCaseResult {
                        test_case_number: number,
                        visibility: tc.visibility,
                        status: response.status,
                        stdin: mask(input),
                        expected: mask(expected),
                        stdout: mask(actual),
                        stderr,
                        time: response.time,
                        memory: response.memory,
                        result,
                    },
                    execution_ms,
                    memory_mb,
                    log_line,
                }
            }
            Err(err) => {
                tracing::warn!(
                    test_case = number,
                    error = %err,
                    "judge call failed; recording error outcome for this case"
                );
                CaseOutcome {
                    record: TestCaseResult {
                        test_case_number: number,
                        visibility: tc.visibility,
                        status: JudgeStatus::execution_error(),
                        stdin: mask(input),
                        expected: mask(expected),
                        stdout: mask(String::new()),
                        stderr: Some(err.to_string()),
                        time: None,
                        memory: None,
                        result: SubmissionResult::Error,
                    },
                    execution_ms: 0.0,
                    memory_mb: 0.0,
                    log_line: Some(format!("TC {} Error: {}", number, err)),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::coding_question::TestCaseVisibility;
    use crate::models::submission::{QuestionSubmission, Submission};
    use crate::services::judge_service::{JudgeResponse, MockJudge};
    use crate::store::{MemoryStore, SubmissionRepo};
    use chrono::Utc;

    fn accepted(stdout: &str) -> JudgeResponse {
        JudgeResponse {
            status: JudgeStatus {
                id: 3,
                description: "Accepted".into(),
            },
            stdout: Some(stdout.to_string()),
            stderr: None,
            time: Some(0.01),
            memory: Some(2048.0),
        }
    }

    fn case(input: &str, output: &str, visibility: TestCaseVisibility) -> TestCase {
        TestCase {
            input: input.to_string(),
            expected_output: output.to_string(),
            visibility,
        }
    }

    async fn seeded_store(question_id: Uuid) -> (Arc<MemoryStore>, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let mut submission = Submission::new("cand-1".into(), Uuid::new_v4(), 1);
        submission.question_submissions.push(QuestionSubmission::new(
            question_id,
            1,
            "print(input())".into(),
            "python".into(),
            3,
            60,
            Utc::now(),
        ));
        let stored = store.insert_submission(&submission).await.unwrap();
        (store, stored.id)
    }

    #[tokio::test]
    async fn private_cases_are_masked_but_truthfully_classified() {
        let question_id = Uuid::new_v4();
        let (store, submission_id) = seeded_store(question_id).await;

        let mut judge = MockJudge::new();
        judge
            .expect_submit_and_wait()
            .returning(|_, _, stdin| Ok(accepted(&format!("{}!", stdin))));

        let service = GradingService::new(store.clone(), Arc::new(judge), 1);
        let cases = vec![
            case("a", "a!", TestCaseVisibility::Public),
            case("secret", "secret!", TestCaseVisibility::Private),
        ];
        let summary = service
            .grade_question(submission_id, question_id, "code", 71, &cases)
            .await
            .unwrap();

        assert_eq!(summary.result, SubmissionResult::Accepted);
        assert_eq!(summary.test_cases_passed, 2);

        let public = &summary.results[0];
        assert_eq!(public.stdin, "a");
        let private = &summary.results[1];
        assert_eq!(private.stdin, HIDDEN_MARKER);
        assert_eq!(private.expected, HIDDEN_MARKER);
        assert_eq!(private.stdout, HIDDEN_MARKER);
        assert_eq!(private.result, SubmissionResult::Accepted);

        // The persisted record is masked too.
        let stored = store.submission_by_id(submission_id).await.unwrap().unwrap();
        let qs = stored.question_submission(question_id).unwrap();
        assert_eq!(qs.test_case_results[1].stdin, HIDDEN_MARKER);
    }

    #[tokio::test]
    async fn zero_passes_takes_first_case_result() {
        let question_id = Uuid::new_v4();
        let (store, submission_id) = seeded_store(question_id).await;

        let mut judge = MockJudge::new();
        judge.expect_submit_and_wait().returning(|_, _, _| {
            Ok(JudgeResponse {
                status: JudgeStatus {
                    id: 6,
                    description: "Compilation Error".into(),
                },
                stdout: None,
                stderr: Some("boom".into()),
                time: None,
                memory: None,
            })
        });

        let service = GradingService::new(store, Arc::new(judge), 1);
        let cases = vec![
            case("1", "2", TestCaseVisibility::Public),
            case("3", "4", TestCaseVisibility::Public),
        ];
        let summary = service
            .grade_question(submission_id, question_id, "code", 71, &cases)
            .await
            .unwrap();

        assert_eq!(summary.test_cases_passed, 0);
        assert_eq!(summary.result, SubmissionResult::CompilationError);
    }

    #[tokio::test]
    async fn judge_failure_on_one_case_does_not_abort_the_rest() {
        let question_id = Uuid::new_v4();
        let (store, submission_id) = seeded_store(question_id).await;

        let mut judge = MockJudge::new();
        judge.expect_submit_and_wait().returning(|_, _, stdin| {
            if stdin == "bad" {
                Err(Error::ExternalService("judge timeout".into()))
            } else {
                Ok(accepted("ok"))
            }
        });

        let service = GradingService::new(store, Arc::new(judge), 1);
        let cases = vec![
            case("good", "ok", TestCaseVisibility::Public),
            case("bad", "ok", TestCaseVisibility::Public),
            case("good", "ok", TestCaseVisibility::Public),
        ];
        let summary = service
            .grade_question(submission_id, question_id, "code", 71, &cases)
            .await
            .unwrap();

        assert_eq!(summary.test_cases_passed, 2);
        assert_eq!(summary.result, SubmissionResult::WrongAnswer);
        assert_eq!(summary.results[1].result, SubmissionResult::Error);
        assert!(summary.results[1].stderr.as_deref().unwrap().contains("judge timeout"));
    }

    #[tokio::test]
    async fn ungradeable_case_is_invalid_and_skipped() {
        let question_id = Uuid::new_v4();
        let (store, submission_id) = seeded_store(question_id).await;

        let mut judge = MockJudge::new();
        judge
            .expect_submit_and_wait()
            .returning(|_, _, _| Ok(accepted("ok")));

        let service = GradingService::new(store, Arc::new(judge), 1);
        let cases = vec![
            case("x", "   ", TestCaseVisibility::Public),
            case("y", "ok", TestCaseVisibility::Public),
        ];
        let summary = service
            .grade_question(submission_id, question_id, "code", 71, &cases)
            .await
            .unwrap();

        assert_eq!(summary.results[0].result, SubmissionResult::Invalid);
        assert_eq!(summary.test_cases_passed, 1);
        assert_eq!(summary.result, SubmissionResult::WrongAnswer);
    }

    #[tokio::test]
    async fn missing_question_marks_nothing_and_surfaces_not_found() {
        let question_id = Uuid::new_v4();
        let (store, submission_id) = seeded_store(question_id).await;

        let judge = MockJudge::new();
        let service = GradingService::new(store, Arc::new(judge), 1);
        let err = service
            .grade_question(submission_id, Uuid::new_v4(), "code", 71, &[])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
