use std::sync::Arc;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::submission::{Submission, SubmissionResult};
use crate::store::Store;

/// Submission-level roll-up recomputed from the current question
/// submissions. Pure: re-running over the same document yields the same
/// numbers.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct RollUp {
    pub questions_solved: i32,
    pub score_percentage: Decimal,
    pub total_time_taken: i64,
}

#[derive(Clone)]
pub struct StatisticsAggregator {
    store: Arc<dyn Store>,
}

impl StatisticsAggregator {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Derive the roll-up without touching storage. The percentage is
    /// solved over the snapshotted `total_questions`, not over the attempted
    /// count, rounded to 2 decimals.
    pub fn derive(submission: &Submission) -> RollUp {
        let questions_solved = submission
            .question_submissions
            .iter()
            .filter(|qs| qs.result == Some(SubmissionResult::Accepted))
            .count() as i32;

        let score_percentage = if submission.total_questions > 0 {
            (Decimal::from(questions_solved) * Decimal::from(100)
                / Decimal::from(submission.total_questions))
            .round_dp(2)
        } else {
            Decimal::ZERO
        };

        let total_time_taken = submission
            .question_submissions
            .iter()
            .map(|qs| qs.time_taken)
            .sum();

        RollUp {
            questions_solved,
            score_percentage,
            total_time_taken,
        }
    }

    /// Recompute and persist the three roll-up fields (plus `updated_at`).
    /// Never changes the submission status; safe to call after every grading
    /// run.
    pub async fn recompute(&self, submission_id: Uuid) -> Result<RollUp> {
        let submission = self
            .store
            .submission_by_id(submission_id)
            .await?
            .ok_or_else(|| Error::NotFound("Submission not found".to_string()))?;

        let rollup = Self::derive(&submission);
        self.store
            .set_submission_stats(
                submission_id,
                rollup.questions_solved,
                rollup.score_percentage,
                rollup.total_time_taken,
            )
            .await?;

        tracing::debug!(
            submission_id = %submission_id,
            solved = rollup.questions_solved,
            score = %rollup.score_percentage,
            "submission roll-up recomputed"
        );
        Ok(rollup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::submission::{QuestionSubmission, SubmissionStatus};
    use chrono::Utc;

    fn submission_with_results(total: i32, results: &[Option<SubmissionResult>]) -> Submission {
        let mut submission = Submission::new("cand-1".into(), Uuid::new_v4(), total);
        for (i, result) in results.iter().enumerate() {
            let mut qs = QuestionSubmission::new(
                Uuid::new_v4(),
                i as i32 + 1,
                "code".into(),
                "python".into(),
                3,
                60,
                Utc::now(),
            );
            qs.status = SubmissionStatus::Completed;
            qs.result = *result;
            submission.question_submissions.push(qs);
        }
        submission
    }

    #[test]
    fn percentage_uses_total_questions_not_attempted() {
        let submission =
            submission_with_results(4, &[Some(SubmissionResult::Accepted)]);
        let rollup = StatisticsAggregator::derive(&submission);
        assert_eq!(rollup.questions_solved, 1);
        assert_eq!(rollup.score_percentage, Decimal::new(25, 0));
    }

    #[test]
    fn derive_is_idempotent() {
        let submission = submission_with_results(
            3,
            &[
                Some(SubmissionResult::Accepted),
                Some(SubmissionResult::WrongAnswer),
                Some(SubmissionResult::Accepted),
            ],
        );
        let first = StatisticsAggregator::derive(&submission);
        let second = StatisticsAggregator::derive(&submission);
        assert_eq!(first, second);
        assert_eq!(first.questions_solved, 2);
        assert_eq!(first.score_percentage, Decimal::new(6667, 2));
        assert_eq!(first.total_time_taken, 180);
    }

    #[test]
    fn empty_total_yields_zero_percentage() {
        let submission = submission_with_results(0, &[]);
        let rollup = StatisticsAggregator::derive(&submission);
        assert_eq!(rollup.score_percentage, Decimal::ZERO);
    }
}
