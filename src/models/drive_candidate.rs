use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::drive::{RoundState, RoundStatus};

/// Tri-state flag used for shortlisting and final selection. `Unset` means
/// the decision has not been taken yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
    Unset,
}

impl Default for Decision {
    fn default() -> Self {
        Self::Unset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundResult {
    Passed,
    Failed,
    Unset,
}

impl Default for RoundResult {
    fn default() -> Self {
        Self::Unset
    }
}

/// Per-candidate copy of one drive round's state, augmented with the
/// candidate's own outcome. Joined to the drive's [`RoundState`] by
/// `round_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRoundState {
    pub round_id: Uuid,
    pub round_number: i32,
    pub round_type: String,
    pub status: RoundStatus,
    pub scheduled: bool,
    pub completed: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub result: RoundResult,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub interview_link: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateRoundState {
    /// Template for lazy initialization at shortlisting time: the drive's
    /// round state with the per-candidate fields reset.
    pub fn from_round(rs: &RoundState, now: DateTime<Utc>) -> Self {
        Self {
            round_id: rs.round_id,
            round_number: rs.round_number,
            round_type: rs.round_type.clone(),
            status: rs.status,
            scheduled: rs.scheduled,
            completed: rs.completed,
            deadline: rs.deadline,
            result: RoundResult::Unset,
            score: None,
            feedback: None,
            interview_link: None,
            updated_at: now,
        }
    }
}

/// A candidate's enrollment in one drive. `rounds_status` stays empty until
/// the candidate is shortlisted; from then on it mirrors the drive's
/// `round_statuses` entry-for-entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveCandidate {
    pub id: Uuid,
    pub drive_id: Uuid,
    pub candidate_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub resume_content: Option<String>,
    #[serde(default)]
    pub resume_score: Option<i32>,
    #[serde(default)]
    pub resume_shortlisted: Decision,
    #[serde(default)]
    pub selected: Decision,
    pub current_round: i32,
    pub rounds_status: Vec<CandidateRoundState>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriveCandidate {
    pub fn round_entry(&self, round_id: Uuid) -> Option<&CandidateRoundState> {
        self.rounds_status.iter().find(|rs| rs.round_id == round_id)
    }

    pub fn completed_rounds(&self) -> usize {
        self.rounds_status.iter().filter(|rs| rs.completed).count()
    }

    /// A candidate is selectable when every round entry carries a passed
    /// result.
    pub fn passed_all_rounds(&self) -> bool {
        !self.rounds_status.is_empty()
            && self
                .rounds_status
                .iter()
                .all(|rs| rs.result == RoundResult::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::drive::{generate_round_statuses, RoundSpec};

    #[test]
    fn from_round_resets_candidate_fields() {
        let rounds = vec![RoundSpec {
            round_id: Uuid::new_v4(),
            round_type: "HR".into(),
            description: None,
            deadline: None,
        }];
        let now = Utc::now();
        let statuses = generate_round_statuses(&rounds, now);
        let entry = CandidateRoundState::from_round(&statuses[0], now);

        assert_eq!(entry.round_id, rounds[0].round_id);
        assert_eq!(entry.round_number, 1);
        assert_eq!(entry.status, RoundStatus::Pending);
        assert_eq!(entry.result, RoundResult::Unset);
        assert!(entry.score.is_none());
        assert!(entry.interview_link.is_none());
    }

    #[test]
    fn decision_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Decision::Yes).unwrap(), "\"yes\"");
        assert_eq!(
            serde_json::to_string(&RoundResult::Passed).unwrap(),
            "\"passed\""
        );
    }
}
