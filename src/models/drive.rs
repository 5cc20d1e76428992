use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Overall lifecycle status of a hiring drive. Round scheduling/completion
/// are transition requests, not stored statuses; see
/// [`DriveTransition`](crate::dto::drive_dto::DriveTransition).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DriveStatus {
    DriveCreated,
    ResumeUploaded,
    ResumeShortlisted,
    EmailSent,
    SelectionEmailSent,
    Completed,
}

impl DriveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DriveCreated => "driveCreated",
            Self::ResumeUploaded => "resumeUploaded",
            Self::ResumeShortlisted => "resumeShortlisted",
            Self::EmailSent => "emailSent",
            Self::SelectionEmailSent => "selectionEmailSent",
            Self::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "driveCreated" => Some(Self::DriveCreated),
            "resumeUploaded" => Some(Self::ResumeUploaded),
            "resumeShortlisted" => Some(Self::ResumeShortlisted),
            "emailSent" => Some(Self::EmailSent),
            "selectionEmailSent" => Some(Self::SelectionEmailSent),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "full-time")]
    FullTime,
    #[serde(rename = "internship")]
    Internship,
}

impl Default for JobType {
    fn default() -> Self {
        Self::FullTime
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Pending,
    InProgress,
    Completed,
}

/// One round in the drive's catalog. `round_id` is the stable join key used
/// by every cross-document update; `round_number` (1-based, on the matching
/// [`RoundState`]) is display order only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSpec {
    pub round_id: Uuid,
    #[serde(rename = "type")]
    pub round_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl RoundSpec {
    /// Coding rounds get assessment invites and a submission pipeline;
    /// everything else gets interview invites.
    pub fn is_coding(&self) -> bool {
        self.round_type.trim().eq_ignore_ascii_case("coding")
    }
}

/// Drive-level tracking state for one round, parallel to `rounds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundState {
    pub round_id: Uuid,
    pub round_number: i32,
    pub round_type: String,
    pub status: RoundStatus,
    pub scheduled: bool,
    pub completed: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub id: Uuid,
    pub company_id: String,
    pub job_id: String,
    pub role: String,
    pub location: Option<String>,
    pub candidates_to_hire: i32,
    pub job_type: JobType,
    #[serde(default)]
    pub internship_duration: Option<String>,
    pub skills: Vec<String>,
    pub rounds: Vec<RoundSpec>,
    pub round_statuses: Vec<RoundState>,
    /// 0 = no round started yet; otherwise the 1-based number of the round
    /// currently in progress.
    pub current_round: i32,
    pub status: DriveStatus,
    /// Display labels for UI progress; `current_stage` points into it.
    pub stages: Vec<String>,
    pub current_stage: i32,
    pub coding_question_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Drive {
    pub fn round_spec(&self, round_number: i32) -> Option<&RoundSpec> {
        if round_number < 1 {
            return None;
        }
        self.rounds.get((round_number - 1) as usize)
    }

    pub fn round_state(&self, round_id: Uuid) -> Option<&RoundState> {
        self.round_statuses.iter().find(|rs| rs.round_id == round_id)
    }

    pub fn all_rounds_completed(&self) -> bool {
        !self.round_statuses.is_empty()
            && self
                .round_statuses
                .iter()
                .all(|rs| rs.status == RoundStatus::Completed)
    }
}

/// Tracking entries for each catalog round, all Pending. The entry and its
/// catalog round share a `round_id`; `round_number` is index + 1.
pub fn generate_round_statuses(rounds: &[RoundSpec], now: DateTime<Utc>) -> Vec<RoundState> {
    rounds
        .iter()
        .enumerate()
        .map(|(idx, spec)| RoundState {
            round_id: spec.round_id,
            round_number: idx as i32 + 1,
            round_type: spec.round_type.clone(),
            status: RoundStatus::Pending,
            scheduled: false,
            completed: false,
            deadline: spec.deadline,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

/// Display stages: the fixed pre-round steps, one label per round, then the
/// selection step.
pub fn generate_stages(rounds: &[RoundSpec]) -> Vec<String> {
    let mut stages = vec![
        "Resume screening".to_string(),
        "Shortlisting".to_string(),
        "Invitations".to_string(),
    ];
    for (idx, spec) in rounds.iter().enumerate() {
        stages.push(format!("Round {}: {}", idx + 1, spec.round_type));
    }
    stages.push("Selection".to_string());
    stages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(types: &[&str]) -> Vec<RoundSpec> {
        types
            .iter()
            .map(|t| RoundSpec {
                round_id: Uuid::new_v4(),
                round_type: t.to_string(),
                description: None,
                deadline: None,
            })
            .collect()
    }

    #[test]
    fn round_statuses_are_aligned_with_catalog() {
        let rounds = specs(&["coding", "Technical", "HR"]);
        let statuses = generate_round_statuses(&rounds, Utc::now());

        assert_eq!(statuses.len(), rounds.len());
        for (i, rs) in statuses.iter().enumerate() {
            assert_eq!(rs.round_number, i as i32 + 1);
            assert_eq!(rs.round_id, rounds[i].round_id);
            assert_eq!(rs.status, RoundStatus::Pending);
            assert!(!rs.scheduled);
            assert!(!rs.completed);
        }
    }

    #[test]
    fn coding_round_detection_is_case_insensitive() {
        let rounds = specs(&[" Coding ", "hr"]);
        assert!(rounds[0].is_coding());
        assert!(!rounds[1].is_coding());
    }

    #[test]
    fn status_round_trips_through_names() {
        for status in [
            DriveStatus::DriveCreated,
            DriveStatus::ResumeUploaded,
            DriveStatus::ResumeShortlisted,
            DriveStatus::EmailSent,
            DriveStatus::SelectionEmailSent,
            DriveStatus::Completed,
        ] {
            assert_eq!(DriveStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(DriveStatus::from_str("ROUND_SCHEDULING"), None);
    }

    #[test]
    fn stages_cover_every_round() {
        let rounds = specs(&["coding", "HR"]);
        let stages = generate_stages(&rounds);
        assert_eq!(stages.len(), 3 + rounds.len() + 1);
        assert_eq!(stages[3], "Round 1: coding");
        assert_eq!(stages.last().map(String::as_str), Some("Selection"));
    }
}
