use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::error::Result;
use crate::store::{CandidateRoundPatch, Store};

/// Aggregate outcome of one fan-out pass. Skips are candidates with no
/// matching round entry (not yet shortlisted, or enrolled before the round
/// existed) and per-candidate write failures; neither fails the batch.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FanOutReport {
    pub candidates: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Mirrors drive-level round transitions onto every enrolled candidate's
/// personal round array. Best-effort: a failure mid-pass leaves earlier
/// candidates on the new state and later ones on the old, to be healed by
/// the next transition touching the same round.
#[derive(Clone)]
pub struct RoundProjector {
    store: Arc<dyn Store>,
}

impl RoundProjector {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn fan_out(
        &self,
        drive_id: Uuid,
        round_id: Uuid,
        round_number: i32,
        patch: &CandidateRoundPatch,
    ) -> Result<FanOutReport> {
        let candidates = self.store.candidates_for_drive(drive_id).await?;
        let mut report = FanOutReport {
            candidates: candidates.len(),
            updated: 0,
            skipped: 0,
        };

        for candidate in &candidates {
            match self
                .store
                .patch_candidate_round(candidate.id, round_id, patch, None)
                .await
            {
                Ok(true) => report.updated += 1,
                Ok(false) => {
                    report.skipped += 1;
                    tracing::warn!(
                        drive_id = %drive_id,
                        candidate_id = %candidate.candidate_id,
                        round_number,
                        "candidate has no entry for this round; skipping"
                    );
                }
                Err(err) => {
                    report.skipped += 1;
                    tracing::warn!(
                        drive_id = %drive_id,
                        candidate_id = %candidate.candidate_id,
                        round_number,
                        error = %err,
                        "candidate round update failed; skipping"
                    );
                }
            }
        }

        tracing::info!(
            drive_id = %drive_id,
            round_number,
            updated = report.updated,
            skipped = report.skipped,
            "round fan-out finished"
        );
        Ok(report)
    }
}
