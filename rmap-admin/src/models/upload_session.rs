//! Upload wizard session
//!
//! One session per admin browser session. Tracks which wizard step is
//! complete, the staging state of the latest attempt, the attempt counter
//! that unlocks relaxed validation, and the rows of the last upload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::parser::RawRow;
use crate::ingest::PromotionProgress;

/// Furthest wizard step reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStep {
    AwaitingUpload,
    Uploaded,
    Previewed,
    Updated,
}

/// Staging state of the most recent upload attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StagingState {
    Idle,
    Parsing,
    Validating,
    Persisting,
    Staged,
    ParseFailed,
    ValidationFailed,
    /// Staging write failed or timed out
    PersistFailed,
    /// Staged rows were published; another promotion needs a new upload
    Promoted,
}

impl StagingState {
    /// Attempt finished (successfully or not)
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StagingState::Staged
                | StagingState::ParseFailed
                | StagingState::ValidationFailed
                | StagingState::PersistFailed
                | StagingState::Promoted
        )
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub session_id: Uuid,
    pub old_state: StagingState,
    pub new_state: StagingState,
    pub transitioned_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct UploadSession {
    pub session_id: Uuid,
    pub step: UploadStep,
    pub staging: StagingState,
    /// Upload POSTs since the preview step was last entered
    pub attempts: u32,
    /// Staged rows have been through the geocode-missing step
    pub geocoded: bool,
    /// Rows of the last readable upload, kept for retries without re-upload
    pub retained_rows: Option<Vec<RawRow>>,
    pub filename: Option<String>,
    /// Committed steps of a promotion that failed after replacing production
    pub promotion_resume: Option<PromotionProgress>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Client-visible snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub upload: bool,
    pub geocoding: bool,
    pub preview: bool,
    pub update: bool,
    pub staging_state: StagingState,
    pub attempts: u32,
    pub show_escape_hatch: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl UploadSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            step: UploadStep::AwaitingUpload,
            staging: StagingState::Idle,
            attempts: 0,
            geocoded: false,
            retained_rows: None,
            filename: None,
            promotion_resume: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reset step flags when the upload step is (re)visited
    ///
    /// The attempt counter and retained rows survive so a retry can still
    /// use the escape hatch.
    pub fn restart(&mut self) {
        self.step = UploadStep::AwaitingUpload;
        self.staging = StagingState::Idle;
        self.geocoded = false;
        self.updated_at = Utc::now();
    }

    pub fn transition_to(&mut self, new_state: StagingState) -> StateTransition {
        let transition = StateTransition {
            session_id: self.session_id,
            old_state: self.staging,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.staging = new_state;
        self.updated_at = transition.transitioned_at;

        if new_state == StagingState::Staged {
            self.step = UploadStep::Uploaded;
            self.geocoded = false;
            self.promotion_resume = None;
        } else if new_state.is_terminal() {
            self.step = UploadStep::AwaitingUpload;
        }

        transition
    }

    /// Relaxed validation may be requested once more than one attempt failed
    pub fn escape_hatch_available(&self) -> bool {
        self.attempts > 1
    }

    /// Count an upload POST; returns whether relaxed mode was available
    /// before this attempt
    pub fn begin_attempt(&mut self) -> bool {
        let available = self.escape_hatch_available();
        self.attempts += 1;
        self.transition_to(StagingState::Idle);
        available
    }

    pub fn is_staged(&self) -> bool {
        self.staging == StagingState::Staged
    }

    /// Enter the preview step; resets the attempt counter
    pub fn enter_preview(&mut self) {
        self.attempts = 0;
        self.updated_at = Utc::now();
    }

    /// Admin confirmed the preview and may promote
    pub fn mark_previewed(&mut self) {
        if self.step < UploadStep::Previewed {
            self.step = UploadStep::Previewed;
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_geocoded(&mut self) {
        self.geocoded = true;
        self.updated_at = Utc::now();
    }

    /// Promotion succeeded; the staged batch cannot be promoted again
    pub fn mark_updated(&mut self) {
        self.step = UploadStep::Updated;
        self.staging = StagingState::Promoted;
        self.retained_rows = None;
        self.promotion_resume = None;
        self.updated_at = Utc::now();
    }

    /// Remember a failed promotion so a retry can resume it
    pub fn record_promotion_failure(&mut self, progress: &PromotionProgress) {
        self.promotion_resume = progress
            .production_replaced()
            .then(|| progress.clone());
        self.updated_at = Utc::now();
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            upload: self.step >= UploadStep::Uploaded,
            geocoding: self.geocoded,
            preview: self.step >= UploadStep::Previewed,
            update: self.step == UploadStep::Updated,
            staging_state: self.staging,
            attempts: self.attempts,
            show_escape_hatch: self.escape_hatch_available(),
            filename: self.filename.clone(),
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_hatch_after_two_attempts() {
        let mut session = UploadSession::new();
        assert!(!session.begin_attempt());
        session.transition_to(StagingState::ValidationFailed);
        assert!(!session.status().show_escape_hatch);

        assert!(!session.begin_attempt());
        session.transition_to(StagingState::ValidationFailed);
        assert!(session.status().show_escape_hatch);

        // Third attempt may use relaxed mode
        assert!(session.begin_attempt());
        assert_eq!(session.attempts, 3);
    }

    #[test]
    fn test_preview_resets_attempts() {
        let mut session = UploadSession::new();
        session.begin_attempt();
        session.begin_attempt();
        session.transition_to(StagingState::Staged);
        session.enter_preview();
        assert_eq!(session.attempts, 0);
        assert!(!session.escape_hatch_available());
        assert!(session.status().upload);
    }

    #[test]
    fn test_failure_clears_upload_flag() {
        let mut session = UploadSession::new();
        session.begin_attempt();
        session.transition_to(StagingState::Staged);
        assert!(session.status().upload);

        session.begin_attempt();
        let t = session.transition_to(StagingState::ParseFailed);
        assert_eq!(t.old_state, StagingState::Idle);
        assert!(!session.status().upload);
        assert!(!session.is_staged());
    }

    #[test]
    fn test_step_progression() {
        let mut session = UploadSession::new();
        session.begin_attempt();
        session.transition_to(StagingState::Staged);
        session.mark_previewed();
        session.mark_updated();
        let status = session.status();
        assert!(status.upload && status.preview && status.update);
        assert_eq!(status.staging_state, StagingState::Promoted);
        assert!(!session.is_staged());
    }

    #[test]
    fn test_resume_kept_only_after_production_replaced() {
        use crate::ingest::PromotionStep;

        let mut session = UploadSession::new();
        session.begin_attempt();
        session.transition_to(StagingState::Staged);

        let early = PromotionProgress {
            completed: vec![PromotionStep::BackupSnapshot],
            ..Default::default()
        };
        session.record_promotion_failure(&early);
        assert!(session.promotion_resume.is_none());

        let late = PromotionProgress {
            completed: vec![PromotionStep::BackupSnapshot, PromotionStep::ReplaceProduction],
            backup_rows: 1,
            production_rows: 2,
            cached_rows: 0,
        };
        session.record_promotion_failure(&late);
        assert_eq!(session.promotion_resume.as_ref(), Some(&late));

        // A fresh batch must never resume the old promotion
        session.begin_attempt();
        session.transition_to(StagingState::Staged);
        assert!(session.promotion_resume.is_none());
    }
}
