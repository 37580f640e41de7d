//! Pull request lifecycle
//!
//! A pull request starts `OPEN` and may move to `MERGED`, which is terminal.
//! Reviewer changes are only legal while the PR is open; merging is always
//! legal and idempotent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::PullRequest;

/// Status of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PrStatus {
    /// Accepting reviewer changes
    Open,
    /// Terminal, reviewer set is frozen
    Merged,
}

impl PrStatus {
    /// Statuses reachable from this one
    pub fn valid_transitions(&self) -> &'static [PrStatus] {
        match self {
            PrStatus::Open => &[PrStatus::Merged],
            PrStatus::Merged => &[],
        }
    }

    /// Check if moving to `to` is a legal forward transition
    pub fn can_transition_to(&self, to: &PrStatus) -> bool {
        self.valid_transitions().contains(to)
    }

    /// Whether no further transitions exist
    pub fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }

    /// Whether reviewers may be added, replaced or removed
    pub fn allows_reviewer_changes(&self) -> bool {
        matches!(self, PrStatus::Open)
    }

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PrStatus::Open => "OPEN",
            PrStatus::Merged => "MERGED",
        }
    }
}

impl fmt::Display for PrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PrStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "OPEN" => Ok(PrStatus::Open),
            "MERGED" => Ok(PrStatus::Merged),
            other => Err(Error::Internal(format!("Unknown pull request status: {}", other))),
        }
    }
}

/// Fail with `InvalidState` unless the PR still accepts reviewer changes
pub fn ensure_mutable(pr: &PullRequest) -> Result<()> {
    if pr.status.allows_reviewer_changes() {
        Ok(())
    } else {
        Err(Error::InvalidState(format!(
            "cannot change reviewers of {} pull request {}",
            pr.status, pr.id
        )))
    }
}

/// Outcome of a merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// PR was already merged; nothing to write
    AlreadyMerged,
    /// PR must be stored as merged at this instant
    Merge { merged_at: DateTime<Utc> },
}

/// Decide what merging `pr` at `now` amounts to
pub fn merge(pr: &PullRequest, now: DateTime<Utc>) -> MergeOutcome {
    if pr.status.can_transition_to(&PrStatus::Merged) {
        tracing::debug!(pr_id = %pr.id, from = %pr.status, to = %PrStatus::Merged, "Pull request status transition");
        MergeOutcome::Merge { merged_at: now }
    } else {
        MergeOutcome::AlreadyMerged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pr(status: PrStatus) -> PullRequest {
        PullRequest {
            id: "pr-1".into(),
            name: "Add search".into(),
            author_id: "u1".into(),
            status,
            created_at: Utc::now(),
            merged_at: None,
            reviewers: vec!["u2".into()],
        }
    }

    #[test]
    fn test_transitions() {
        assert!(PrStatus::Open.can_transition_to(&PrStatus::Merged));
        assert!(!PrStatus::Merged.can_transition_to(&PrStatus::Open));
        assert!(!PrStatus::Open.can_transition_to(&PrStatus::Open));
        assert!(PrStatus::Merged.is_terminal());
        assert!(!PrStatus::Open.is_terminal());
    }

    #[test]
    fn test_parse_round_trip() {
        assert_eq!("OPEN".parse::<PrStatus>().unwrap(), PrStatus::Open);
        assert_eq!("MERGED".parse::<PrStatus>().unwrap(), PrStatus::Merged);
        assert!("CLOSED".parse::<PrStatus>().is_err());
    }

    #[test]
    fn test_ensure_mutable() {
        assert!(ensure_mutable(&pr(PrStatus::Open)).is_ok());
        let err = ensure_mutable(&pr(PrStatus::Merged)).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_merge_open_stamps_time() {
        let now = Utc::now();
        assert_eq!(
            merge(&pr(PrStatus::Open), now),
            MergeOutcome::Merge { merged_at: now }
        );
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut merged = pr(PrStatus::Merged);
        merged.merged_at = Some(Utc::now());
        assert_eq!(merge(&merged, Utc::now()), MergeOutcome::AlreadyMerged);
    }
}
