//! Directory abstraction
//!
//! The Directory is the single source of truth for teams, users and pull
//! requests. The engine only reads and writes through this trait; the
//! in-memory implementation lives in [`crate::memory`] and the SQLite one in
//! the `roster-db` crate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cascade::ReassignmentPlan;
use crate::lifecycle::PrStatus;
use crate::model::{PullRequest, PullRequestSummary, ReviewerStat, Team, User};

/// Errors a Directory implementation may report
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Unique key already taken
    #[error("{0} already exists")]
    DuplicateKey(String),

    /// Storage failure
    #[error("{0}")]
    Backend(String),
}

/// Result type alias for Directory operations
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Storage operations the assignment engine relies on
///
/// Every method that changes reviewers of a single PR must be atomic: the
/// remove and add halves of a swap land together or not at all.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Create an empty team. Fails with `DuplicateKey` if the name is taken.
    async fn create_team(&self, team_name: &str) -> DirectoryResult<()>;

    /// Team with its roster ordered by user id
    async fn get_team(&self, team_name: &str) -> DirectoryResult<Team>;

    async fn team_exists(&self, team_name: &str) -> DirectoryResult<bool>;

    /// Insert the user or overwrite name, team and active flag
    async fn upsert_user(&self, user: &User) -> DirectoryResult<()>;

    async fn get_user(&self, user_id: &str) -> DirectoryResult<User>;

    /// Set the active flag and return the updated user
    async fn set_user_active(&self, user_id: &str, is_active: bool) -> DirectoryResult<User>;

    /// Active members of `team_name` other than `exclude_id`, ordered by id
    async fn get_active_teammates(
        &self,
        team_name: &str,
        exclude_id: &str,
    ) -> DirectoryResult<Vec<User>>;

    /// All members of `team_name`, ordered by id
    async fn get_users_by_team(&self, team_name: &str) -> DirectoryResult<Vec<User>>;

    /// Deactivate every listed user in one unit and return them, ordered by id
    async fn deactivate_users(&self, user_ids: &[String]) -> DirectoryResult<Vec<User>>;

    /// Store a new PR with its reviewers. Fails with `DuplicateKey` if the id is taken.
    async fn create_pr(&self, pr: &PullRequest) -> DirectoryResult<PullRequest>;

    async fn get_pr(&self, pr_id: &str) -> DirectoryResult<PullRequest>;

    async fn update_pr_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<PullRequest>;

    /// Append reviewers in order while the PR holds fewer than `max_reviewers`
    ///
    /// The count is read and written in one unit, so concurrent callers can
    /// never push a PR over the cap. Ids that are already reviewers, inactive,
    /// or the author are skipped, and a merged PR is left untouched. Fails with
    /// `NotFound` for an unknown PR or user.
    async fn add_reviewers(
        &self,
        pr_id: &str,
        user_ids: &[String],
        max_reviewers: usize,
    ) -> DirectoryResult<PullRequest>;

    /// Atomically remove `old_id` and, if given, add `new_id`
    ///
    /// Fails with `NotFound` if `old_id` is not a reviewer of the PR.
    async fn swap_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: Option<&str>,
    ) -> DirectoryResult<PullRequest>;

    /// Apply every swap of `plan` in one unit
    ///
    /// Eligibility is checked again at write time: a planned replacement who
    /// is no longer active, authors the PR or already reviews it leaves the
    /// slot vacated. Slots whose old reviewer is already gone are skipped.
    async fn batch_swap_reviewers(&self, plan: &ReassignmentPlan) -> DirectoryResult<()>;

    /// Open PRs that have at least one of `user_ids` as reviewer, oldest first
    async fn get_open_prs_by_reviewers(&self, user_ids: &[String])
        -> DirectoryResult<Vec<PullRequest>>;

    /// Every PR `user_id` reviews, newest first
    async fn get_prs_by_reviewer(&self, user_id: &str)
        -> DirectoryResult<Vec<PullRequestSummary>>;

    /// Assignment counts for every user, busiest first
    async fn reviewer_stats(&self) -> DirectoryResult<Vec<ReviewerStat>>;
}
