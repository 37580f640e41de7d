//! Pull request lifecycle and reviewer management

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::directory::{Directory, DirectoryError};
use crate::error::{Error, Result};
use crate::lifecycle::{self, MergeOutcome, PrStatus};
use crate::model::PullRequest;
use crate::policy::{self, AssignmentPolicy, TopUp};

use super::plan_stale_reviewers;

/// A PR after one reviewer was swapped out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub pr: PullRequest,
    pub replaced_by: String,
}

pub struct PullRequestService<D: Directory + ?Sized> {
    directory: Arc<D>,
    policy: Arc<AssignmentPolicy>,
}

impl<D: Directory + ?Sized> PullRequestService<D> {
    pub fn new(directory: Arc<D>, policy: Arc<AssignmentPolicy>) -> Self {
        Self { directory, policy }
    }

    pub async fn get(&self, pr_id: &str) -> Result<PullRequest> {
        Ok(self.directory.get_pr(pr_id).await?)
    }

    /// Open a PR and assign its initial reviewers
    ///
    /// Reviewers are drawn at random from the author's active teammates, up
    /// to the configured cap. A team too small to fill the cap is fine.
    pub async fn create(&self, pr_id: &str, name: &str, author_id: &str) -> Result<PullRequest> {
        let author = self.directory.get_user(author_id).await?;

        match self.directory.get_pr(pr_id).await {
            Ok(_) => return Err(Error::AlreadyExists(format!("pull request {}", pr_id))),
            Err(DirectoryError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let teammates = self
            .directory
            .get_active_teammates(&author.team_name, &author.id)
            .await?;
        let reviewers = self.policy.initial_reviewers(&author, &teammates);

        let pr = self
            .directory
            .create_pr(&PullRequest::open(pr_id, name, author_id, reviewers))
            .await?;
        tracing::info!(pr_id = %pr.id, author = %pr.author_id, reviewers = ?pr.reviewers, "Created pull request");
        Ok(pr)
    }

    /// Merge a PR; merging twice returns the stored PR unchanged
    pub async fn merge(&self, pr_id: &str) -> Result<PullRequest> {
        let pr = self.directory.get_pr(pr_id).await?;

        match lifecycle::merge(&pr, Utc::now()) {
            MergeOutcome::AlreadyMerged => {
                tracing::debug!(pr_id = %pr.id, "Pull request already merged");
                Ok(pr)
            }
            MergeOutcome::Merge { merged_at } => {
                let pr = self
                    .directory
                    .update_pr_status(pr_id, PrStatus::Merged, Some(merged_at))
                    .await?;
                tracing::info!(pr_id = %pr.id, "Merged pull request");
                Ok(pr)
            }
        }
    }

    /// Replace `old_id` on an open PR with a random active teammate of theirs
    ///
    /// Errors, in order of precedence: `InvalidState` for a merged PR,
    /// `NotAssigned` when `old_id` is not a reviewer, `NoCandidate` when the
    /// outgoing reviewer's team has nobody free.
    ///
    /// Other reviewers who went inactive are repaired before the swap.
    pub async fn reassign(&self, pr_id: &str, old_id: &str) -> Result<Reassignment> {
        let pr = self.directory.get_pr(pr_id).await?;
        policy::check_replaceable(&pr, old_id)?;
        let pr = self.repair_stale(pr, Some(old_id)).await?;

        let old = self.directory.get_user(old_id).await?;
        let pool = self
            .directory
            .get_active_teammates(&old.team_name, &old.id)
            .await?;
        let new_id = self.policy.replace_one(&pr, old_id, &pool)?;

        let pr = match self
            .directory
            .swap_reviewer(pr_id, old_id, Some(&new_id))
            .await
        {
            Ok(pr) => pr,
            Err(DirectoryError::NotFound(what)) => {
                if self.still_assigned(pr_id, old_id).await {
                    return Err(Error::NotFound(what));
                }
                // Removed by a concurrent writer since we read the PR
                return Err(Error::NotAssigned {
                    pr_id: pr_id.to_string(),
                    user_id: old_id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(pr_id = %pr.id, old = %old_id, new = %new_id, "Reassigned reviewer");
        Ok(Reassignment {
            pr,
            replaced_by: new_id,
        })
    }

    /// Fill free reviewer slots up to the cap
    ///
    /// Inactive reviewers still listed on the PR are repaired first. A PR at
    /// the cap, or with nobody eligible, comes back unchanged without writes.
    pub async fn auto_assign(&self, pr_id: &str) -> Result<PullRequest> {
        let pr = self.directory.get_pr(pr_id).await?;
        lifecycle::ensure_mutable(&pr)?;
        let pr = self.repair_stale(pr, None).await?;

        let author = self.directory.get_user(&pr.author_id).await?;
        let pool = self
            .directory
            .get_active_teammates(&author.team_name, &author.id)
            .await?;

        match self.policy.top_up(&pr, &pool)? {
            TopUp::Full => {
                tracing::debug!(pr_id = %pr.id, reviewers = pr.reviewers.len(), "Reviewer slots already full");
                Ok(pr)
            }
            TopUp::NoCandidates => {
                tracing::info!(pr_id = %pr.id, "No candidates to fill reviewer slots");
                Ok(pr)
            }
            TopUp::Add(new_ids) => {
                let pr = self
                    .directory
                    .add_reviewers(pr_id, &new_ids, self.policy.max_reviewers())
                    .await?;
                tracing::info!(pr_id = %pr.id, picked = ?new_ids, reviewers = ?pr.reviewers, "Assigned additional reviewers");
                Ok(pr)
            }
        }
    }

    /// Replace reviewers of an open PR who are no longer active
    ///
    /// Each stale slot goes to the first free active member of the stale
    /// reviewer's team, or is vacated. All slots of the PR are written in
    /// one unit.
    pub async fn repair(&self, pr_id: &str) -> Result<PullRequest> {
        let pr = self.directory.get_pr(pr_id).await?;
        lifecycle::ensure_mutable(&pr)?;
        self.repair_stale(pr, None).await
    }

    /// Replace inactive reviewers of `pr` other than `keep`
    async fn repair_stale(&self, pr: PullRequest, keep: Option<&str>) -> Result<PullRequest> {
        let mut stale = Vec::new();
        for reviewer in &pr.reviewers {
            if keep == Some(reviewer.as_str()) {
                continue;
            }
            let user = self.directory.get_user(reviewer).await?;
            if !user.is_active {
                stale.push(user);
            }
        }
        if stale.is_empty() {
            return Ok(pr);
        }

        let plan = plan_stale_reviewers(self.directory.as_ref(), &pr, &stale).await?;
        self.directory.batch_swap_reviewers(&plan).await?;
        tracing::warn!(
            pr_id = %pr.id,
            replaced = plan.replacement_count(),
            vacated = plan.vacancy_count(),
            "Repaired inactive reviewers"
        );
        Ok(self.directory.get_pr(&pr.id).await?)
    }

    async fn still_assigned(&self, pr_id: &str, user_id: &str) -> bool {
        self.directory
            .get_pr(pr_id)
            .await
            .map(|pr| pr.has_reviewer(user_id))
            .unwrap_or(true)
    }
}
