//! User activity, bulk deactivation and review listings

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::cascade::CascadePlanner;
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::model::{PullRequestSummary, ReviewerStat, User};

use super::repair_after_deactivation;

/// Outcome of deactivating a batch of team members
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeactivationReport {
    /// Users as stored after deactivation
    pub users: Vec<User>,
    /// Reviewer slots the cascade planned, replaced or vacated
    pub reassigned_count: usize,
    /// Slots that got a new reviewer
    pub replaced: usize,
    /// Slots left empty for lack of candidates
    pub vacated: usize,
    /// PRs whose reviewers could not be written; the users stay inactive
    pub unrepaired_prs: Vec<String>,
}

pub struct UserService<D: Directory + ?Sized> {
    directory: Arc<D>,
}

impl<D: Directory + ?Sized> UserService<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Flip a user's active flag
    ///
    /// Deactivating a user repairs every open PR they still review: each
    /// slot goes to the first free active teammate, or is vacated. This runs
    /// even when the user was already inactive, which heals reviews left
    /// behind by an interrupted deactivation. Repair failures are logged and
    /// never fail the call.
    pub async fn set_user_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        let user = self.directory.set_user_active(user_id, is_active).await?;
        tracing::info!(user_id = %user.id, is_active, "Set user activity");

        if !user.is_active {
            let repaired = repair_after_deactivation(self.directory.as_ref(), &user).await;
            if !repaired.is_empty() {
                tracing::info!(
                    user_id = %user.id,
                    prs = repaired.pr_ids().count(),
                    slots = repaired.slot_count(),
                    "Repaired reviews of deactivated user"
                );
            }
        }

        Ok(user)
    }

    /// Deactivate several members of one team and cascade their reviews
    ///
    /// Replacements come from the team's members who stay active, scanned in
    /// user id order. If writing the reassignments fails the users remain
    /// deactivated and the affected PRs are listed in the report.
    pub async fn deactivate_team_users(
        &self,
        team_name: &str,
        user_ids: &[String],
    ) -> Result<DeactivationReport> {
        if user_ids.is_empty() {
            return Ok(DeactivationReport::default());
        }

        if !self.directory.team_exists(team_name).await? {
            return Err(Error::NotFound(format!("team {}", team_name)));
        }

        let members = self.directory.get_users_by_team(team_name).await?;
        let member_ids: HashSet<&str> = members.iter().map(|u| u.id.as_str()).collect();
        let ids: Vec<String> = user_ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if let Some(stranger) = ids.iter().find(|id| !member_ids.contains(id.as_str())) {
            return Err(Error::NotFound(format!(
                "user {} in team {}",
                stranger, team_name
            )));
        }

        let leaving: HashSet<String> = ids.iter().cloned().collect();
        let planner = CascadePlanner::for_team(&members, &leaving);
        let prs = self.directory.get_open_prs_by_reviewers(&ids).await?;
        let plan = planner.plan(&prs, &leaving);

        let users = self.directory.deactivate_users(&ids).await?;
        tracing::info!(team = %team_name, users = users.len(), open_prs = prs.len(), "Deactivated team members");

        let unrepaired_prs = match self.directory.batch_swap_reviewers(&plan).await {
            Ok(()) => Vec::new(),
            Err(e) => {
                tracing::warn!(team = %team_name, error = %e, "Failed to apply reviewer reassignments");
                plan.pr_ids().map(str::to_string).collect()
            }
        };

        let report = DeactivationReport {
            users,
            reassigned_count: plan.slot_count(),
            replaced: plan.replacement_count(),
            vacated: plan.vacancy_count(),
            unrepaired_prs,
        };
        tracing::info!(
            team = %team_name,
            reassigned = report.reassigned_count,
            vacated = report.vacated,
            "Cascade reassignment finished"
        );
        Ok(report)
    }

    /// PRs the user reviews, newest first
    pub async fn get_reviews(&self, user_id: &str) -> Result<Vec<PullRequestSummary>> {
        self.directory.get_user(user_id).await?;
        Ok(self.directory.get_prs_by_reviewer(user_id).await?)
    }

    /// Review counts per user, busiest first
    pub async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>> {
        Ok(self.directory.reviewer_stats().await?)
    }
}
