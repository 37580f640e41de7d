//! Directory-backed services
//!
//! Services load records from a [`Directory`], ask the assignment policy or
//! the cascade planner what should change, and write the answer back.

mod pull_requests;
mod teams;
mod users;

pub use pull_requests::{PullRequestService, Reassignment};
pub use teams::TeamService;
pub use users::{DeactivationReport, UserService};

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use crate::cascade::{CascadePlanner, ReassignmentPlan};
use crate::directory::Directory;
use crate::error::Result;
use crate::model::{PullRequest, User};
use crate::policy::AssignmentPolicy;

/// All services over one directory and one policy
pub struct Services<D: Directory + ?Sized> {
    pub teams: TeamService<D>,
    pub users: UserService<D>,
    pub pull_requests: PullRequestService<D>,
}

impl<D: Directory + ?Sized> Services<D> {
    pub fn new(directory: Arc<D>, policy: Arc<AssignmentPolicy>) -> Self {
        Self {
            teams: TeamService::new(Arc::clone(&directory)),
            users: UserService::new(Arc::clone(&directory)),
            pull_requests: PullRequestService::new(directory, policy),
        }
    }
}

/// Repair the open reviews of a user who was just deactivated
///
/// Each slot is swapped for the first free active teammate of `user`, or
/// vacated when there is none. Failures are logged and skipped; the returned
/// plan holds only the swaps that landed.
pub(crate) async fn repair_after_deactivation<D: Directory + ?Sized>(
    directory: &D,
    user: &User,
) -> ReassignmentPlan {
    let mut applied = ReassignmentPlan::new();

    let prs = match directory
        .get_open_prs_by_reviewers(std::slice::from_ref(&user.id))
        .await
    {
        Ok(prs) => prs,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to load open reviews of deactivated user");
            return applied;
        }
    };
    if prs.is_empty() {
        return applied;
    }

    let teammates = match directory
        .get_active_teammates(&user.team_name, &user.id)
        .await
    {
        Ok(users) => users,
        Err(e) => {
            tracing::warn!(user_id = %user.id, team = %user.team_name, error = %e, "Failed to load replacement candidates");
            return applied;
        }
    };

    let leaving = HashSet::from([user.id.clone()]);
    let planner = CascadePlanner::for_team(&teammates, &leaving);

    for pr in &prs {
        for (old_id, new_id) in planner.plan_pr(pr, &leaving) {
            match directory
                .swap_reviewer(&pr.id, &old_id, new_id.as_deref())
                .await
            {
                Ok(_) => {
                    match &new_id {
                        Some(new) => tracing::info!(pr_id = %pr.id, old = %old_id, new = %new, "Reassigned reviewer"),
                        None => tracing::warn!(pr_id = %pr.id, old = %old_id, "No available candidates, removing reviewer"),
                    }
                    applied.record(pr.id.clone(), old_id, new_id);
                }
                Err(e) => {
                    tracing::warn!(pr_id = %pr.id, old = %old_id, error = %e, "Failed to reassign reviewer");
                }
            }
        }
    }

    applied
}

/// Plan replacements for the `stale` reviewers of one PR
///
/// Each stale reviewer is replaced from their own team's active members.
/// Slots are planned against a working copy of the PR so replacements chosen
/// for one team are occupied for the next.
pub(crate) async fn plan_stale_reviewers<D: Directory + ?Sized>(
    directory: &D,
    pr: &PullRequest,
    stale: &[User],
) -> Result<ReassignmentPlan> {
    let mut by_team: BTreeMap<&str, HashSet<String>> = BTreeMap::new();
    for user in stale {
        by_team
            .entry(user.team_name.as_str())
            .or_default()
            .insert(user.id.clone());
    }

    let mut working = pr.clone();
    let mut plan = ReassignmentPlan::new();

    for (team, leaving) in by_team {
        let members = directory.get_users_by_team(team).await?;
        let planner = CascadePlanner::for_team(&members, &leaving);

        for (old_id, new_id) in planner.plan_pr(&working, &leaving) {
            working.reviewers.retain(|r| r != &old_id);
            if let Some(new_id) = &new_id {
                working.reviewers.push(new_id.clone());
            }
            plan.record(pr.id.clone(), old_id, new_id);
        }
    }

    Ok(plan)
}
