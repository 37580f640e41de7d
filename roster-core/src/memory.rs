//! In-memory implementation of [`Directory`].
//!
//! All records live in one map set behind a `RwLock`, so every call is a
//! single atomic unit. State is lost when the value is dropped.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cascade::ReassignmentPlan;
use crate::directory::{Directory, DirectoryError, DirectoryResult};
use crate::lifecycle::PrStatus;
use crate::model::{PullRequest, PullRequestSummary, ReviewerStat, Team, TeamMember, User};

#[derive(Debug, Default)]
struct State {
    teams: BTreeSet<String>,
    users: BTreeMap<String, User>,
    prs: BTreeMap<String, PullRequest>,
}

impl State {
    fn pr(&self, pr_id: &str) -> DirectoryResult<&PullRequest> {
        self.prs
            .get(pr_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("pull request {}", pr_id)))
    }

    fn pr_mut(&mut self, pr_id: &str) -> DirectoryResult<&mut PullRequest> {
        self.prs
            .get_mut(pr_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("pull request {}", pr_id)))
    }

    fn require_user(&self, user_id: &str) -> DirectoryResult<&User> {
        self.users
            .get(user_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("user {}", user_id)))
    }
}

/// In-memory directory.
///
/// Used by tests and as a scratch store; counts mutating calls so callers
/// can assert that an operation wrote nothing.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: RwLock<State>,
    writes: AtomicU64,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mutating calls served so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn swap_in(pr: &mut PullRequest, old_id: &str, new_id: Option<&str>) -> bool {
    let Some(pos) = pr.reviewers.iter().position(|r| r == old_id) else {
        return false;
    };
    pr.reviewers.remove(pos);
    if let Some(new_id) = new_id {
        if !pr.has_reviewer(new_id) {
            pr.reviewers.push(new_id.to_string());
        }
    }
    true
}

#[async_trait]
impl Directory for InMemoryDirectory {
    async fn create_team(&self, team_name: &str) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if !state.teams.insert(team_name.to_string()) {
            return Err(DirectoryError::DuplicateKey(format!("team {}", team_name)));
        }
        self.record_write();
        Ok(())
    }

    async fn get_team(&self, team_name: &str) -> DirectoryResult<Team> {
        let state = self.state.read().await;
        if !state.teams.contains(team_name) {
            return Err(DirectoryError::NotFound(format!("team {}", team_name)));
        }
        Ok(Team {
            name: team_name.to_string(),
            members: state
                .users
                .values()
                .filter(|u| u.team_name == team_name)
                .map(TeamMember::from)
                .collect(),
        })
    }

    async fn team_exists(&self, team_name: &str) -> DirectoryResult<bool> {
        Ok(self.state.read().await.teams.contains(team_name))
    }

    async fn upsert_user(&self, user: &User) -> DirectoryResult<()> {
        let mut state = self.state.write().await;
        if !state.teams.contains(&user.team_name) {
            return Err(DirectoryError::NotFound(format!("team {}", user.team_name)));
        }
        state.users.insert(user.id.clone(), user.clone());
        self.record_write();
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> DirectoryResult<User> {
        self.state.read().await.require_user(user_id).cloned()
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> DirectoryResult<User> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| DirectoryError::NotFound(format!("user {}", user_id)))?;
        user.is_active = is_active;
        let user = user.clone();
        self.record_write();
        Ok(user)
    }

    async fn get_active_teammates(
        &self,
        team_name: &str,
        exclude_id: &str,
    ) -> DirectoryResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.team_name == team_name && u.is_active && u.id != exclude_id)
            .cloned()
            .collect())
    }

    async fn get_users_by_team(&self, team_name: &str) -> DirectoryResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| u.team_name == team_name)
            .cloned()
            .collect())
    }

    async fn deactivate_users(&self, user_ids: &[String]) -> DirectoryResult<Vec<User>> {
        let mut state = self.state.write().await;
        for id in user_ids {
            state.require_user(id)?;
        }

        let ids: BTreeSet<&String> = user_ids.iter().collect();
        let mut updated = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = state.users.get_mut(id) {
                user.is_active = false;
                updated.push(user.clone());
            }
        }
        self.record_write();
        Ok(updated)
    }

    async fn create_pr(&self, pr: &PullRequest) -> DirectoryResult<PullRequest> {
        let mut state = self.state.write().await;
        if state.prs.contains_key(&pr.id) {
            return Err(DirectoryError::DuplicateKey(format!("pull request {}", pr.id)));
        }
        state.require_user(&pr.author_id)?;
        for reviewer in &pr.reviewers {
            state.require_user(reviewer)?;
        }

        let mut stored = pr.clone();
        let mut seen = HashSet::new();
        stored.reviewers.retain(|r| seen.insert(r.clone()));
        state.prs.insert(stored.id.clone(), stored.clone());
        self.record_write();
        Ok(stored)
    }

    async fn get_pr(&self, pr_id: &str) -> DirectoryResult<PullRequest> {
        self.state.read().await.pr(pr_id).cloned()
    }

    async fn update_pr_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<PullRequest> {
        let mut state = self.state.write().await;
        let pr = state.pr_mut(pr_id)?;
        pr.status = status;
        if merged_at.is_some() {
            pr.merged_at = merged_at;
        }
        let pr = pr.clone();
        self.record_write();
        Ok(pr)
    }

    async fn add_reviewers(
        &self,
        pr_id: &str,
        user_ids: &[String],
        max_reviewers: usize,
    ) -> DirectoryResult<PullRequest> {
        let mut state = self.state.write().await;
        state.pr(pr_id)?;
        let mut active = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if state.require_user(id)?.is_active {
                active.push(id.clone());
            }
        }

        let pr = state.pr_mut(pr_id)?;
        let mut added = false;
        if pr.is_open() {
            for id in active {
                if pr.reviewers.len() >= max_reviewers {
                    break;
                }
                if id != pr.author_id && !pr.has_reviewer(&id) {
                    pr.reviewers.push(id);
                    added = true;
                }
            }
        }
        let pr = pr.clone();
        if added {
            self.record_write();
        }
        Ok(pr)
    }

    async fn swap_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: Option<&str>,
    ) -> DirectoryResult<PullRequest> {
        let mut state = self.state.write().await;
        if let Some(new_id) = new_id {
            state.require_user(new_id)?;
        }
        let pr = state.pr_mut(pr_id)?;
        if !swap_in(pr, old_id, new_id) {
            return Err(DirectoryError::NotFound(format!(
                "reviewer {} on pull request {}",
                old_id, pr_id
            )));
        }
        let pr = pr.clone();
        self.record_write();
        Ok(pr)
    }

    async fn batch_swap_reviewers(&self, plan: &ReassignmentPlan) -> DirectoryResult<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let mut state = self.state.write().await;

        // Stage on copies; the store only changes once every swap applies.
        let mut staged = BTreeMap::new();
        for pr_id in plan.pr_ids() {
            staged.insert(pr_id.to_string(), state.pr(pr_id)?.clone());
        }
        for (pr_id, old_id, new_id) in plan.iter() {
            let new_id = match new_id {
                Some(id) => state.require_user(id)?.is_active.then_some(id),
                None => None,
            };
            if let Some(pr) = staged.get_mut(pr_id) {
                let new_id = new_id.filter(|id| *id != pr.author_id);
                swap_in(pr, old_id, new_id);
            }
        }

        state.prs.extend(staged);
        self.record_write();
        Ok(())
    }

    async fn get_open_prs_by_reviewers(
        &self,
        user_ids: &[String],
    ) -> DirectoryResult<Vec<PullRequest>> {
        let state = self.state.read().await;
        let mut prs: Vec<PullRequest> = state
            .prs
            .values()
            .filter(|pr| pr.is_open() && user_ids.iter().any(|id| pr.has_reviewer(id)))
            .cloned()
            .collect();
        prs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(prs)
    }

    async fn get_prs_by_reviewer(&self, user_id: &str) -> DirectoryResult<Vec<PullRequestSummary>> {
        let state = self.state.read().await;
        let mut prs: Vec<&PullRequest> = state
            .prs
            .values()
            .filter(|pr| pr.has_reviewer(user_id))
            .collect();
        prs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(prs.into_iter().map(PullRequest::summary).collect())
    }

    async fn reviewer_stats(&self) -> DirectoryResult<Vec<ReviewerStat>> {
        let state = self.state.read().await;
        let mut stats: Vec<ReviewerStat> = state
            .users
            .values()
            .map(|u| ReviewerStat {
                user_id: u.id.clone(),
                username: u.username.clone(),
                assignments: state.prs.values().filter(|pr| pr.has_reviewer(&u.id)).count() as u64,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.assignments
                .cmp(&a.assignments)
                .then_with(|| a.username.cmp(&b.username))
        });
        Ok(stats)
    }
}
