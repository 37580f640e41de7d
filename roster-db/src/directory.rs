//! SQLite-backed [`Directory`]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use roster_core::{
    Directory, DirectoryResult, PrStatus, PullRequest, PullRequestSummary, ReassignmentPlan,
    ReviewerStat, Team, User,
};

use crate::Database;

#[async_trait]
impl Directory for Database {
    async fn create_team(&self, team_name: &str) -> DirectoryResult<()> {
        Ok(self.teams().create(team_name).await?)
    }

    async fn get_team(&self, team_name: &str) -> DirectoryResult<Team> {
        Ok(self.teams().get(team_name).await?)
    }

    async fn team_exists(&self, team_name: &str) -> DirectoryResult<bool> {
        Ok(self.teams().exists(team_name).await?)
    }

    async fn upsert_user(&self, user: &User) -> DirectoryResult<()> {
        Ok(self.users().upsert(user).await?)
    }

    async fn get_user(&self, user_id: &str) -> DirectoryResult<User> {
        Ok(self.users().get(user_id).await?)
    }

    async fn set_user_active(&self, user_id: &str, is_active: bool) -> DirectoryResult<User> {
        Ok(self.users().set_active(user_id, is_active).await?)
    }

    async fn get_active_teammates(
        &self,
        team_name: &str,
        exclude_id: &str,
    ) -> DirectoryResult<Vec<User>> {
        Ok(self.users().active_teammates(team_name, exclude_id).await?)
    }

    async fn get_users_by_team(&self, team_name: &str) -> DirectoryResult<Vec<User>> {
        Ok(self.users().by_team(team_name).await?)
    }

    async fn deactivate_users(&self, user_ids: &[String]) -> DirectoryResult<Vec<User>> {
        Ok(self.users().deactivate_many(user_ids).await?)
    }

    async fn create_pr(&self, pr: &PullRequest) -> DirectoryResult<PullRequest> {
        Ok(self.pull_requests().create(pr).await?)
    }

    async fn get_pr(&self, pr_id: &str) -> DirectoryResult<PullRequest> {
        Ok(self.pull_requests().get(pr_id).await?)
    }

    async fn update_pr_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> DirectoryResult<PullRequest> {
        Ok(self
            .pull_requests()
            .update_status(pr_id, status, merged_at)
            .await?)
    }

    async fn add_reviewers(
        &self,
        pr_id: &str,
        user_ids: &[String],
        max_reviewers: usize,
    ) -> DirectoryResult<PullRequest> {
        Ok(self
            .pull_requests()
            .add_reviewers(pr_id, user_ids, max_reviewers)
            .await?)
    }

    async fn swap_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: Option<&str>,
    ) -> DirectoryResult<PullRequest> {
        Ok(self
            .pull_requests()
            .swap_reviewer(pr_id, old_id, new_id)
            .await?)
    }

    async fn batch_swap_reviewers(&self, plan: &ReassignmentPlan) -> DirectoryResult<()> {
        Ok(self.pull_requests().batch_swap(plan).await?)
    }

    async fn get_open_prs_by_reviewers(
        &self,
        user_ids: &[String],
    ) -> DirectoryResult<Vec<PullRequest>> {
        Ok(self.pull_requests().open_by_reviewers(user_ids).await?)
    }

    async fn get_prs_by_reviewer(&self, user_id: &str) -> DirectoryResult<Vec<PullRequestSummary>> {
        Ok(self.pull_requests().by_reviewer(user_id).await?)
    }

    async fn reviewer_stats(&self) -> DirectoryResult<Vec<ReviewerStat>> {
        Ok(self.users().reviewer_stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use roster_core::{
        AssignmentPolicy, DirectoryError, Error, ReviewerSelector, Services, TeamMember,
    };

    use super::*;
    use crate::test_db;

    async fn services(ids: &[&str]) -> (Arc<Database>, Services<Database>) {
        let db = Arc::new(test_db().await);
        let policy = Arc::new(AssignmentPolicy::new(2, ReviewerSelector::seeded(5)));
        let services = Services::new(Arc::clone(&db), policy);
        services
            .teams
            .create_team(
                "backend",
                ids.iter()
                    .map(|id| TeamMember::new(*id, id.to_uppercase(), true))
                    .collect(),
            )
            .await
            .unwrap();
        (db, services)
    }

    #[tokio::test]
    async fn test_directory_errors_surface_as_kinds() {
        let db = test_db().await;
        assert!(matches!(
            db.get_user("ghost").await,
            Err(DirectoryError::NotFound(_))
        ));
        db.create_team("backend").await.unwrap();
        assert!(matches!(
            db.create_team("backend").await,
            Err(DirectoryError::DuplicateKey(_))
        ));
    }

    #[tokio::test]
    async fn test_cascade_over_sqlite() {
        let (db, services) = services(&["u1", "u2", "u3", "u4", "u5"]).await;
        for (id, author, reviewers) in [("pr-1", "u1", vec!["u2", "u3"]), ("pr-2", "u4", vec!["u2"])] {
            db.create_pr(&PullRequest::open(
                id,
                "Feature",
                author,
                reviewers.into_iter().map(String::from).collect(),
            ))
            .await
            .unwrap();
        }

        let report = services
            .users
            .deactivate_team_users("backend", &["u2".to_string(), "u3".to_string()])
            .await
            .unwrap();

        assert_eq!(report.reassigned_count, 3);
        assert!(report.unrepaired_prs.is_empty());
        assert_eq!(db.get_pr("pr-1").await.unwrap().reviewers, vec!["u4", "u5"]);
        assert_eq!(db.get_pr("pr-2").await.unwrap().reviewers, vec!["u1"]);
        assert!(!db.get_user("u3").await.unwrap().is_active);
    }

    #[tokio::test]
    async fn test_pull_request_lifecycle_over_sqlite() {
        let (_db, services) = services(&["u1", "u2", "u3", "u4"]).await;
        let prs = &services.pull_requests;

        let pr = prs.create("pr-1", "Add search", "u1").await.unwrap();
        assert_eq!(pr.reviewers.len(), 2);

        let old = pr.reviewers[0].clone();
        let outcome = prs.reassign("pr-1", &old).await.unwrap();
        assert!(!outcome.pr.has_reviewer(&old));
        assert!(outcome.pr.has_reviewer(&outcome.replaced_by));
        assert!(!outcome.pr.has_reviewer("u1"));

        let merged = prs.merge("pr-1").await.unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        let again = prs.merge("pr-1").await.unwrap();
        assert_eq!(again.merged_at, merged.merged_at);

        let err = prs.reassign("pr-1", &outcome.replaced_by).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_stats_over_sqlite() {
        let (db, services) = services(&["u1", "u2", "u3"]).await;
        db.create_pr(&PullRequest::open("pr-1", "A", "u1", vec!["u2".into(), "u3".into()]))
            .await
            .unwrap();
        db.create_pr(&PullRequest::open("pr-2", "B", "u3", vec!["u2".into()]))
            .await
            .unwrap();

        let stats = services.users.reviewer_stats().await.unwrap();
        let counts: Vec<_> = stats
            .iter()
            .map(|s| (s.user_id.as_str(), s.assignments))
            .collect();
        assert_eq!(counts, vec![("u2", 2), ("u3", 1), ("u1", 0)]);
    }
}
