//! Pull request and reviewer slot repository

use std::str::FromStr;

use chrono::{DateTime, Utc};
use roster_core::{PrStatus, PullRequest, PullRequestSummary, ReassignmentPlan};
use sqlx::{SqliteConnection, SqlitePool};

use super::{placeholders, require_pr, require_user};
use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
struct PullRequestRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
}

impl PullRequestRow {
    fn into_pull_request(self, reviewers: Vec<String>) -> Result<PullRequest> {
        Ok(PullRequest {
            status: parse_status(&self.status)?,
            id: self.pull_request_id,
            name: self.pull_request_name,
            author_id: self.author_id,
            created_at: self.created_at,
            merged_at: self.merged_at,
            reviewers,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    pull_request_id: String,
    pull_request_name: String,
    author_id: String,
    status: String,
}

fn parse_status(raw: &str) -> Result<PrStatus> {
    PrStatus::from_str(raw)
        .map_err(|_| Error::InvalidData(format!("unknown pull request status {}", raw)))
}

const PR_COLUMNS: &str =
    "pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status, pr.created_at, pr.merged_at";

/// Repository for pull requests and their reviewer slots
pub struct PullRequestsRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> PullRequestsRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a PR with its reviewers in one transaction
    pub async fn create(&self, pr: &PullRequest) -> Result<PullRequest> {
        let mut tx = self.pool.begin().await?;

        require_user(&mut *tx, &pr.author_id).await?;
        for reviewer in &pr.reviewers {
            require_user(&mut *tx, reviewer).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO pull_requests (
                pull_request_id, pull_request_name, author_id, status, created_at, merged_at
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&pr.id)
        .bind(&pr.name)
        .bind(&pr.author_id)
        .bind(pr.status.as_str())
        .bind(pr.created_at)
        .bind(pr.merged_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::on_conflict(e, || format!("pull request {}", pr.id)))?;

        for reviewer in &pr.reviewers {
            insert_reviewer(&mut *tx, &pr.id, reviewer).await?;
        }

        let created = load(&mut *tx, &pr.id).await?;
        tx.commit().await?;

        tracing::debug!(pr_id = %created.id, reviewers = created.reviewers.len(), "Inserted pull request");
        Ok(created)
    }

    pub async fn get(&self, pr_id: &str) -> Result<PullRequest> {
        let mut conn = self.pool.acquire().await?;
        load(&mut *conn, pr_id).await
    }

    /// Store a new status; `merged_at` is only written when given
    pub async fn update_status(
        &self,
        pr_id: &str,
        status: PrStatus,
        merged_at: Option<DateTime<Utc>>,
    ) -> Result<PullRequest> {
        let result = sqlx::query(
            r#"
            UPDATE pull_requests
            SET status = ?, merged_at = COALESCE(?, merged_at)
            WHERE pull_request_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(merged_at)
        .bind(pr_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("pull request {}", pr_id)));
        }
        self.get(pr_id).await
    }

    /// Append eligible reviewers while the PR is under `max_reviewers`
    ///
    /// Writes come first in the transaction, so it holds the write lock
    /// while counting and concurrent callers queue behind it. Each insert
    /// re-counts the slots in the same statement.
    pub async fn add_reviewers(
        &self,
        pr_id: &str,
        user_ids: &[String],
        max_reviewers: usize,
    ) -> Result<PullRequest> {
        let max_reviewers = i64::try_from(max_reviewers).unwrap_or(i64::MAX);
        let mut tx = self.pool.begin().await?;

        for user_id in user_ids {
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO pr_reviewers (pull_request_id, user_id)
                SELECT pr.pull_request_id, u.user_id
                FROM pull_requests pr, users u
                WHERE pr.pull_request_id = ? AND u.user_id = ?
                  AND pr.status = 'OPEN'
                  AND u.is_active = 1
                  AND u.user_id <> pr.author_id
                  AND (SELECT COUNT(*) FROM pr_reviewers
                       WHERE pull_request_id = pr.pull_request_id) < ?
                "#,
            )
            .bind(pr_id)
            .bind(user_id)
            .bind(max_reviewers)
            .execute(&mut *tx)
            .await?;
        }

        require_pr(&mut *tx, pr_id).await?;
        for user_id in user_ids {
            require_user(&mut *tx, user_id).await?;
        }

        let pr = load(&mut *tx, pr_id).await?;
        tx.commit().await?;
        Ok(pr)
    }

    /// Remove `old_id` and add `new_id` in one transaction
    pub async fn swap_reviewer(
        &self,
        pr_id: &str,
        old_id: &str,
        new_id: Option<&str>,
    ) -> Result<PullRequest> {
        let mut tx = self.pool.begin().await?;

        require_pr(&mut *tx, pr_id).await?;
        if let Some(new_id) = new_id {
            require_user(&mut *tx, new_id).await?;
        }
        if !swap(&mut *tx, pr_id, old_id, new_id).await? {
            return Err(Error::NotFound(format!(
                "reviewer {} on pull request {}",
                old_id, pr_id
            )));
        }

        let pr = load(&mut *tx, pr_id).await?;
        tx.commit().await?;
        Ok(pr)
    }

    /// Apply a whole reassignment plan in one transaction
    ///
    /// Slots whose old reviewer is already gone are skipped. A replacement
    /// who is no longer eligible leaves the slot vacated.
    pub async fn batch_swap(&self, plan: &ReassignmentPlan) -> Result<()> {
        if plan.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        for pr_id in plan.pr_ids() {
            require_pr(&mut *tx, pr_id).await?;
        }
        for (pr_id, old_id, new_id) in plan.iter() {
            let new_id = match new_id {
                Some(id) => eligible(&mut *tx, pr_id, id).await?.then_some(id),
                None => None,
            };
            swap(&mut *tx, pr_id, old_id, new_id).await?;
        }
        tx.commit().await?;

        tracing::debug!(slots = plan.slot_count(), "Applied reassignment plan");
        Ok(())
    }

    /// Open PRs reviewed by any of `user_ids`, oldest first
    pub async fn open_by_reviewers(&self, user_ids: &[String]) -> Result<Vec<PullRequest>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            r#"
            SELECT DISTINCT {}
            FROM pull_requests pr
            JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
            WHERE pr.status = 'OPEN' AND r.user_id IN ({})
            ORDER BY pr.created_at ASC, pr.pull_request_id ASC
            "#,
            PR_COLUMNS,
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query_as::<_, PullRequestRow>(&sql);
        for user_id in user_ids {
            query = query.bind(user_id);
        }

        let mut conn = self.pool.acquire().await?;
        let rows = query.fetch_all(&mut *conn).await?;

        let mut prs = Vec::with_capacity(rows.len());
        for row in rows {
            let reviewers = reviewers_of(&mut *conn, &row.pull_request_id).await?;
            prs.push(row.into_pull_request(reviewers)?);
        }
        Ok(prs)
    }

    /// Every PR `user_id` reviews, newest first
    pub async fn by_reviewer(&self, user_id: &str) -> Result<Vec<PullRequestSummary>> {
        let rows = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT pr.pull_request_id, pr.pull_request_name, pr.author_id, pr.status
            FROM pull_requests pr
            JOIN pr_reviewers r ON r.pull_request_id = pr.pull_request_id
            WHERE r.user_id = ?
            ORDER BY pr.created_at DESC, pr.pull_request_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(PullRequestSummary {
                    status: parse_status(&row.status)?,
                    id: row.pull_request_id,
                    name: row.pull_request_name,
                    author_id: row.author_id,
                })
            })
            .collect()
    }
}

async fn load(conn: &mut SqliteConnection, pr_id: &str) -> Result<PullRequest> {
    let row = sqlx::query_as::<_, PullRequestRow>(&format!(
        "SELECT {} FROM pull_requests pr WHERE pr.pull_request_id = ?",
        PR_COLUMNS
    ))
    .bind(pr_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::RowNotFound => Error::NotFound(format!("pull request {}", pr_id)),
        e => e.into(),
    })?;

    let reviewers = reviewers_of(conn, pr_id).await?;
    row.into_pull_request(reviewers)
}

async fn reviewers_of(conn: &mut SqliteConnection, pr_id: &str) -> Result<Vec<String>> {
    Ok(sqlx::query_scalar(
        "SELECT user_id FROM pr_reviewers WHERE pull_request_id = ? ORDER BY id",
    )
    .bind(pr_id)
    .fetch_all(&mut *conn)
    .await?)
}

async fn insert_reviewer(conn: &mut SqliteConnection, pr_id: &str, user_id: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO pr_reviewers (pull_request_id, user_id) VALUES (?, ?)")
        .bind(pr_id)
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Whether `user_id` is active and not the author of `pr_id`
async fn eligible(conn: &mut SqliteConnection, pr_id: &str, user_id: &str) -> Result<bool> {
    require_user(&mut *conn, user_id).await?;
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM users u, pull_requests pr
        WHERE u.user_id = ? AND pr.pull_request_id = ?
          AND u.is_active = 1
          AND u.user_id <> pr.author_id
        "#,
    )
    .bind(user_id)
    .bind(pr_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(count > 0)
}

/// Returns false when `old_id` was not a reviewer; nothing is added then
async fn swap(
    conn: &mut SqliteConnection,
    pr_id: &str,
    old_id: &str,
    new_id: Option<&str>,
) -> Result<bool> {
    let removed = sqlx::query("DELETE FROM pr_reviewers WHERE pull_request_id = ? AND user_id = ?")
        .bind(pr_id)
        .bind(old_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    if removed == 0 {
        return Ok(false);
    }

    if let Some(new_id) = new_id {
        insert_reviewer(conn, pr_id, new_id).await?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_db, Database};
    use chrono::Duration;
    use roster_core::User;

    async fn seeded() -> Database {
        let db = test_db().await;
        db.teams().create("backend").await.unwrap();
        for id in ["u1", "u2", "u3", "u4"] {
            db.users()
                .upsert(&User::new(id, id.to_uppercase(), "backend"))
                .await
                .unwrap();
        }
        db
    }

    fn pr(id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest::open(
            id,
            format!("Feature {}", id),
            author,
            reviewers.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_create_and_get_keeps_reviewer_order() {
        let db = seeded().await;
        let created = db
            .pull_requests()
            .create(&pr("pr-1", "u1", &["u3", "u2"]))
            .await
            .unwrap();
        assert_eq!(created.reviewers, vec!["u3", "u2"]);
        assert_eq!(created.status, PrStatus::Open);

        let loaded = db.pull_requests().get("pr-1").await.unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_create_duplicate_and_unknown_users() {
        let db = seeded().await;
        db.pull_requests().create(&pr("pr-1", "u1", &[])).await.unwrap();

        let err = db.pull_requests().create(&pr("pr-1", "u1", &[])).await.unwrap_err();
        assert!(matches!(err, Error::Duplicate(_)));

        let err = db
            .pull_requests()
            .create(&pr("pr-2", "u1", &["ghost"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            db.pull_requests().get("pr-2").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_status_keeps_merged_at() {
        let db = seeded().await;
        db.pull_requests().create(&pr("pr-1", "u1", &[])).await.unwrap();

        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let merged = db
            .pull_requests()
            .update_status("pr-1", PrStatus::Merged, Some(now))
            .await
            .unwrap();
        assert_eq!(merged.status, PrStatus::Merged);
        assert_eq!(merged.merged_at, Some(now));

        let again = db
            .pull_requests()
            .update_status("pr-1", PrStatus::Merged, None)
            .await
            .unwrap();
        assert_eq!(again.merged_at, Some(now));
    }

    #[tokio::test]
    async fn test_swap_reviewer() {
        let db = seeded().await;
        db.pull_requests()
            .create(&pr("pr-1", "u1", &["u2", "u3"]))
            .await
            .unwrap();

        let swapped = db
            .pull_requests()
            .swap_reviewer("pr-1", "u2", Some("u4"))
            .await
            .unwrap();
        assert_eq!(swapped.reviewers, vec!["u3", "u4"]);

        let vacated = db
            .pull_requests()
            .swap_reviewer("pr-1", "u3", None)
            .await
            .unwrap();
        assert_eq!(vacated.reviewers, vec!["u4"]);

        let err = db
            .pull_requests()
            .swap_reviewer("pr-1", "u2", Some("u3"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(db.pull_requests().get("pr-1").await.unwrap().reviewers, vec!["u4"]);
    }

    #[tokio::test]
    async fn test_batch_swap_rolls_back_on_error() {
        let db = seeded().await;
        db.pull_requests()
            .create(&pr("pr-1", "u1", &["u2"]))
            .await
            .unwrap();

        let mut plan = ReassignmentPlan::new();
        plan.record("pr-1", "u2", Some("u3".to_string()));
        plan.record("pr-9", "u2", None);
        let err = db.pull_requests().batch_swap(&plan).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(db.pull_requests().get("pr-1").await.unwrap().reviewers, vec!["u2"]);

        let mut plan = ReassignmentPlan::new();
        plan.record("pr-1", "u2", Some("u3".to_string()));
        db.pull_requests().batch_swap(&plan).await.unwrap();
        assert_eq!(db.pull_requests().get("pr-1").await.unwrap().reviewers, vec!["u3"]);
    }

    #[tokio::test]
    async fn test_add_reviewers_enforces_cap_and_eligibility() {
        let db = seeded().await;
        db.pull_requests().create(&pr("pr-1", "u1", &[])).await.unwrap();
        db.users().set_active("u2", false).await.unwrap();

        let ids: Vec<String> = ["u1", "u2", "u3", "u4"].iter().map(|s| s.to_string()).collect();
        let repo = db.pull_requests();
        let (first, second) = tokio::join!(
            repo.add_reviewers("pr-1", &ids[2..], 1),
            repo.add_reviewers("pr-1", &ids, 1)
        );
        first.unwrap();
        second.unwrap();

        let stored = db.pull_requests().get("pr-1").await.unwrap();
        assert_eq!(stored.reviewers.len(), 1);
        assert!(stored.reviewers[0] == "u3" || stored.reviewers[0] == "u4");

        let err = db
            .pull_requests()
            .add_reviewers("pr-1", &["ghost".to_string()], 2)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(db.pull_requests().get("pr-1").await.unwrap().reviewers.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_swap_vacates_ineligible_replacement() {
        let db = seeded().await;
        db.pull_requests()
            .create(&pr("pr-1", "u1", &["u2", "u3"]))
            .await
            .unwrap();
        db.users().set_active("u4", false).await.unwrap();

        let mut plan = ReassignmentPlan::new();
        plan.record("pr-1", "u2", Some("u4".to_string()));
        plan.record("pr-1", "u3", Some("u1".to_string()));
        db.pull_requests().batch_swap(&plan).await.unwrap();

        assert!(db.pull_requests().get("pr-1").await.unwrap().reviewers.is_empty());
    }

    #[tokio::test]
    async fn test_listing_orders() {
        let db = seeded().await;
        let base = Utc::now();
        for (i, id) in ["pr-a", "pr-b", "pr-c"].iter().enumerate() {
            let mut p = pr(id, "u1", &["u2"]);
            p.created_at = base + Duration::seconds(i as i64);
            db.pull_requests().create(&p).await.unwrap();
        }
        db.pull_requests()
            .update_status("pr-b", PrStatus::Merged, Some(base))
            .await
            .unwrap();

        let open = db
            .pull_requests()
            .open_by_reviewers(&["u2".to_string(), "u3".to_string()])
            .await
            .unwrap();
        let ids: Vec<_> = open.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pr-a", "pr-c"]);

        let reviewed = db.pull_requests().by_reviewer("u2").await.unwrap();
        let ids: Vec<_> = reviewed.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pr-c", "pr-b", "pr-a"]);
        assert_eq!(reviewed[1].status, PrStatus::Merged);

        assert!(db.pull_requests().open_by_reviewers(&[]).await.unwrap().is_empty());
    }
}
