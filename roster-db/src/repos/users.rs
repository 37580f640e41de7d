//! User repository

use roster_core::{ReviewerStat, User};
use sqlx::SqlitePool;

use super::{placeholders, require_user};
use crate::{Error, Result};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRow {
    user_id: String,
    username: String,
    team_name: String,
    is_active: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.user_id,
            username: row.username,
            team_name: row.team_name,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StatRow {
    user_id: String,
    username: String,
    assignments: i64,
}

/// Repository for users and their active flags
pub struct UsersRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UsersRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert the user, or overwrite name, team and active flag
    pub async fn upsert(&self, user: &User) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let team: Option<String> =
            sqlx::query_scalar("SELECT team_name FROM teams WHERE team_name = ?")
                .bind(&user.team_name)
                .fetch_optional(&mut *tx)
                .await?;
        if team.is_none() {
            return Err(Error::NotFound(format!("team {}", user.team_name)));
        }

        sqlx::query(
            r#"
            INSERT INTO users (user_id, username, team_name, is_active)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                username = excluded.username,
                team_name = excluded.team_name,
                is_active = excluded.is_active
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.team_name)
        .bind(user.is_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<User> {
        sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map(User::from)
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => Error::NotFound(format!("user {}", user_id)),
            e => e.into(),
        })
    }

    /// Set the active flag and return the updated user
    pub async fn set_active(&self, user_id: &str, is_active: bool) -> Result<User> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE user_id = ?")
            .bind(is_active)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {}", user_id)));
        }
        self.get(user_id).await
    }

    /// Active members of a team except `exclude_id`, ordered by id
    pub async fn active_teammates(&self, team_name: &str, exclude_id: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_id, username, team_name, is_active
            FROM users
            WHERE team_name = ? AND is_active = 1 AND user_id != ?
            ORDER BY user_id
            "#,
        )
        .bind(team_name)
        .bind(exclude_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Every member of a team, ordered by id
    pub async fn by_team(&self, team_name: &str) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE team_name = ? ORDER BY user_id",
        )
        .bind(team_name)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Deactivate all listed users in one transaction
    ///
    /// Fails without changes if any user is missing.
    pub async fn deactivate_many(&self, user_ids: &[String]) -> Result<Vec<User>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await?;
        for user_id in user_ids {
            require_user(&mut *tx, user_id).await?;
            sqlx::query("UPDATE users SET is_active = 0 WHERE user_id = ?")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let sql = format!(
            "SELECT user_id, username, team_name, is_active FROM users WHERE user_id IN ({}) ORDER BY user_id",
            placeholders(user_ids.len())
        );
        let mut query = sqlx::query_as::<_, UserRow>(&sql);
        for user_id in user_ids {
            query = query.bind(user_id);
        }
        let rows = query.fetch_all(&mut *tx).await?;
        tx.commit().await?;

        tracing::debug!(count = rows.len(), "Deactivated users");
        Ok(rows.into_iter().map(User::from).collect())
    }

    /// Review assignments per user over all PRs, busiest first
    pub async fn reviewer_stats(&self) -> Result<Vec<ReviewerStat>> {
        let rows = sqlx::query_as::<_, StatRow>(
            r#"
            SELECT u.user_id, u.username, COUNT(r.id) AS assignments
            FROM users u
            LEFT JOIN pr_reviewers r ON r.user_id = u.user_id
            GROUP BY u.user_id, u.username
            ORDER BY assignments DESC, u.username ASC
            "#,
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewerStat {
                user_id: row.user_id,
                username: row.username,
                assignments: u64::try_from(row.assignments).unwrap_or_default(),
            })
            .collect())
    }
}
