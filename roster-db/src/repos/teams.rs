//! Team repository

use roster_core::{Team, TeamMember, User};
use sqlx::SqlitePool;

use super::users::UserRow;
use crate::{Error, Result};

/// Repository for teams and their rosters
pub struct TeamsRepo<'a> {
    pool: &'a SqlitePool,
}

impl<'a> TeamsRepo<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an empty team
    pub async fn create(&self, team_name: &str) -> Result<()> {
        sqlx::query("INSERT INTO teams (team_name) VALUES (?)")
            .bind(team_name)
            .execute(self.pool)
            .await
            .map_err(|e| Error::on_conflict(e, || format!("team {}", team_name)))?;
        tracing::debug!(team = %team_name, "Inserted team");
        Ok(())
    }

    pub async fn exists(&self, team_name: &str) -> Result<bool> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT team_name FROM teams WHERE team_name = ?")
                .bind(team_name)
                .fetch_optional(self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Team with its members ordered by user id
    pub async fn get(&self, team_name: &str) -> Result<Team> {
        if !self.exists(team_name).await? {
            return Err(Error::NotFound(format!("team {}", team_name)));
        }

        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT user_id, username, team_name, is_active FROM users WHERE team_name = ? ORDER BY user_id",
        )
        .bind(team_name)
        .fetch_all(self.pool)
        .await?;

        Ok(Team {
            name: team_name.to_string(),
            members: rows
                .into_iter()
                .map(|row| TeamMember::from(&User::from(row)))
                .collect(),
        })
    }
}
