//! Repositories over the connection pool

pub mod pull_requests;
pub mod teams;
pub mod users;

pub use pull_requests::PullRequestsRepo;
pub use teams::TeamsRepo;
pub use users::UsersRepo;

use sqlx::SqliteConnection;

use crate::{Error, Result};

/// `?, ?, ?` for an IN list of `count` values
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Fail with `NotFound` unless the user exists
pub(crate) async fn require_user(conn: &mut SqliteConnection, user_id: &str) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    if count == 0 {
        return Err(Error::NotFound(format!("user {}", user_id)));
    }
    Ok(())
}

/// Fail with `NotFound` unless the pull request exists
pub(crate) async fn require_pr(conn: &mut SqliteConnection, pr_id: &str) -> Result<()> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM pull_requests WHERE pull_request_id = ?")
            .bind(pr_id)
            .fetch_one(&mut *conn)
            .await?;
    if count == 0 {
        return Err(Error::NotFound(format!("pull request {}", pr_id)));
    }
    Ok(())
}
