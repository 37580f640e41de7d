//! CLI command implementations

pub mod pr;
pub mod stats;
pub mod team;
pub mod user;

pub use pr::PrArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

use std::sync::Arc;

use anyhow::Context as _;
use roster_core::{AssignmentPolicy, Config, PullRequest, ReviewerSelector, Services};
use roster_db::{Database, DatabaseConfig};
use serde::Serialize;

/// Open database and services shared by the data commands
pub struct Context {
    pub services: Services<Database>,
    json: bool,
}

impl Context {
    pub async fn open(config: &Config, json: bool) -> anyhow::Result<Self> {
        let path = config.database.resolved_path()?;
        let db = Database::connect(
            DatabaseConfig::new(&path).with_max_connections(config.database.max_connections),
        )
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
        db.migrate().await.context("Failed to prepare database schema")?;

        let policy = AssignmentPolicy::new(
            config.assignment.max_reviewers,
            ReviewerSelector::with_seed(config.assignment.seed),
        );

        Ok(Self {
            services: Services::new(Arc::new(db), Arc::new(policy)),
            json,
        })
    }

    /// Print `value` as JSON, or with `human` otherwise
    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

pub(crate) fn print_pull_request(pr: &PullRequest) {
    println!("{} [{}] {}", pr.id, pr.status, pr.name);
    println!("  author: {}", pr.author_id);
    if pr.reviewers.is_empty() {
        println!("  reviewers: (none)");
    } else {
        println!("  reviewers: {}", pr.reviewers.join(", "));
    }
    println!("  created: {}", pr.created_at.to_rfc3339());
    if let Some(merged_at) = pr.merged_at {
        println!("  merged: {}", merged_at.to_rfc3339());
    }
}
