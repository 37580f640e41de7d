//! User commands

use clap::{ArgAction, Args, Subcommand};
use roster_core::{DeactivationReport, PullRequestSummary, User};

use super::Context;

/// User management commands
#[derive(Args, Debug)]
pub struct UserArgs {
    #[command(subcommand)]
    pub command: UserCommand,
}

#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Activate or deactivate a user; deactivation hands their open reviews on
    SetActive {
        /// User id
        user_id: String,

        /// New state (true or false)
        #[arg(action = ArgAction::Set)]
        is_active: bool,
    },

    /// Deactivate several members of a team and reassign their reviews
    Deactivate {
        /// Team the users belong to
        #[arg(short, long)]
        team: String,

        /// User ids to deactivate
        #[arg(required = true)]
        user_ids: Vec<String>,
    },

    /// List pull requests a user reviews, newest first
    Reviews {
        /// User id
        user_id: String,
    },
}

impl UserArgs {
    /// Execute the user command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let users = &ctx.services.users;
        match &self.command {
            UserCommand::SetActive { user_id, is_active } => {
                let user = users.set_user_active(user_id, *is_active).await?;
                ctx.emit(&user, print_user)
            }
            UserCommand::Deactivate { team, user_ids } => {
                let report = users.deactivate_team_users(team, user_ids).await?;
                ctx.emit(&report, print_report)
            }
            UserCommand::Reviews { user_id } => {
                let reviews = users.get_reviews(user_id).await?;
                ctx.emit(&reviews, |reviews| print_reviews(user_id, reviews))
            }
        }
    }
}

fn print_user(user: &User) {
    let state = if user.is_active { "active" } else { "inactive" };
    println!("{} ({}) in {}: {}", user.id, user.username, user.team_name, state);
}

fn print_report(report: &DeactivationReport) {
    println!("Deactivated {} user(s)", report.users.len());
    println!(
        "Reassigned {} reviewer slot(s): {} replaced, {} left empty",
        report.reassigned_count, report.replaced, report.vacated
    );
    if !report.unrepaired_prs.is_empty() {
        println!(
            "Could not update reviewers of: {}",
            report.unrepaired_prs.join(", ")
        );
        println!("Run `roster pr repair <id>` for each to retry");
    }
}

fn print_reviews(user_id: &str, reviews: &[PullRequestSummary]) {
    if reviews.is_empty() {
        println!("{} reviews no pull requests", user_id);
        return;
    }
    println!("Pull requests reviewed by {}:", user_id);
    for pr in reviews {
        println!("  {:<12} {:<8} {} (by {})", pr.id, pr.status, pr.name, pr.author_id);
    }
}
