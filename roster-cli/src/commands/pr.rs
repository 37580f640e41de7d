//! Pull request commands

use clap::{Args, Subcommand};
use roster_core::Reassignment;

use super::{print_pull_request, Context};

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// Open a pull request and assign reviewers from the author's team
    Create {
        /// Pull request id
        pr_id: String,

        /// Pull request title
        name: String,

        /// Author user id
        #[arg(short, long)]
        author: String,
    },

    /// Show a pull request
    Show {
        /// Pull request id
        pr_id: String,
    },

    /// Mark a pull request merged
    Merge {
        /// Pull request id
        pr_id: String,
    },

    /// Replace one reviewer with a teammate of theirs
    Reassign {
        /// Pull request id
        pr_id: String,

        /// Reviewer to replace
        #[arg(long)]
        old: String,
    },

    /// Fill free reviewer slots up to the cap
    AutoAssign {
        /// Pull request id
        pr_id: String,
    },

    /// Replace reviewers who are no longer active
    Repair {
        /// Pull request id
        pr_id: String,
    },
}

impl PrArgs {
    /// Execute the pull request command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let prs = &ctx.services.pull_requests;
        let pr = match &self.command {
            PrCommand::Create {
                pr_id,
                name,
                author,
            } => prs.create(pr_id, name, author).await?,
            PrCommand::Show { pr_id } => prs.get(pr_id).await?,
            PrCommand::Merge { pr_id } => prs.merge(pr_id).await?,
            PrCommand::Reassign { pr_id, old } => {
                let outcome = prs.reassign(pr_id, old).await?;
                return ctx.emit(&outcome, print_reassignment);
            }
            PrCommand::AutoAssign { pr_id } => prs.auto_assign(pr_id).await?,
            PrCommand::Repair { pr_id } => prs.repair(pr_id).await?,
        };
        ctx.emit(&pr, print_pull_request)
    }
}

fn print_reassignment(outcome: &Reassignment) {
    println!("Replaced by {}", outcome.replaced_by);
    print_pull_request(&outcome.pr);
}
