//! Review statistics command

use clap::Args;
use roster_core::ReviewerStat;

use super::Context;

/// Show how many pull requests each user reviews
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Only show the busiest N users
    #[arg(short, long)]
    top: Option<usize>,
}

impl StatsArgs {
    /// Execute the stats command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let mut stats = ctx.services.users.reviewer_stats().await?;
        if let Some(top) = self.top {
            stats.truncate(top);
        }
        ctx.emit(&stats, |stats| print_stats(stats))
    }
}

fn print_stats(stats: &[ReviewerStat]) {
    if stats.is_empty() {
        println!("No users yet.");
        return;
    }
    println!("{:<12} {:<20} {:>7}", "USER", "USERNAME", "REVIEWS");
    for stat in stats {
        println!(
            "{:<12} {:<20} {:>7}",
            stat.user_id, stat.username, stat.assignments
        );
    }
}
