//! Team management commands

use clap::{Args, Subcommand};
use roster_core::{Team, TeamMember};

use super::Context;

/// Team management commands
#[derive(Args, Debug)]
pub struct TeamArgs {
    #[command(subcommand)]
    pub command: TeamCommand,
}

#[derive(Subcommand, Debug)]
pub enum TeamCommand {
    /// Create a team with its members
    Add {
        /// Team name
        name: String,

        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Add or update members of an existing team
    Update {
        /// Team name
        name: String,

        #[command(flatten)]
        roster: RosterArgs,
    },

    /// Show a team and its members
    Show {
        /// Team name
        name: String,
    },
}

#[derive(Args, Debug)]
pub struct RosterArgs {
    /// Member as ID:USERNAME (repeatable)
    #[arg(short, long = "member", value_parser = parse_member)]
    members: Vec<(String, String)>,

    /// Member ids to store as inactive
    #[arg(long, num_args = 1..)]
    inactive: Vec<String>,
}

impl RosterArgs {
    fn to_members(&self) -> Vec<TeamMember> {
        self.members
            .iter()
            .map(|(id, username)| {
                TeamMember::new(id.clone(), username.clone(), !self.inactive.contains(id))
            })
            .collect()
    }
}

fn parse_member(raw: &str) -> Result<(String, String), String> {
    match raw.split_once(':') {
        Some((id, username)) if !id.is_empty() && !username.is_empty() => {
            Ok((id.to_string(), username.to_string()))
        }
        _ => Err(format!("expected ID:USERNAME, got '{}'", raw)),
    }
}

impl TeamArgs {
    /// Execute the team command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let teams = &ctx.services.teams;
        let team = match &self.command {
            TeamCommand::Add { name, roster } => {
                teams.create_team(name, roster.to_members()).await?
            }
            TeamCommand::Update { name, roster } => {
                teams.update_team(name, roster.to_members()).await?
            }
            TeamCommand::Show { name } => teams.get_team(name).await?,
        };
        ctx.emit(&team, print_team)
    }
}

fn print_team(team: &Team) {
    println!("Team {} ({} members)", team.name, team.members.len());
    for member in &team.members {
        let state = if member.is_active { "active" } else { "inactive" };
        println!("  {:<12} {:<20} {}", member.user_id, member.username, state);
    }
}
