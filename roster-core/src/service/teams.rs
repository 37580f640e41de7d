//! Team roster management

use std::sync::Arc;

use crate::directory::{Directory, DirectoryError};
use crate::error::{Error, Result};
use crate::model::{Team, TeamMember, User};

use super::repair_after_deactivation;

pub struct TeamService<D: Directory + ?Sized> {
    directory: Arc<D>,
}

impl<D: Directory + ?Sized> TeamService<D> {
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Create a team with its initial roster
    ///
    /// Members that already exist elsewhere move into the new team.
    pub async fn create_team(&self, team_name: &str, members: Vec<TeamMember>) -> Result<Team> {
        if self.directory.team_exists(team_name).await? {
            return Err(Error::AlreadyExists(format!("team {}", team_name)));
        }

        self.directory.create_team(team_name).await?;
        for member in members {
            self.directory
                .upsert_user(&member.into_user(team_name))
                .await?;
        }

        let team = self.directory.get_team(team_name).await?;
        tracing::info!(team = %team.name, members = team.members.len(), "Created team");
        Ok(team)
    }

    /// Upsert members of an existing team
    ///
    /// An existing member listed as inactive has their open reviews
    /// repaired, as with [`UserService::set_user_active`].
    ///
    /// [`UserService::set_user_active`]: super::UserService::set_user_active
    pub async fn update_team(&self, team_name: &str, members: Vec<TeamMember>) -> Result<Team> {
        if !self.directory.team_exists(team_name).await? {
            return Err(Error::NotFound(format!("team {}", team_name)));
        }

        for member in members {
            let previous = self.existing_user(&member.user_id).await?;
            let user = member.into_user(team_name);
            self.directory.upsert_user(&user).await?;

            if previous.is_some() && !user.is_active {
                let repaired = repair_after_deactivation(self.directory.as_ref(), &user).await;
                if !repaired.is_empty() {
                    tracing::info!(user_id = %user.id, slots = repaired.slot_count(), "Repaired reviews of member deactivated by roster update");
                }
            }
        }

        let team = self.directory.get_team(team_name).await?;
        tracing::info!(team = %team.name, members = team.members.len(), "Updated team");
        Ok(team)
    }

    pub async fn get_team(&self, team_name: &str) -> Result<Team> {
        Ok(self.directory.get_team(team_name).await?)
    }

    async fn existing_user(&self, user_id: &str) -> Result<Option<User>> {
        match self.directory.get_user(user_id).await {
            Ok(user) => Ok(Some(user)),
            Err(DirectoryError::NotFound(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
