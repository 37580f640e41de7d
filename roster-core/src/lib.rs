//! Roster Core - reviewer assignment engine
//!
//! This crate picks code reviewers for pull requests inside teams and keeps
//! those assignments consistent as people go inactive and PRs get merged.
//! Storage is abstracted behind the [`Directory`] trait.

pub mod cascade;
pub mod config;
pub mod directory;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod model;
pub mod policy;
pub mod selector;
pub mod service;

pub use cascade::{CascadePlanner, ReassignmentPlan};
pub use config::{AssignmentConfig, Config, DatabaseSettings};
pub use directory::{Directory, DirectoryError, DirectoryResult};
pub use error::{Error, Result};
pub use lifecycle::PrStatus;
pub use memory::InMemoryDirectory;
pub use model::{PullRequest, PullRequestSummary, ReviewerStat, Team, TeamMember, User};
pub use policy::{AssignmentPolicy, TopUp, DEFAULT_MAX_REVIEWERS};
pub use selector::{select, ReviewerSelector};
pub use service::{
    DeactivationReport, PullRequestService, Reassignment, Services, TeamService, UserService,
};
