//! Pull request review automation.
//!
//! Given one pull request event, decides which size, status and
//! reviewer-approved labels the PR should carry, how urgently it needs
//! review, whether a stale reviewer assignment should be dropped and
//! whether a maintainer requesting changes should be assigned. The plan is
//! then applied to GitHub and mirrored onto a project board.

pub mod apply;
pub mod cli;
pub mod config;
pub mod engine;
pub mod forge;
pub mod github;
pub mod graphql;
pub mod ledger;
pub mod logic;
pub mod project;
pub mod types;

pub use apply::{ProjectSync, apply_output, collect_input, run, sync_project_fields};
pub use cli::{Invocation, parse_args};
pub use config::{Config, PriorityParams, SizeLabelConfig, StatusLabels, TeamRef, Threshold};
pub use engine::plan_automation;
pub use forge::{Forge, LabelRemoval};
pub use github::GitHub;
pub use ledger::{LedgerBoard, LedgerEntry, NewLedgerEntry};
pub use project::{ProjectMutation, ProjectUpdate};
pub use types::{
    AutomationInput, CheckConclusion, CheckRun, CheckStatus, Comment, EventContext, FileChange,
    LabelPlan, LatestReview, OutputPlan, PrSnapshot, ProjectField, ProjectFieldOption,
    ProjectFieldValue, ProjectItem, ProjectItemFieldValue, Repo, RepoError, Review,
    ReviewDecision, ReviewState,
};
