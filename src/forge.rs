use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    config::TeamRef,
    ledger::{LedgerBoard, LedgerEntry, NewLedgerEntry},
    project::ProjectMutation,
    types::{PrSnapshot, Repo},
};

/// Outcome of removing a label that may already be gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelRemoval {
    Removed,
    NotPresent,
}

/// Everything the automation reads from or writes to the code forge.
///
/// `GitHub` is the production implementation; tests substitute an
/// in-memory forge.
#[async_trait]
pub trait Forge {
    /// Loads the PR together with the configured project board.
    async fn fetch_snapshot(
        &self,
        repo: &Repo,
        number: u64,
        project_owner: &str,
        project_number: u64,
    ) -> Result<PrSnapshot>;

    /// Logins of the team's members, or `None` when the team does not exist
    /// or is not visible to the token.
    async fn team_members(&self, team: &TeamRef) -> Result<Option<BTreeSet<String>>>;

    async fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()>;

    async fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<LabelRemoval>;

    async fn add_assignees(&self, repo: &Repo, number: u64, assignees: &[String]) -> Result<()>;

    async fn remove_assignees(&self, repo: &Repo, number: u64, assignees: &[String])
    -> Result<()>;

    async fn update_project_fields(&self, mutation: &ProjectMutation) -> Result<()>;

    /// Locates the ledger board, or `None` if it or its fields are missing.
    async fn fetch_ledger_board(&self, org: &str, number: u64) -> Result<Option<LedgerBoard>>;

    async fn fetch_ledger_entries(&self, board: &LedgerBoard) -> Result<Vec<LedgerEntry>>;

    async fn create_ledger_entry(&self, board: &LedgerBoard, entry: &NewLedgerEntry)
    -> Result<()>;
}
