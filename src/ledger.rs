//! Reviewer score ledger.
//!
//! A separate project board keeps one draft item per reviewer and PR. Each
//! item is assigned to the reviewer and carries a numeric `Score` field and
//! a text `Pull Request` field holding `repo#number`. The sum of a login's
//! scores feeds into the priority of PRs they author.

use std::collections::BTreeSet;

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    forge::Forge,
    types::{EventContext, ReviewState},
};

pub const SCORE_FIELD_NAME: &str = "Score";
pub const PR_FIELD_NAME: &str = "Pull Request";

/// Ids needed to read from and write to the ledger board.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerBoard {
    pub project_id: String,
    pub score_field_id: String,
    pub pr_field_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub item_id: String,
    pub assignee_login: String,
    pub pr_ref: String,
    pub score: Option<f64>,
}

/// A ledger item about to be created for a submitted review.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub reviewer: String,
    pub score: i64,
    pub pr_ref: String,
    pub pr_title: String,
}

impl NewLedgerEntry {
    pub fn draft_title(&self) -> String {
        format!("Review: {}", self.pr_title)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOutcome {
    Created,
    AlreadyRecorded,
    BoardMissing,
}

pub fn review_score(state: &ReviewState) -> Option<i64> {
    match state {
        ReviewState::Approved => Some(2),
        ReviewState::ChangesRequested => Some(3),
        ReviewState::Commented => Some(1),
        _ => None,
    }
}

/// The entry a review submission earns, if any.
///
/// Only submitted reviews by a member of a known, non-empty reviewer team
/// with a scoring state count.
pub fn ledger_entry_for_review(
    event: &EventContext,
    reviewer_logins: Option<&BTreeSet<String>>,
    pr_title: &str,
) -> Option<NewLedgerEntry> {
    if !event.is_review_submission() {
        return None;
    }
    let reviewer_logins = reviewer_logins.filter(|logins| !logins.is_empty())?;
    if !reviewer_logins.contains(&event.actor) {
        return None;
    }
    let state = ReviewState::parse(event.review_state.as_deref()?);
    let score = review_score(&state)?;

    Some(NewLedgerEntry {
        reviewer: event.actor.clone(),
        score,
        pr_ref: format!("{}#{}", event.repo.name(), event.issue_number),
        pr_title: pr_title.to_string(),
    })
}

/// Sum of all ledger scores recorded for `login`.
pub fn total_score(entries: &[LedgerEntry], login: &str) -> i64 {
    entries
        .iter()
        .filter(|entry| entry.assignee_login == login)
        .map(|entry| entry.score.unwrap_or(0.0))
        .sum::<f64>()
        .round() as i64
}

/// Creates the ledger item unless the reviewer already has one for this PR.
pub async fn record_review<F>(
    forge: &F,
    org: &str,
    ledger_number: u64,
    entry: &NewLedgerEntry,
) -> Result<LedgerOutcome>
where
    F: Forge + Sync,
{
    let Some(board) = forge.fetch_ledger_board(org, ledger_number).await? else {
        return Ok(LedgerOutcome::BoardMissing);
    };

    let entries = forge.fetch_ledger_entries(&board).await?;
    if entries
        .iter()
        .any(|existing| existing.pr_ref == entry.pr_ref && existing.assignee_login == entry.reviewer)
    {
        return Ok(LedgerOutcome::AlreadyRecorded);
    }

    forge.create_ledger_entry(&board, entry).await?;
    Ok(LedgerOutcome::Created)
}

/// Records the review in the ledger. Failures are logged and swallowed so
/// the rest of the automation still runs.
pub async fn update_reviewer_score_ledger<F>(
    forge: &F,
    event: &EventContext,
    ledger_number: u64,
    reviewer_logins: Option<&BTreeSet<String>>,
    pr_title: &str,
) where
    F: Forge + Sync,
{
    let Some(entry) = ledger_entry_for_review(event, reviewer_logins, pr_title) else {
        return;
    };
    info!(
        "Reviewer: {}, Review: {}, Score: +{}",
        entry.reviewer,
        event.review_state.as_deref().unwrap_or_default().to_uppercase(),
        entry.score
    );

    match record_review(forge, event.repo.owner(), ledger_number, &entry).await {
        Ok(LedgerOutcome::Created) => info!(
            "Created ledger entry: {} +{} for {}",
            entry.reviewer, entry.score, entry.pr_ref
        ),
        Ok(LedgerOutcome::AlreadyRecorded) => {
            info!("Entry already exists for {} on {}", entry.reviewer, entry.pr_ref)
        }
        Ok(LedgerOutcome::BoardMissing) => {
            warn!("Reviewer score ledger project not found, skipping")
        }
        Err(err) => warn!("Failed to update reviewer score ledger: {err:#}"),
    }
}

async fn fetch_all_entries<F>(forge: &F, org: &str, ledger_number: u64) -> Result<Vec<LedgerEntry>>
where
    F: Forge + Sync,
{
    match forge.fetch_ledger_board(org, ledger_number).await? {
        Some(board) => forge.fetch_ledger_entries(&board).await,
        None => Ok(Vec::new()),
    }
}

/// Total ledger score for `login`, or 0 if the ledger cannot be read.
pub async fn reviewer_score<F>(forge: &F, org: &str, ledger_number: u64, login: &str) -> i64
where
    F: Forge + Sync,
{
    match fetch_all_entries(forge, org, ledger_number).await {
        Ok(entries) => total_score(&entries, login),
        Err(err) => {
            warn!("Failed to get reviewer score for {login}: {err:#}");
            0
        }
    }
}
