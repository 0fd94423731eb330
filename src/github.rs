use std::{collections::BTreeSet, process::Command};

use anyhow::{Context, Result};
use async_trait::async_trait;
use octocrab::Octocrab;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::TeamRef,
    forge::{Forge, LabelRemoval},
    graphql::{
        AddDraftIssueData, GraphQLResponse, LEDGER_MAX_PAGES, LedgerItemsData, LedgerProjectData,
        PrAutomationData, UserData, add_draft_issue_mutation, ledger_board_from_response,
        ledger_items_query, ledger_page_from_response, ledger_project_query, pr_automation_query,
        snapshot_from_response, update_number_field_mutation, update_text_field_mutation,
        user_id_query,
    },
    ledger::{LedgerBoard, LedgerEntry, NewLedgerEntry},
    project::ProjectMutation,
    types::{PrSnapshot, Repo},
};

const TEAM_MEMBERS_PER_PAGE: u8 = 100;

pub fn get_github_token() -> Result<String> {
    // Actions runners export GITHUB_TOKEN; prefer it over spawning gh.
    for var in ["GITHUB_TOKEN", "GH_TOKEN"] {
        if let Some(token) = std::env::var(var).ok().filter(|t| !t.is_empty()) {
            return Ok(token);
        }
    }

    let output = Command::new("gh").args(["auth", "token"]).output()?;

    if !output.status.success() {
        anyhow::bail!("Failed to get GitHub token from gh CLI. Please run 'gh auth login' first");
    }

    let token = String::from_utf8(output.stdout)?.trim().to_string();

    if token.is_empty() {
        anyhow::bail!("Empty token returned from gh CLI");
    }

    Ok(token)
}

/// Creates an authenticated GitHub client using available credentials.
pub fn setup_github_client() -> Result<Octocrab> {
    let token = get_github_token().context("Failed to obtain GitHub authentication token")?;
    Octocrab::builder()
        .personal_token(token)
        .build()
        .context("Failed to create GitHub client")
}

fn is_not_found(err: &octocrab::Error) -> bool {
    matches!(err, octocrab::Error::GitHub { source, .. } if source.status_code.as_u16() == 404)
}

/// GitHub-backed forge using REST for labels, assignees and teams, and
/// GraphQL for everything project related.
pub struct GitHub {
    client: Octocrab,
}

impl GitHub {
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(setup_github_client()?))
    }

    async fn graphql<T: DeserializeOwned>(&self, request: &Value) -> Result<T> {
        let response: GraphQLResponse<T> = self.client.graphql(request).await?;
        response.into_data()
    }
}

#[async_trait]
impl Forge for GitHub {
    async fn fetch_snapshot(
        &self,
        repo: &Repo,
        number: u64,
        project_owner: &str,
        project_number: u64,
    ) -> Result<PrSnapshot> {
        let query = pr_automation_query(repo, number, project_owner, project_number);
        let data: PrAutomationData = self
            .graphql(&query)
            .await
            .with_context(|| format!("Failed to fetch PR {repo}#{number}"))?;
        snapshot_from_response(data, number)
    }

    async fn team_members(&self, team: &TeamRef) -> Result<Option<BTreeSet<String>>> {
        let first_page = match self
            .client
            .teams(&team.org)
            .members(&team.slug)
            .per_page(TEAM_MEMBERS_PER_PAGE)
            .send()
            .await
        {
            Ok(page) => page,
            Err(err) if is_not_found(&err) => {
                debug!("Team {team} not found or not visible");
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to list members of {team}"));
            }
        };

        let members = self
            .client
            .all_pages(first_page)
            .await
            .with_context(|| format!("Failed to list members of {team}"))?;

        Ok(Some(members.into_iter().map(|member| member.login).collect()))
    }

    async fn add_labels(&self, repo: &Repo, number: u64, labels: &[String]) -> Result<()> {
        self.client
            .issues(repo.owner(), repo.name())
            .add_labels(number, labels)
            .await
            .with_context(|| format!("Failed to add labels to {repo}#{number}"))?;
        Ok(())
    }

    async fn remove_label(&self, repo: &Repo, number: u64, label: &str) -> Result<LabelRemoval> {
        match self
            .client
            .issues(repo.owner(), repo.name())
            .remove_label(number, label)
            .await
        {
            Ok(_) => Ok(LabelRemoval::Removed),
            Err(err) if is_not_found(&err) => Ok(LabelRemoval::NotPresent),
            Err(err) => Err(err)
                .with_context(|| format!("Failed to remove label '{label}' from {repo}#{number}")),
        }
    }

    async fn add_assignees(&self, repo: &Repo, number: u64, assignees: &[String]) -> Result<()> {
        let assignees: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(repo.owner(), repo.name())
            .add_assignees(number, &assignees)
            .await
            .with_context(|| format!("Failed to assign {repo}#{number}"))?;
        Ok(())
    }

    async fn remove_assignees(
        &self,
        repo: &Repo,
        number: u64,
        assignees: &[String],
    ) -> Result<()> {
        let assignees: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(repo.owner(), repo.name())
            .remove_assignees(number, &assignees)
            .await
            .with_context(|| format!("Failed to unassign {repo}#{number}"))?;
        Ok(())
    }

    async fn update_project_fields(&self, mutation: &ProjectMutation) -> Result<()> {
        let _: Value = self
            .graphql(&mutation.to_request())
            .await
            .context("Failed to update project fields")?;
        Ok(())
    }

    async fn fetch_ledger_board(&self, org: &str, number: u64) -> Result<Option<LedgerBoard>> {
        let data: LedgerProjectData = self
            .graphql(&ledger_project_query(org, number))
            .await
            .context("Failed to fetch reviewer score ledger project")?;
        ledger_board_from_response(data)
    }

    async fn fetch_ledger_entries(&self, board: &LedgerBoard) -> Result<Vec<LedgerEntry>> {
        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..LEDGER_MAX_PAGES {
            let data: LedgerItemsData = self
                .graphql(&ledger_items_query(&board.project_id, cursor.as_deref()))
                .await
                .context("Failed to fetch reviewer score ledger items")?;
            let (page, next) = ledger_page_from_response(data);
            entries.extend(page);
            match next {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(entries)
    }

    async fn create_ledger_entry(&self, board: &LedgerBoard, entry: &NewLedgerEntry) -> Result<()> {
        let user: UserData = self.graphql(&user_id_query(&entry.reviewer)).await?;
        let user_id = user
            .user
            .and_then(|u| u.id)
            .with_context(|| format!("Could not find user ID for {}", entry.reviewer))?;

        let created: AddDraftIssueData = self
            .graphql(&add_draft_issue_mutation(
                &board.project_id,
                &entry.draft_title(),
                &user_id,
            ))
            .await
            .context("Failed to create ledger draft issue")?;
        let item_id = created
            .add_project_v2_draft_issue
            .project_item
            .id
            .context("Ledger draft issue was created without an item id")?;

        let _: Value = self
            .graphql(&update_number_field_mutation(
                &board.project_id,
                &item_id,
                &board.score_field_id,
                entry.score as f64,
            ))
            .await
            .context("Failed to set ledger score")?;
        let _: Value = self
            .graphql(&update_text_field_mutation(
                &board.project_id,
                &item_id,
                &board.pr_field_id,
                &entry.pr_ref,
            ))
            .await
            .context("Failed to set ledger pull request reference")?;

        Ok(())
    }
}
