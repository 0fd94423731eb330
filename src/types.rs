use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when parsing an `owner/repo` string.
#[derive(Debug, Error, PartialEq)]
pub enum RepoError {
    #[error("repository must be in format 'owner/repo', got: '{0}'")]
    InvalidFormat(String),
    #[error("repository owner cannot be empty")]
    EmptyOwner,
    #[error("repository name cannot be empty")]
    EmptyName,
}

/// A GitHub repository identified by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    owner: String,
    name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, RepoError> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() {
            return Err(RepoError::EmptyOwner);
        }
        if name.is_empty() {
            return Err(RepoError::EmptyName);
        }
        Ok(Self { owner, name })
    }

    pub fn parse(repo: &str) -> Result<Self, RepoError> {
        let mut parts = repo.trim().split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) => Self::new(owner, name),
            _ => Err(RepoError::InvalidFormat(repo.to_string())),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for Repo {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// State of a submitted pull request review.
///
/// Parsing is case-insensitive: the REST API reports `approved`, GraphQL
/// reports `APPROVED`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    Other(String),
}

impl ReviewState {
    pub fn parse(state: &str) -> Self {
        match state.to_uppercase().as_str() {
            "APPROVED" => ReviewState::Approved,
            "CHANGES_REQUESTED" => ReviewState::ChangesRequested,
            "COMMENTED" => ReviewState::Commented,
            "DISMISSED" => ReviewState::Dismissed,
            "PENDING" => ReviewState::Pending,
            _ => ReviewState::Other(state.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ReviewState::Approved => "APPROVED",
            ReviewState::ChangesRequested => "CHANGES_REQUESTED",
            ReviewState::Commented => "COMMENTED",
            ReviewState::Dismissed => "DISMISSED",
            ReviewState::Pending => "PENDING",
            ReviewState::Other(state) => state,
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub state: ReviewState,
    pub submitted_at: Option<DateTime<Utc>>,
    pub author_login: Option<String>,
    pub body: Option<String>,
}

/// Most recent review per author, as deduplicated by GitHub.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestReview {
    pub state: ReviewState,
    pub author_login: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub author_login: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub path: String,
    pub additions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Queued,
    InProgress,
    Completed,
    Waiting,
    Pending,
    Requested,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Skipped,
    Stale,
    StartupFailure,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckRun {
    pub name: String,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
}

/// GitHub's branch-protection-derived aggregate review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    ChangesRequested,
    ReviewRequired,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectFieldOption {
    pub id: String,
    pub name: String,
}

/// A field in the project board schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectField {
    pub id: String,
    pub name: String,
    pub options: Vec<ProjectFieldOption>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectFieldValue {
    SingleSelect(Option<String>),
    Number(Option<f64>),
}

/// Current value of one field on the PR's board item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItemFieldValue {
    pub field_id: String,
    pub field_name: String,
    pub value: ProjectFieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectItem {
    pub id: String,
    pub field_values: Vec<ProjectItemFieldValue>,
}

/// Everything the decision engine needs to know about one pull request,
/// fetched once per run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrSnapshot {
    pub number: u64,
    pub title: String,
    pub is_draft: bool,
    pub author_login: Option<String>,
    pub review_decision: Option<ReviewDecision>,
    /// Labels in the order GitHub reports them.
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
    pub most_recent_assignment_at: Option<DateTime<Utc>>,
    pub head_commit_date: Option<DateTime<Utc>>,
    pub reviews: Vec<Review>,
    pub latest_reviews: Vec<LatestReview>,
    pub comments: Vec<Comment>,
    pub files: Vec<FileChange>,
    pub files_total_count: u64,
    pub check_runs: Vec<CheckRun>,
    pub project_id: Option<String>,
    pub project_fields: Vec<ProjectField>,
    pub project_item: Option<ProjectItem>,
}

impl PrSnapshot {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// The webhook event that triggered this run.
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    pub repo: Repo,
    pub issue_number: u64,
    pub event_name: String,
    pub action: Option<String>,
    pub actor: String,
    pub label_added: Option<String>,
    /// Raw review state from the webhook payload, lowercase (`changes_requested`).
    pub review_state: Option<String>,
}

impl EventContext {
    pub fn is_review_submission(&self) -> bool {
        self.event_name == "pull_request_review" && self.action.as_deref() == Some("submitted")
    }
}

/// Label reconciliation result. A label never appears in both sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelPlan {
    pub labels_to_add: BTreeSet<String>,
    pub labels_to_remove: BTreeSet<String>,
    pub status_label_to_sync: Option<String>,
}

impl LabelPlan {
    pub fn is_empty(&self) -> bool {
        self.labels_to_add.is_empty() && self.labels_to_remove.is_empty()
    }
}

/// Everything the apply layer should do for this run.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPlan {
    pub label_plan: LabelPlan,
    pub priority: i64,
    pub should_unassign: bool,
    pub assign_reviewer: Option<String>,
}

/// Fully collected input for one automation run.
#[derive(Debug, Clone)]
pub struct AutomationInput {
    pub event: EventContext,
    pub data: PrSnapshot,
    /// `None` when the reviewer team is not accessible.
    pub reviewer_logins: Option<BTreeSet<String>>,
    /// `None` when the maintainer team is not accessible.
    pub maintainer_logins: Option<BTreeSet<String>>,
    pub author_score: i64,
}
