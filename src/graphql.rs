//! GraphQL documents and response shapes.
//!
//! Raw `Raw*` types mirror the wire format, where nearly every field is
//! nullable and unmatched inline fragments arrive as empty objects. The
//! mapping functions turn them into the validated types the rest of the
//! crate works with.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    ledger::{LedgerBoard, LedgerEntry, PR_FIELD_NAME, SCORE_FIELD_NAME},
    types::{
        CheckConclusion, CheckRun, CheckStatus, Comment, FileChange, LatestReview, PrSnapshot,
        ProjectField, ProjectFieldOption, ProjectFieldValue, ProjectItem, ProjectItemFieldValue,
        Repo, Review, ReviewDecision, ReviewState,
    },
};

/// Upper bound on ledger pages read per run (100 items each).
pub const LEDGER_MAX_PAGES: usize = 10;

const PR_AUTOMATION_QUERY: &str = r#"
    query(
        $owner: String!
        $repo: String!
        $issueNumber: Int!
        $projectOwner: String!
        $projectNumber: Int!
    ) {
        repository(owner: $owner, name: $repo) {
            pullRequest(number: $issueNumber) {
                number
                title
                isDraft
                reviewDecision
                author {
                    login
                }
                commits(last: 1) {
                    nodes {
                        commit {
                            committedDate
                            checkSuites(first: 100) {
                                nodes {
                                    checkRuns(first: 100) {
                                        nodes {
                                            name
                                            status
                                            conclusion
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                assignees(first: 100) {
                    nodes {
                        login
                    }
                }
                labels(first: 100) {
                    nodes {
                        name
                    }
                }
                timelineItems(last: 10, itemTypes: [ASSIGNED_EVENT]) {
                    nodes {
                        __typename
                        ... on AssignedEvent {
                            createdAt
                            assignee {
                                ... on User {
                                    login
                                }
                                ... on Bot {
                                    login
                                }
                            }
                        }
                    }
                }
                reviews(first: 100) {
                    nodes {
                        state
                        submittedAt
                        body
                        author {
                            login
                        }
                    }
                }
                latestReviews(first: 100) {
                    nodes {
                        state
                        author {
                            login
                        }
                    }
                }
                comments(last: 100) {
                    nodes {
                        createdAt
                        author {
                            login
                        }
                    }
                }
                files(first: 100) {
                    totalCount
                    nodes {
                        path
                        additions
                    }
                }
                projectItems(first: 100) {
                    nodes {
                        id
                        project {
                            id
                        }
                        fieldValues(first: 100) {
                            nodes {
                                __typename
                                ... on ProjectV2ItemFieldSingleSelectValue {
                                    name
                                    field {
                                        ... on ProjectV2SingleSelectField {
                                            id
                                            name
                                            options {
                                                id
                                                name
                                            }
                                        }
                                    }
                                }
                                ... on ProjectV2ItemFieldNumberValue {
                                    number
                                    field {
                                        ... on ProjectV2Field {
                                            id
                                            name
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        organization(login: $projectOwner) {
            projectV2(number: $projectNumber) {
                id
                fields(first: 100) {
                    nodes {
                        ... on ProjectV2SingleSelectField {
                            id
                            name
                            options {
                                id
                                name
                            }
                        }
                        ... on ProjectV2Field {
                            id
                            name
                        }
                    }
                }
            }
        }
    }
"#;

const LEDGER_PROJECT_QUERY: &str = r#"
    query($org: String!, $number: Int!) {
        organization(login: $org) {
            projectV2(number: $number) {
                id
                fields(first: 20) {
                    nodes {
                        ... on ProjectV2Field {
                            id
                            name
                        }
                        ... on ProjectV2SingleSelectField {
                            id
                            name
                        }
                    }
                }
            }
        }
    }
"#;

const LEDGER_ITEMS_QUERY: &str = r#"
    query($projectId: ID!, $cursor: String) {
        node(id: $projectId) {
            ... on ProjectV2 {
                items(first: 100, after: $cursor) {
                    pageInfo {
                        hasNextPage
                        endCursor
                    }
                    nodes {
                        id
                        fieldValues(first: 10) {
                            nodes {
                                ... on ProjectV2ItemFieldTextValue {
                                    text
                                    field {
                                        ... on ProjectV2Field {
                                            name
                                        }
                                    }
                                }
                                ... on ProjectV2ItemFieldNumberValue {
                                    number
                                    field {
                                        ... on ProjectV2Field {
                                            name
                                        }
                                    }
                                }
                            }
                        }
                        content {
                            ... on DraftIssue {
                                assignees(first: 1) {
                                    nodes {
                                        login
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
"#;

const USER_ID_QUERY: &str = r#"
    query($login: String!) {
        user(login: $login) {
            id
        }
    }
"#;

const ADD_DRAFT_ISSUE_MUTATION: &str = r#"
    mutation($projectId: ID!, $title: String!, $assigneeIds: [ID!]) {
        addProjectV2DraftIssue(input: {
            projectId: $projectId
            title: $title
            assigneeIds: $assigneeIds
        }) {
            projectItem {
                id
            }
        }
    }
"#;

const UPDATE_NUMBER_FIELD_MUTATION: &str = r#"
    mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: Float!) {
        updateProjectV2ItemFieldValue(input: {
            projectId: $projectId
            itemId: $itemId
            fieldId: $fieldId
            value: { number: $value }
        }) {
            projectV2Item {
                id
            }
        }
    }
"#;

const UPDATE_TEXT_FIELD_MUTATION: &str = r#"
    mutation($projectId: ID!, $itemId: ID!, $fieldId: ID!, $value: String!) {
        updateProjectV2ItemFieldValue(input: {
            projectId: $projectId
            itemId: $itemId
            fieldId: $fieldId
            value: { text: $value }
        }) {
            projectV2Item {
                id
            }
        }
    }
"#;

pub fn pr_automation_query(
    repo: &Repo,
    number: u64,
    project_owner: &str,
    project_number: u64,
) -> Value {
    json!({
        "query": PR_AUTOMATION_QUERY,
        "variables": {
            "owner": repo.owner(),
            "repo": repo.name(),
            "issueNumber": number,
            "projectOwner": project_owner,
            "projectNumber": project_number,
        }
    })
}

pub fn ledger_project_query(org: &str, number: u64) -> Value {
    json!({
        "query": LEDGER_PROJECT_QUERY,
        "variables": { "org": org, "number": number }
    })
}

pub fn ledger_items_query(project_id: &str, cursor: Option<&str>) -> Value {
    json!({
        "query": LEDGER_ITEMS_QUERY,
        "variables": { "projectId": project_id, "cursor": cursor }
    })
}

pub fn user_id_query(login: &str) -> Value {
    json!({
        "query": USER_ID_QUERY,
        "variables": { "login": login }
    })
}

pub fn add_draft_issue_mutation(project_id: &str, title: &str, assignee_id: &str) -> Value {
    json!({
        "query": ADD_DRAFT_ISSUE_MUTATION,
        "variables": {
            "projectId": project_id,
            "title": title,
            "assigneeIds": [assignee_id],
        }
    })
}

pub fn update_number_field_mutation(
    project_id: &str,
    item_id: &str,
    field_id: &str,
    value: f64,
) -> Value {
    json!({
        "query": UPDATE_NUMBER_FIELD_MUTATION,
        "variables": {
            "projectId": project_id,
            "itemId": item_id,
            "fieldId": field_id,
            "value": value,
        }
    })
}

pub fn update_text_field_mutation(
    project_id: &str,
    item_id: &str,
    field_id: &str,
    value: &str,
) -> Value {
    json!({
        "query": UPDATE_TEXT_FIELD_MUTATION,
        "variables": {
            "projectId": project_id,
            "itemId": item_id,
            "fieldId": field_id,
            "value": value,
        }
    })
}

/// Top-level GraphQL envelope. GitHub answers 200 even when the query
/// fails, so `errors` has to be checked explicitly.
#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
}

impl<T> GraphQLResponse<T> {
    pub fn into_data(self) -> Result<T> {
        if let Some(errors) = self.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            bail!("GraphQL request failed: {}", messages.join("; "));
        }
        self.data.context("GraphQL response contained no data")
    }
}

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

fn nodes<T>(connection: Option<Connection<T>>) -> impl Iterator<Item = T> {
    connection
        .and_then(|c| c.nodes)
        .into_iter()
        .flatten()
        .flatten()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawActor {
    pub login: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawId {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLabel {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCheckRun {
    pub name: Option<String>,
    pub status: Option<CheckStatus>,
    pub conclusion: Option<CheckConclusion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCheckSuite {
    pub check_runs: Option<Connection<RawCheckRun>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCommit {
    pub committed_date: Option<DateTime<Utc>>,
    pub check_suites: Option<Connection<RawCheckSuite>>,
}

#[derive(Debug, Deserialize)]
pub struct RawCommitNode {
    pub commit: Option<RawCommit>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAssignedEvent {
    pub created_at: DateTime<Utc>,
    pub assignee: Option<RawActor>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawTimelineItem {
    AssignedEvent(RawAssignedEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub state: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub body: Option<String>,
    pub author: Option<RawActor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawComment {
    pub created_at: Option<DateTime<Utc>>,
    pub author: Option<RawActor>,
}

#[derive(Debug, Deserialize)]
pub struct RawFile {
    pub path: Option<String>,
    pub additions: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFileConnection {
    pub total_count: Option<u64>,
    pub nodes: Option<Vec<Option<RawFile>>>,
}

#[derive(Debug, Deserialize)]
pub struct RawFieldOption {
    pub id: String,
    pub name: String,
}

/// A project field. Field types the query has no fragment for come back as
/// `{}` and are dropped during mapping.
#[derive(Debug, Deserialize)]
pub struct RawProjectField {
    pub id: Option<String>,
    pub name: Option<String>,
    pub options: Option<Vec<RawFieldOption>>,
}

#[derive(Debug, Deserialize)]
pub struct RawSingleSelectValue {
    pub name: Option<String>,
    pub field: Option<RawProjectField>,
}

#[derive(Debug, Deserialize)]
pub struct RawNumberValue {
    pub number: Option<f64>,
    pub field: Option<RawProjectField>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
pub enum RawItemFieldValue {
    #[serde(rename = "ProjectV2ItemFieldSingleSelectValue")]
    SingleSelect(RawSingleSelectValue),
    #[serde(rename = "ProjectV2ItemFieldNumberValue")]
    Number(RawNumberValue),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProjectItem {
    pub id: String,
    pub project: Option<RawId>,
    pub field_values: Option<Connection<RawItemFieldValue>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPullRequest {
    pub number: u64,
    pub title: String,
    pub is_draft: Option<bool>,
    pub review_decision: Option<ReviewDecision>,
    pub author: Option<RawActor>,
    pub commits: Option<Connection<RawCommitNode>>,
    pub assignees: Option<Connection<RawActor>>,
    pub labels: Option<Connection<RawLabel>>,
    pub timeline_items: Option<Connection<RawTimelineItem>>,
    pub reviews: Option<Connection<RawReview>>,
    pub latest_reviews: Option<Connection<RawReview>>,
    pub comments: Option<Connection<RawComment>>,
    pub files: Option<RawFileConnection>,
    pub project_items: Option<Connection<RawProjectItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRepository {
    pub pull_request: Option<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
pub struct RawProject {
    pub id: String,
    pub fields: Option<Connection<RawProjectField>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrganization {
    pub project_v2: Option<RawProject>,
}

#[derive(Debug, Deserialize)]
pub struct PrAutomationData {
    pub repository: Option<RawRepository>,
    pub organization: Option<RawOrganization>,
}

fn map_project_field(field: RawProjectField) -> Option<ProjectField> {
    Some(ProjectField {
        id: field.id?,
        name: field.name?,
        options: field
            .options
            .unwrap_or_default()
            .into_iter()
            .map(|option| ProjectFieldOption {
                id: option.id,
                name: option.name,
            })
            .collect(),
    })
}

fn map_item_field_value(value: RawItemFieldValue) -> Option<ProjectItemFieldValue> {
    let (field, value) = match value {
        RawItemFieldValue::SingleSelect(v) => (v.field?, ProjectFieldValue::SingleSelect(v.name)),
        RawItemFieldValue::Number(v) => (v.field?, ProjectFieldValue::Number(v.number)),
        RawItemFieldValue::Other => return None,
    };
    Some(ProjectItemFieldValue {
        field_id: field.id?,
        field_name: field.name?,
        value,
    })
}

/// Time of the latest assignment of someone who is still assigned.
/// Timeline nodes arrive oldest first.
fn find_most_recent_assignment(
    timeline: &[RawTimelineItem],
    assignees: &[String],
) -> Option<DateTime<Utc>> {
    if assignees.is_empty() {
        return None;
    }
    timeline.iter().rev().find_map(|item| match item {
        RawTimelineItem::AssignedEvent(event) => event
            .assignee
            .as_ref()
            .and_then(|a| a.login.as_ref())
            .filter(|login| assignees.contains(login))
            .map(|_| event.created_at),
        RawTimelineItem::Other => None,
    })
}

fn login(actor: Option<RawActor>) -> Option<String> {
    actor.and_then(|a| a.login)
}

/// Maps the PR automation query result into a snapshot.
pub fn snapshot_from_response(data: PrAutomationData, number: u64) -> Result<PrSnapshot> {
    let pr = data
        .repository
        .and_then(|r| r.pull_request)
        .with_context(|| format!("Failed to load PR #{number}"))?;

    let project = data.organization.and_then(|o| o.project_v2);
    let project_id = project.as_ref().map(|p| p.id.clone());
    let project_fields = project
        .map(|p| nodes(p.fields).filter_map(map_project_field).collect())
        .unwrap_or_default();

    let project_item = project_id.as_ref().and_then(|project_id| {
        nodes(pr.project_items)
            .find(|item| {
                item.project
                    .as_ref()
                    .and_then(|p| p.id.as_ref())
                    .is_some_and(|id| id == project_id)
            })
            .map(|item| ProjectItem {
                id: item.id,
                field_values: nodes(item.field_values)
                    .filter_map(map_item_field_value)
                    .collect(),
            })
    });

    let assignees: Vec<String> = nodes(pr.assignees).filter_map(|a| a.login).collect();
    let timeline: Vec<RawTimelineItem> = nodes(pr.timeline_items).collect();
    let most_recent_assignment_at = find_most_recent_assignment(&timeline, &assignees);

    let head_commit = nodes(pr.commits).next().and_then(|node| node.commit);
    let head_commit_date = head_commit.as_ref().and_then(|c| c.committed_date);
    let check_runs = head_commit
        .map(|commit| {
            nodes(commit.check_suites)
                .flat_map(|suite| nodes(suite.check_runs))
                .map(|run| CheckRun {
                    name: run.name.unwrap_or_default(),
                    status: run.status.unwrap_or(CheckStatus::Pending),
                    conclusion: run.conclusion,
                })
                .collect()
        })
        .unwrap_or_default();

    let reviews = nodes(pr.reviews)
        .map(|review| Review {
            state: ReviewState::parse(review.state.as_deref().unwrap_or_default()),
            submitted_at: review.submitted_at,
            author_login: login(review.author),
            body: review.body,
        })
        .collect();

    let latest_reviews = nodes(pr.latest_reviews)
        .map(|review| LatestReview {
            state: ReviewState::parse(review.state.as_deref().unwrap_or_default()),
            author_login: login(review.author),
        })
        .collect();

    let comments = nodes(pr.comments)
        .map(|comment| Comment {
            author_login: login(comment.author),
            created_at: comment.created_at,
        })
        .collect();

    let (files, files_total_count) = match pr.files {
        Some(files) => (
            files
                .nodes
                .into_iter()
                .flatten()
                .flatten()
                .map(|file| FileChange {
                    path: file.path.unwrap_or_default(),
                    additions: file.additions.unwrap_or(0),
                })
                .collect(),
            files.total_count.unwrap_or(0),
        ),
        None => (Vec::new(), 0),
    };

    Ok(PrSnapshot {
        number: pr.number,
        title: pr.title,
        is_draft: pr.is_draft.unwrap_or(false),
        author_login: login(pr.author),
        review_decision: pr.review_decision,
        labels: nodes(pr.labels).filter_map(|l| l.name).collect(),
        assignees,
        most_recent_assignment_at,
        head_commit_date,
        reviews,
        latest_reviews,
        comments,
        files,
        files_total_count,
        check_runs,
        project_id,
        project_fields,
        project_item,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerProjectData {
    pub organization: Option<RawOrganization>,
}

/// Extracts the ledger board ids. `None` means the board does not exist; a
/// board without its `Score` or `Pull Request` field is an error.
pub fn ledger_board_from_response(data: LedgerProjectData) -> Result<Option<LedgerBoard>> {
    let Some(project) = data.organization.and_then(|o| o.project_v2) else {
        return Ok(None);
    };
    let fields: Vec<ProjectField> = nodes(project.fields).filter_map(map_project_field).collect();
    let field_id = |name: &str| {
        fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| field.id.clone())
    };

    match (field_id(SCORE_FIELD_NAME), field_id(PR_FIELD_NAME)) {
        (Some(score_field_id), Some(pr_field_id)) => Ok(Some(LedgerBoard {
            project_id: project.id,
            score_field_id,
            pr_field_id,
        })),
        (score, pr) => bail!(
            "Missing required fields in ledger project: Score={}, Pull Request={}",
            score.is_some(),
            pr.is_some()
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct RawFieldName {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawLedgerFieldValue {
    pub text: Option<String>,
    pub number: Option<f64>,
    pub field: Option<RawFieldName>,
}

impl RawLedgerFieldValue {
    fn is_field(&self, name: &str) -> bool {
        self.field
            .as_ref()
            .and_then(|f| f.name.as_deref())
            .is_some_and(|n| n == name)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawDraftContent {
    pub assignees: Option<Connection<RawActor>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLedgerItem {
    pub id: String,
    pub field_values: Option<Connection<RawLedgerFieldValue>>,
    pub content: Option<RawDraftContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLedgerItems {
    pub page_info: PageInfo,
    pub nodes: Option<Vec<Option<RawLedgerItem>>>,
}

#[derive(Debug, Deserialize)]
pub struct RawLedgerNode {
    pub items: Option<RawLedgerItems>,
}

#[derive(Debug, Deserialize)]
pub struct LedgerItemsData {
    pub node: Option<RawLedgerNode>,
}

/// One page of ledger entries and the cursor of the next page, if any.
///
/// Items without a PR reference or an assignee are not ledger entries and
/// are skipped.
pub fn ledger_page_from_response(data: LedgerItemsData) -> (Vec<LedgerEntry>, Option<String>) {
    let Some(items) = data.node.and_then(|n| n.items) else {
        return (Vec::new(), None);
    };

    let entries = items
        .nodes
        .into_iter()
        .flatten()
        .flatten()
        .filter_map(|item| {
            let values: Vec<RawLedgerFieldValue> = nodes(item.field_values).collect();
            let pr_ref = values
                .iter()
                .find(|v| v.is_field(PR_FIELD_NAME))
                .and_then(|v| v.text.clone())
                .filter(|text| !text.is_empty())?;
            let score = values
                .iter()
                .find(|v| v.is_field(SCORE_FIELD_NAME))
                .and_then(|v| v.number);
            let assignee_login = item
                .content
                .and_then(|c| nodes(c.assignees).next())
                .and_then(|a| a.login)
                .filter(|login| !login.is_empty())?;

            Some(LedgerEntry {
                item_id: item.id,
                assignee_login,
                pr_ref,
                score,
            })
        })
        .collect();

    let next_cursor = if items.page_info.has_next_page {
        items.page_info.end_cursor
    } else {
        None
    };
    (entries, next_cursor)
}

#[derive(Debug, Deserialize)]
pub struct UserData {
    pub user: Option<RawId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDraftIssueItem {
    pub project_item: RawId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddDraftIssueData {
    pub add_project_v2_draft_issue: RawDraftIssueItem,
}
