use anyhow::{Context, Result};
use clap::Parser;

use crate::{
    config::{Config, TeamRef, parse_regex_list, split_list},
    types::{EventContext, Repo},
};

// Human-readable build info (for clap version display)
const BUILD_INFO_HUMAN: &str = env!("BUILD_INFO_HUMAN");

const DEFAULT_PROJECT_NUMBER: u64 = 14;
const DEFAULT_LEDGER_PROJECT_NUMBER: u64 = 16;

// Inputs are also read from the environment the way GitHub Actions passes
// them (`INPUT_` + upper-cased input name, hyphens kept). Actions sets every
// declared input, so empty values mean "not given".
#[derive(Parser, Debug, Default)]
#[command(
    name = "pr-automation",
    about = "Keeps a pull request's size, status and reviewer-approved labels, assignees and project board fields in step with its review state"
)]
#[command(long_version = BUILD_INFO_HUMAN)]
struct CliArgs {
    /// Repository the PR lives in
    #[arg(
        short = 'r',
        long,
        env = "GITHUB_REPOSITORY",
        value_name = "OWNER/REPO",
        help_heading = "Event"
    )]
    pub repo: Option<String>,

    /// Pull request number; nothing is done without one
    #[arg(long = "pr-number", env = "INPUT_PR-NUMBER", value_name = "NUMBER", help_heading = "Event")]
    pub pr_number: Option<String>,

    /// Action of the triggering pull_request event (opened, labeled, ...)
    #[arg(long, env = "INPUT_ACTION", help_heading = "Event")]
    pub action: Option<String>,

    /// User who triggered the event
    #[arg(long, env = "INPUT_ACTOR", value_name = "LOGIN", help_heading = "Event")]
    pub actor: Option<String>,

    #[arg(long = "github-actor", env = "GITHUB_ACTOR", hide = true)]
    pub github_actor: Option<String>,

    /// Label added by the triggering event
    #[arg(long = "label-added", env = "INPUT_LABEL-ADDED", value_name = "LABEL", help_heading = "Event")]
    pub label_added: Option<String>,

    /// State of the submitted review; makes this a review event
    #[arg(long = "review-state", env = "INPUT_REVIEW-STATE", value_name = "STATE", help_heading = "Event")]
    pub review_state: Option<String>,

    /// Organization owning the project board
    #[arg(long = "project-owner", env = "INPUT_PROJECT-OWNER", value_name = "ORG")]
    pub project_owner: Option<String>,

    /// Project board number [default: 14]
    #[arg(long = "project-number", env = "INPUT_PROJECT-NUMBER", value_name = "NUMBER")]
    pub project_number: Option<String>,

    /// Regexes for files excluded from the size count (comma or newline separated)
    #[arg(long = "ignore-patterns", env = "INPUT_IGNORE-PATTERNS", value_name = "PATTERNS")]
    pub ignore_patterns: Option<String>,

    /// CI checks that lower priority while failing or pending (comma or newline separated)
    #[arg(long = "required-checks", env = "INPUT_REQUIRED-CHECKS", value_name = "NAMES")]
    pub required_checks: Option<String>,

    /// Team whose approvals earn the reviewer-approved label [default: backstage/reviewers]
    #[arg(long = "reviewer-team", env = "INPUT_REVIEWER-TEAM", value_name = "ORG/SLUG")]
    pub reviewer_team: Option<String>,

    /// Team whose change requests trigger auto-assignment [default: backstage/maintainers]
    #[arg(long = "maintainer-team", env = "INPUT_MAINTAINER-TEAM", value_name = "ORG/SLUG")]
    pub maintainer_team: Option<String>,

    /// Reviewer score ledger board number [default: 16]
    #[arg(
        long = "ledger-project-number",
        env = "INPUT_LEDGER-PROJECT-NUMBER",
        value_name = "NUMBER"
    )]
    pub ledger_project_number: Option<String>,

    /// Compute and log the plan without writing anything
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,
}

/// A parsed command line.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub config: Config,
    /// `None` when no PR number was given.
    pub event: Option<EventContext>,
    pub dry_run: bool,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: Option<String>, fallback: u64) -> Result<u64> {
    match non_empty(value) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Invalid numeric input for {name}: {raw}")),
        None => Ok(fallback),
    }
}

fn parse_team(name: &str, value: Option<String>, fallback: TeamRef) -> Result<TeamRef> {
    match non_empty(value) {
        Some(raw) => TeamRef::parse(&raw).with_context(|| format!("Invalid {name}")),
        None => Ok(fallback),
    }
}

impl CliArgs {
    fn build_config(&mut self) -> Result<Config> {
        let project_owner = non_empty(self.project_owner.take())
            .context("--project-owner (or INPUT_PROJECT-OWNER) is required")?;
        let project_number =
            parse_number("project-number", self.project_number.take(), DEFAULT_PROJECT_NUMBER)?;

        let mut config = Config::new(project_owner, project_number);
        config.ignore_patterns =
            parse_regex_list(&non_empty(self.ignore_patterns.take()).unwrap_or_default())?;
        config.required_checks =
            split_list(&non_empty(self.required_checks.take()).unwrap_or_default());
        config.reviewer_team = parse_team(
            "reviewer-team",
            self.reviewer_team.take(),
            config.reviewer_team.clone(),
        )?;
        config.maintainer_team = parse_team(
            "maintainer-team",
            self.maintainer_team.take(),
            config.maintainer_team.clone(),
        )?;
        config.ledger_project_number = parse_number(
            "ledger-project-number",
            self.ledger_project_number.take(),
            DEFAULT_LEDGER_PROJECT_NUMBER,
        )?;

        config.validate()?;
        Ok(config)
    }

    fn build_event(&mut self) -> Result<Option<EventContext>> {
        let Some(raw_number) = non_empty(self.pr_number.take()) else {
            return Ok(None);
        };
        let issue_number: u64 = raw_number
            .parse()
            .with_context(|| format!("Invalid numeric input for pr-number: {raw_number}"))?;

        let repo = non_empty(self.repo.take())
            .context("--repo (or GITHUB_REPOSITORY) is required")?;
        let repo = Repo::parse(&repo)
            .map_err(|e| anyhow::anyhow!("Invalid repository format '{}': {}", repo, e))?;

        let actor = non_empty(self.actor.take())
            .or_else(|| non_empty(self.github_actor.take()))
            .context("--actor (or GITHUB_ACTOR) is required")?;

        let review_state = non_empty(self.review_state.take());
        let (event_name, action) = match review_state {
            Some(_) => ("pull_request_review", Some("submitted".to_string())),
            None => ("pull_request", non_empty(self.action.take())),
        };

        Ok(Some(EventContext {
            repo,
            issue_number,
            event_name: event_name.to_string(),
            action,
            actor,
            label_added: non_empty(self.label_added.take()),
            review_state,
        }))
    }
}

/// Parses command-line arguments (falling back to action inputs in the
/// environment) into a validated configuration and event.
pub fn parse_args<I, T>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let mut cli = CliArgs::try_parse_from(args)?;
    let config = cli.build_config()?;
    let event = cli.build_event()?;
    Ok(Invocation {
        config,
        event,
        dry_run: cli.dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Invocation> {
        let mut args = vec![
            "pr-automation",
            "--repo",
            "backstage/backstage",
            "--actor",
            "alice",
            "--project-owner",
            "backstage",
        ];
        args.extend_from_slice(extra);
        parse_args(args)
    }

    #[test]
    fn test_defaults() {
        let invocation = parse(&["--pr-number", "42", "--project-number", "14"]).unwrap();
        let config = invocation.config;
        assert_eq!(config.project_owner, "backstage");
        assert_eq!(config.project_number, 14);
        assert_eq!(config.reviewer_team.to_string(), "backstage/reviewers");
        assert_eq!(config.maintainer_team.to_string(), "backstage/maintainers");
        assert_eq!(config.status_field_name, "Status");
        assert_eq!(config.priority_field_name, "Priority");
        assert!(!invocation.dry_run);

        let event = invocation.event.unwrap();
        assert_eq!(event.repo.to_string(), "backstage/backstage");
        assert_eq!(event.issue_number, 42);
        assert_eq!(event.actor, "alice");
    }

    #[test]
    fn test_review_state_makes_review_event() {
        let event = parse(&[
            "--pr-number",
            "42",
            "--action",
            "labeled",
            "--review-state",
            "changes_requested",
        ])
        .unwrap()
        .event
        .unwrap();
        assert_eq!(event.event_name, "pull_request_review");
        assert_eq!(event.action.as_deref(), Some("submitted"));
        assert_eq!(event.review_state.as_deref(), Some("changes_requested"));
        assert!(event.is_review_submission());
    }

    #[test]
    fn test_pull_request_event() {
        let event = parse(&[
            "--pr-number",
            "7",
            "--action",
            "labeled",
            "--label-added",
            "status:needs-decision",
            "--review-state",
            "",
        ])
        .unwrap()
        .event
        .unwrap();
        assert_eq!(event.event_name, "pull_request");
        assert_eq!(event.action.as_deref(), Some("labeled"));
        assert_eq!(event.label_added.as_deref(), Some("status:needs-decision"));
        assert_eq!(event.review_state, None);
    }

    #[test]
    fn test_missing_pr_number_means_no_event() {
        let invocation = parse(&["--pr-number", "", "--dry-run"]).unwrap();
        assert!(invocation.event.is_none());
        assert!(invocation.dry_run);
    }

    #[test]
    fn test_lists_and_teams() {
        let config = parse(&[
            "--ignore-patterns",
            "yarn\\.lock$\n\\.snap$",
            "--required-checks",
            "build, test",
            "--reviewer-team",
            "acme/reviewers",
            "--maintainer-team",
            "acme/core",
            "--ledger-project-number",
            "3",
        ])
        .unwrap()
        .config;
        assert_eq!(config.ignore_patterns.len(), 2);
        assert_eq!(config.required_checks, vec!["build", "test"]);
        assert_eq!(config.reviewer_team.org, "acme");
        assert_eq!(config.maintainer_team.slug, "core");
        assert_eq!(config.ledger_project_number, 3);
    }

    #[test]
    fn test_invalid_inputs() {
        let err = parse(&["--project-number", "fourteen"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid numeric input for project-number: fourteen"
        );

        assert!(parse(&["--ignore-patterns", "(unclosed"]).is_err());
        assert!(parse(&["--reviewer-team", "reviewers"]).is_err());
        assert!(parse(&["--pr-number", "abc"]).is_err());

        let err = parse_args([
            "pr-automation",
            "--repo",
            "not-a-repo",
            "--actor",
            "alice",
            "--project-owner",
            "backstage",
            "--pr-number",
            "1",
        ])
        .unwrap_err();
        assert!(err.to_string().contains("Invalid repository format"));
    }

    #[test]
    fn test_help_is_a_clap_error() {
        let err = parse_args(["pr-automation", "--help"]).unwrap_err();
        let clap_err = err.downcast_ref::<clap::Error>().unwrap();
        assert_eq!(clap_err.kind(), clap::error::ErrorKind::DisplayHelp);
    }
}
