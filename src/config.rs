use std::collections::BTreeSet;

use anyhow::{Context, Result};
use regex::Regex;

/// Upper bound (inclusive) on additions for one size bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Threshold {
    AtMost(u64),
    Unbounded,
}

impl Threshold {
    pub fn admits(&self, additions: u64) -> bool {
        match self {
            Threshold::AtMost(limit) => additions <= *limit,
            Threshold::Unbounded => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SizeLabelConfig {
    pub label: String,
    pub threshold: Threshold,
}

impl SizeLabelConfig {
    fn new(label: &str, threshold: Threshold) -> Self {
        Self {
            label: label.to_string(),
            threshold,
        }
    }
}

/// Parameters of the size-decay priority curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityParams {
    /// Starting/max priority before size-based reduction (min is always 0).
    pub base: i64,
    /// Base of the exponential decay (0.5 halves priority every `exponent_divisor` lines).
    pub exponent_base: f64,
    /// Lines of additions before priority starts decreasing.
    pub exponent_offset: f64,
    /// Lines of additions per decay step.
    pub exponent_divisor: f64,
    /// Priority boost when a reviewer has approved.
    pub reviewer_bump: i64,
}

impl Default for PriorityParams {
    fn default() -> Self {
        Self {
            base: 100,
            exponent_base: 0.5,
            exponent_offset: 1.0,
            exponent_divisor: 99.0,
            reviewer_bump: 100,
        }
    }
}

/// A GitHub team addressed as `org/slug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamRef {
    pub org: String,
    pub slug: String,
}

impl TeamRef {
    pub fn parse(team: &str) -> Result<Self> {
        let (org, slug) = team
            .trim()
            .split_once('/')
            .filter(|(org, slug)| !org.is_empty() && !slug.is_empty() && !slug.contains('/'))
            .with_context(|| format!("Team must be in format 'org/slug', got: '{team}'"))?;
        Ok(Self {
            org: org.to_string(),
            slug: slug.to_string(),
        })
    }
}

impl std::fmt::Display for TeamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.org, self.slug)
    }
}

/// Status label names and their project board column names.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLabels {
    /// (label, board status name) in declaration order.
    pub board_names: Vec<(String, String)>,
    pub default: String,
    pub needs_decision: String,
    pub needs_changes: String,
    pub awaiting_merge: String,
    pub needs_review: String,
}

impl StatusLabels {
    pub fn all(&self) -> BTreeSet<String> {
        self.board_names
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    pub fn board_name(&self, label: &str) -> Option<&str> {
        self.board_names
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, name)| name.as_str())
    }
}

impl Default for StatusLabels {
    fn default() -> Self {
        let board_names = [
            ("status:needs-changes", "Needs Changes"),
            ("status:needs-review", "Needs Review"),
            ("status:needs-owner-review", "Needs Owner Review"),
            ("status:needs-decision", "Needs Decision"),
            ("status:awaiting-merge", "Awaiting Merge"),
        ]
        .into_iter()
        .map(|(label, name)| (label.to_string(), name.to_string()))
        .collect();

        Self {
            board_names,
            default: "status:needs-review".to_string(),
            needs_decision: "status:needs-decision".to_string(),
            needs_changes: "status:needs-changes".to_string(),
            awaiting_merge: "status:awaiting-merge".to_string(),
            needs_review: "status:needs-review".to_string(),
        }
    }
}

pub fn default_size_labels() -> Vec<SizeLabelConfig> {
    vec![
        SizeLabelConfig::new("size:tiny", Threshold::AtMost(5)),
        SizeLabelConfig::new("size:small", Threshold::AtMost(50)),
        SizeLabelConfig::new("size:medium", Threshold::AtMost(500)),
        SizeLabelConfig::new("size:large", Threshold::AtMost(2500)),
        SizeLabelConfig::new("size:huge", Threshold::Unbounded),
    ]
}

/// Run-wide configuration, built once at start-up and passed by reference.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_owner: String,
    pub project_number: u64,
    pub ignore_patterns: Vec<Regex>,
    pub required_checks: Vec<String>,
    pub size_labels: Vec<SizeLabelConfig>,
    pub status_labels: StatusLabels,
    pub reviewer_approved_label: String,
    pub reviewer_team: TeamRef,
    pub maintainer_team: TeamRef,
    pub status_field_name: String,
    pub priority_field_name: String,
    pub priority_params: PriorityParams,
    pub ledger_project_number: u64,
}

impl Config {
    /// Configuration with the stock label tables for the given board.
    pub fn new(project_owner: impl Into<String>, project_number: u64) -> Self {
        Self {
            project_owner: project_owner.into(),
            project_number,
            ignore_patterns: Vec::new(),
            required_checks: Vec::new(),
            size_labels: default_size_labels(),
            status_labels: StatusLabels::default(),
            reviewer_approved_label: "reviewer-approved".to_string(),
            reviewer_team: TeamRef {
                org: "backstage".to_string(),
                slug: "reviewers".to_string(),
            },
            maintainer_team: TeamRef {
                org: "backstage".to_string(),
                slug: "maintainers".to_string(),
            },
            status_field_name: "Status".to_string(),
            priority_field_name: "Priority".to_string(),
            priority_params: PriorityParams::default(),
            ledger_project_number: 16,
        }
    }

    pub fn size_label_set(&self) -> BTreeSet<String> {
        self.size_labels.iter().map(|s| s.label.clone()).collect()
    }

    /// Rejects a size table that could leave some addition count unlabelled.
    pub fn validate(&self) -> Result<()> {
        match self.size_labels.last() {
            Some(SizeLabelConfig {
                threshold: Threshold::Unbounded,
                ..
            }) => Ok(()),
            Some(last) => anyhow::bail!(
                "Size label table must end with an unbounded bucket, last is '{}'",
                last.label
            ),
            None => anyhow::bail!("Size label table is empty"),
        }
    }
}

/// Splits a comma- or newline-separated action input into trimmed items.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_regex_list(value: &str) -> Result<Vec<Regex>> {
    split_list(value)
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("Invalid ignore pattern: '{pattern}'"))
        })
        .collect()
}
