use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::{
    config::Config,
    logic::{
        LabelPlanInput, PriorityInput, SizeLabelError, StaleReviewInput, StatusDecisionInput,
        calculate_priority, calculate_size_label, determine_target_status_label,
        estimate_total_additions, has_author_responded_to_changes_request, plan_label_changes,
        should_auto_assign_reviewer, should_have_reviewer_approved_label,
        should_unassign_stale_review,
    },
    types::{AutomationInput, OutputPlan},
};

/// Runs every decision for one PR and assembles the plan for the apply layer.
///
/// The only failure is a size table with no bucket for the computed
/// additions, which is a configuration bug.
pub fn plan_automation(
    input: &AutomationInput,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<OutputPlan, SizeLabelError> {
    let event = &input.event;
    let data = &input.data;
    info!(
        "PR automation for #{} {}/{}",
        event.issue_number,
        event.event_name,
        event.action.as_deref().unwrap_or("n/a")
    );

    let estimate = estimate_total_additions(&data.files, data.files_total_count, &config.ignore_patterns);
    info!(
        "{} {} additions across {} files",
        if estimate.estimated { "Estimated" } else { "Counted" },
        estimate.additions,
        estimate.total_files
    );

    let size_label = calculate_size_label(estimate.additions, &config.size_labels)?;

    let mut reviewer_approved = data.has_label(&config.reviewer_approved_label);
    match &input.reviewer_logins {
        Some(reviewer_logins) => {
            reviewer_approved = should_have_reviewer_approved_label(&data.reviews, reviewer_logins);
        }
        None => info!(
            "Reviewer team {} not accessible, skipping reviewer-approved sync",
            config.reviewer_team
        ),
    }

    let author_has_responded = has_author_responded_to_changes_request(
        &data.reviews,
        &data.comments,
        data.author_login.as_deref(),
        data.head_commit_date,
    );

    let status_labels = config.status_labels.all();
    debug!(
        event_name = %event.event_name,
        action = event.action.as_deref().unwrap_or("none"),
        review_state = event.review_state.as_deref().unwrap_or("none"),
        review_decision = ?data.review_decision,
        latest_reviews = ?data.latest_reviews.iter().map(|r| r.state.as_str()).collect::<Vec<_>>(),
        existing_status_labels = ?data.labels.iter().filter(|l| status_labels.contains(*l)).collect::<Vec<_>>(),
        author_has_responded,
        "Resolving status label"
    );

    let target_status_label = determine_target_status_label(&StatusDecisionInput {
        labels: &data.labels,
        status_labels: &config.status_labels,
        review_decision: data.review_decision,
        label_added: event.label_added.as_deref(),
        author_has_responded,
    });
    debug!(target = ?target_status_label, "Resolved status label");

    let size_label_set = config.size_label_set();
    let label_plan = plan_label_changes(&LabelPlanInput {
        existing_labels: &data.labels,
        size_label,
        size_label_set: &size_label_set,
        reviewer_approved_label: &config.reviewer_approved_label,
        reviewer_approved,
        status_labels: &status_labels,
        target_status_label: target_status_label.as_deref(),
        default_status_label: &config.status_labels.default,
    });

    let priority = calculate_priority(&PriorityInput {
        additions: estimate.additions,
        priority_params: &config.priority_params,
        reviewer_approved,
        author_score: input.author_score,
        reviews: &data.reviews,
        is_draft: data.is_draft,
        check_runs: &data.check_runs,
        required_checks: &config.required_checks,
    });

    let has_needs_review_label = data.has_label(&config.status_labels.needs_review);
    debug!(
        has_needs_review_label,
        assignees = ?data.assignees,
        most_recent_assignment_at = ?data.most_recent_assignment_at,
        "Checking for stale review assignment"
    );
    let should_unassign = should_unassign_stale_review(
        &StaleReviewInput {
            has_needs_review_label,
            assignees: &data.assignees,
            most_recent_assignment_at: data.most_recent_assignment_at,
        },
        now,
    );

    let assign_reviewer = should_auto_assign_reviewer(
        event.review_state.as_deref(),
        &event.actor,
        &data.assignees,
        input.maintainer_logins.as_ref(),
    )
    .then(|| event.actor.clone());

    debug!(
        add = ?label_plan.labels_to_add,
        remove = ?label_plan.labels_to_remove,
        status_label_to_sync = ?label_plan.status_label_to_sync,
        priority,
        should_unassign,
        assign_reviewer = ?assign_reviewer,
        "Planned output"
    );

    Ok(OutputPlan {
        label_plan,
        priority,
        should_unassign,
        assign_reviewer,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        config::{SizeLabelConfig, Threshold},
        types::{
            EventContext, FileChange, PrSnapshot, Repo, Review, ReviewDecision, ReviewState,
        },
    };

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn event() -> EventContext {
        EventContext {
            repo: Repo::new("backstage", "backstage").unwrap(),
            issue_number: 42,
            event_name: "pull_request".to_string(),
            action: Some("synchronize".to_string()),
            actor: "author".to_string(),
            label_added: None,
            review_state: None,
        }
    }

    fn input(data: PrSnapshot) -> AutomationInput {
        AutomationInput {
            event: event(),
            data,
            reviewer_logins: Some(BTreeSet::from(["reviewer".to_string()])),
            maintainer_logins: Some(BTreeSet::from(["maintainer".to_string()])),
            author_score: 0,
        }
    }

    fn snapshot(additions: u64) -> PrSnapshot {
        PrSnapshot {
            number: 42,
            title: "Fix things".to_string(),
            author_login: Some("author".to_string()),
            files: vec![FileChange {
                path: "src/index.ts".to_string(),
                additions,
            }],
            files_total_count: 1,
            ..PrSnapshot::default()
        }
    }

    #[test]
    fn test_fresh_pr_plan() {
        let config = Config::new("backstage", 14);
        let plan = plan_automation(&input(snapshot(10)), &config, now()).unwrap();

        assert_eq!(
            plan.label_plan.labels_to_add,
            BTreeSet::from(["size:small".to_string(), "status:needs-review".to_string()])
        );
        assert!(plan.label_plan.labels_to_remove.is_empty());
        assert_eq!(
            plan.label_plan.status_label_to_sync.as_deref(),
            Some("status:needs-review")
        );
        assert_eq!(plan.priority, 94);
        assert!(!plan.should_unassign);
        assert_eq!(plan.assign_reviewer, None);
    }

    #[test]
    fn test_reviewer_approval_bumps_priority_and_labels() {
        let config = Config::new("backstage", 14);
        let mut data = snapshot(1);
        data.review_decision = Some(ReviewDecision::Approved);
        data.labels = vec!["size:tiny".to_string(), "status:needs-review".to_string()];
        data.reviews = vec![Review {
            state: ReviewState::Approved,
            submitted_at: Some(now() - Duration::days(1)),
            author_login: Some("reviewer".to_string()),
            body: None,
        }];

        let plan = plan_automation(&input(data), &config, now()).unwrap();
        assert_eq!(
            plan.label_plan.labels_to_add,
            BTreeSet::from([
                "reviewer-approved".to_string(),
                "status:awaiting-merge".to_string()
            ])
        );
        assert_eq!(
            plan.label_plan.labels_to_remove,
            BTreeSet::from(["status:needs-review".to_string()])
        );
        assert_eq!(plan.priority, 200);
    }

    #[test]
    fn test_inaccessible_reviewer_team_keeps_existing_label() {
        let config = Config::new("backstage", 14);
        let mut data = snapshot(1);
        data.labels = vec![
            "size:tiny".to_string(),
            "reviewer-approved".to_string(),
            "status:needs-review".to_string(),
        ];
        let mut input = input(data);
        input.reviewer_logins = None;

        let plan = plan_automation(&input, &config, now()).unwrap();
        assert!(plan.label_plan.is_empty());
        assert_eq!(plan.priority, 200);
    }

    #[test]
    fn test_stale_assignment_and_auto_assign() {
        let config = Config::new("backstage", 14);
        let mut data = snapshot(1);
        data.labels = vec!["status:needs-review".to_string()];
        data.assignees = vec!["reviewer".to_string()];
        data.most_recent_assignment_at = Some(now() - Duration::days(20));
        let plan = plan_automation(&input(data), &config, now()).unwrap();
        assert!(plan.should_unassign);
        assert_eq!(plan.assign_reviewer, None);

        let mut input = input(snapshot(1));
        input.event.event_name = "pull_request_review".to_string();
        input.event.action = Some("submitted".to_string());
        input.event.review_state = Some("changes_requested".to_string());
        input.event.actor = "maintainer".to_string();
        let plan = plan_automation(&input, &config, now()).unwrap();
        assert_eq!(plan.assign_reviewer.as_deref(), Some("maintainer"));
    }

    #[test]
    fn test_misconfigured_size_table_fails() {
        let mut config = Config::new("backstage", 14);
        config.size_labels = vec![SizeLabelConfig {
            label: "size:tiny".to_string(),
            threshold: Threshold::AtMost(5),
        }];
        let err = plan_automation(&input(snapshot(100)), &config, now()).unwrap_err();
        assert_eq!(err, SizeLabelError { additions: 100 });
    }
}
