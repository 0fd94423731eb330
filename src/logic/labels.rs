use std::collections::BTreeSet;

use crate::types::LabelPlan;

#[derive(Debug, Clone, Copy)]
pub struct LabelPlanInput<'a> {
    /// Labels currently on the PR, in GitHub order.
    pub existing_labels: &'a [String],
    pub size_label: &'a str,
    pub size_label_set: &'a BTreeSet<String>,
    pub reviewer_approved_label: &'a str,
    pub reviewer_approved: bool,
    pub status_labels: &'a BTreeSet<String>,
    pub target_status_label: Option<&'a str>,
    pub default_status_label: &'a str,
}

/// Reconciles the desired size, reviewer-approved and status labels with
/// the labels already on the PR.
pub fn plan_label_changes(input: &LabelPlanInput<'_>) -> LabelPlan {
    let has = |label: &str| input.existing_labels.iter().any(|l| l == label);
    let mut plan = LabelPlan::default();

    for label in input.existing_labels {
        if input.size_label_set.contains(label) && label != input.size_label {
            plan.labels_to_remove.insert(label.clone());
        }
    }
    if !has(input.size_label) {
        plan.labels_to_add.insert(input.size_label.to_string());
    }

    match (input.reviewer_approved, has(input.reviewer_approved_label)) {
        (true, false) => {
            plan.labels_to_add.insert(input.reviewer_approved_label.to_string());
        }
        (false, true) => {
            plan.labels_to_remove.insert(input.reviewer_approved_label.to_string());
        }
        _ => {}
    }

    let mut existing_status = input
        .existing_labels
        .iter()
        .filter(|label| input.status_labels.contains(*label));

    plan.status_label_to_sync = match input.target_status_label {
        None => match existing_status.next() {
            // Keep the label set as-is but still report it so the board stays in step.
            Some(current) => Some(current.clone()),
            None => {
                plan.labels_to_add.insert(input.default_status_label.to_string());
                Some(input.default_status_label.to_string())
            }
        },
        Some(target) => {
            for label in existing_status.filter(|label| *label != target) {
                plan.labels_to_remove.insert(label.clone());
            }
            if !has(target) {
                plan.labels_to_add.insert(target.to_string());
            }
            Some(target.to_string())
        }
    };

    let LabelPlan {
        labels_to_add,
        labels_to_remove,
        ..
    } = &mut plan;
    labels_to_remove.retain(|label| !labels_to_add.contains(label));

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, StatusLabels};

    struct Fixture {
        size_labels: BTreeSet<String>,
        status_labels: BTreeSet<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                size_labels: Config::new("backstage", 14).size_label_set(),
                status_labels: StatusLabels::default().all(),
            }
        }

        fn input<'a>(
            &'a self,
            existing: &'a [String],
            size_label: &'a str,
            reviewer_approved: bool,
            target: Option<&'a str>,
        ) -> LabelPlanInput<'a> {
            LabelPlanInput {
                existing_labels: existing,
                size_label,
                size_label_set: &self.size_labels,
                reviewer_approved_label: "reviewer-approved",
                reviewer_approved,
                status_labels: &self.status_labels,
                target_status_label: target,
                default_status_label: "status:needs-review",
            }
        }
    }

    fn set(labels: &[&str]) -> BTreeSet<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    fn labels(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|l| l.to_string()).collect()
    }

    /// Applies a plan to a label list the way the apply layer would.
    fn apply(existing: &[String], plan: &LabelPlan) -> Vec<String> {
        let mut result: Vec<String> = existing
            .iter()
            .filter(|l| !plan.labels_to_remove.contains(*l))
            .cloned()
            .collect();
        for label in &plan.labels_to_add {
            if !result.contains(label) {
                result.push(label.clone());
            }
        }
        result
    }

    #[test]
    fn test_fresh_pr() {
        let fixture = Fixture::new();
        let plan = plan_label_changes(&fixture.input(&[], "size:small", false, None));
        assert_eq!(plan.labels_to_add, set(&["size:small", "status:needs-review"]));
        assert!(plan.labels_to_remove.is_empty());
        assert_eq!(
            plan.status_label_to_sync.as_deref(),
            Some("status:needs-review")
        );
    }

    #[test]
    fn test_replaces_size_label() {
        let fixture = Fixture::new();
        let existing = labels(&["size:tiny", "size:huge", "bug", "status:needs-review"]);
        let plan = plan_label_changes(&fixture.input(&existing, "size:large", false, None));
        assert_eq!(plan.labels_to_add, set(&["size:large"]));
        assert_eq!(plan.labels_to_remove, set(&["size:tiny", "size:huge"]));
    }

    #[test]
    fn test_reviewer_approved_label() {
        let fixture = Fixture::new();
        let existing = labels(&["size:tiny", "status:needs-review"]);
        let plan = plan_label_changes(&fixture.input(&existing, "size:tiny", true, None));
        assert_eq!(plan.labels_to_add, set(&["reviewer-approved"]));

        let existing = labels(&["size:tiny", "status:needs-review", "reviewer-approved"]);
        let plan = plan_label_changes(&fixture.input(&existing, "size:tiny", false, None));
        assert_eq!(plan.labels_to_remove, set(&["reviewer-approved"]));
        assert!(plan.labels_to_add.is_empty());
    }

    #[test]
    fn test_null_target_keeps_existing_status() {
        let fixture = Fixture::new();
        let existing = labels(&["status:needs-decision", "size:tiny"]);
        let plan = plan_label_changes(&fixture.input(&existing, "size:tiny", false, None));
        assert!(plan.is_empty());
        assert_eq!(
            plan.status_label_to_sync.as_deref(),
            Some("status:needs-decision")
        );
    }

    #[test]
    fn test_target_replaces_other_status_labels() {
        let fixture = Fixture::new();
        let existing = labels(&["status:needs-review", "status:needs-changes", "size:tiny"]);
        let plan = plan_label_changes(&fixture.input(
            &existing,
            "size:tiny",
            false,
            Some("status:awaiting-merge"),
        ));
        assert_eq!(plan.labels_to_add, set(&["status:awaiting-merge"]));
        assert_eq!(
            plan.labels_to_remove,
            set(&["status:needs-review", "status:needs-changes"])
        );
        assert_eq!(
            plan.status_label_to_sync.as_deref(),
            Some("status:awaiting-merge")
        );
    }

    #[test]
    fn test_add_wins_over_remove() {
        // A default status label that is also a stale size label lands in both sets.
        let fixture = Fixture::new();
        let existing = labels(&["size:tiny"]);
        let input = LabelPlanInput {
            default_status_label: "size:tiny",
            ..fixture.input(&existing, "size:small", false, None)
        };
        let plan = plan_label_changes(&input);
        assert_eq!(plan.labels_to_add, set(&["size:small", "size:tiny"]));
        assert!(plan.labels_to_remove.is_empty());
    }

    #[test]
    fn test_idempotent_after_apply() {
        let fixture = Fixture::new();
        let scenarios: [(&[&str], &str, bool, Option<&str>); 4] = [
            (&[], "size:small", false, None),
            (
                &["size:huge", "status:needs-changes", "reviewer-approved"],
                "size:tiny",
                false,
                Some("status:needs-review"),
            ),
            (&["bug", "size:medium"], "size:medium", true, Some("status:awaiting-merge")),
            (&["status:needs-decision"], "size:large", true, None),
        ];

        for (existing, size, approved, target) in scenarios {
            let existing = labels(existing);
            let input = fixture.input(&existing, size, approved, target);
            let plan = plan_label_changes(&input);
            assert_eq!(plan, plan_label_changes(&input));
            assert!(plan.labels_to_add.is_disjoint(&plan.labels_to_remove));

            let applied = apply(&existing, &plan);
            let replan = plan_label_changes(&fixture.input(&applied, size, approved, target));
            assert!(replan.is_empty(), "existing={existing:?} replan={replan:?}");
            assert_eq!(replan.status_label_to_sync, plan.status_label_to_sync);
        }
    }
}
