use std::collections::BTreeSet;

/// Whether a maintainer requesting changes on an unassigned PR should be
/// assigned to it. `review_state` is the raw webhook value (`changes_requested`).
pub fn should_auto_assign_reviewer(
    review_state: Option<&str>,
    reviewer_login: &str,
    assignees: &[String],
    maintainer_logins: Option<&BTreeSet<String>>,
) -> bool {
    review_state == Some("changes_requested")
        && assignees.is_empty()
        && maintainer_logins.is_some_and(|maintainers| maintainers.contains(reviewer_login))
}
