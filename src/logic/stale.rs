use chrono::{DateTime, Duration, Utc};

/// Days an assignment may sit in needs-review before it is dropped.
pub const STALE_ASSIGNMENT_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy)]
pub struct StaleReviewInput<'a> {
    pub has_needs_review_label: bool,
    pub assignees: &'a [String],
    pub most_recent_assignment_at: Option<DateTime<Utc>>,
}

pub fn should_unassign_stale_review(input: &StaleReviewInput<'_>, now: DateTime<Utc>) -> bool {
    if !input.has_needs_review_label || input.assignees.is_empty() {
        return false;
    }

    input
        .most_recent_assignment_at
        .is_some_and(|assigned_at| now - assigned_at >= Duration::days(STALE_ASSIGNMENT_DAYS))
}
