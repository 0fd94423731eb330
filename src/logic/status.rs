use std::collections::BTreeSet;

use crate::{config::StatusLabels, types::ReviewDecision};

#[derive(Debug, Clone, Copy)]
pub struct StatusDecisionInput<'a> {
    /// Labels currently on the PR.
    pub labels: &'a [String],
    pub status_labels: &'a StatusLabels,
    pub review_decision: Option<ReviewDecision>,
    /// Label added by the triggering event, if any.
    pub label_added: Option<&'a str>,
    pub author_has_responded: bool,
}

/// Picks the status label the PR should carry.
///
/// `None` means "leave the status labels alone", which is different from
/// resolving to the needs-review label.
pub fn determine_target_status_label(input: &StatusDecisionInput<'_>) -> Option<String> {
    let labels = input.status_labels;
    let known: BTreeSet<String> = labels.all();

    // A status label someone just added by hand always wins.
    if let Some(added) = input.label_added.filter(|added| known.contains(*added)) {
        return Some(added.to_string());
    }

    // needs-decision freezes automation until a human moves the PR on.
    if input.labels.iter().any(|l| *l == labels.needs_decision) {
        return None;
    }

    let target = match input.review_decision {
        Some(ReviewDecision::ChangesRequested) if input.author_has_responded => {
            &labels.needs_review
        }
        Some(ReviewDecision::ChangesRequested) => &labels.needs_changes,
        Some(ReviewDecision::Approved) => &labels.awaiting_merge,
        Some(ReviewDecision::ReviewRequired | ReviewDecision::Unknown) | None => {
            &labels.needs_review
        }
    };
    Some(target.clone())
}
