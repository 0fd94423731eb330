use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::types::{Review, ReviewState};

fn timestamp_or_epoch(review: &Review) -> DateTime<Utc> {
    review.submitted_at.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Latest review by timestamp; undated reviews sort as the epoch and the
/// earliest of equally dated reviews wins.
fn latest_review<'a>(reviews: impl Iterator<Item = &'a Review>) -> Option<&'a Review> {
    reviews.fold(None, |latest: Option<&Review>, review| match latest {
        Some(current) if timestamp_or_epoch(review) <= timestamp_or_epoch(current) => latest,
        _ => Some(review),
    })
}

/// Whether the reviewer-approved label should be present.
///
/// Holds when a reviewer-team member approved and that approval is newer
/// than the latest change request from anyone.
pub fn should_have_reviewer_approved_label(
    reviews: &[Review],
    reviewer_logins: &BTreeSet<String>,
) -> bool {
    let latest_approval = latest_review(reviews.iter().filter(|review| {
        review.state == ReviewState::Approved
            && review
                .author_login
                .as_ref()
                .is_some_and(|login| reviewer_logins.contains(login))
    }));
    let latest_changes_requested = latest_review(
        reviews
            .iter()
            .filter(|review| review.state == ReviewState::ChangesRequested),
    );

    match (latest_approval, latest_changes_requested) {
        (Some(approval), Some(changes)) => {
            timestamp_or_epoch(approval) > timestamp_or_epoch(changes)
        }
        (approval, _) => approval.is_some(),
    }
}
