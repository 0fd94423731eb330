use chrono::{DateTime, Utc};

use crate::types::{Comment, Review, ReviewState};

/// Whether the PR author has addressed the most recent "changes requested"
/// review, either by pushing a newer commit or by commenting afterwards.
pub fn has_author_responded_to_changes_request(
    reviews: &[Review],
    comments: &[Comment],
    author_login: Option<&str>,
    head_commit_date: Option<DateTime<Utc>>,
) -> bool {
    let Some(changes_requested_at) = reviews
        .iter()
        .filter(|review| review.state == ReviewState::ChangesRequested)
        .filter_map(|review| review.submitted_at)
        .max()
    else {
        return false;
    };

    if head_commit_date.is_some_and(|committed| committed > changes_requested_at) {
        return true;
    }

    let Some(author_login) = author_login else {
        return false;
    };

    comments
        .iter()
        .filter(|comment| comment.author_login.as_deref() == Some(author_login))
        .filter_map(|comment| comment.created_at)
        .max()
        .is_some_and(|commented| commented > changes_requested_at)
}
