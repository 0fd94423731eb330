use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::types::Review;

const COPILOT_LOGIN: &str = "copilot-pull-request-reviewer";
const COPILOT_LOGIN_BOT: &str = "copilot-pull-request-reviewer[bot]";

static PRIORITY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<!--\s*priority:\s*([0-9]+)\s*-->")
        .expect("Failed to compile priority pattern")
});

fn is_copilot(login: Option<&str>) -> bool {
    matches!(login, Some(COPILOT_LOGIN | COPILOT_LOGIN_BOT))
}

/// Extracts `N` from `<!-- priority: N -->`, accepting only 0..=100.
fn extract_priority(body: &str) -> Option<i64> {
    let captures = PRIORITY_PATTERN.captures(body)?;
    let priority: i64 = captures.get(1)?.as_str().parse().ok()?;
    (0..=100).contains(&priority).then_some(priority)
}

/// Priority hint from the most recent Copilot review carrying a valid
/// priority marker, or 0 when there is none.
///
/// Reviews sharing the latest timestamp resolve to the earliest one in
/// `reviews` order.
pub fn get_copilot_review_priority(reviews: &[Review]) -> i64 {
    reviews
        .iter()
        .filter(|review| is_copilot(review.author_login.as_deref()))
        .filter_map(|review| {
            let submitted_at = review.submitted_at?;
            let priority = extract_priority(review.body.as_deref()?)?;
            Some((submitted_at, priority))
        })
        .fold(None::<(DateTime<Utc>, i64)>, |latest, candidate| match latest {
            Some((at, _)) if candidate.0 <= at => latest,
            _ => Some(candidate),
        })
        .map_or(0, |(_, priority)| priority)
}
