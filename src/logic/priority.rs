use tracing::info;

use super::{checks::get_required_checks_status, copilot::get_copilot_review_priority};
use crate::{
    config::PriorityParams,
    types::{CheckRun, Review},
};

const DRAFT_MULTIPLIER: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct PriorityInput<'a> {
    pub additions: u64,
    pub priority_params: &'a PriorityParams,
    pub reviewer_approved: bool,
    pub author_score: i64,
    pub reviews: &'a [Review],
    pub is_draft: bool,
    pub check_runs: &'a [CheckRun],
    pub required_checks: &'a [String],
}

/// Size-decay term: `base * exponent_base ^ ((additions - offset) / divisor)`,
/// rounded and clamped to `[0, base]`.
pub fn base_priority(additions: u64, params: &PriorityParams) -> i64 {
    let exponent = (additions as f64 - params.exponent_offset) / params.exponent_divisor;
    let raw = params.base as f64 * params.exponent_base.powf(exponent);
    (raw.round() as i64).clamp(0, params.base.max(0))
}

/// Review priority of a PR. Only the size term is clamped; the bumps and
/// multipliers that follow are applied in a fixed order and the result is
/// left unbounded.
pub fn calculate_priority(input: &PriorityInput<'_>) -> i64 {
    let params = input.priority_params;
    let mut parts: Vec<String> = Vec::new();

    let mut score = base_priority(input.additions, params) as f64;

    if input.reviewer_approved {
        score += params.reviewer_bump as f64;
        parts.push(format!("reviewer approval +{}", params.reviewer_bump));
    }

    if input.author_score > 0 {
        score += input.author_score as f64;
        parts.push(format!("author score +{}", input.author_score));
    }

    let copilot_priority = get_copilot_review_priority(input.reviews);
    if copilot_priority > 0 {
        score += copilot_priority as f64;
        parts.push(format!("copilot +{copilot_priority}"));
    }

    if input.is_draft {
        score *= DRAFT_MULTIPLIER;
        parts.push(format!("draft ×{DRAFT_MULTIPLIER}"));
    }

    let checks = get_required_checks_status(input.check_runs, input.required_checks);
    if checks.multiplier < 1.0 {
        score *= checks.multiplier;
        let mut status = Vec::new();
        if !checks.failing_checks.is_empty() {
            status.push(format!("failing: {}", checks.failing_checks.join(", ")));
        }
        if !checks.pending_checks.is_empty() {
            status.push(format!("pending: {}", checks.pending_checks.join(", ")));
        }
        parts.push(format!("checks ×{} ({})", checks.multiplier, status.join("; ")));
    }

    let priority = score.round() as i64;
    if parts.is_empty() {
        info!("Priority: {priority}");
    } else {
        info!("Priority: {priority} ({})", parts.join(", "));
    }

    priority
}
