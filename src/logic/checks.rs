use crate::types::{CheckConclusion, CheckRun, CheckStatus};

#[derive(Debug, Clone, PartialEq)]
pub struct RequiredChecksStatus {
    /// 1.0 if passing (or nothing to evaluate), 0.5 otherwise.
    pub multiplier: f64,
    /// Checks that completed with a non-success conclusion.
    pub failing_checks: Vec<String>,
    /// Checks that have not completed yet.
    pub pending_checks: Vec<String>,
}

impl RequiredChecksStatus {
    fn passing() -> Self {
        Self {
            multiplier: 1.0,
            failing_checks: Vec::new(),
            pending_checks: Vec::new(),
        }
    }
}

/// Evaluates required CI checks. Unconfigured or absent checks never block.
pub fn get_required_checks_status(
    check_runs: &[CheckRun],
    required_check_names: &[String],
) -> RequiredChecksStatus {
    let required: Vec<&CheckRun> = check_runs
        .iter()
        .filter(|run| required_check_names.contains(&run.name))
        .collect();

    if required.is_empty() {
        return RequiredChecksStatus::passing();
    }

    let failing_checks: Vec<String> = required
        .iter()
        .filter(|run| {
            run.status == CheckStatus::Completed
                && run.conclusion != Some(CheckConclusion::Success)
        })
        .map(|run| run.name.clone())
        .collect();

    let pending_checks: Vec<String> = required
        .iter()
        .filter(|run| run.status != CheckStatus::Completed)
        .map(|run| run.name.clone())
        .collect();

    let multiplier = if failing_checks.is_empty() && pending_checks.is_empty() {
        1.0
    } else {
        0.5
    };

    RequiredChecksStatus {
        multiplier,
        failing_checks,
        pending_checks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(name: &str, status: CheckStatus, conclusion: Option<CheckConclusion>) -> CheckRun {
        CheckRun {
            name: name.to_string(),
            status,
            conclusion,
        }
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_no_required_checks_configured() {
        let runs = [run("build", CheckStatus::Completed, Some(CheckConclusion::Failure))];
        assert_eq!(
            get_required_checks_status(&runs, &[]),
            RequiredChecksStatus::passing()
        );
    }

    #[test]
    fn test_required_checks_not_present() {
        let runs = [run("lint", CheckStatus::InProgress, None)];
        assert_eq!(
            get_required_checks_status(&runs, &names(&["build"])),
            RequiredChecksStatus::passing()
        );
    }

    #[test]
    fn test_all_passing() {
        let runs = [
            run("build", CheckStatus::Completed, Some(CheckConclusion::Success)),
            run("test", CheckStatus::Completed, Some(CheckConclusion::Success)),
            run("lint", CheckStatus::Completed, Some(CheckConclusion::Failure)),
        ];
        let status = get_required_checks_status(&runs, &names(&["build", "test"]));
        assert_eq!(status.multiplier, 1.0);
        assert!(status.failing_checks.is_empty());
        assert!(status.pending_checks.is_empty());
    }

    #[test]
    fn test_failing_and_pending() {
        let runs = [
            run("build", CheckStatus::Completed, Some(CheckConclusion::Skipped)),
            run("test", CheckStatus::Queued, None),
            run("e2e", CheckStatus::Completed, None),
            run("docs", CheckStatus::Completed, Some(CheckConclusion::Success)),
        ];
        let status = get_required_checks_status(&runs, &names(&["build", "test", "e2e", "docs"]));
        assert_eq!(status.multiplier, 0.5);
        assert_eq!(status.failing_checks, names(&["build", "e2e"]));
        assert_eq!(status.pending_checks, names(&["test"]));
    }

    #[test]
    fn test_unrecognised_status_counts_as_pending() {
        let runs = [
            run("build", CheckStatus::Unknown, Some(CheckConclusion::Success)),
            run("test", CheckStatus::Completed, Some(CheckConclusion::Unknown)),
        ];
        let status = get_required_checks_status(&runs, &names(&["build", "test"]));
        assert_eq!(status.pending_checks, names(&["build"]));
        assert_eq!(status.failing_checks, names(&["test"]));
    }
}
