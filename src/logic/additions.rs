use regex::Regex;

use crate::types::FileChange;

#[derive(Debug, Clone, PartialEq)]
pub struct AdditionsEstimate {
    pub additions: u64,
    pub relevant_files: u64,
    pub total_files: u64,
    /// True when the file list was truncated and the totals are extrapolated.
    pub estimated: bool,
}

/// Estimates added lines across a PR from a possibly truncated file list.
///
/// Files matching any of `ignore_patterns` (lockfiles, snapshots, ...) are
/// left out. When `total_count` exceeds the number of loaded files the
/// relevant-file ratio and the mean additions per relevant file of the
/// loaded prefix are extrapolated to the whole PR.
pub fn estimate_total_additions(
    files: &[FileChange],
    total_count: u64,
    ignore_patterns: &[Regex],
) -> AdditionsEstimate {
    let relevant: Vec<&FileChange> = files
        .iter()
        .filter(|file| !ignore_patterns.iter().any(|p| p.is_match(&file.path)))
        .collect();
    let relevant_additions: u64 = relevant.iter().map(|file| file.additions).sum();
    let loaded = files.len() as u64;

    if total_count <= loaded || files.is_empty() {
        return AdditionsEstimate {
            additions: relevant_additions,
            relevant_files: relevant.len() as u64,
            total_files: total_count,
            estimated: false,
        };
    }

    let relevant_ratio = relevant.len() as f64 / loaded as f64;
    let estimated_relevant_count = (total_count as f64 * relevant_ratio).round();
    let average_relevant_additions = if relevant.is_empty() {
        0.0
    } else {
        relevant_additions as f64 / relevant.len() as f64
    };
    let estimated_additions = (average_relevant_additions * estimated_relevant_count).round();

    AdditionsEstimate {
        additions: estimated_additions as u64,
        relevant_files: estimated_relevant_count as u64,
        total_files: total_count,
        estimated: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, additions: u64) -> FileChange {
        FileChange {
            path: path.to_string(),
            additions,
        }
    }

    fn lockfile_patterns() -> Vec<Regex> {
        vec![Regex::new(r"yarn\.lock$").unwrap()]
    }

    #[test]
    fn test_counts_exactly_when_all_files_loaded() {
        let files = [file("a.ts", 10), file("b.ts", 5), file("yarn.lock", 1000)];
        let estimate = estimate_total_additions(&files, 3, &lockfile_patterns());
        assert_eq!(
            estimate,
            AdditionsEstimate {
                additions: 15,
                relevant_files: 2,
                total_files: 3,
                estimated: false,
            }
        );
    }

    #[test]
    fn test_extrapolates_truncated_list() {
        let files = [file("a", 10), file("yarn.lock", 100)];
        let estimate = estimate_total_additions(&files, 4, &lockfile_patterns());
        assert_eq!(
            estimate,
            AdditionsEstimate {
                additions: 20,
                relevant_files: 2,
                total_files: 4,
                estimated: true,
            }
        );
    }

    #[test]
    fn test_no_loaded_files() {
        let estimate = estimate_total_additions(&[], 250, &lockfile_patterns());
        assert_eq!(estimate.additions, 0);
        assert_eq!(estimate.relevant_files, 0);
        assert_eq!(estimate.total_files, 250);
        assert!(!estimate.estimated);
    }

    #[test]
    fn test_only_ignored_files_loaded() {
        let files = [file("yarn.lock", 500)];
        let estimate = estimate_total_additions(&files, 10, &lockfile_patterns());
        assert_eq!(estimate.additions, 0);
        assert_eq!(estimate.relevant_files, 0);
        assert!(estimate.estimated);
    }

    #[test]
    fn test_without_ignore_patterns() {
        let files = [file("a", 3), file("b", 7)];
        let estimate = estimate_total_additions(&files, 2, &[]);
        assert_eq!(estimate.additions, 10);
        assert_eq!(estimate.relevant_files, 2);
    }
}
