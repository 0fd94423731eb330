use thiserror::Error;

use crate::config::SizeLabelConfig;

/// Raised when the size table has no bucket for an addition count, which
/// means the table is misconfigured.
#[derive(Debug, Error, PartialEq)]
#[error("no size label configured for {additions} additions")]
pub struct SizeLabelError {
    pub additions: u64,
}

/// Returns the first bucket whose threshold admits `additions`.
pub fn calculate_size_label(
    additions: u64,
    size_labels: &[SizeLabelConfig],
) -> Result<&str, SizeLabelError> {
    size_labels
        .iter()
        .find(|size| size.threshold.admits(additions))
        .map(|size| size.label.as_str())
        .ok_or(SizeLabelError { additions })
}
