//! Pure decision functions. Nothing in here performs I/O; every input is
//! passed explicitly so each function can be tested in isolation.

pub mod additions;
pub mod approval;
pub mod auto_assign;
pub mod author_response;
pub mod checks;
pub mod copilot;
pub mod labels;
pub mod priority;
pub mod size;
pub mod stale;
pub mod status;

pub use additions::{AdditionsEstimate, estimate_total_additions};
pub use approval::should_have_reviewer_approved_label;
pub use auto_assign::should_auto_assign_reviewer;
pub use author_response::has_author_responded_to_changes_request;
pub use checks::{RequiredChecksStatus, get_required_checks_status};
pub use copilot::get_copilot_review_priority;
pub use labels::{LabelPlanInput, plan_label_changes};
pub use priority::{PriorityInput, base_priority, calculate_priority};
pub use size::{SizeLabelError, calculate_size_label};
pub use stale::{StaleReviewInput, should_unassign_stale_review};
pub use status::{StatusDecisionInput, determine_target_status_label};
