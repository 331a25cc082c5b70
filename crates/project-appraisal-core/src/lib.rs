pub mod error;
pub mod time_value;
pub mod types;

#[cfg(feature = "capital_budgeting")]
pub mod capital_budgeting;

#[cfg(feature = "reporting")]
pub mod reporting;

pub use error::AppraisalError;
pub use types::*;

/// Standard result type for all project-appraisal operations
pub type AppraisalResult<T> = Result<T, AppraisalError>;
