pub mod appraisal;
pub mod metrics;
pub mod payback;
pub mod schedule;
