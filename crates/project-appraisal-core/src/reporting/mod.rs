//! Boundary between the appraisal kernel and its external collaborators:
//! the parameter-extraction service, the narrative-evaluation service and
//! the presentation layer.

pub mod extraction;
pub mod retry;
pub mod session;
pub mod snapshot;
