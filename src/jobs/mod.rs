//! Job tracking
//!
//! - Job status records and their transitions
//! - Concurrent tracker keyed by job id
//! - Job id generation

pub mod id;
pub mod record;
pub mod tracker;

pub use id::new_job_id;
pub use record::Job;
pub use tracker::JobTracker;
