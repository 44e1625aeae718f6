//! Job identifiers

use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generate a job id: creation time in unix seconds plus a random suffix.
pub fn new_job_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}_{}", secs, Uuid::new_v4().simple())
}
