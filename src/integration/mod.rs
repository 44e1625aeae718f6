//! Integration testing module
//!
//! End-to-end tests through the HTTP router:
//! - Download submission and status polling
//! - Playlist confirmation flow
//! - Finished file listing and serving


#[cfg(test)]
mod e2e;
