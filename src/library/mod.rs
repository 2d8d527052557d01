//! Per-library release checks
//!
//! - **status**: how long unreleased changes have been waiting
//! - **plan**: whether a release is due and the candidate tags

pub mod plan;
pub mod status;
