//! Core building blocks shared by every command
//!
//! - **config**: `bundlebot.toml` parsing and validation
//! - **context**: configuration loaded once and passed to commands
//! - **error**: error types with contextual help messages, plus run diagnostics
//! - **vcs**: git operations on the umbrella checkout (SystemGit)

pub mod config;
pub mod context;
pub mod error;
pub mod vcs;
