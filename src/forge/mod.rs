//! Forge (code-hosting REST API) access

pub mod api;
pub mod client;
pub mod types;

pub use client::{ForgeClient, GitHubClient};
