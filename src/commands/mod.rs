//! CLI commands for bundlebot
//!
//! ## Setup & Inspection
//! - **init**: write a default `bundlebot.toml`
//! - **registry**: list a bundle's submodules, check membership of a URL
//!
//! ## Bundles
//! - **bundle**: update submodules, extract changes, publish dated releases
//!
//! ## Libraries
//! - **library**: release state and next-release proposals
//!
//! All commands accept `&RunContext` so configuration is loaded once.

pub mod bundle;
pub mod init;
pub mod library;
pub mod registry;

pub use bundle::{run_bundle_changes, run_bundle_release, run_bundle_update};
pub use init::run_init;
pub use library::{run_library_plan, run_library_status};
pub use registry::{run_contains, run_submodules};
