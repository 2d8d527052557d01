//! Bundle reconciliation engine
//!
//! - **manifest**: `.gitmodules` scanning, URL normalisation, bundle membership
//! - **diff**: submodule pointer moves since a release tag
//! - **version**: commit → tag resolution inside submodules
//! - **identity**: persisted email → username cache
//! - **contributors**: per-range tallies and their merge
//! - **release**: the staged release synthesizer
//! - **update**: moving submodules to their newest releases

pub mod contributors;
pub mod diff;
pub mod identity;
pub mod manifest;
pub mod release;
pub mod update;
pub mod version;

#[cfg(test)]
pub(crate) mod testing;
