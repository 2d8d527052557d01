//! Integration tests for bundlebot
//!
//! These drive the built binary against temporary git repositories.
//! Nothing here talks to the network: forge-backed commands are covered by
//! unit tests with a fake client.

mod helpers;
mod test_changes;
mod test_init;
mod test_logging;
mod test_registry;
mod test_release;
