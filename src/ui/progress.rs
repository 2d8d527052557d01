//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free progress bars on stderr

use linya::{Bar, Progress};
use std::io::IsTerminal;

/// Progress bar over the submodules of one bundle
pub struct SubmoduleProgress {
  progress: Progress,
  bar: Bar,
}

impl SubmoduleProgress {
  /// Create a new progress bar
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// A bar only when stderr is an interactive terminal and there's work
  pub fn for_terminal(total: usize, label: impl Into<String>) -> Option<Self> {
    if total == 0 || !std::io::stderr().is_terminal() {
      return None;
    }
    Some(Self::new(total, label))
  }

  /// Increment progress by 1
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}
