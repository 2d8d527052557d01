//! In-memory stand-ins for git and the forge, with call counters

use crate::core::error::{BotError, BotResult, GitError};
use crate::core::vcs::{BundleRepo, LogEntry};
use crate::forge::ForgeClient;
use crate::forge::client::{ForgeResponse, ForgeResult};
use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

/// Commit detail JSON as the forge returns it
pub fn commit_json(sha: &str, author: Option<&str>, committer: Option<&str>) -> String {
  let user = |login: Option<&str>| match login {
    Some(l) => serde_json::json!({ "login": l }),
    None => serde_json::Value::Null,
  };
  serde_json::json!({
    "sha": sha,
    "author": user(author),
    "committer": user(committer),
    "commit": { "committer": { "email": "x@example.com", "date": "2024-03-01T12:00:00Z" } }
  })
  .to_string()
}

#[derive(Default)]
pub struct FakeRepo {
  diff: String,
  head: String,
  tags: HashMap<(String, String), String>,
  logs: HashMap<(Option<String>, String), Vec<LogEntry>>,
  failing_logs: HashSet<Option<String>>,
  diff_calls: Cell<usize>,
  log_calls: Cell<usize>,
}

impl FakeRepo {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_diff(mut self, diff: &str) -> Self {
    self.diff = diff.to_string();
    self
  }

  pub fn with_head(mut self, head: &str) -> Self {
    self.head = head.to_string();
    self
  }

  pub fn with_tag(mut self, submodule: &str, commit: &str, tag: &str) -> Self {
    self
      .tags
      .insert((submodule.to_string(), commit.to_string()), tag.to_string());
    self
  }

  pub fn with_log(mut self, submodule: Option<&str>, range: &str, entries: Vec<LogEntry>) -> Self {
    self
      .logs
      .insert((submodule.map(str::to_string), range.to_string()), entries);
    self
  }

  pub fn failing_log(mut self, submodule: Option<&str>) -> Self {
    self.failing_logs.insert(submodule.map(str::to_string));
    self
  }

  pub fn diff_calls(&self) -> usize {
    self.diff_calls.get()
  }

  pub fn log_calls(&self) -> usize {
    self.log_calls.get()
  }
}

impl BundleRepo for FakeRepo {
  fn submodule_diff(&self, _since: &str) -> BotResult<String> {
    self.diff_calls.set(self.diff_calls.get() + 1);
    Ok(self.diff.clone())
  }

  fn exact_tag(&self, submodule: &str, commit: &str) -> BotResult<Option<String>> {
    Ok(self.tags.get(&(submodule.to_string(), commit.to_string())).cloned())
  }

  fn commit_log(&self, submodule: Option<&str>, range: &str) -> BotResult<Vec<LogEntry>> {
    self.log_calls.set(self.log_calls.get() + 1);
    let key = submodule.map(str::to_string);
    if self.failing_logs.contains(&key) {
      return Err(BotError::Git(GitError::CommandFailed {
        command: "git log".to_string(),
        stderr: "fatal: bad revision".to_string(),
      }));
    }
    Ok(self.logs.get(&(key, range.to_string())).cloned().unwrap_or_default())
  }

  fn head_commit(&self) -> BotResult<String> {
    Ok(self.head.clone())
  }
}

struct Route {
  status: u16,
  body: String,
  next_page: Option<String>,
}

/// Forge serving canned responses; unknown paths answer 404
pub struct FakeForge {
  routes: HashMap<String, Route>,
  publish_status: u16,
  publish_body: Option<String>,
  gets: RefCell<Vec<String>>,
  posts: RefCell<Vec<serde_json::Value>>,
}

impl FakeForge {
  pub fn new() -> Self {
    Self {
      routes: HashMap::new(),
      publish_status: 201,
      publish_body: None,
      gets: RefCell::new(Vec::new()),
      posts: RefCell::new(Vec::new()),
    }
  }

  pub fn with_json(self, path: &str, body: &str) -> Self {
    self.with_status(path, 200, body)
  }

  pub fn with_status(mut self, path: &str, status: u16, body: &str) -> Self {
    self.routes.insert(
      path.to_string(),
      Route {
        status,
        body: body.to_string(),
        next_page: None,
      },
    );
    self
  }

  pub fn with_page(mut self, path: &str, body: &str, next: Option<&str>) -> Self {
    self.routes.insert(
      path.to_string(),
      Route {
        status: 200,
        body: body.to_string(),
        next_page: next.map(str::to_string),
      },
    );
    self
  }

  pub fn reject_publish(mut self, status: u16, body: &str) -> Self {
    self.publish_status = status;
    self.publish_body = Some(body.to_string());
    self
  }

  /// GET requests whose path starts with `prefix`
  pub fn get_calls(&self, prefix: &str) -> usize {
    self.gets.borrow().iter().filter(|p| p.starts_with(prefix)).count()
  }

  pub fn publish_calls(&self) -> usize {
    self.posts.borrow().len()
  }

  /// Bodies posted to the release endpoint
  pub fn published(&self) -> Vec<serde_json::Value> {
    self.posts.borrow().clone()
  }
}

impl ForgeClient for FakeForge {
  fn get(&self, path: &str) -> ForgeResult<ForgeResponse> {
    self.gets.borrow_mut().push(path.to_string());
    Ok(match self.routes.get(path) {
      Some(route) => ForgeResponse {
        url: path.to_string(),
        status: route.status,
        body: route.body.clone(),
        next_page: route.next_page.clone(),
      },
      None => ForgeResponse {
        url: path.to_string(),
        status: 404,
        body: r#"{"message":"Not Found"}"#.to_string(),
        next_page: None,
      },
    })
  }

  fn post_json(&self, path: &str, body: &serde_json::Value) -> ForgeResult<ForgeResponse> {
    self.posts.borrow_mut().push(body.clone());
    let response_body = match &self.publish_body {
      Some(b) => b.clone(),
      None => serde_json::json!({
        "tag_name": body["tag_name"],
        "html_url": format!("https://github.com{}/tag", path.trim_start_matches("/repos")),
      })
      .to_string(),
    };
    Ok(ForgeResponse {
      url: path.to_string(),
      status: self.publish_status,
      body: response_body,
      next_page: None,
    })
  }
}
