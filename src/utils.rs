//! Small string helpers shared by the forge client and the bundle engine

/// Replace every occurrence of `secret` with `[secure]`
///
/// Used on anything that may echo a request URL or header back to the user.
pub fn redact(text: &str, secret: Option<&str>) -> String {
  match secret {
    Some(s) if !s.is_empty() => text.replace(s, "[secure]"),
    _ => text.to_string(),
  }
}

/// Drop a trailing `.git` from a remote URL
pub fn strip_git_suffix(url: &str) -> &str {
  url.strip_suffix(".git").unwrap_or(url)
}

/// `owner/repo` from a remote URL
///
/// Works for `https://host/owner/repo(.git)` and `git@host:owner/repo(.git)`.
pub fn repo_name(url: &str) -> Option<String> {
  let trimmed = strip_git_suffix(url.trim_end_matches('/'));
  let mut parts = trimmed.rsplit(['/', ':']);
  let repo = parts.next().filter(|s| !s.is_empty())?;
  let owner = parts.next().filter(|s| !s.is_empty())?;
  Some(format!("{}/{}", owner, repo))
}
