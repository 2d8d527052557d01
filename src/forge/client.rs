//! Blocking HTTP client for the forge API
//!
//! The engine only needs "give me the body for this path" and "post this JSON
//! to this path". [`ForgeClient`] is that seam; [`GitHubClient`] implements it
//! over `reqwest::blocking` with authentication, `Link`-header pagination and
//! rate-limit pauses.

use crate::core::config::ForgeConfig;
use crate::core::error::{BotError, BotResult, ForgeError};
use crate::utils::redact;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, LINK};
use std::time::Duration;

const ACCEPT_JSON: &str = "application/vnd.github+json";

/// Treated as "plenty left" when the forge omits the quota header
const UNKNOWN_REMAINING: u64 = 1_000_000;

/// Extra wait after the advertised reset, to avoid racing the window
const RESET_GRACE_SECS: u64 = 60;

pub type ForgeResult<T> = Result<T, ForgeError>;

/// A forge response, decoded only as far as the transport layer cares
#[derive(Debug, Clone)]
pub struct ForgeResponse {
  pub url: String,
  pub status: u16,
  pub body: String,
  /// `rel="next"` target from the `Link` header
  pub next_page: Option<String>,
}

impl ForgeResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Decode the body as `T`
  pub fn json<T: serde::de::DeserializeOwned>(&self) -> ForgeResult<T> {
    serde_json::from_str(&self.body).map_err(|e| ForgeError::Decode {
      url: self.url.clone(),
      reason: e.to_string(),
    })
  }

  /// `message` field of an error body, or the raw body
  pub fn error_message(&self) -> String {
    serde_json::from_str::<crate::forge::types::ErrorBody>(&self.body)
      .map(|b| b.message)
      .unwrap_or_else(|_| self.body.chars().take(200).collect())
  }
}

/// Request/response capability consumed by the engine
pub trait ForgeClient {
  /// GET an API path (leading `/`) or an absolute URL
  fn get(&self, path: &str) -> ForgeResult<ForgeResponse>;

  /// POST a JSON body to an API path
  fn post_json(&self, path: &str, body: &serde_json::Value) -> ForgeResult<ForgeResponse>;
}

/// Forge client backed by `reqwest::blocking`
pub struct GitHubClient {
  http: Client,
  api_url: String,
  token: Option<String>,
  user: Option<String>,
}

impl GitHubClient {
  /// Build from config, reading credentials from the configured env vars
  pub fn from_config(config: &ForgeConfig) -> BotResult<Self> {
    let http = Client::builder()
      .connect_timeout(Duration::from_secs(15))
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("bundlebot/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| BotError::message(format!("Failed to build HTTP client: {}", e)))?;

    let token = config.token();
    if token.is_none() {
      tracing::warn!(env = %config.token_env, "no forge token set; requests are anonymous and heavily rate limited");
    }

    Ok(Self {
      http,
      api_url: config.api_url.trim_end_matches('/').to_string(),
      token,
      user: config.user(),
    })
  }

  fn resolve_url(&self, path: &str) -> String {
    if path.starts_with('/') {
      format!("{}{}", self.api_url, path)
    } else {
      path.to_string()
    }
  }

  fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
    let builder = builder.header(ACCEPT, ACCEPT_JSON);
    match (&self.token, &self.user) {
      (Some(token), Some(user)) => builder.basic_auth(user, Some(token)),
      (Some(token), None) => builder.bearer_auth(token),
      _ => builder,
    }
  }

  fn send(&self, method: &str, url: String, builder: RequestBuilder) -> ForgeResult<ForgeResponse> {
    let response = self.authorize(builder).send().map_err(|e| {
      let reason = redact(&e.to_string(), self.token.as_deref());
      tracing::error!(method, url = %url, "{}", reason);
      ForgeError::Transport {
        url: url.clone(),
        reason,
      }
    })?;

    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let remaining = header_u64(&headers, "x-ratelimit-remaining").unwrap_or(UNKNOWN_REMAINING);
    tracing::debug!(method, url = %url, status, remaining, "forge request");

    let next_page = headers
      .get(LINK)
      .and_then(|v| v.to_str().ok())
      .and_then(next_link);
    let body = read_body(response, &url, self.token.as_deref())?;

    if remaining % 100 == 0 || remaining < 20 {
      tracing::info!("{} requests remaining this hour", remaining);
    }
    if let Some(reset) = header_u64(&headers, "x-ratelimit-reset")
      && let Some(wait) = rate_limit_pause(remaining, reset, now_epoch())
    {
      tracing::warn!(seconds = wait.as_secs(), "forge rate limit reached; pausing until reset");
      std::thread::sleep(wait);
    }

    Ok(ForgeResponse {
      url,
      status,
      body,
      next_page,
    })
  }
}

impl ForgeClient for GitHubClient {
  fn get(&self, path: &str) -> ForgeResult<ForgeResponse> {
    let url = self.resolve_url(path);
    let builder = self.http.get(&url);
    self.send("GET", url, builder)
  }

  fn post_json(&self, path: &str, body: &serde_json::Value) -> ForgeResult<ForgeResponse> {
    let url = self.resolve_url(path);
    let builder = self.http.post(&url).json(body);
    self.send("POST", url, builder)
  }
}

fn read_body(response: Response, url: &str, secret: Option<&str>) -> ForgeResult<String> {
  response.text().map_err(|e| ForgeError::Transport {
    url: url.to_string(),
    reason: redact(&e.to_string(), secret),
  })
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
  headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn now_epoch() -> u64 {
  chrono::Utc::now().timestamp().max(0) as u64
}

/// How long to block before the next request, if at all
///
/// Pauses only once the quota is down to its last request, until the reset
/// epoch plus a grace minute.
pub fn rate_limit_pause(remaining: u64, reset_epoch: u64, now_epoch: u64) -> Option<Duration> {
  if remaining > 1 || reset_epoch <= now_epoch {
    return None;
  }
  Some(Duration::from_secs(reset_epoch - now_epoch + RESET_GRACE_SECS))
}

/// Extract the `rel="next"` URL from a `Link` header
pub fn next_link(header: &str) -> Option<String> {
  header.split(',').find_map(|part| {
    let mut pieces = part.split(';');
    let target = pieces.next()?.trim();
    let is_next = pieces.any(|p| {
      let p = p.trim();
      p == "rel=\"next\"" || p == "rel=next"
    });
    if !is_next {
      return None;
    }
    target
      .strip_prefix('<')
      .and_then(|t| t.strip_suffix('>'))
      .map(str::to_string)
  })
}
