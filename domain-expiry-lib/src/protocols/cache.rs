//! Persistent, URL-keyed HTTP cache for the IANA registries.
//!
//! Entries live as one JSON file per URL in a single directory and survive
//! across process invocations. Freshness follows the response's
//! `Cache-Control` header; stale entries with validators are revalidated with
//! a conditional request. Writes go through a temporary file that is renamed
//! into place, so concurrent processes can at worst lose an update.

use chrono::Utc;
use reqwest::header::{
    HeaderMap, CACHE_CONTROL, ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED,
};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Why a cached fetch produced no body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Connection, TLS, timeout or body read failure
    Transport(String),
    /// The server answered with a non-success status
    Status(u16),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(message) => write!(f, "{}", message),
            Self::Status(code) => write!(f, "server returned HTTP {}", code),
        }
    }
}

/// The subset of `Cache-Control` directives the cache acts on.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CacheDirectives {
    no_store: bool,
    no_cache: bool,
    max_age: Option<u64>,
}

impl CacheDirectives {
    fn parse(value: &str) -> Self {
        let mut directives = Self::default();
        for token in value.split(',') {
            let token = token.trim().to_ascii_lowercase();
            if token == "no-store" {
                directives.no_store = true;
            } else if token == "no-cache" {
                directives.no_cache = true;
            } else if let Some(age) = token.strip_prefix("max-age=") {
                directives.max_age = age.trim_matches('"').parse().ok();
            }
        }
        directives
    }

    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        headers
            .get(CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(Self::parse)
    }

    /// Seconds the response may be served without contacting the origin.
    fn lifetime(&self, default_ttl: Duration) -> u64 {
        if self.no_cache {
            0
        } else {
            self.max_age.unwrap_or(default_ttl.as_secs())
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    url: String,
    stored_at: i64,
    lifetime: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    last_modified: Option<String>,
    body: String,
}

impl CacheEntry {
    fn is_fresh(&self, now: i64) -> bool {
        let age = now - self.stored_at;
        age >= 0 && (age as u64) < self.lifetime
    }
}

/// HTTP GET with a persisted cache in front of it.
///
/// Constructed explicitly and owned by whoever loads the registries; there is
/// no process-wide session.
#[derive(Clone)]
pub struct HttpCache {
    client: reqwest::Client,
    dir: PathBuf,
    default_ttl: Duration,
}

impl HttpCache {
    /// Create a cache rooted at `dir` that fetches through `client`.
    pub fn new<P: Into<PathBuf>>(client: reqwest::Client, dir: P, default_ttl: Duration) -> Self {
        Self {
            client,
            dir: dir.into(),
            default_ttl,
        }
    }

    /// Fetch `url`, serving it from disk while fresh.
    pub async fn get(&self, url: &str) -> Result<String, FetchFailure> {
        let now = Utc::now().timestamp();
        let cached = self.read_entry(url);

        if let Some(entry) = &cached {
            if entry.is_fresh(now) {
                debug!("Cache hit for {}", url);
                return Ok(entry.body.clone());
            }
            debug!("Cache entry for {} is stale, revalidating", url);
        } else {
            debug!("Cache miss for {}", url);
        }

        let mut request = self.client.get(url);
        if let Some(entry) = &cached {
            if let Some(etag) = &entry.etag {
                request = request.header(IF_NONE_MATCH, etag.as_str());
            }
            if let Some(last_modified) = &entry.last_modified {
                request = request.header(IF_MODIFIED_SINCE, last_modified.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            if let Some(mut entry) = cached {
                debug!("{} not modified, refreshing cache entry", url);
                if let Some(directives) = CacheDirectives::from_headers(response.headers()) {
                    entry.lifetime = directives.lifetime(self.default_ttl);
                }
                entry.stored_at = now;
                self.write_entry(&entry);
                return Ok(entry.body);
            }
        }

        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }

        let directives = CacheDirectives::from_headers(response.headers()).unwrap_or_default();
        let etag = header_string(response.headers(), ETAG);
        let last_modified = header_string(response.headers(), LAST_MODIFIED);

        let body = response
            .text()
            .await
            .map_err(|e| FetchFailure::Transport(e.to_string()))?;

        if directives.no_store {
            debug!("{} marked no-store, not caching", url);
        } else {
            self.write_entry(&CacheEntry {
                url: url.to_string(),
                stored_at: now,
                lifetime: directives.lifetime(self.default_ttl),
                etag,
                last_modified,
                body: body.clone(),
            });
        }

        Ok(body)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(cache_file_name(url))
    }

    fn read_entry(&self, url: &str) -> Option<CacheEntry> {
        let path = self.entry_path(url);
        let content = std::fs::read(&path).ok()?;
        match serde_json::from_slice::<CacheEntry>(&content) {
            Ok(entry) if entry.url == url => Some(entry),
            Ok(_) => None,
            Err(e) => {
                warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write_entry(&self, entry: &CacheEntry) {
        if let Err(e) = self.try_write_entry(entry) {
            warn!("Could not update cache for {}: {}", entry.url, e);
        }
    }

    fn try_write_entry(&self, entry: &CacheEntry) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(&serde_json::to_vec(entry)?)?;
        file.persist(self.entry_path(&entry.url))
            .map_err(|e| e.error)?;
        Ok(())
    }
}

fn header_string(headers: &HeaderMap, name: reqwest::header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// File name for a URL's cache entry.
fn cache_file_name(url: &str) -> String {
    let mut name: String = url
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    name.push_str(".json");
    name
}
