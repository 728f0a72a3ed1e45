//! Core data types for expiration resolution.
//!
//! This module defines the directory entries, the per-lookup RDAP outcome,
//! the final report and the resolver configuration.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default location of the IANA RDAP bootstrap registry for DNS.
pub const DEFAULT_BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// Default location of the IANA registrar-id registry.
pub const DEFAULT_REGISTRAR_IDS_URL: &str =
    "https://www.iana.org/assignments/registrar-ids/registrar-ids-1.csv";

/// One label → RDAP base URL mapping from the bootstrap registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BootstrapEntry {
    /// Lowercase top-level label (e.g. "com")
    pub label: String,
    /// RDAP base URL serving that label
    pub service_url: String,
}

/// One row of the IANA registrar-id registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrarEntry {
    /// IANA registrar id
    pub registrar_id: u32,
    /// Registrar name, matched case-insensitively
    pub name: String,
    /// The registrar's own RDAP base URL
    pub rdap_base_url: String,
}

/// Successful outcome of a single RDAP domain lookup.
///
/// Failures are reported through [`crate::ExpiryError`], so a value of this
/// type is never both a day count and a referral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RdapLookupResult {
    /// Signed days until expiration (negative when already expired)
    ExpirationFound { days: i64, expiration_date: NaiveDate },

    /// No expiration event, but the record names a registrar
    RegistrarReferral {
        registrar: String,
        /// Raw body, captured in debug mode only
        body: Option<String>,
    },
}

/// Result of a full expiration resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationReport {
    /// The domain as supplied by the caller
    pub domain: String,

    /// IDNA ASCII form used for every lookup
    pub ascii_domain: String,

    /// Days until expiration, negative when already expired
    pub days: i64,

    /// Calendar date of the expiration event
    pub expiration_date: NaiveDate,

    /// RDAP base URL that supplied the expiration date
    pub rdap_server: String,

    /// Registrar consulted through the fallback hop, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar: Option<String>,
}

/// Configuration for the resolver, its HTTP cache and its RDAP client.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Timeout applied to every outbound request
    /// Default: 120 seconds
    pub timeout: Duration,

    /// Directory holding the persisted HTTP cache
    /// Default: `<tmp>/iana_rdap_cache`
    pub cache_dir: PathBuf,

    /// Freshness used when a response carries no `max-age`
    /// Default: 24 hours
    pub cache_ttl: Duration,

    /// IANA RDAP bootstrap registry URL
    pub bootstrap_url: String,

    /// IANA registrar-id CSV URL
    pub registrar_ids_url: String,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Capture raw RDAP bodies on failure
    /// Default: false
    pub debug: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            cache_dir: std::env::temp_dir().join("iana_rdap_cache"),
            cache_ttl: Duration::from_secs(24 * 3600),
            bootstrap_url: DEFAULT_BOOTSTRAP_URL.to_string(),
            registrar_ids_url: DEFAULT_REGISTRAR_IDS_URL.to_string(),
            user_agent: format!("domain-expiry/{}", env!("CARGO_PKG_VERSION")),
            debug: false,
        }
    }
}

impl ResolverConfig {
    /// Set the timeout for every outbound request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the HTTP cache directory.
    pub fn with_cache_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Set the fallback freshness for responses without `max-age`.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_bootstrap_url<S: Into<String>>(mut self, url: S) -> Self {
        self.bootstrap_url = url.into();
        self
    }

    pub fn with_registrar_ids_url<S: Into<String>>(mut self, url: S) -> Self {
        self.registrar_ids_url = url.into();
        self
    }

    /// Enable or disable raw-body capture.
    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }
}
