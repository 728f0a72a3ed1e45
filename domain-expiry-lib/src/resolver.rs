//! Expiration resolver.
//!
//! This module provides [`ExpirationResolver`], which walks the RDAP
//! hierarchy for one domain:
//!
//! ```text
//! Start -> TldLookup -> RegistryQuery -> Done
//!                                     -> RegistrarLookup -> RegistrarQuery -> Done
//! ```
//!
//! Any state may end in a classified failure. The registrar hop happens at
//! most once; it exists because registries and registrars disagree on who
//! publishes the expiration date, not to paper over transient errors. Apart
//! from a 404, every registrar-side failure ends as
//! `NoExpirationAfterFallback` carrying the underlying cause.

use crate::error::ExpiryError;
use crate::protocols::{BootstrapDirectory, HttpCache, RdapClient, RegistrarDirectory};
use crate::types::{ExpirationReport, RdapLookupResult, ResolverConfig};
use crate::utils::{extract_tld, normalize_domain};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// Resolves the number of days until a domain expires.
///
/// The resolver owns its HTTP client and registry cache; both live exactly as
/// long as the resolver.
///
/// # Example
///
/// ```rust,no_run
/// use domain_expiry_lib::ExpirationResolver;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = ExpirationResolver::new()?;
///     let report = resolver.resolve("example.com").await?;
///     println!("{} days until {} expires", report.days, report.domain);
///     Ok(())
/// }
/// ```
pub struct ExpirationResolver {
    config: ResolverConfig,
    cache: HttpCache,
    rdap_client: RdapClient,
}

impl ExpirationResolver {
    /// Create a resolver with default configuration.
    pub fn new() -> Result<Self, ExpiryError> {
        Self::with_config(ResolverConfig::default())
    }

    /// Create a resolver with custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use domain_expiry_lib::{ExpirationResolver, ResolverConfig};
    /// use std::time::Duration;
    ///
    /// let config = ResolverConfig::default()
    ///     .with_timeout(Duration::from_secs(30))
    ///     .with_debug(true);
    ///
    /// let resolver = ExpirationResolver::with_config(config).unwrap();
    /// ```
    pub fn with_config(config: ResolverConfig) -> Result<Self, ExpiryError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ExpiryError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_http_client(config, http_client))
    }

    /// Create a resolver around an existing HTTP client.
    ///
    /// The client's own timeout and proxy settings are used as-is.
    pub fn with_http_client(config: ResolverConfig, http_client: reqwest::Client) -> Self {
        let cache = HttpCache::new(
            http_client.clone(),
            config.cache_dir.clone(),
            config.cache_ttl,
        );
        let rdap_client = RdapClient::new(http_client, config.debug);

        Self {
            config,
            cache,
            rdap_client,
        }
    }

    /// Get the configuration of this resolver.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve the days until `domain` expires, as of now.
    pub async fn resolve(&self, domain: &str) -> Result<ExpirationReport, ExpiryError> {
        self.resolve_at(domain, Utc::now()).await
    }

    /// Resolve the days until `domain` expires, as of `now`.
    ///
    /// # Errors
    ///
    /// Every [`ExpiryError`] classification except the configuration ones.
    pub async fn resolve_at(
        &self,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<ExpirationReport, ExpiryError> {
        // Start
        let ascii_domain = normalize_domain(domain)?;

        // TldLookup
        let tld = extract_tld(&ascii_domain)?;
        let bootstrap = BootstrapDirectory::load(&self.cache, &self.config.bootstrap_url).await?;
        let registry_url = bootstrap.resolve(&tld)?.to_string();

        // RegistryQuery
        let registrar = match self
            .rdap_client
            .lookup(&registry_url, &ascii_domain, now)
            .await?
        {
            RdapLookupResult::ExpirationFound {
                days,
                expiration_date,
            } => {
                return Ok(ExpirationReport {
                    domain: domain.to_string(),
                    ascii_domain,
                    days,
                    expiration_date,
                    rdap_server: registry_url,
                    registrar: None,
                });
            }
            RdapLookupResult::RegistrarReferral { registrar, .. } => registrar,
        };

        // RegistrarLookup
        info!(
            "{} has no expiration date at {}, asking registrar '{}'",
            ascii_domain, registry_url, registrar
        );
        let registrars =
            RegistrarDirectory::load(&self.cache, &self.config.registrar_ids_url)
                .await
                .map_err(|reason| ExpiryError::registrar_not_found(&registrar, reason))?;
        let registrar_url = registrars.resolve(&registrar)?.to_string();
        debug!("Registrar '{}' RDAP server is {}", registrar, registrar_url);

        // RegistrarQuery
        let (cause, body) = match self
            .rdap_client
            .lookup(&registrar_url, &ascii_domain, now)
            .await
        {
            Ok(RdapLookupResult::ExpirationFound {
                days,
                expiration_date,
            }) => {
                return Ok(ExpirationReport {
                    domain: domain.to_string(),
                    ascii_domain,
                    days,
                    expiration_date,
                    rdap_server: registrar_url,
                    registrar: Some(registrar),
                });
            }
            Ok(RdapLookupResult::RegistrarReferral {
                registrar: referred,
                body,
            }) => {
                debug!("Registrar record refers to '{}' again, not following", referred);
                (None, body)
            }
            Err(ExpiryError::NoExpirationAndNoRegistrar { body, .. }) => (None, body),
            Err(not_found @ ExpiryError::DomainNotFound { .. }) => return Err(not_found),
            Err(other) => (
                Some(other.to_string()),
                other.raw_body().map(str::to_owned),
            ),
        };

        Err(ExpiryError::NoExpirationAfterFallback {
            domain: ascii_domain,
            registrar,
            cause,
            body,
        })
    }
}
