//! Error handling for expiration resolution.
//!
//! Every way a resolution attempt can end without a day count is a variant of
//! [`ExpiryError`]. Transport-level errors from the HTTP stack are classified
//! at the component boundary and never leak out of the library.

use std::fmt;

/// Main error type for expiration resolution.
///
/// All variants are terminal for the current attempt. The only automatic
/// follow-up is the single registrar-fallback hop performed by the resolver.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpiryError {
    /// The input could not be normalized into an ASCII domain name
    InvalidDomainFormat { domain: String, reason: String },

    /// The IANA bootstrap registry could not be fetched
    BootstrapUnavailable { url: String, message: String },

    /// The IANA bootstrap registry was fetched but could not be parsed
    BootstrapMalformed { url: String, message: String },

    /// The TLD has no entry in the bootstrap registry
    NoRdapServerForTld { tld: String },

    /// Transport failure (DNS, TCP, TLS, timeout) talking to an RDAP server
    RdapConnectionFailed { server: String, message: String },

    /// HTTP 403
    RdapServerRefused { server: String },

    /// HTTP 404
    DomainNotFound { domain: String, server: String },

    /// HTTP 409
    RdapRateLimited { server: String },

    /// HTTP 503
    RdapServerBroken { server: String },

    /// The RDAP body is not usable JSON or carries an unparseable expiration date
    RdapMalformed {
        server: String,
        message: String,
        body: Option<String>,
    },

    /// No expiration event and no registrar entity in the RDAP record
    NoExpirationAndNoRegistrar {
        domain: String,
        body: Option<String>,
    },

    /// More than one expiration event in the RDAP record
    AmbiguousExpirationData {
        domain: String,
        count: usize,
        body: Option<String>,
    },

    /// The registrar named by the registry is unknown to the registrar directory
    RegistrarNotFound { registrar: String, reason: String },

    /// The registrar's RDAP server did not yield an expiration date either
    NoExpirationAfterFallback {
        domain: String,
        registrar: String,
        /// Why the registrar query failed, when it did not simply lack data
        cause: Option<String>,
        body: Option<String>,
    },

    /// Invalid configuration value or file
    ConfigError { message: String },

    /// File I/O errors when reading configuration
    FileError { path: String, message: String },
}

impl ExpiryError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomainFormat {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    pub fn bootstrap_unavailable<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::BootstrapUnavailable {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn bootstrap_malformed<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::BootstrapMalformed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new connection error for an RDAP server.
    pub fn connection<S: Into<String>, M: Into<String>>(server: S, message: M) -> Self {
        Self::RdapConnectionFailed {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a new malformed-response error.
    pub fn malformed<S: Into<String>, M: Into<String>>(
        server: S,
        message: M,
        body: Option<String>,
    ) -> Self {
        Self::RdapMalformed {
            server: server.into(),
            message: message.into(),
            body,
        }
    }

    /// Create a new registrar-not-found error.
    pub fn registrar_not_found<N: Into<String>, R: Into<String>>(registrar: N, reason: R) -> Self {
        Self::RegistrarNotFound {
            registrar: registrar.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable classification tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidDomainFormat { .. } => "invalid_domain_format",
            Self::BootstrapUnavailable { .. } => "bootstrap_unavailable",
            Self::BootstrapMalformed { .. } => "bootstrap_malformed",
            Self::NoRdapServerForTld { .. } => "no_rdap_server_for_tld",
            Self::RdapConnectionFailed { .. } => "rdap_connection_failed",
            Self::RdapServerRefused { .. } => "rdap_server_refused",
            Self::DomainNotFound { .. } => "domain_not_found",
            Self::RdapRateLimited { .. } => "rdap_rate_limited",
            Self::RdapServerBroken { .. } => "rdap_server_broken",
            Self::RdapMalformed { .. } => "rdap_malformed",
            Self::NoExpirationAndNoRegistrar { .. } => "no_expiration_and_no_registrar",
            Self::AmbiguousExpirationData { .. } => "ambiguous_expiration_data",
            Self::RegistrarNotFound { .. } => "registrar_not_found",
            Self::NoExpirationAfterFallback { .. } => "no_expiration_after_fallback",
            Self::ConfigError { .. } => "config_error",
            Self::FileError { .. } => "file_error",
        }
    }

    /// The raw RDAP body captured in debug mode, if any.
    pub fn raw_body(&self) -> Option<&str> {
        match self {
            Self::RdapMalformed { body, .. }
            | Self::NoExpirationAndNoRegistrar { body, .. }
            | Self::AmbiguousExpirationData { body, .. }
            | Self::NoExpirationAfterFallback { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for ExpiryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomainFormat { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::BootstrapUnavailable { url, message } => {
                write!(f, "The RDAP bootstrap registry {} is unreachable: {}", url, message)
            }
            Self::BootstrapMalformed { url, message } => {
                write!(f, "The RDAP bootstrap registry {} is malformed: {}", url, message)
            }
            Self::NoRdapServerForTld { tld } => {
                write!(f, "The TLD {} does not have an RDAP server", tld)
            }
            Self::RdapConnectionFailed { server, message } => {
                write!(f, "The connection to the RDAP server {} failed: {}", server, message)
            }
            Self::RdapServerRefused { server } => {
                write!(f, "Got 403, the RDAP server {} refused to reply", server)
            }
            Self::DomainNotFound { domain, server } => {
                write!(f, "Got 404, the domain {} has not been found on {}", domain, server)
            }
            Self::RdapRateLimited { server } => {
                write!(f, "Got 409, the RDAP server {} is rate limiting us", server)
            }
            Self::RdapServerBroken { server } => {
                write!(f, "Got 503, the RDAP server {} seems broken", server)
            }
            Self::RdapMalformed {
                server, message, ..
            } => {
                write!(f, "Unusable reply from the RDAP server {}: {}", server, message)
            }
            Self::NoExpirationAndNoRegistrar { domain, .. } => write!(
                f,
                "The domain JSON for {} has neither an expiration event nor a registrar entity, run with --debug to have the JSON dump",
                domain
            ),
            Self::AmbiguousExpirationData { domain, count, .. } => write!(
                f,
                "The domain JSON for {} has {} expiration events, refusing to guess",
                domain, count
            ),
            Self::RegistrarNotFound { registrar, reason } => {
                write!(f, "The registrar '{}' has no known RDAP server: {}", registrar, reason)
            }
            Self::NoExpirationAfterFallback {
                domain,
                registrar,
                cause,
                ..
            } => {
                write!(
                    f,
                    "Neither the registry nor the registrar '{}' publish an expiration date for {}",
                    registrar, domain
                )?;
                if let Some(cause) = cause {
                    write!(f, " ({})", cause)?;
                }
                Ok(())
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
        }
    }
}

impl std::error::Error for ExpiryError {}
