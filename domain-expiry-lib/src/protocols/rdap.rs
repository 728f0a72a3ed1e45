//! RDAP (Registration Data Access Protocol) domain lookups.
//!
//! One lookup is one HTTP GET of `{base}domain/{name}`. The status code is
//! classified before the body is looked at; the body is then searched for a
//! single `expiration` event, or failing that for the registrar entity the
//! record defers to.

use crate::error::ExpiryError;
use crate::types::RdapLookupResult;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::header::ACCEPT;
use serde_json::Value;
use tracing::debug;

/// How an RDAP HTTP status is handled.
///
/// The recognized codes short-circuit the lookup; everything else, including
/// unexpected non-success codes, proceeds to body parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdapStatus {
    /// 403
    Refused,
    /// 404
    NotFound,
    /// 409
    RateLimited,
    /// 503
    Broken,
    /// Parse the body
    Proceed,
}

impl RdapStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            403 => Self::Refused,
            404 => Self::NotFound,
            409 => Self::RateLimited,
            503 => Self::Broken,
            _ => Self::Proceed,
        }
    }
}

/// RDAP client performing single domain lookups.
#[derive(Clone)]
pub struct RdapClient {
    /// Shared HTTP client; carries the configured timeout
    http_client: reqwest::Client,
    /// Attach raw bodies to body-level failures
    debug: bool,
}

impl RdapClient {
    pub fn new(http_client: reqwest::Client, debug: bool) -> Self {
        Self { http_client, debug }
    }

    /// Build the lookup URL for `domain` under `base_url`.
    pub fn domain_url(base_url: &str, domain: &str) -> String {
        if base_url.ends_with('/') {
            format!("{}domain/{}", base_url, domain)
        } else {
            format!("{}/domain/{}", base_url, domain)
        }
    }

    /// Look up `domain` on the RDAP server at `base_url`.
    ///
    /// `now` is the instant the day count is computed against.
    ///
    /// # Errors
    ///
    /// - `RdapConnectionFailed` for transport failures and timeouts
    /// - `RdapServerRefused`, `DomainNotFound`, `RdapRateLimited`,
    ///   `RdapServerBroken` for the recognized status codes
    /// - `RdapMalformed`, `NoExpirationAndNoRegistrar`,
    ///   `AmbiguousExpirationData` for unusable bodies
    pub async fn lookup(
        &self,
        base_url: &str,
        domain: &str,
        now: DateTime<Utc>,
    ) -> Result<RdapLookupResult, ExpiryError> {
        let url = Self::domain_url(base_url, domain);
        debug!("The used RDAP server is {}", base_url);

        let response = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/rdap+json, application/json")
            .send()
            .await
            .map_err(|e| ExpiryError::connection(base_url, e.to_string()))?;

        let code = response.status().as_u16();
        debug!("RDAP response for {}: HTTP {}", url, code);

        match RdapStatus::from_code(code) {
            RdapStatus::Refused => {
                return Err(ExpiryError::RdapServerRefused {
                    server: base_url.to_string(),
                })
            }
            RdapStatus::NotFound => {
                return Err(ExpiryError::DomainNotFound {
                    domain: domain.to_string(),
                    server: base_url.to_string(),
                })
            }
            RdapStatus::RateLimited => {
                return Err(ExpiryError::RdapRateLimited {
                    server: base_url.to_string(),
                })
            }
            RdapStatus::Broken => {
                return Err(ExpiryError::RdapServerBroken {
                    server: base_url.to_string(),
                })
            }
            RdapStatus::Proceed => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| ExpiryError::connection(base_url, e.to_string()))?;
        debug!("The used RDAP JSON is {}", body);

        let captured = self.debug.then(|| body.clone());
        let json: Value = serde_json::from_str(&body).map_err(|e| {
            ExpiryError::malformed(
                base_url,
                format!("response is not JSON: {}", e),
                captured.clone(),
            )
        })?;

        interpret_response(&json, domain, base_url, now, captured)
    }
}

/// Turn a parsed RDAP domain object into a lookup result.
///
/// `body` is attached to body-level failures for diagnosis.
pub fn interpret_response(
    json: &Value,
    domain: &str,
    server: &str,
    now: DateTime<Utc>,
    body: Option<String>,
) -> Result<RdapLookupResult, ExpiryError> {
    let dates = expiration_event_dates(json);

    match dates.as_slice() {
        [] => match extract_registrar_name(json) {
            Some(registrar) => {
                debug!("No expiration event for {}, registrar is {}", domain, registrar);
                Ok(RdapLookupResult::RegistrarReferral { registrar, body })
            }
            None => Err(ExpiryError::NoExpirationAndNoRegistrar {
                domain: domain.to_string(),
                body,
            }),
        },
        [date] => {
            let expiration_date = date.and_then(parse_event_date).ok_or_else(|| {
                ExpiryError::malformed(
                    server,
                    format!("unparseable expiration eventDate {:?}", date),
                    body.clone(),
                )
            })?;
            Ok(RdapLookupResult::ExpirationFound {
                days: days_until(expiration_date, now),
                expiration_date,
            })
        }
        many => Err(ExpiryError::AmbiguousExpirationData {
            domain: domain.to_string(),
            count: many.len(),
            body,
        }),
    }
}

/// The `eventDate` of every event whose action is `expiration`.
///
/// An expiration event without a string date yields `None` so it still
/// counts towards ambiguity.
fn expiration_event_dates(json: &Value) -> Vec<Option<&str>> {
    json.get("events")
        .and_then(|e| e.as_array())
        .map(|events| {
            events
                .iter()
                .filter(|event| {
                    event.get("eventAction").and_then(|a| a.as_str()) == Some("expiration")
                })
                .map(|event| event.get("eventDate").and_then(|d| d.as_str()))
                .collect()
        })
        .unwrap_or_default()
}

/// Parse the date portion (before `T`) of an RDAP `eventDate`.
pub fn parse_event_date(event_date: &str) -> Option<NaiveDate> {
    let date = event_date.trim().split('T').next()?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Whole days from `now` to the start (00:00 UTC) of `expiration`, floored.
///
/// A domain expiring later today counts as 0, one that expired earlier today
/// as -1.
pub fn days_until(expiration: NaiveDate, now: DateTime<Utc>) -> i64 {
    let expires_at = expiration.and_time(NaiveTime::MIN).and_utc();
    (expires_at - now).num_seconds().div_euclid(86_400)
}

/// Name of the first entity carrying the `registrar` role.
pub fn extract_registrar_name(json: &Value) -> Option<String> {
    json.get("entities")
        .and_then(|e| e.as_array())?
        .iter()
        .find(|entity| {
            entity
                .get("roles")
                .and_then(|r| r.as_array())
                .map(|roles| roles.iter().any(|role| role.as_str() == Some("registrar")))
                .unwrap_or(false)
        })
        .and_then(registrar_name_from_vcard)
}

/// Registrar display name from an entity's `vcardArray`.
///
/// Registries emit the name as the property immediately before `email`; that
/// position is used first. When it yields nothing, the `fn` property is used.
/// All vCard knowledge lives here so a structured parser can replace it.
pub fn registrar_name_from_vcard(entity: &Value) -> Option<String> {
    let properties = entity
        .get("vcardArray")
        .and_then(|v| v.as_array())
        .and_then(|a| a.get(1))
        .and_then(|p| p.as_array())?;

    let property_name = |p: &Value| p.get(0).and_then(|n| n.as_str()).map(str::to_owned);
    let text_value = |p: &Value| {
        p.get(3)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let positional = properties
        .iter()
        .position(|p| property_name(p).as_deref() == Some("email"))
        .filter(|&index| index > 0)
        .and_then(|index| text_value(&properties[index - 1]));

    positional.or_else(|| {
        properties
            .iter()
            .find(|p| property_name(p).as_deref() == Some("fn"))
            .and_then(text_value)
    })
}
