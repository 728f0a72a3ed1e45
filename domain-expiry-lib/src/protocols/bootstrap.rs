//! IANA RDAP bootstrap directory.
//!
//! Maps a top-level label to the RDAP base URL that serves it, built from the
//! IANA bootstrap registry for DNS (RFC 9224). The document is fetched
//! through the [`HttpCache`] and the flat map is rebuilt on every load.

use crate::error::ExpiryError;
use crate::protocols::cache::HttpCache;
use crate::types::BootstrapEntry;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

/// The parts of the bootstrap document we use.
///
/// Each service is a two-element array: the labels, then the base URLs.
#[derive(Debug, Deserialize)]
struct BootstrapDocument {
    services: Vec<(Vec<String>, Vec<String>)>,
}

/// Label → RDAP base URL lookup table.
#[derive(Debug, Clone, Default)]
pub struct BootstrapDirectory {
    endpoints: HashMap<String, String>,
}

impl BootstrapDirectory {
    /// Fetch the bootstrap registry at `url` through `cache` and index it.
    ///
    /// # Errors
    ///
    /// - `BootstrapUnavailable` if the registry cannot be fetched
    /// - `BootstrapMalformed` if it is not a bootstrap document
    pub async fn load(cache: &HttpCache, url: &str) -> Result<Self, ExpiryError> {
        let body = cache
            .get(url)
            .await
            .map_err(|e| ExpiryError::bootstrap_unavailable(url, e.to_string()))?;

        let directory = Self::from_document(&body)
            .map_err(|message| ExpiryError::bootstrap_malformed(url, message))?;

        debug!(
            "Loaded {} RDAP bootstrap entries from {}",
            directory.len(),
            url
        );
        Ok(directory)
    }

    /// Build the directory from the JSON text of a bootstrap document.
    ///
    /// Labels are lowercased. Within a service the first URL is used; a label
    /// listed by more than one service keeps its first-seen URL. Services
    /// without URLs are skipped.
    pub fn from_document(json: &str) -> Result<Self, String> {
        let document: BootstrapDocument =
            serde_json::from_str(json).map_err(|e| format!("invalid bootstrap JSON: {}", e))?;

        let mut endpoints = HashMap::new();
        for (labels, urls) in document.services {
            let Some(url) = urls.first() else {
                continue;
            };
            for label in labels {
                endpoints
                    .entry(label.to_lowercase())
                    .or_insert_with(|| url.clone());
            }
        }

        Ok(Self { endpoints })
    }

    /// Look up the RDAP base URL for an already-lowercased TLD.
    pub fn resolve(&self, tld: &str) -> Result<&str, ExpiryError> {
        self.endpoints
            .get(tld)
            .map(String::as_str)
            .ok_or_else(|| ExpiryError::NoRdapServerForTld {
                tld: tld.to_string(),
            })
    }

    /// Number of labels in the directory.
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// All entries, sorted by label.
    pub fn entries(&self) -> Vec<BootstrapEntry> {
        let mut entries: Vec<BootstrapEntry> = self
            .endpoints
            .iter()
            .map(|(label, url)| BootstrapEntry {
                label: label.clone(),
                service_url: url.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.label.cmp(&b.label));
        entries
    }
}
