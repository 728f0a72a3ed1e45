//! IANA registrar-id directory.
//!
//! Maps a registrar name, as found in a registry's RDAP record, to the
//! registrar's own RDAP base URL. Backed by the IANA registrar-id CSV,
//! fetched through the same [`HttpCache`] as the bootstrap registry.

use crate::error::ExpiryError;
use crate::protocols::cache::HttpCache;
use crate::types::RegistrarEntry;
use tracing::debug;

/// Registrar name → RDAP base URL lookup table.
#[derive(Debug, Clone, Default)]
pub struct RegistrarDirectory {
    entries: Vec<RegistrarEntry>,
}

impl RegistrarDirectory {
    /// Fetch the registrar-id CSV at `url` through `cache` and parse it.
    ///
    /// The returned error message is used as the reason of a
    /// `RegistrarNotFound` by the resolver.
    pub async fn load(cache: &HttpCache, url: &str) -> Result<Self, String> {
        let body = cache
            .get(url)
            .await
            .map_err(|e| format!("registrar directory {} is unavailable: {}", url, e))?;

        let directory = Self::from_csv(&body);
        debug!("Loaded {} registrars from {}", directory.len(), url);
        Ok(directory)
    }

    /// Parse the registrar-id CSV.
    ///
    /// Expected columns: `ID,Registrar Name,Status,RDAP Base URL`. Rows with a
    /// non-numeric id, an empty name or no RDAP base URL are skipped; the
    /// registry is append-only reference data and one bad row must not hide
    /// the rest.
    pub fn from_csv(text: &str) -> Self {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut entries = Vec::new();
        let mut skipped = 0usize;

        for record in reader.records() {
            let Ok(record) = record else {
                skipped += 1;
                continue;
            };

            let id = record.get(0).and_then(|id| id.trim().parse::<u32>().ok());
            let name = record.get(1).map(str::trim).filter(|n| !n.is_empty());
            let url = record.get(3).map(str::trim).filter(|u| !u.is_empty());

            match (id, name, url) {
                (Some(registrar_id), Some(name), Some(url)) => entries.push(RegistrarEntry {
                    registrar_id,
                    name: name.to_string(),
                    rdap_base_url: url.to_string(),
                }),
                _ => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!("Skipped {} registrar rows without a usable RDAP base URL", skipped);
        }

        Self { entries }
    }

    /// Find the RDAP base URL of a registrar by case-insensitive name.
    ///
    /// The first matching row wins.
    pub fn resolve(&self, name: &str) -> Result<&str, ExpiryError> {
        let wanted = name.trim().to_lowercase();
        self.entries
            .iter()
            .find(|entry| entry.name.to_lowercase() == wanted)
            .map(|entry| entry.rdap_base_url.as_str())
            .ok_or_else(|| {
                ExpiryError::registrar_not_found(name, "not listed in the IANA registrar-id registry")
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
