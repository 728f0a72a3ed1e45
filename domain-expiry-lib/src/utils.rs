//! Domain name normalization helpers.
//!
//! Every lookup works on the IDNA ASCII form of the domain. The TLD used for
//! the bootstrap lookup is lowercased here, at the label-extraction boundary.

use crate::error::ExpiryError;

/// Convert a domain name into its ASCII-compatible (punycode) form.
///
/// Surrounding whitespace and a single trailing root dot are dropped. An
/// input that is already ASCII and differs from its IDNA form only by case is
/// returned unchanged, so normalization is the identity on ASCII names and
/// idempotent on everything else.
///
/// # Errors
///
/// Returns `InvalidDomainFormat` for empty input, empty labels, or labels
/// that IDNA processing rejects.
///
/// # Examples
///
/// ```rust
/// use domain_expiry_lib::normalize_domain;
///
/// assert_eq!(normalize_domain("bücher.example").unwrap(), "xn--bcher-kva.example");
/// assert_eq!(normalize_domain("example.com").unwrap(), "example.com");
/// ```
pub fn normalize_domain(domain: &str) -> Result<String, ExpiryError> {
    let trimmed = domain.trim();
    let trimmed = trimmed.strip_suffix('.').unwrap_or(trimmed);

    if trimmed.is_empty() {
        return Err(ExpiryError::invalid_domain(
            domain,
            "Domain name cannot be empty",
        ));
    }

    if trimmed.split('.').any(|label| label.is_empty()) {
        return Err(ExpiryError::invalid_domain(
            domain,
            "Domain name contains an empty label",
        ));
    }

    let ascii = idna::domain_to_ascii_cow(trimmed.as_bytes(), idna::AsciiDenyList::URL)
        .map_err(|e| ExpiryError::invalid_domain(domain, format!("IDNA conversion failed: {}", e)))?;

    if ascii.is_empty() {
        return Err(ExpiryError::invalid_domain(
            domain,
            "Domain name maps to nothing",
        ));
    }

    if trimmed.is_ascii() && trimmed.eq_ignore_ascii_case(&ascii) {
        Ok(trimmed.to_string())
    } else {
        Ok(ascii.into_owned())
    }
}

/// Extract the lowercased rightmost label of a normalized domain.
///
/// Multi-level public suffixes such as `co.uk` are not special: RDAP bootstrap
/// is keyed by the top-level label only.
pub fn extract_tld(domain: &str) -> Result<String, ExpiryError> {
    match domain.rsplit('.').next() {
        Some(tld) if !tld.is_empty() => Ok(tld.to_ascii_lowercase()),
        _ => Err(ExpiryError::invalid_domain(domain, "Domain has no top-level label")),
    }
}
