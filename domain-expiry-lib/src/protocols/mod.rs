//! Protocol and registry implementations used by the resolver.
//!
//! This module contains the RDAP client, the two IANA directories it
//! depends on, and the persistent HTTP cache that backs those directories.

/// Persistent HTTP cache honoring Cache-Control
pub mod cache;

/// IANA RDAP bootstrap registry (TLD -> RDAP server)
pub mod bootstrap;

/// IANA registrar-id registry (registrar -> RDAP server)
pub mod registrar;

/// RDAP domain lookups
pub mod rdap;

// Re-export commonly used types
pub use bootstrap::BootstrapDirectory;
pub use cache::{FetchFailure, HttpCache};
pub use rdap::{
    days_until, extract_registrar_name, interpret_response, parse_event_date,
    registrar_name_from_vcard, RdapClient, RdapStatus,
};
pub use registrar::RegistrarDirectory;
