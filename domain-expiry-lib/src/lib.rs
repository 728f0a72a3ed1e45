//! # Domain Expiry Library
//!
//! Resolve how many days remain before an Internet domain name expires, using
//! the RDAP hierarchy.
//!
//! The resolver finds the RDAP server for the domain's TLD through the IANA
//! bootstrap registry, reads the `expiration` event from the registry's
//! record and, when the registry leaves it out, asks the registrar's own RDAP
//! server found through the IANA registrar-id registry.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use domain_expiry_lib::ExpirationResolver;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = ExpirationResolver::new()?;
//!     let report = resolver.resolve("example.com").await?;
//!
//!     println!("{} expires in {} days", report.domain, report.days);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **IDNA**: internationalized names are converted to punycode first
//! - **Bootstrap Registry**: RDAP endpoint discovery per TLD
//! - **Registrar Fallback**: one hop to the registrar's RDAP server
//! - **Persistent Cache**: IANA registries cached on disk per Cache-Control
//! - **Classified Errors**: one variant per failure mode

// Re-export main public API types and functions
// This makes them available as domain_expiry_lib::TypeName
pub use config::{load_env_config, ConfigManager, DefaultsConfig, EnvConfig, FileConfig};
pub use error::ExpiryError;
pub use resolver::ExpirationResolver;
pub use types::{
    BootstrapEntry, ExpirationReport, RdapLookupResult, RegistrarEntry, ResolverConfig,
    DEFAULT_BOOTSTRAP_URL, DEFAULT_REGISTRAR_IDS_URL,
};
pub use utils::{extract_tld, normalize_domain};

// Public modules
pub mod config;
pub mod protocols;

// Internal modules - re-exported above
mod error;
mod resolver;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ExpiryError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
