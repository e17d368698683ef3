//! Registration-data protocols.
//!
//! RDAP is the primary source; WHOIS is the fallback for registries without a
//! usable RDAP service.

/// RDAP (Registration Data Access Protocol) client and response parsing
pub mod rdap;

/// WHOIS client and free-text parsing
pub mod whois;

/// RDAP endpoint table and IANA bootstrap discovery
pub mod registry;

pub use rdap::RdapClient;
pub use registry::initialize_bootstrap;
pub use whois::WhoisClient;
