//! # TLD Scanner Library
//!
//! Finds domains under other top-level domains that are registered to the
//! same organization as a target domain.
//!
//! The target's registrant organization is resolved first. Every candidate
//! (`base label + TLD`) is then looked up concurrently, bounded by a worker
//! limit and spaced by a global rate limit, and compared case-insensitively
//! against the target organization.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tld_scanner_lib::{
//!     build_candidates, extract_base_label, load_wordlist, RegistrationLookup, ScanConfig,
//!     Scanner,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default();
//!     let lookup = Arc::new(RegistrationLookup::with_config(&config)?);
//!     let scanner = Scanner::new(lookup, config)?;
//!
//!     let tlds = load_wordlist("wordlist.txt")?;
//!     let target = scanner.resolve_target("example.com").await?;
//!     let candidates = build_candidates(extract_base_label(&target.domain), &tlds);
//!
//!     let result = scanner
//!         .scan(&target.domain, &target.organization, &candidates)
//!         .await?;
//!     for record in &result.matching_domains {
//!         println!("{}", record.domain);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **RDAP Protocol**: structured registration data, with IANA bootstrap discovery
//! - **WHOIS Fallback**: the system `whois` command for registries without RDAP
//! - **Bounded Concurrency**: a worker limit and a global rate limit
//! - **Layered Configuration**: TOML files and `TS_*` environment variables

pub use concurrent::{rate_limiter, Admission, Governor, IntervalLimiter, RateLimit, Unlimited};
pub use config::{
    env_config_from, load_env_config, parse_timeout_string, validate_workers, ConfigManager,
    DefaultsConfig, EnvConfig, FileConfig, DEFAULT_WORDLIST,
};
pub use error::ScanError;
pub use lookup::{Lookup, RegistrationLookup};
pub use protocols::initialize_bootstrap;
pub use scanner::{is_match, ScanObserver, Scanner};
pub use types::{DomainRecord, ScanConfig, ScanProgress, ScanResult, MAX_WORKERS};
pub use utils::{
    build_candidates, extract_base_label, is_placeholder_organization, load_wordlist,
    normalize_organization, parse_wordlist, validate_domain,
};

mod concurrent;
mod config;
mod error;
mod lookup;
mod protocols;
mod scanner;
mod types;
mod utils;

/// Result alias for library operations.
pub type Result<T> = std::result::Result<T, ScanError>;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
