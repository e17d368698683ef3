//! Core data types for organization scans.
//!
//! This module defines the per-domain lookup record, the terminal scan result
//! and the configuration that drives the scan engine.

use crate::error::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on the worker count accepted from config files and the CLI.
pub const MAX_WORKERS: usize = 500;

/// Outcome of one registration-data lookup.
///
/// A record with `error` set carries no trustworthy registration data and is
/// never classified as a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain name that was looked up (e.g., "example.net")
    pub domain: String,

    /// Registrant organization. Empty means unknown or privacy-shielded.
    pub organization: String,

    /// The registrar that manages this domain
    pub registrar: String,

    /// When the domain was first registered
    pub created_date: String,

    /// When the domain registration expires
    pub expiry_date: String,

    /// Status codes joined with ", "
    pub status: String,

    /// Nameservers in the order the registry returned them
    pub name_servers: Vec<String>,

    /// Failure reason, present iff the lookup did not produce a usable record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the lookup completed
    pub timestamp: DateTime<Utc>,
}

impl DomainRecord {
    /// Create an empty record for `domain`, stamped now.
    pub fn new<D: Into<String>>(domain: D) -> Self {
        Self {
            domain: domain.into(),
            organization: String::new(),
            registrar: String::new(),
            created_date: String::new(),
            expiry_date: String::new(),
            status: String::new(),
            name_servers: Vec::new(),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a failure record carrying `reason`.
    pub fn failed<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::new(domain)
        }
    }

    /// Create a failure record from a lookup error.
    pub fn from_error<D: Into<String>>(domain: D, error: &ScanError) -> Self {
        Self::failed(domain, error.to_string())
    }

    /// Whether the lookup for this record failed.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Whether the record carries a usable organization.
    pub fn has_organization(&self) -> bool {
        !self.is_error() && !self.organization.is_empty()
    }
}

/// Terminal output of a scan.
///
/// Built once, after every per-domain task finished. The counters are derived
/// from the collections in [`ScanResult::assemble`].
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// The domain whose organization was the scan target
    pub target_domain: String,

    /// The organization candidates are compared against
    pub target_organization: String,

    /// Every record, sorted by domain
    pub all_domains: Vec<DomainRecord>,

    /// Records whose organization matched, sorted by domain
    pub matching_domains: Vec<DomainRecord>,

    /// Wall-clock time of the sweep
    pub duration: Duration,

    pub total_scanned: usize,
    pub total_matches: usize,
    pub total_errors: usize,
}

impl ScanResult {
    /// Assemble a result from already-sorted collections.
    pub fn assemble(
        target_domain: String,
        target_organization: String,
        all_domains: Vec<DomainRecord>,
        matching_domains: Vec<DomainRecord>,
        duration: Duration,
    ) -> Self {
        let total_errors = all_domains.iter().filter(|r| r.is_error()).count();
        Self {
            target_domain,
            target_organization,
            total_scanned: all_domains.len(),
            total_matches: matching_domains.len(),
            total_errors,
            all_domains,
            matching_domains,
            duration,
        }
    }

    /// Records whose lookup failed.
    pub fn errors(&self) -> impl Iterator<Item = &DomainRecord> {
        self.all_domains.iter().filter(|r| r.is_error())
    }

    /// Scanned domains per second.
    pub fn rate(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.total_scanned as f64 / secs
        } else {
            0.0
        }
    }
}

/// Running counters handed to progress observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub completed: usize,
    pub total: usize,
    pub matches: usize,
    pub errors: usize,
}

/// Configuration options for a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Maximum number of lookups in flight
    /// Default: 10
    pub workers: usize,

    /// Budget for each individual lookup
    /// Default: 30 seconds
    #[serde(skip)]
    pub timeout: Duration,

    /// Minimum spacing between any two lookups across all workers.
    /// Zero disables rate limiting.
    /// Default: 100 milliseconds
    #[serde(skip)]
    pub rate_limit: Duration,

    /// Whether to fall back to the system `whois` command when RDAP fails
    /// Default: true
    pub enable_whois_fallback: bool,

    /// Whether to use the IANA bootstrap registry for TLDs missing from the built-in map
    /// Default: true
    pub enable_bootstrap: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout: Duration::from_secs(30),
            rate_limit: Duration::from_millis(100),
            enable_whois_fallback: true,
            enable_bootstrap: true,
        }
    }
}

impl ScanConfig {
    /// Set the number of concurrent lookups.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the per-lookup timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the global spacing between lookups.
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Enable or disable WHOIS fallback.
    pub fn with_whois_fallback(mut self, enabled: bool) -> Self {
        self.enable_whois_fallback = enabled;
        self
    }

    /// Enable or disable IANA bootstrap.
    pub fn with_bootstrap(mut self, enabled: bool) -> Self {
        self.enable_bootstrap = enabled;
        self
    }

    /// Check the settings the engine cannot run without.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.workers == 0 {
            return Err(ScanError::config("Worker count must be at least 1"));
        }
        if self.timeout.is_zero() {
            return Err(ScanError::config("Lookup timeout must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_record_has_no_organization() {
        let record = DomainRecord::failed("example.net", "timeout");
        assert!(record.is_error());
        assert!(!record.has_organization());
        assert!(record.organization.is_empty());
    }

    #[test]
    fn test_assemble_derives_counters() {
        let mut ok = DomainRecord::new("example.com");
        ok.organization = "Example Corp".to_string();
        let all = vec![
            ok.clone(),
            DomainRecord::failed("example.net", "timeout"),
            DomainRecord::failed("example.org", "no data"),
        ];
        let result = ScanResult::assemble(
            "example.com".to_string(),
            "Example Corp".to_string(),
            all,
            vec![ok],
            Duration::from_secs(2),
        );

        assert_eq!(result.total_scanned, 3);
        assert_eq!(result.total_matches, 1);
        assert_eq!(result.total_errors, 2);
        assert_eq!(result.errors().count(), 2);
        assert!((result.rate() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_config_validation() {
        assert!(ScanConfig::default().validate().is_ok());
        assert!(ScanConfig::default().with_workers(0).validate().is_err());
        assert!(ScanConfig::default()
            .with_timeout(Duration::ZERO)
            .validate()
            .is_err());
        // Zero rate limit is valid and means "no pacing"
        assert!(ScanConfig::default()
            .with_rate_limit(Duration::ZERO)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_error_field_omitted_when_absent() {
        let record = DomainRecord::new("example.com");
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("error").is_none());
        assert!(json.get("name_servers").unwrap().is_array());
    }
}
