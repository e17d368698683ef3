//! Registration-data lookup client.
//!
//! The scan engine only depends on the [`Lookup`] trait. The shipped
//! implementation, [`RegistrationLookup`], queries RDAP first and falls back to
//! the system `whois` command when RDAP has no endpoint or fails. WHOIS also
//! supplies the registrant organization when the RDAP answer carries none.

use crate::error::ScanError;
use crate::protocols::{RdapClient, WhoisClient};
use crate::types::{DomainRecord, ScanConfig};
use crate::utils::{normalize_organization, validate_domain};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// One registration-data query per call.
///
/// Implementations must be safe to call concurrently and must return within
/// roughly `timeout`; the engine does not add its own watchdog.
#[async_trait]
pub trait Lookup: Send + Sync {
    /// Look up `domain`, returning its record or a typed failure.
    async fn lookup(&self, domain: &str, timeout: Duration) -> Result<DomainRecord, ScanError>;
}

/// RDAP lookup with WHOIS fallback.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use tld_scanner_lib::{Lookup, RegistrationLookup};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let lookup = RegistrationLookup::new()?;
///     let record = lookup.lookup("example.com", Duration::from_secs(10)).await?;
///     println!("{} -> {}", record.domain, record.organization);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct RegistrationLookup {
    /// RDAP client for structured registration data
    rdap: Arc<dyn RecordSource>,
    /// WHOIS client for registries without a usable RDAP service
    whois: Arc<dyn RecordSource>,
    enable_whois_fallback: bool,
}

/// A single registration-data protocol.
#[async_trait]
trait RecordSource: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<DomainRecord, ScanError>;
}

#[async_trait]
impl RecordSource for RdapClient {
    async fn fetch(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        self.query(domain).await
    }
}

#[async_trait]
impl RecordSource for WhoisClient {
    async fn fetch(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        self.query(domain).await
    }
}

impl RegistrationLookup {
    /// Create a lookup client with default settings.
    pub fn new() -> Result<Self, ScanError> {
        Self::with_config(&ScanConfig::default())
    }

    /// Create a lookup client honoring the protocol switches in `config`.
    pub fn with_config(config: &ScanConfig) -> Result<Self, ScanError> {
        let rdap_client = RdapClient::with_config(config.timeout, config.enable_bootstrap)?;
        Ok(Self::with_sources(
            Arc::new(rdap_client),
            Arc::new(WhoisClient::new()),
            config.enable_whois_fallback,
        ))
    }

    fn with_sources(
        rdap: Arc<dyn RecordSource>,
        whois: Arc<dyn RecordSource>,
        enable_whois_fallback: bool,
    ) -> Self {
        Self {
            rdap,
            whois,
            enable_whois_fallback,
        }
    }

    async fn query(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        let rdap_error = match self.rdap.fetch(domain).await {
            Ok(record) if has_organization(&record) => return Ok(record),
            // Thin registries (.com, .net) only publish the registrar over RDAP
            Ok(record) => return Ok(self.complete_from_whois(record).await),
            Err(e) => e,
        };

        // A definitive "not registered" from RDAP is final.
        if matches!(rdap_error, ScanError::NoData { .. }) || !self.enable_whois_fallback {
            return Err(rdap_error);
        }

        debug!(domain, error = %rdap_error, "RDAP lookup failed, falling back to WHOIS");

        match self.whois.fetch(domain).await {
            Ok(record) => Ok(record),
            Err(whois_error) if whois_error.indicates_no_data() => Err(whois_error),
            Err(whois_error) => {
                debug!(domain, error = %whois_error, "WHOIS fallback failed");
                // RDAP errors are usually more informative
                Err(rdap_error)
            }
        }
    }

    /// Fill in the registrant organization of an RDAP record from WHOIS.
    ///
    /// The RDAP record is returned unchanged when WHOIS is disabled, fails, or
    /// has no organization either.
    async fn complete_from_whois(&self, record: DomainRecord) -> DomainRecord {
        if !self.enable_whois_fallback {
            return record;
        }

        debug!(domain = %record.domain, "RDAP record has no registrant organization, asking WHOIS");

        match self.whois.fetch(&record.domain).await {
            Ok(whois) if has_organization(&whois) => merge_records(record, whois),
            Ok(_) => record,
            Err(e) => {
                debug!(domain = %record.domain, error = %e, "WHOIS completion failed");
                record
            }
        }
    }
}

fn has_organization(record: &DomainRecord) -> bool {
    !normalize_organization(&record.organization).is_empty()
}

/// Take the organization from WHOIS and keep RDAP's fields where present.
fn merge_records(rdap: DomainRecord, whois: DomainRecord) -> DomainRecord {
    fn prefer(primary: String, secondary: String) -> String {
        if primary.is_empty() {
            secondary
        } else {
            primary
        }
    }

    DomainRecord {
        organization: whois.organization,
        registrar: prefer(rdap.registrar, whois.registrar),
        created_date: prefer(rdap.created_date, whois.created_date),
        expiry_date: prefer(rdap.expiry_date, whois.expiry_date),
        status: prefer(rdap.status, whois.status),
        name_servers: if rdap.name_servers.is_empty() {
            whois.name_servers
        } else {
            rdap.name_servers
        },
        ..rdap
    }
}

#[async_trait]
impl Lookup for RegistrationLookup {
    async fn lookup(&self, domain: &str, timeout: Duration) -> Result<DomainRecord, ScanError> {
        validate_domain(domain)?;

        let mut record = tokio::time::timeout(timeout, self.query(domain))
            .await
            .map_err(|_| ScanError::timeout("registration lookup", timeout))??;

        record.organization = normalize_organization(&record.organization);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned answer for one protocol.
    struct StubSource {
        reply: Result<DomainRecord, ScanError>,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn record(organization: &str, registrar: &str) -> Arc<Self> {
            let mut record = DomainRecord::new("acme.com");
            record.organization = organization.to_string();
            record.registrar = registrar.to_string();
            Self::reply(Ok(record))
        }

        fn error(error: ScanError) -> Arc<Self> {
            Self::reply(Err(error))
        }

        fn reply(reply: Result<DomainRecord, ScanError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RecordSource for StubSource {
        async fn fetch(&self, _domain: &str) -> Result<DomainRecord, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn lookup(rdap: &Arc<StubSource>, whois: &Arc<StubSource>, fallback: bool) -> RegistrationLookup {
        RegistrationLookup::with_sources(rdap.clone(), whois.clone(), fallback)
    }

    async fn run(lookup: &RegistrationLookup) -> Result<DomainRecord, ScanError> {
        lookup.lookup("acme.com", Duration::from_secs(1)).await
    }

    #[tokio::test]
    async fn test_rdap_organization_skips_whois() {
        let rdap = StubSource::record("Acme Inc", "RDAP Registrar");
        let whois = StubSource::record("Whois Org", "Whois Registrar");

        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.organization, "Acme Inc");
        assert_eq!(whois.calls(), 0);
    }

    #[tokio::test]
    async fn test_registrar_only_rdap_takes_organization_from_whois() {
        let mut thin = DomainRecord::new("acme.com");
        thin.registrar = "MarkMonitor Inc.".to_string();
        thin.created_date = "1997-09-15T04:00:00Z".to_string();
        let rdap = StubSource::reply(Ok(thin));

        let mut full = DomainRecord::new("acme.com");
        full.organization = "Acme LLC".to_string();
        full.registrar = "MarkMonitor, Inc.".to_string();
        full.expiry_date = "2028-09-14T04:00:00Z".to_string();
        full.name_servers = vec!["ns1.acme.com".to_string()];
        let whois = StubSource::reply(Ok(full));

        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.organization, "Acme LLC");
        assert_eq!(record.registrar, "MarkMonitor Inc.");
        assert_eq!(record.created_date, "1997-09-15T04:00:00Z");
        assert_eq!(record.expiry_date, "2028-09-14T04:00:00Z");
        assert_eq!(record.name_servers, vec!["ns1.acme.com"]);
        assert!(record.error.is_none());
        assert_eq!(whois.calls(), 1);
    }

    #[tokio::test]
    async fn test_redacted_rdap_organization_asks_whois() {
        let rdap = StubSource::record("REDACTED FOR PRIVACY", "RDAP Registrar");
        let whois = StubSource::record("Acme LLC", "");

        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.organization, "Acme LLC");
        assert_eq!(record.registrar, "RDAP Registrar");
    }

    #[tokio::test]
    async fn test_registrar_only_rdap_kept_when_whois_has_nothing() {
        let rdap = StubSource::record("", "MarkMonitor Inc.");

        let whois = StubSource::error(ScanError::whois("acme.com", "connection refused"));
        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.registrar, "MarkMonitor Inc.");
        assert!(record.organization.is_empty());
        assert!(record.error.is_none());

        let whois = StubSource::record("Data Redacted", "Other");
        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.registrar, "MarkMonitor Inc.");
        assert!(record.organization.is_empty());
    }

    #[tokio::test]
    async fn test_registrar_only_rdap_without_fallback() {
        let rdap = StubSource::record("", "MarkMonitor Inc.");
        let whois = StubSource::record("Acme LLC", "");

        let record = run(&lookup(&rdap, &whois, false)).await.unwrap();
        assert!(record.organization.is_empty());
        assert_eq!(whois.calls(), 0);
    }

    #[tokio::test]
    async fn test_rdap_not_found_is_final() {
        let rdap = StubSource::error(ScanError::no_data("acme.com"));
        let whois = StubSource::record("Acme LLC", "");

        let result = run(&lookup(&rdap, &whois, true)).await;
        assert!(matches!(result, Err(ScanError::NoData { .. })));
        assert_eq!(whois.calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_fallback_returns_rdap_error() {
        let rdap = StubSource::error(ScanError::rdap_with_status("acme.com", "busy", 503));
        let whois = StubSource::record("Acme LLC", "");

        let result = run(&lookup(&rdap, &whois, false)).await;
        assert!(matches!(
            result,
            Err(ScanError::RdapError {
                status_code: Some(503),
                ..
            })
        ));
        assert_eq!(whois.calls(), 0);
    }

    #[tokio::test]
    async fn test_whois_answers_when_rdap_fails() {
        let rdap = StubSource::error(ScanError::bootstrap("zz", "no RDAP endpoint"));
        let whois = StubSource::record("Acme LLC", "Whois Registrar");

        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert_eq!(record.organization, "Acme LLC");
        assert_eq!(whois.calls(), 1);
    }

    #[tokio::test]
    async fn test_whois_no_data_wins_over_rdap_error() {
        let rdap = StubSource::error(ScanError::rdap("acme.com", "Request failed"));
        let whois = StubSource::error(ScanError::no_data("acme.com"));

        let result = run(&lookup(&rdap, &whois, true)).await;
        assert!(matches!(result, Err(ScanError::NoData { .. })));
    }

    #[tokio::test]
    async fn test_other_whois_failure_reports_rdap_error() {
        let rdap = StubSource::error(ScanError::rdap("acme.com", "Request failed"));
        let whois = StubSource::error(ScanError::whois("acme.com", "rate limited"));

        let result = run(&lookup(&rdap, &whois, true)).await;
        assert!(matches!(result, Err(ScanError::RdapError { .. })));
    }

    #[tokio::test]
    async fn test_placeholder_organization_is_normalized() {
        let rdap = StubSource::record("REDACTED FOR PRIVACY", "Registrar");
        let whois = StubSource::record("Contact Privacy Inc.", "");

        let record = run(&lookup(&rdap, &whois, true)).await.unwrap();
        assert!(record.organization.is_empty());
    }

    #[test]
    fn test_with_config_protocol_switches() {
        let config = ScanConfig::default()
            .with_whois_fallback(false)
            .with_bootstrap(false);
        let lookup = RegistrationLookup::with_config(&config).unwrap();
        assert!(!lookup.enable_whois_fallback);

        let lookup = RegistrationLookup::with_config(&ScanConfig::default()).unwrap();
        assert!(lookup.enable_whois_fallback);
    }

    #[tokio::test]
    async fn test_lookup_rejects_invalid_domain() {
        let lookup = RegistrationLookup::new().unwrap();
        let result = lookup.lookup("", Duration::from_secs(1)).await;
        assert!(matches!(result, Err(ScanError::InvalidDomain { .. })));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_lookup_thin_registry_domain() {
        let lookup = RegistrationLookup::new().unwrap();
        let record = lookup
            .lookup("google.com", Duration::from_secs(15))
            .await
            .unwrap();
        assert_eq!(record.domain, "google.com");
        assert!(!record.registrar.is_empty());
        assert!(!record.organization.is_empty());
    }
}
