//! The concurrent scan engine.
//!
//! [`Scanner::scan`] spawns one task per candidate domain. Each task passes
//! the [`Governor`] and the shared [`RateLimit`], performs a single lookup and
//! hands exactly one [`DomainRecord`] back through its join handle. The calling
//! task is the only owner of the result collections: it drains the join set,
//! classifies each record and notifies the optional [`ScanObserver`].

use crate::concurrent::{rate_limiter, Governor, RateLimit};
use crate::error::ScanError;
use crate::lookup::Lookup;
use crate::types::{DomainRecord, ScanConfig, ScanProgress, ScanResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Receives every completed record while a scan is running.
///
/// Called from the aggregating task, one record at a time. Implementations
/// must return quickly; they run between joins.
pub trait ScanObserver: Send + Sync {
    fn on_record(&self, record: &DomainRecord, progress: &ScanProgress);
}

/// Decide whether a record belongs to the target organization.
///
/// Failed lookups and empty organizations never match, so two unrelated
/// privacy-shielded domains cannot match each other.
pub fn is_match(record: &DomainRecord, target_org: &str) -> bool {
    if record.is_error() || record.organization.is_empty() {
        return false;
    }
    record.organization == target_org
        || record.organization.to_lowercase() == target_org.to_lowercase()
}

/// Drives lookups for a candidate set and collects the outcome.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tld_scanner_lib::{RegistrationLookup, ScanConfig, Scanner};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ScanConfig::default().with_workers(20);
///     let lookup = Arc::new(RegistrationLookup::with_config(&config)?);
///     let scanner = Scanner::new(lookup, config)?;
///
///     let target = scanner.resolve_target("example.com").await?;
///     let candidates = vec!["example.net".to_string(), "example.org".to_string()];
///     let result = scanner
///         .scan(&target.domain, &target.organization, &candidates)
///         .await?;
///     println!("{} matches", result.total_matches);
///     Ok(())
/// }
/// ```
pub struct Scanner {
    lookup: Arc<dyn Lookup>,
    config: ScanConfig,
    limiter: Option<Arc<dyn RateLimit>>,
    observer: Option<Arc<dyn ScanObserver>>,
}

impl Scanner {
    /// Create a scanner. Fails if the configuration cannot drive a scan.
    pub fn new(lookup: Arc<dyn Lookup>, config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self {
            lookup,
            config,
            limiter: None,
            observer: None,
        })
    }

    /// Use a specific limiter instead of one built from `config.rate_limit`.
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimit>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Attach a progress observer.
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Look up the target domain and return its record.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::TargetResolution`] if the lookup fails or the
    /// target has no organization to compare against.
    pub async fn resolve_target(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        let record = self
            .lookup
            .lookup(domain, self.config.timeout)
            .await
            .map_err(|e| ScanError::target_resolution(domain, e.to_string()))?;

        if let Some(reason) = &record.error {
            return Err(ScanError::target_resolution(domain, reason.clone()));
        }
        if record.organization.is_empty() {
            return Err(ScanError::target_resolution(
                domain,
                "No organization found in registration data",
            ));
        }

        info!(target_domain = domain, organization = %record.organization, "Resolved target organization");
        Ok(record)
    }

    /// Scan every candidate and classify the results against `target_org`.
    ///
    /// Returns once every candidate has produced exactly one record. Lookup
    /// failures become records with `error` set; the only error returned is
    /// a configuration error raised before any lookup is scheduled.
    pub async fn scan(
        &self,
        target_domain: &str,
        target_org: &str,
        candidates: &[String],
    ) -> Result<ScanResult, ScanError> {
        let started = Instant::now();
        self.config.validate()?;

        let governor = Governor::new(self.config.workers)?;
        let limiter = match &self.limiter {
            Some(limiter) => limiter.clone(),
            None => rate_limiter(self.config.rate_limit),
        };

        info!(
            candidates = candidates.len(),
            workers = self.config.workers,
            rate_limit_ms = self.config.rate_limit.as_millis() as u64,
            "Starting scan"
        );

        let mut tasks = JoinSet::new();
        let mut pending: HashMap<String, usize> = HashMap::new();

        for domain in candidates {
            *pending.entry(domain.clone()).or_default() += 1;
            tasks.spawn(scan_one(
                domain.clone(),
                self.lookup.clone(),
                governor.clone(),
                limiter.clone(),
                self.config.timeout,
            ));
        }

        let mut aggregator = Aggregator::new(target_org, candidates.len());

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(record) => {
                    settle(&mut pending, &record.domain);
                    self.collect(&mut aggregator, record);
                }
                Err(err) => {
                    warn!("Scan task ended without a record: {}", err);
                }
            }
        }

        // Tasks that panicked or were aborted still owe their domain a record.
        for (domain, missing) in pending {
            for _ in 0..missing {
                let record =
                    DomainRecord::failed(&domain, "Lookup task aborted before producing a result");
                self.collect(&mut aggregator, record);
            }
        }

        let (mut all, mut matches) = aggregator.into_parts();
        all.sort_by(|a, b| a.domain.cmp(&b.domain));
        matches.sort_by(|a, b| a.domain.cmp(&b.domain));

        let duration = started.elapsed();
        let result = ScanResult::assemble(
            target_domain.to_string(),
            target_org.to_string(),
            all,
            matches,
            duration,
        );

        info!(
            scanned = result.total_scanned,
            matches = result.total_matches,
            errors = result.total_errors,
            elapsed_ms = duration.as_millis() as u64,
            "Scan finished"
        );

        Ok(result)
    }

    fn collect(&self, aggregator: &mut Aggregator, record: DomainRecord) {
        let (stored, progress) = aggregator.push(record);
        if let Some(observer) = &self.observer {
            observer.on_record(stored, &progress);
        }
    }
}

/// One candidate's full path through the gates.
async fn scan_one(
    domain: String,
    lookup: Arc<dyn Lookup>,
    governor: Governor,
    limiter: Arc<dyn RateLimit>,
    timeout: Duration,
) -> DomainRecord {
    // Held until this function returns, on every path.
    let _slot = match governor.admit().await {
        Ok(slot) => slot,
        Err(e) => return DomainRecord::from_error(domain, &e),
    };

    limiter.wait().await;

    match lookup.lookup(&domain, timeout).await {
        Ok(mut record) => {
            debug!(domain = %domain, organization = %record.organization, "Lookup completed");
            record.domain = domain;
            record
        }
        Err(e) => {
            debug!(domain = %domain, error = %e, "Lookup failed");
            DomainRecord::from_error(domain, &e)
        }
    }
}

fn settle(pending: &mut HashMap<String, usize>, domain: &str) {
    if let Some(count) = pending.get_mut(domain) {
        *count -= 1;
        if *count == 0 {
            pending.remove(domain);
        }
    }
}

/// Exclusive owner of the result collections during a scan.
struct Aggregator {
    target_org: String,
    all: Vec<DomainRecord>,
    matches: Vec<DomainRecord>,
    progress: ScanProgress,
}

impl Aggregator {
    fn new(target_org: &str, total: usize) -> Self {
        Self {
            target_org: target_org.to_string(),
            all: Vec::with_capacity(total),
            matches: Vec::new(),
            progress: ScanProgress {
                total,
                ..ScanProgress::default()
            },
        }
    }

    /// Classify and store a record, returning it with the updated counters.
    fn push(&mut self, record: DomainRecord) -> (&DomainRecord, ScanProgress) {
        let matched = is_match(&record, &self.target_org);
        self.progress.completed += 1;
        if record.is_error() {
            self.progress.errors += 1;
        }
        if matched {
            self.progress.matches += 1;
            self.matches.push(record.clone());
        }
        self.all.push(record);
        (&self.all[self.all.len() - 1], self.progress)
    }

    fn into_parts(self) -> (Vec<DomainRecord>, Vec<DomainRecord>) {
        (self.all, self.matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(domain: &str, org: &str) -> DomainRecord {
        DomainRecord {
            organization: org.to_string(),
            ..DomainRecord::new(domain)
        }
    }

    #[test]
    fn test_is_match_case_insensitive() {
        assert!(is_match(&record("a.com", "Example Corp"), "Example Corp"));
        assert!(is_match(&record("a.net", "EXAMPLE CORP"), "Example Corp"));
        assert!(is_match(&record("a.de", "Société Générale"), "SOCIÉTÉ GÉNÉRALE"));
        assert!(!is_match(&record("a.org", "Other Corp"), "Example Corp"));
    }

    #[test]
    fn test_is_match_rejects_empty_organization() {
        assert!(!is_match(&record("a.com", ""), "Example Corp"));
        // Blank never matches blank
        assert!(!is_match(&record("a.com", ""), ""));
    }

    #[test]
    fn test_is_match_rejects_failed_records() {
        let mut failed = record("a.com", "Example Corp");
        failed.error = Some("timeout".to_string());
        assert!(!is_match(&failed, "Example Corp"));
    }

    #[test]
    fn test_aggregator_counts() {
        let mut aggregator = Aggregator::new("Example Corp", 3);

        let (stored, progress) = aggregator.push(record("a.com", "Example Corp"));
        assert_eq!(stored.domain, "a.com");
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.matches, 1);

        let (_, progress) = aggregator.push(DomainRecord::failed("a.net", "timeout"));
        assert_eq!(progress.errors, 1);
        assert_eq!(progress.matches, 1);
        assert_eq!(progress.total, 3);

        let (all, matches) = aggregator.into_parts();
        assert_eq!(all.len(), 2);
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_settle_handles_duplicates() {
        let mut pending = HashMap::new();
        pending.insert("a.com".to_string(), 2);
        settle(&mut pending, "a.com");
        assert_eq!(pending.get("a.com"), Some(&1));
        settle(&mut pending, "a.com");
        assert!(pending.is_empty());
        settle(&mut pending, "unknown.com");
        assert!(pending.is_empty());
    }
}
