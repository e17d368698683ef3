//! RDAP endpoint discovery.
//!
//! Endpoints come from a built-in table first, then from the IANA bootstrap
//! registry (`dns.json`), which is fetched once and cached process-wide.

use crate::error::ScanError;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const BOOTSTRAP_URL: &str = "https://data.iana.org/rdap/dns.json";

/// RDAP endpoints rarely move; refetch the bootstrap file once a day.
const BOOTSTRAP_TTL: Duration = Duration::from_secs(24 * 3600);

const BOOTSTRAP_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Endpoints learned from the IANA bootstrap registry.
#[derive(Default)]
struct EndpointCache {
    endpoints: HashMap<String, String>,
    /// TLDs the bootstrap file does not list
    missing: HashSet<String>,
    fetched_at: Option<Instant>,
}

impl EndpointCache {
    fn is_fresh(&self) -> bool {
        matches!(self.fetched_at, Some(t) if t.elapsed() <= BOOTSTRAP_TTL)
    }
}

lazy_static::lazy_static! {
    static ref ENDPOINT_CACHE: Mutex<EndpointCache> = Mutex::new(EndpointCache::default());

    /// Registries whose RDAP base URL is known ahead of time.
    static ref BUILTIN_ENDPOINTS: HashMap<&'static str, &'static str> = HashMap::from([
        ("com", "https://rdap.verisign.com/com/v1/domain/"),
        ("net", "https://rdap.verisign.com/net/v1/domain/"),
        ("org", "https://rdap.publicinterestregistry.org/rdap/domain/"),
        ("info", "https://rdap.identitydigital.services/rdap/domain/"),
        ("biz", "https://rdap.nic.biz/domain/"),
        ("app", "https://pubapi.registry.google/rdap/domain/"),
        ("dev", "https://pubapi.registry.google/rdap/domain/"),
        ("page", "https://pubapi.registry.google/rdap/domain/"),
        ("xyz", "https://rdap.centralnic.com/xyz/domain/"),
        ("tech", "https://rdap.centralnic.com/tech/domain/"),
        ("online", "https://rdap.centralnic.com/online/domain/"),
        ("site", "https://rdap.centralnic.com/site/domain/"),
        ("shop", "https://rdap.gmoregistry.net/rdap/domain/"),
        ("ai", "https://rdap.identitydigital.services/rdap/domain/"),
        ("io", "https://rdap.identitydigital.services/rdap/domain/"),
        ("me", "https://rdap.identitydigital.services/rdap/domain/"),
        ("us", "https://rdap.nic.us/domain/"),
        ("uk", "https://rdap.nominet.uk/domain/"),
        ("de", "https://rdap.denic.de/domain/"),
        ("ca", "https://rdap.ca.fury.ca/rdap/domain/"),
        ("au", "https://rdap.cctld.au/rdap/domain/"),
        ("fr", "https://rdap.nic.fr/domain/"),
        ("nl", "https://rdap.sidn.nl/domain/"),
        ("br", "https://rdap.registro.br/domain/"),
        ("in", "https://rdap.nixiregistry.in/rdap/domain/"),
        ("tv", "https://rdap.nic.tv/domain/"),
        ("cc", "https://tld-rdap.verisign.com/cc/v1/domain/"),
        ("cloud", "https://rdap.registry.cloud/rdap/domain/"),
    ]);
}

fn lock_cache() -> Result<std::sync::MutexGuard<'static, EndpointCache>, ScanError> {
    ENDPOINT_CACHE
        .lock()
        .map_err(|_| ScanError::internal("RDAP endpoint cache lock poisoned"))
}

/// Base URL of the built-in RDAP service for `tld`, if there is one.
pub fn builtin_rdap_endpoint(tld: &str) -> Option<&'static str> {
    BUILTIN_ENDPOINTS.get(tld.to_lowercase().as_str()).copied()
}

/// Resolve the RDAP base URL for `tld`.
///
/// The returned URL ends in `/domain/`; append the domain name to query it.
///
/// # Errors
///
/// Returns [`ScanError::BootstrapError`] when no endpoint is known, either
/// because bootstrap is disabled or because IANA does not list the TLD.
pub async fn get_rdap_endpoint(tld: &str, use_bootstrap: bool) -> Result<String, ScanError> {
    let tld = tld.to_lowercase();

    if let Some(endpoint) = builtin_rdap_endpoint(&tld) {
        return Ok(endpoint.to_string());
    }

    if !use_bootstrap {
        return Err(ScanError::bootstrap(
            &tld,
            "No known RDAP endpoint and bootstrap disabled",
        ));
    }

    {
        let cache = lock_cache()?;
        if cache.is_fresh() {
            if let Some(endpoint) = cache.endpoints.get(&tld) {
                return Ok(endpoint.clone());
            }
            if cache.missing.contains(&tld) {
                return Err(ScanError::bootstrap(&tld, "TLD has no RDAP service"));
            }
        }
    }

    initialize_bootstrap().await?;

    let mut cache = lock_cache()?;
    if let Some(endpoint) = cache.endpoints.get(&tld) {
        return Ok(endpoint.clone());
    }
    cache.missing.insert(tld.clone());
    Err(ScanError::bootstrap(
        &tld,
        "TLD not found in IANA bootstrap registry",
    ))
}

/// Fetch the IANA bootstrap registry unless a fresh copy is cached.
///
/// Concurrent callers may both fetch on a cold cache; the last write wins and
/// both copies are equivalent.
pub async fn initialize_bootstrap() -> Result<(), ScanError> {
    if lock_cache()?.is_fresh() {
        return Ok(());
    }

    let endpoints = fetch_bootstrap().await?;
    info!(tlds = endpoints.len(), "Loaded IANA RDAP bootstrap registry");

    let mut cache = lock_cache()?;
    cache.endpoints = endpoints;
    cache.missing.clear();
    cache.fetched_at = Some(Instant::now());
    Ok(())
}

async fn fetch_bootstrap() -> Result<HashMap<String, String>, ScanError> {
    debug!(url = BOOTSTRAP_URL, "Fetching RDAP bootstrap registry");

    let client = reqwest::Client::builder()
        .timeout(BOOTSTRAP_FETCH_TIMEOUT)
        .build()
        .map_err(|e| ScanError::network_with_source("Failed to create HTTP client", e.to_string()))?;

    let response = client.get(BOOTSTRAP_URL).send().await.map_err(|e| {
        ScanError::bootstrap("*", format!("Failed to fetch bootstrap registry: {}", e))
    })?;

    if !response.status().is_success() {
        return Err(ScanError::bootstrap(
            "*",
            format!("Bootstrap registry returned HTTP {}", response.status()),
        ));
    }

    let json: serde_json::Value = response.json().await.map_err(|e| {
        ScanError::bootstrap("*", format!("Failed to parse bootstrap JSON: {}", e))
    })?;

    parse_bootstrap(&json)
}

/// Flatten a bootstrap document into a TLD -> endpoint map.
///
/// Each service is `[[tlds...], [urls...]]`; the first URL wins.
pub(crate) fn parse_bootstrap(json: &serde_json::Value) -> Result<HashMap<String, String>, ScanError> {
    let services = json
        .get("services")
        .and_then(|s| s.as_array())
        .ok_or_else(|| ScanError::bootstrap("*", "Bootstrap document has no 'services' array"))?;

    let mut endpoints = HashMap::new();
    for service in services.iter().filter_map(|s| s.as_array()) {
        let (Some(tlds), Some(urls)) = (
            service.first().and_then(|t| t.as_array()),
            service.get(1).and_then(|u| u.as_array()),
        ) else {
            continue;
        };
        let Some(url) = urls.iter().find_map(|u| u.as_str()) else {
            continue;
        };

        let endpoint = format!("{}/domain/", url.trim_end_matches('/'));
        for tld in tlds.iter().filter_map(|t| t.as_str()) {
            endpoints.insert(tld.to_lowercase(), endpoint.clone());
        }
    }
    Ok(endpoints)
}

/// The last label of `domain`, lowercased.
pub fn extract_tld(domain: &str) -> Result<String, ScanError> {
    match domain.rsplit_once('.') {
        Some((rest, tld)) if !rest.is_empty() && !tld.is_empty() => Ok(tld.to_lowercase()),
        _ => Err(ScanError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_tld() {
        assert_eq!(extract_tld("example.com").unwrap(), "com");
        assert_eq!(extract_tld("example.co.UK").unwrap(), "uk");
        assert!(extract_tld("invalid").is_err());
        assert!(extract_tld(".com").is_err());
        assert!(extract_tld("example.").is_err());
    }

    #[test]
    fn test_builtin_endpoints_are_https() {
        for (tld, endpoint) in BUILTIN_ENDPOINTS.iter() {
            assert!(endpoint.starts_with("https://"), "{} endpoint", tld);
            assert!(endpoint.ends_with("/domain/"), "{} endpoint", tld);
        }
        assert!(builtin_rdap_endpoint("COM").is_some());
    }

    #[tokio::test]
    async fn test_unknown_tld_without_bootstrap() {
        let result = get_rdap_endpoint("zz", false).await;
        assert!(matches!(result, Err(ScanError::BootstrapError { .. })));
    }

    #[test]
    fn test_parse_bootstrap() {
        let json = serde_json::json!({
            "services": [
                [["example", "TEST"], ["https://rdap.example.net/", "http://rdap.example.net/"]],
                [["broken"]],
                [["other"], ["https://rdap.other.org"]]
            ]
        });
        let endpoints = parse_bootstrap(&json).unwrap();
        assert_eq!(
            endpoints.get("test").map(String::as_str),
            Some("https://rdap.example.net/domain/")
        );
        assert_eq!(
            endpoints.get("other").map(String::as_str),
            Some("https://rdap.other.org/domain/")
        );
        assert!(!endpoints.contains_key("broken"));

        assert!(parse_bootstrap(&serde_json::json!({})).is_err());
    }
}
