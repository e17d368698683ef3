//! WHOIS fallback using the system `whois` command.
//!
//! WHOIS output is free text whose layout differs per registry. The parser
//! reads `Key: Value` lines and maps the common key spellings onto
//! [`DomainRecord`] fields.

use crate::error::ScanError;
use crate::types::DomainRecord;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

lazy_static::lazy_static! {
    static ref FIELD_LINE: Regex =
        Regex::new(r"^\s*([A-Za-z][A-Za-z0-9 /()._-]*?)\s*:\s*(.*?)\s*$").expect("valid regex");
}

const ORGANIZATION_KEYS: &[&str] = &[
    "registrant organization",
    "registrant organisation",
    "registrant org",
    "org",
    "organization",
    "organisation",
    "owner",
    "holder",
];
const REGISTRAR_KEYS: &[&str] = &["registrar", "sponsoring registrar", "registrar name"];
const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created",
    "created on",
    "created date",
    "registered on",
    "registration time",
    "domain registration date",
];
const EXPIRY_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiry date",
    "expiration date",
    "expires",
    "expires on",
    "expiration time",
    "paid-till",
];
const STATUS_KEYS: &[&str] = &["domain status", "status"];
const NAME_SERVER_KEYS: &[&str] = &["name server", "nameserver", "nserver", "name servers"];

const NO_DATA_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no data found",
    "no entries found",
    "status: available",
    "status: free",
    "not registered",
    "no matching record",
    "no object found",
    "object does not exist",
    "this domain name has not been registered",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "rate limit exceeded",
    "too many requests",
    "try again later",
    "quota exceeded",
    "limit exceeded",
    "rate-limited",
];

const UNSUPPORTED_PATTERNS: &[&str] = &["no whois server is known", "no whois server"];

/// Runs `whois <domain>` and parses the answer.
///
/// The child process is killed if the lookup future is dropped, so an outer
/// timeout cancels the query.
#[derive(Debug, Clone, Default)]
pub struct WhoisClient;

impl WhoisClient {
    pub fn new() -> Self {
        Self
    }

    /// Query the system `whois` command for `domain`.
    pub async fn query(&self, domain: &str) -> Result<DomainRecord, ScanError> {
        debug!(domain, "Running whois");

        let output = Command::new("whois")
            .arg(domain)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ScanError::whois(
                    domain,
                    format!(
                        "Failed to execute whois command: {}. Make sure 'whois' is installed.",
                        e
                    ),
                )
            })?;

        let text = String::from_utf8_lossy(&output.stdout);
        parse_whois_record(domain, &text)
    }
}

/// Parse raw WHOIS text into a record.
///
/// # Errors
///
/// - [`ScanError::NoData`] for "no match" style answers without registration fields
/// - [`ScanError::WhoisError`] for rate limiting, unsupported TLDs and answers
///   with no recognizable fields
pub fn parse_whois_record(domain: &str, text: &str) -> Result<DomainRecord, ScanError> {
    let lower = text.to_lowercase();

    if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(ScanError::whois(domain, "Rate limited by WHOIS server"));
    }
    if UNSUPPORTED_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(ScanError::whois(domain, "No WHOIS server known for this TLD"));
    }

    let mut record = DomainRecord::new(domain);
    let mut statuses: Vec<String> = Vec::new();
    let mut recognized = 0usize;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('%') || trimmed.starts_with('#') || trimmed.starts_with(">>>") {
            continue;
        }
        let Some(caps) = FIELD_LINE.captures(line) else {
            continue;
        };
        let key = caps[1].to_lowercase();
        let value = caps[2].trim();
        if value.is_empty() {
            continue;
        }

        let key = key.as_str();
        if ORGANIZATION_KEYS.contains(&key) {
            fill_once(&mut record.organization, value);
        } else if REGISTRAR_KEYS.contains(&key) {
            fill_once(&mut record.registrar, value);
        } else if CREATED_KEYS.contains(&key) {
            fill_once(&mut record.created_date, value);
        } else if EXPIRY_KEYS.contains(&key) {
            fill_once(&mut record.expiry_date, value);
        } else if STATUS_KEYS.contains(&key) {
            // "clientTransferProhibited https://icann.org/epp#clientTransferProhibited"
            if let Some(code) = value.split_whitespace().next() {
                if !statuses.iter().any(|s| s == code) {
                    statuses.push(code.to_string());
                }
            }
        } else if NAME_SERVER_KEYS.contains(&key) {
            if let Some(host) = value.split_whitespace().next() {
                let host = host.trim_end_matches('.').to_lowercase();
                if !record.name_servers.contains(&host) {
                    record.name_servers.push(host);
                }
            }
        } else {
            continue;
        }
        recognized += 1;
    }

    record.status = statuses.join(", ");

    let registered = !record.registrar.is_empty() || !record.created_date.is_empty();
    if !registered && NO_DATA_PATTERNS.iter().any(|p| lower.contains(p)) {
        return Err(ScanError::no_data(domain));
    }
    if recognized == 0 {
        return Err(ScanError::whois(
            domain,
            "Unable to find registration fields in WHOIS response",
        ));
    }

    Ok(record)
}

fn fill_once(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}
