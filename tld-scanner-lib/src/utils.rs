//! Helpers for building candidate domains and cleaning lookup data.

use crate::error::ScanError;
use std::path::Path;

/// Organizations registries publish instead of the real registrant.
const PLACEHOLDER_ORGANIZATIONS: &[&str] = &[
    "redacted for privacy",
    "redacted",
    "data redacted",
    "privacy",
    "private",
    "private registration",
    "not disclosed",
    "non-public data",
    "statutory masking enabled",
    "contact privacy inc.",
    "domains by proxy, llc",
    "withheldforprivacy ehf",
    "whoisguard, inc.",
    "privacy protect, llc (privacyprotect.org)",
    "perfect privacy, llc",
    "identity protection service",
    "n/a",
    "none",
];

/// Check basic domain syntax.
///
/// Requires at least two labels of 1-63 characters, no label starting or
/// ending with a hyphen, and at most 253 characters overall.
pub fn validate_domain(domain: &str) -> Result<(), ScanError> {
    let domain = domain.trim();

    if domain.is_empty() {
        return Err(ScanError::invalid_domain(domain, "Domain name cannot be empty"));
    }
    if domain.len() > 253 {
        return Err(ScanError::invalid_domain(domain, "Domain name too long"));
    }
    if !domain.contains('.') {
        return Err(ScanError::invalid_domain(
            domain,
            "Domain must contain at least one dot",
        ));
    }

    for label in domain.split('.') {
        if label.is_empty() || label.len() > 63 {
            return Err(ScanError::invalid_domain(domain, "Invalid label length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(ScanError::invalid_domain(
                domain,
                "Labels cannot start or end with a hyphen",
            ));
        }
        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            return Err(ScanError::invalid_domain(domain, "Invalid character in label"));
        }
    }

    Ok(())
}

/// Read a TLD wordlist.
///
/// One suffix per line. Whitespace is trimmed, blank lines and `#` comments
/// are skipped, and a leading `.` is added when missing. Order is preserved.
pub fn load_wordlist<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ScanError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| ScanError::file_error(path.display().to_string(), e.to_string()))?;
    Ok(parse_wordlist(&content))
}

/// Parse wordlist text; see [`load_wordlist`].
pub fn parse_wordlist(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            if line.starts_with('.') {
                line.to_string()
            } else {
                format!(".{}", line)
            }
        })
        .collect()
}

/// The first dot-separated label of `domain`.
///
/// `sub.example.com` yields `sub`; a name without dots is returned unchanged.
pub fn extract_base_label(domain: &str) -> &str {
    match domain.split_once('.') {
        Some((base, _)) => base,
        None => domain,
    }
}

/// Join `base` with every suffix, preserving order.
pub fn build_candidates(base: &str, tlds: &[String]) -> Vec<String> {
    tlds.iter().map(|tld| format!("{}{}", base, tld)).collect()
}

/// Whether `organization` is a privacy-service placeholder.
pub fn is_placeholder_organization(organization: &str) -> bool {
    let lower = organization.trim().to_lowercase();
    if lower.is_empty() {
        return true;
    }
    PLACEHOLDER_ORGANIZATIONS.contains(&lower.as_str())
        || lower.contains("redacted")
        || lower.contains("privacy service")
        || lower.contains("whois privacy")
}

/// Trim `organization`, mapping privacy placeholders to the empty string.
pub fn normalize_organization(organization: &str) -> String {
    if is_placeholder_organization(organization) {
        String::new()
    } else {
        organization.trim().to_string()
    }
}
