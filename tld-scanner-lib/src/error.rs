//! Error handling for scan operations.
//!
//! A single error type covers configuration problems, target resolution
//! failures and per-domain lookup failures. Per-domain failures never abort a
//! scan; the engine turns them into the `error` field of a `DomainRecord`.

use std::fmt;
use std::time::Duration;

/// Main error type for scanning operations.
#[derive(Debug, Clone)]
pub enum ScanError {
    /// Invalid domain name format
    InvalidDomain { domain: String, reason: String },

    /// Network-related errors (connection refused, DNS, etc.)
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// RDAP protocol specific errors
    RdapError {
        domain: String,
        message: String,
        status_code: Option<u16>,
    },

    /// WHOIS protocol specific errors
    WhoisError { domain: String, message: String },

    /// Bootstrap registry lookup failures
    BootstrapError { tld: String, message: String },

    /// Malformed lookup responses
    ParseError {
        message: String,
        content: Option<String>,
    },

    /// The registry has no registration data for the domain
    NoData { domain: String },

    /// Configuration errors (invalid worker count, bad config file, etc.)
    ConfigError { message: String },

    /// File I/O errors when reading wordlists or config files
    FileError { path: String, message: String },

    /// Operation exceeded its time budget
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The target domain could not be resolved to an organization
    TargetResolution { domain: String, reason: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl ScanError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new RDAP error.
    pub fn rdap<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: None,
        }
    }

    /// Create a new RDAP error with HTTP status code.
    pub fn rdap_with_status<D: Into<String>, M: Into<String>>(
        domain: D,
        message: M,
        status_code: u16,
    ) -> Self {
        Self::RdapError {
            domain: domain.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    /// Create a new WHOIS error.
    pub fn whois<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::WhoisError {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::ParseError {
            message: message.into(),
            content: None,
        }
    }

    /// Create a new no-data error.
    pub fn no_data<D: Into<String>>(domain: D) -> Self {
        Self::NoData {
            domain: domain.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new target resolution error.
    pub fn target_resolution<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::TargetResolution {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Check whether the error means the registry simply has no record.
    ///
    /// RDAP answers 404 and WHOIS servers answer with "no match" style text
    /// for unregistered names.
    pub fn indicates_no_data(&self) -> bool {
        match self {
            Self::NoData { .. } => true,
            Self::RdapError {
                status_code: Some(404),
                ..
            } => true,
            Self::WhoisError { message, .. } => {
                let msg = message.to_lowercase();
                msg.contains("not found") || msg.contains("no match") || msg.contains("no data")
            }
            _ => false,
        }
    }

    /// Check if this error must stop the whole scan before it starts.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::FileError { .. } | Self::TargetResolution { .. }
        )
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::RdapError {
                domain,
                message,
                status_code,
            } => {
                if let Some(code) = status_code {
                    write!(f, "RDAP error for '{}' (HTTP {}): {}", domain, code, message)
                } else {
                    write!(f, "RDAP error for '{}': {}", domain, message)
                }
            }
            Self::WhoisError { domain, message } => {
                write!(f, "WHOIS error for '{}': {}", domain, message)
            }
            Self::BootstrapError { tld, message } => {
                write!(f, "Bootstrap error for TLD '{}': {}", tld, message)
            }
            Self::ParseError { message, .. } => {
                write!(f, "Parse error: {}", message)
            }
            Self::NoData { domain } => {
                write!(f, "No registration data found for '{}'", domain)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => {
                write!(f, "Timeout after {:?} during: {}", duration, operation)
            }
            Self::TargetResolution { domain, reason } => {
                write!(f, "Could not resolve target '{}': {}", domain, reason)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ScanError {}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network_with_source("HTTP request timed out", err.to_string())
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for ScanError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<toml::de::Error> for ScanError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML configuration: {}", err))
    }
}

impl From<std::io::Error> for ScanError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ScanError::timeout("registration lookup", Duration::from_secs(3));
        assert_eq!(
            err.to_string(),
            "Timeout after 3s during: registration lookup"
        );

        let err = ScanError::no_data("example.zz");
        assert_eq!(
            err.to_string(),
            "No registration data found for 'example.zz'"
        );

        let err = ScanError::rdap_with_status("example.com", "server error", 503);
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_indicates_no_data() {
        assert!(ScanError::no_data("a.com").indicates_no_data());
        assert!(ScanError::rdap_with_status("a.com", "missing", 404).indicates_no_data());
        assert!(ScanError::whois("a.com", "No match for domain").indicates_no_data());
        assert!(!ScanError::network("refused").indicates_no_data());
    }

    #[test]
    fn test_classification() {
        assert!(ScanError::config("workers must be at least 1").is_fatal());
        assert!(ScanError::target_resolution("a.com", "no organization").is_fatal());
        assert!(!ScanError::timeout("lookup", Duration::from_secs(1)).is_fatal());
    }
}
