//! Configuration file parsing and environment overrides.
//!
//! Settings are layered with increasing precedence: built-in defaults, TOML
//! config files, `TS_*` environment variables, then command-line flags. The
//! library handles the first three; the CLI applies its flags last.

use crate::error::ScanError;
use crate::types::{ScanConfig, MAX_WORKERS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Default wordlist path when none is configured.
pub const DEFAULT_WORDLIST: &str = "wordlist.txt";

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for scan options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,
}

/// The `[defaults]` table.
///
/// ```toml
/// [defaults]
/// workers = 20
/// timeout = "15s"
/// rate_limit_ms = 250
/// wordlist = "tlds.txt"
/// whois_fallback = true
/// bootstrap = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Per-lookup timeout, e.g. "30s" or "2m"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Spacing between lookups in milliseconds; 0 disables pacing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wordlist: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub whois_fallback: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<bool>,
}

impl DefaultsConfig {
    /// Overlay these values onto `config`.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout.as_deref().and_then(parse_timeout_string) {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(rate_limit_ms) = self.rate_limit_ms {
            config.rate_limit = Duration::from_millis(rate_limit_ms);
        }
        if let Some(enabled) = self.whois_fallback {
            config.enable_whois_fallback = enabled;
        }
        if let Some(enabled) = self.bootstrap {
            config.enable_bootstrap = enabled;
        }
        config
    }

    /// Values from `higher` win field by field.
    fn merge(mut self, higher: DefaultsConfig) -> DefaultsConfig {
        if higher.workers.is_some() {
            self.workers = higher.workers;
        }
        if higher.timeout.is_some() {
            self.timeout = higher.timeout;
        }
        if higher.rate_limit_ms.is_some() {
            self.rate_limit_ms = higher.rate_limit_ms;
        }
        if higher.wordlist.is_some() {
            self.wordlist = higher.wordlist;
        }
        if higher.whois_fallback.is_some() {
            self.whois_fallback = higher.whois_fallback;
        }
        if higher.bootstrap.is_some() {
            self.bootstrap = higher.bootstrap;
        }
        self
    }
}

/// Configuration discovery and loading.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    ///
    /// [`ScanError::FileError`] if the file cannot be read,
    /// [`ScanError::ConfigError`] if it is not valid TOML or fails validation.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, ScanError> {
        let path = path.as_ref();

        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content)?;
        self.validate_config(&config)?;

        debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Load every config file found in the standard locations and merge them.
    ///
    /// Lowest to highest precedence: XDG, home directory, current directory.
    /// A file that exists but is invalid is an error.
    pub fn discover_and_load(&self) -> Result<FileConfig, ScanError> {
        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        let mut merged = FileConfig::default();
        for path in candidates.into_iter().flatten() {
            let config = self.load_file(&path)?;
            merged = self.merge_configs(merged, config);
        }
        Ok(merged)
    }

    /// `./tld-scanner.toml` or `./.tld-scanner.toml`.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./tld-scanner.toml", "./.tld-scanner.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// `~/.tld-scanner.toml`.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let path = Path::new(&env::var_os("HOME")?).join(".tld-scanner.toml");
        path.exists().then_some(path)
    }

    /// `$XDG_CONFIG_HOME/tld-scanner/config.toml`, defaulting to `~/.config`.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("tld-scanner").join("config.toml");
        path.exists().then_some(path)
    }

    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        let defaults = match (lower.defaults, higher.defaults) {
            (Some(lower), Some(higher)) => Some(lower.merge(higher)),
            (lower, higher) => higher.or(lower),
        };
        FileConfig { defaults }
    }

    fn validate_config(&self, config: &FileConfig) -> Result<(), ScanError> {
        let Some(defaults) = &config.defaults else {
            return Ok(());
        };

        if let Some(workers) = defaults.workers {
            validate_workers(workers)?;
        }

        if let Some(timeout) = &defaults.timeout {
            match parse_timeout_string(timeout) {
                Some(secs) if secs > 0 => {}
                _ => {
                    return Err(ScanError::config(format!(
                        "Invalid timeout '{}'. Use a format like '5s', '30s', '2m'",
                        timeout
                    )))
                }
            }
        }

        if let Some(wordlist) = &defaults.wordlist {
            if wordlist.trim().is_empty() {
                return Err(ScanError::config("Wordlist path cannot be empty"));
            }
        }

        Ok(())
    }
}

/// Check a worker count against the accepted range.
pub fn validate_workers(workers: usize) -> Result<(), ScanError> {
    if workers == 0 || workers > MAX_WORKERS {
        return Err(ScanError::config(format!(
            "Worker count must be between 1 and {}",
            MAX_WORKERS
        )));
    }
    Ok(())
}

/// Values taken from `TS_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub workers: Option<usize>,
    pub timeout: Option<Duration>,
    pub rate_limit: Option<Duration>,
    pub wordlist: Option<String>,
    pub whois_fallback: Option<bool>,
    pub bootstrap: Option<bool>,
    pub config: Option<String>,
}

impl EnvConfig {
    /// Overlay these values onto `config`.
    pub fn apply(&self, mut config: ScanConfig) -> ScanConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit = rate_limit;
        }
        if let Some(enabled) = self.whois_fallback {
            config.enable_whois_fallback = enabled;
        }
        if let Some(enabled) = self.bootstrap {
            config.enable_bootstrap = enabled;
        }
        config
    }
}

/// Read the `TS_*` environment variables.
///
/// Invalid values are logged and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|key| env::var(key).ok())
}

/// Build an [`EnvConfig`] from any variable source.
pub fn env_config_from<F>(var: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    if let Some(val) = var("TS_WORKERS") {
        match val.trim().parse::<usize>() {
            Ok(workers) if validate_workers(workers).is_ok() => {
                debug!("Using TS_WORKERS={}", workers);
                env_config.workers = Some(workers);
            }
            _ => warn!(
                "Ignoring invalid TS_WORKERS='{}', must be 1-{}",
                val, MAX_WORKERS
            ),
        }
    }

    if let Some(val) = var("TS_TIMEOUT") {
        match parse_timeout_string(&val) {
            Some(secs) if secs > 0 => {
                debug!("Using TS_TIMEOUT={}", val);
                env_config.timeout = Some(Duration::from_secs(secs));
            }
            _ => warn!(
                "Ignoring invalid TS_TIMEOUT='{}', use a format like '5s', '30s', '2m'",
                val
            ),
        }
    }

    if let Some(val) = var("TS_RATE_LIMIT") {
        match val.trim().parse::<u64>() {
            Ok(ms) => {
                debug!("Using TS_RATE_LIMIT={}", ms);
                env_config.rate_limit = Some(Duration::from_millis(ms));
            }
            Err(_) => warn!("Ignoring invalid TS_RATE_LIMIT='{}', expected milliseconds", val),
        }
    }

    if let Some(val) = var("TS_WORDLIST") {
        if !val.trim().is_empty() {
            debug!("Using TS_WORDLIST={}", val);
            env_config.wordlist = Some(val);
        }
    }

    env_config.whois_fallback = bool_var(&var, "TS_WHOIS_FALLBACK");
    env_config.bootstrap = bool_var(&var, "TS_BOOTSTRAP");

    if let Some(val) = var("TS_CONFIG") {
        if !val.trim().is_empty() {
            debug!("Using TS_CONFIG={}", val);
            env_config.config = Some(val);
        }
    }

    env_config
}

fn bool_var<F>(var: &F, key: &str) -> Option<bool>
where
    F: Fn(&str) -> Option<String>,
{
    let val = var(key)?;
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            warn!("Ignoring invalid {}='{}', use true/false", key, val);
            None
        }
    }
}

/// Parse a timeout like "5s", "30s", "2m" or a bare number of seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        timeout_str.parse::<u64>().ok()
    }
}
