//! TLD Scanner CLI Application
//!
//! Finds domains under other TLDs that are registered to the same
//! organization as a target domain. This binary is a thin front end over
//! tld-scanner-lib: it resolves settings, drives the scan and renders reports.

mod report;
mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use console::style;
use report::{emit, ScanReport};
use std::error::Error;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tld_scanner_lib::{
    build_candidates, extract_base_label, initialize_bootstrap, load_env_config, load_wordlist,
    validate_workers, ConfigManager, EnvConfig, FileConfig, RegistrationLookup, ScanConfig,
    Scanner, DEFAULT_WORDLIST,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;
use ui::{Console, ConsoleObserver};

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// CLI arguments for tld-scanner
#[derive(Parser, Debug)]
#[command(name = "tld-scanner")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find domains registered to the same organization across many TLDs")]
#[command(
    long_about = "Resolve the registrant organization of a target domain, then look up the same name under every TLD in a wordlist and report the domains owned by that organization.\n\nLookups use RDAP with automatic WHOIS fallback."
)]
#[command(after_help = "Examples:\n  tld-scanner -d example.com -w wordlist.txt -o results.txt -t 20 -v\n  tld-scanner -d example.com --json -o results.json --all")]
#[command(styles = STYLES)]
pub struct Args {
    /// Target domain to analyze (required)
    #[arg(short = 'd', long = "domain", value_name = "DOMAIN", help_heading = "Target")]
    pub domain: Option<String>,

    /// Path to TLD wordlist file [default: wordlist.txt]
    #[arg(short = 'w', long = "wordlist", value_name = "FILE", help_heading = "Target")]
    pub wordlist: Option<String>,

    /// Output file path (prints to stdout when omitted)
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Output")]
    pub output: Option<String>,

    /// Output results in JSON format
    #[arg(long = "json", help_heading = "Output")]
    pub json: bool,

    /// Save all domain results, not just matches
    #[arg(long = "all", help_heading = "Output")]
    pub all: bool,

    /// Show every checked domain and failure reason
    #[arg(short = 'v', long = "verbose", help_heading = "Output")]
    pub verbose: bool,

    /// Number of concurrent lookups [default: 10, max: 500]
    #[arg(short = 't', long = "threads", value_name = "N", help_heading = "Performance")]
    pub threads: Option<usize>,

    /// Per-lookup timeout in seconds [default: 30]
    #[arg(long = "timeout", value_name = "SECONDS", help_heading = "Performance")]
    pub timeout: Option<u64>,

    /// Milliseconds between lookups across all workers, 0 disables [default: 100]
    #[arg(short = 'r', long = "rate-limit", value_name = "MS", help_heading = "Performance")]
    pub rate_limit: Option<u64>,

    /// Disable automatic WHOIS fallback
    #[arg(long = "no-whois", help_heading = "Protocol")]
    pub no_whois: bool,

    /// Disable IANA bootstrap (use only built-in RDAP endpoints)
    #[arg(long = "no-bootstrap", help_heading = "Protocol")]
    pub no_bootstrap: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Log lookup details to stderr
    #[arg(long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
struct Settings {
    scan: ScanConfig,
    wordlist: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = validate_args(&args) {
        eprintln!("{} {}", style("[ERROR]").red(), e);
        process::exit(1);
    }

    init_tracing(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("{} {}", style("[ERROR]").red(), e);
        process::exit(1);
    }
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("warn,tld_scanner=debug,tld_scanner_lib=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    match args.domain.as_deref().map(str::trim) {
        Some(domain) if !domain.is_empty() => {}
        _ => return Err("Domain is required. Use -h for help.".to_string()),
    }

    if let Some(threads) = args.threads {
        validate_workers(threads).map_err(|e| e.to_string())?;
    }

    if args.timeout == Some(0) {
        return Err("Timeout must be at least 1 second".to_string());
    }

    Ok(())
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let console = Console::new(args.json);
    let domain = args
        .domain
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    console.banner();

    let settings = build_settings(&args, &load_env_config())?;
    let tlds = load_wordlist(&settings.wordlist)
        .map_err(|e| format!("Failed to load wordlist: {}", e))?;

    let lookup = Arc::new(RegistrationLookup::with_config(&settings.scan)?);
    let scanner = Scanner::new(lookup, settings.scan.clone())?;

    console.info(&format!("Analyzing target domain: {}", domain));
    let target = scanner.resolve_target(&domain).await?;
    console.info(&format!(
        "Target organization: {}",
        style(&target.organization).green()
    ));
    console.info(&format!("Loaded {} TLDs from wordlist", tlds.len()));

    if tlds.is_empty() {
        console.warning("Wordlist contains no TLDs; nothing to scan");
    }

    if settings.scan.enable_bootstrap {
        if let Err(e) = initialize_bootstrap().await {
            warn!("Bootstrap registry unavailable, using built-in RDAP endpoints: {}", e);
        }
    }

    let candidates = build_candidates(extract_base_label(&domain), &tlds);
    console.info(&format!(
        "Starting scan of {} domains with {} threads...",
        candidates.len(),
        settings.scan.workers
    ));

    let observer = (!args.json)
        .then(|| Arc::new(ConsoleObserver::new(&target.organization, args.verbose)));
    let scanner = match &observer {
        Some(observer) => scanner.with_observer(observer.clone()),
        None => scanner,
    };

    let result = scanner
        .scan(&domain, &target.organization, &candidates)
        .await?;

    if let Some(observer) = &observer {
        observer.finish();
    }

    let report = ScanReport::new(&result, args.all);
    let content = if args.json {
        format!("{}\n", report.to_json()?)
    } else {
        report.to_text(args.verbose)
    };

    emit(&content, args.output.as_deref())
        .map_err(|e| format!("Failed to write results: {}", e))?;
    if let Some(path) = &args.output {
        console.info(&format!("Results saved to {}", path));
    }

    console.summary(&result);
    Ok(())
}

/// Resolve settings: defaults, then config files, then environment, then flags.
fn build_settings(args: &Args, env: &EnvConfig) -> Result<Settings, Box<dyn Error>> {
    let config_manager = ConfigManager::new();

    let file_config = match args.config.as_ref().or(env.config.as_ref()) {
        Some(path) => config_manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?,
        None => config_manager.discover_and_load()?,
    };

    Ok(apply_layers(file_config, env, args))
}

fn apply_layers(file_config: FileConfig, env: &EnvConfig, args: &Args) -> Settings {
    let defaults = file_config.defaults.unwrap_or_default();

    let mut scan = env.apply(defaults.apply(ScanConfig::default()));

    if let Some(threads) = args.threads {
        scan.workers = threads;
    }
    if let Some(timeout) = args.timeout {
        scan.timeout = Duration::from_secs(timeout);
    }
    if let Some(rate_limit) = args.rate_limit {
        scan.rate_limit = Duration::from_millis(rate_limit);
    }
    // Flags only ever disable; their absence keeps config and env values.
    if args.no_whois {
        scan.enable_whois_fallback = false;
    }
    if args.no_bootstrap {
        scan.enable_bootstrap = false;
    }

    let wordlist = args
        .wordlist
        .clone()
        .or_else(|| env.wordlist.clone())
        .or(defaults.wordlist)
        .unwrap_or_else(|| DEFAULT_WORDLIST.to_string());

    Settings { scan, wordlist }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tld_scanner_lib::DefaultsConfig;

    fn create_test_args() -> Args {
        Args {
            domain: Some("example.com".to_string()),
            wordlist: None,
            output: None,
            json: false,
            all: false,
            verbose: false,
            threads: None,
            timeout: None,
            rate_limit: None,
            no_whois: false,
            no_bootstrap: false,
            config: None,
            debug: false,
        }
    }

    fn file_config(defaults: DefaultsConfig) -> FileConfig {
        FileConfig {
            defaults: Some(defaults),
        }
    }

    #[test]
    fn test_validate_args_requires_domain() {
        let mut args = create_test_args();
        args.domain = None;
        assert!(validate_args(&args).unwrap_err().contains("Domain is required"));

        args.domain = Some("   ".to_string());
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_thread_bounds() {
        let mut args = create_test_args();
        assert!(validate_args(&args).is_ok());

        args.threads = Some(0);
        assert!(validate_args(&args).is_err());

        args.threads = Some(501);
        assert!(validate_args(&args).is_err());

        args.threads = Some(500);
        assert!(validate_args(&args).is_ok());
    }

    #[test]
    fn test_validate_args_zero_timeout() {
        let mut args = create_test_args();
        args.timeout = Some(0);
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_defaults_without_any_layer() {
        let settings = apply_layers(
            FileConfig::default(),
            &EnvConfig::default(),
            &create_test_args(),
        );
        assert_eq!(settings.scan.workers, 10);
        assert_eq!(settings.scan.timeout, Duration::from_secs(30));
        assert_eq!(settings.scan.rate_limit, Duration::from_millis(100));
        assert!(settings.scan.enable_whois_fallback);
        assert!(settings.scan.enable_bootstrap);
        assert_eq!(settings.wordlist, "wordlist.txt");
    }

    #[test]
    fn test_precedence_cli_over_env_over_file() {
        let file = file_config(DefaultsConfig {
            workers: Some(5),
            timeout: Some("10s".to_string()),
            rate_limit_ms: Some(500),
            wordlist: Some("file.txt".to_string()),
            ..Default::default()
        });
        let env = EnvConfig {
            workers: Some(20),
            wordlist: Some("env.txt".to_string()),
            ..Default::default()
        };
        let mut args = create_test_args();
        args.threads = Some(40);

        let settings = apply_layers(file, &env, &args);
        assert_eq!(settings.scan.workers, 40);
        assert_eq!(settings.scan.timeout, Duration::from_secs(10));
        assert_eq!(settings.scan.rate_limit, Duration::from_millis(500));
        assert_eq!(settings.wordlist, "env.txt");
    }

    #[test]
    fn test_protocol_flags_only_disable() {
        let file = file_config(DefaultsConfig {
            whois_fallback: Some(false),
            ..Default::default()
        });
        let mut args = create_test_args();
        args.no_bootstrap = true;

        let settings = apply_layers(file, &EnvConfig::default(), &args);
        assert!(!settings.scan.enable_whois_fallback);
        assert!(!settings.scan.enable_bootstrap);
    }

    #[test]
    fn test_explicit_config_file_errors_are_fatal() {
        let mut args = create_test_args();
        args.config = Some("/nonexistent/tld-scanner.toml".to_string());
        let err = build_settings(&args, &EnvConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Failed to load config file"));
    }
}
