//! Terminal output for the tld-scanner CLI.
//!
//! Banner, `[INFO]` status lines, live per-domain lines while the scan runs,
//! and the closing summary. JSON runs keep stdout for the report, so all of
//! this goes to stderr and live progress is suppressed.

use console::{style, Term};
use std::time::Duration;
use tld_scanner_lib::{is_match, DomainRecord, ScanObserver, ScanProgress, ScanResult};

const BANNER: &str = r"
 _____ _     ____    ____
|_   _| |   |  _ \  / ___|  ___ __ _ _ __  _ __   ___ _ __
  | | | |   | | | | \___ \ / __/ _` | '_ \| '_ \ / _ \ '__|
  | | | |___| |_| |  ___) | (_| (_| | | | | | | |  __/ |
  |_| |_____|____/  |____/ \___\__,_|_| |_|_| |_|\___|_|
";

/// Where status output goes for this run.
#[derive(Clone)]
pub struct Console {
    term: Term,
}

impl Console {
    /// Status output on stdout, or on stderr when stdout carries JSON.
    pub fn new(json: bool) -> Self {
        let term = if json { Term::stderr() } else { Term::stdout() };
        Self { term }
    }

    fn line(&self, text: &str) {
        let _ = self.term.write_line(text);
    }

    pub fn banner(&self) {
        self.line(&style(BANNER).cyan().to_string());
        let tagline = format!(
            "                 Domain Enumeration Tool v{}",
            env!("CARGO_PKG_VERSION")
        );
        self.line(&style(tagline).yellow().to_string());
        self.line("");
    }

    pub fn info(&self, message: &str) {
        self.line(&format!("{} {}", style("[INFO]").blue(), message));
    }

    pub fn warning(&self, message: &str) {
        self.line(&format!("{} {}", style("[WARNING]").yellow(), message));
    }

    /// Print the closing summary with the scan rate.
    pub fn summary(&self, result: &ScanResult) {
        self.line("");
        self.line(&style("=== SCAN SUMMARY ===").cyan().to_string());
        self.line(&format!(
            "Domains Scanned: {}",
            style(result.total_scanned).white()
        ));
        self.line(&format!(
            "Matches Found: {}",
            style(result.total_matches).green()
        ));
        self.line(&format!("Errors: {}", style(result.total_errors).red()));
        self.line(&format!(
            "Duration: {}",
            style(format_duration(result.duration)).yellow()
        ));
        self.line(&format!(
            "Rate: {}",
            style(format!("{:.2} domains/second", result.rate())).magenta()
        ));
    }
}

/// Live progress while the scan runs.
///
/// Matches are always announced. Verbose mode adds a line per checked or
/// failed domain; otherwise a single progress counter is redrawn in place.
pub struct ConsoleObserver {
    term: Term,
    target_org: String,
    verbose: bool,
}

impl ConsoleObserver {
    pub fn new(target_org: &str, verbose: bool) -> Self {
        Self {
            term: Term::stdout(),
            target_org: target_org.to_string(),
            verbose,
        }
    }

    /// End the in-place progress line.
    pub fn finish(&self) {
        if !self.verbose {
            let _ = self.term.write_line("");
        }
    }
}

impl ScanObserver for ConsoleObserver {
    fn on_record(&self, record: &DomainRecord, progress: &ScanProgress) {
        if !self.verbose {
            let _ = self.term.clear_line();
        }

        if is_match(record, &self.target_org) {
            let _ = self.term.write_line(&format_match(record));
        }

        if self.verbose {
            if let Some(line) = format_checked(record) {
                let _ = self.term.write_line(&line);
            }
        } else {
            let _ = self.term.write_str(&format_progress(progress));
        }
    }
}

fn format_match(record: &DomainRecord) -> String {
    format!(
        "{} {} -> {}",
        style("[+] MATCH:").green(),
        record.domain,
        style(&record.organization).yellow()
    )
}

/// Verbose line for a non-matching outcome; `None` when there is nothing to say.
fn format_checked(record: &DomainRecord) -> Option<String> {
    if let Some(error) = &record.error {
        Some(format!(
            "{} {} -> {}",
            style("[!] ERROR:").red(),
            record.domain,
            error
        ))
    } else if !record.organization.is_empty() {
        Some(format!(
            "{} {} -> {}",
            style("[-] CHECKED:").white(),
            record.domain,
            record.organization
        ))
    } else {
        None
    }
}

fn format_progress(progress: &ScanProgress) -> String {
    format!(
        "{} Progress: {}/{} domains scanned ({} matches)",
        style("[INFO]").blue(),
        progress.completed,
        progress.total,
        progress.matches
    )
}

/// Human-readable duration, e.g. `1.25s` or `830.00ms`.
pub fn format_duration(duration: Duration) -> String {
    format!("{:.2?}", duration)
}
