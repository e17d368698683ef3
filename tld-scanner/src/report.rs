//! Final report rendering: the text block and the JSON document.

use crate::ui::format_duration;
use console::style;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use tld_scanner_lib::{DomainRecord, ScanResult};

/// JSON shape of a finished scan.
///
/// `all_domains` is only present when every result was requested.
#[derive(Debug, Serialize)]
pub struct ScanReport<'a> {
    pub target_domain: &'a str,
    pub target_organization: &'a str,
    pub matching_domains: &'a [DomainRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_domains: Option<&'a [DomainRecord]>,
    pub scan_duration: String,
    pub total_scanned: usize,
    pub total_matches: usize,
    pub total_errors: usize,
}

impl<'a> ScanReport<'a> {
    pub fn new(result: &'a ScanResult, include_all: bool) -> Self {
        Self {
            target_domain: &result.target_domain,
            target_organization: &result.target_organization,
            matching_domains: &result.matching_domains,
            all_domains: include_all.then_some(result.all_domains.as_slice()),
            scan_duration: format_duration(result.duration),
            total_scanned: result.total_scanned,
            total_matches: result.total_matches,
            total_errors: result.total_errors,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render the text report.
    ///
    /// The full domain list is included only when `verbose` is set and the
    /// report carries all domains.
    pub fn to_text(&self, verbose: bool) -> String {
        let mut out = String::new();

        let _ = writeln!(out);
        let _ = writeln!(out, "{}", style("=== TLD SCANNER RESULTS ===").cyan());
        let _ = writeln!(out, "Target Domain: {}", self.target_domain);
        let _ = writeln!(out, "Target Organization: {}", self.target_organization);
        let _ = writeln!(out, "Scan Duration: {}", self.scan_duration);
        let _ = writeln!(out, "Total Scanned: {}", self.total_scanned);
        let _ = writeln!(out, "Total Matches: {}", self.total_matches);
        let _ = writeln!(out, "Total Errors: {}", self.total_errors);
        let _ = writeln!(out);

        if !self.matching_domains.is_empty() {
            let _ = writeln!(out, "{}", style("=== MATCHING DOMAINS ===").green());
            for record in self.matching_domains {
                let _ = writeln!(out, "[+] {}", record.domain);
                let _ = writeln!(out, "    Organization: {}", record.organization);
                let _ = writeln!(out, "    Registrar: {}", record.registrar);
                let _ = writeln!(out, "    Created: {}", record.created_date);
                let _ = writeln!(out, "    Expires: {}", record.expiry_date);
                if !record.name_servers.is_empty() {
                    let _ = writeln!(out, "    Name Servers: {}", record.name_servers.join(", "));
                }
                let _ = writeln!(out);
            }
        }

        match self.all_domains {
            Some(all) if verbose && !all.is_empty() => {
                let _ = writeln!(out, "{}", style("=== ALL SCANNED DOMAINS ===").yellow());
                for record in all {
                    match &record.error {
                        Some(error) => {
                            let _ = writeln!(out, "[!] {} -> ERROR: {}", record.domain, error);
                        }
                        None => {
                            let _ = writeln!(out, "[-] {} -> {}", record.domain, record.organization);
                        }
                    }
                }
            }
            _ => {}
        }

        out
    }
}

/// Write `content` to `path`, or print it when no path is given.
///
/// Files never receive terminal color codes.
pub fn emit(content: &str, path: Option<&str>) -> std::io::Result<()> {
    match path {
        Some(path) => fs::write(path, console::strip_ansi_codes(content).as_bytes()),
        None => {
            print!("{}", content);
            Ok(())
        }
    }
}
