//! Output rendering and formatting

use console::{Style, Term};
use secscan_types::CheckReport;
use std::fmt::Write as _;
use std::io;

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            term: Term::stdout(),
        }
    }

    /// Render a check report on stdout
    pub fn render_report(&self, report: &CheckReport) -> io::Result<()> {
        let rendered = if self.json_output {
            serde_json::to_string_pretty(report).map_err(io::Error::other)?
        } else {
            self.format_report(report)
        };
        self.term.write_line(rendered.trim_end())
    }

    /// Human readable form of a report
    pub fn format_report(&self, report: &CheckReport) -> String {
        let colors = self.term.features().colors_supported();
        let danger = Style::new().red().bold().force_styling(colors);
        let dim = Style::new().dim().force_styling(colors);
        let ok = Style::new().green().force_styling(colors);

        let mut out = String::new();
        for finding in &report.vulnerabilities {
            let _ = writeln!(
                out,
                "package {} ({}) is {}",
                finding.package,
                finding.version,
                danger.apply_to("vulnerable")
            );
            for advisory in &finding.advisories {
                let id = if advisory.id.is_empty() {
                    advisory.title.as_str()
                } else {
                    advisory.id.as_str()
                };
                let _ = writeln!(out, "\t{id} ({})", dim.apply_to(&advisory.link));
            }
        }

        for skipped in &report.skipped {
            let _ = writeln!(
                out,
                "package {} ({}) skipped: {}",
                skipped.package, skipped.version, skipped.reason
            );
        }

        if !report.vulnerable {
            let _ = writeln!(out, "{}", ok.apply_to("no known vulnerabilities found"));
        }

        if let Some(fingerprint) = &report.fingerprint {
            let _ = writeln!(
                out,
                "{}",
                dim.apply_to(format!("advisories revision {}", fingerprint.short()))
            );
        }
        out
    }
}
