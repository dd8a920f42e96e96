//! Output formatting for the scim-drift CLI.
//!
//! This module renders a [`DriftReport`] as styled tables, plain text or
//! JSON, and provides the progress spinner shown while fetching.

use crate::args::OutputFormat;
use anyhow::Result;
use console::{Style, Term};
use drift_core::{DriftReport, OrgMember};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt::Write;
use std::time::Duration;

/// Renders drift reports in the selected format.
pub struct OutputFormatter {
    /// Selected output format
    format: OutputFormat,
    /// Whether colors are enabled
    colors_enabled: bool,
}

impl OutputFormatter {
    /// Create a new output formatter.
    pub fn new(format: OutputFormat, colors_enabled: bool) -> Self {
        Self {
            format,
            colors_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Print the report to stdout.
    pub fn print_report(&self, report: &DriftReport) -> Result<()> {
        let rendered = self.render(report)?;
        print!("{}", rendered);
        Ok(())
    }

    /// Render the report in the selected format.
    pub fn render(&self, report: &DriftReport) -> Result<String> {
        match self.format {
            OutputFormat::Table => Ok(self.render_table(report)),
            OutputFormat::Txt => Ok(render_txt(report)),
            OutputFormat::Json => {
                let mut json = serde_json::to_string_pretty(report)?;
                json.push('\n');
                Ok(json)
            }
        }
    }

    /// Create a spinner for the fetch phase.
    ///
    /// Only shown for table output on an interactive terminal, so piped and
    /// CI output stays clean.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if self.format != OutputFormat::Table || !Term::stderr().is_term() {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));

        Some(pb)
    }

    fn paint(&self, text: &str, style: &Style) -> String {
        if self.colors_enabled {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn render_table(&self, report: &DriftReport) -> String {
        let title = Style::new().bold().underlined();
        let bad = Style::new().red().bold();
        let good = Style::new().green();

        let mut out = String::new();
        let heading = match report.organization() {
            Some(org) => format!("SCIM drift report for {}", org),
            None => "SCIM drift report".to_string(),
        };
        let _ = writeln!(out, "{}", self.paint(&heading, &title));
        out.push('\n');

        let without_scim = report.members_without_scim();
        let _ = writeln!(
            out,
            "{}",
            self.paint(
                &format!("Members without SCIM identity ({})", without_scim.len()),
                if without_scim.is_empty() { &good } else { &bad },
            )
        );
        if without_scim.is_empty() {
            let _ = writeln!(out, "  none");
        } else {
            let rows: Vec<Vec<String>> = without_scim
                .iter()
                .map(|m| vec![m.login.clone(), joined_emails(m)])
                .collect();
            self.write_table(&mut out, &["Login", "Verified emails"], &rows);
        }
        out.push('\n');

        let without_email = report.members_without_verified_email();
        let _ = writeln!(
            out,
            "{}",
            self.paint(
                &format!("Members without verified email ({})", without_email.len()),
                if without_email.is_empty() { &good } else { &bad },
            )
        );
        if without_email.is_empty() {
            let _ = writeln!(out, "  none");
        } else {
            let rows: Vec<Vec<String>> = without_email
                .iter()
                .map(|m| vec![m.login.clone(), m.node_id.clone()])
                .collect();
            self.write_table(&mut out, &["Login", "Node ID"], &rows);
        }
        out.push('\n');

        if !report.ambiguous_keys().is_empty() {
            let _ = writeln!(
                out,
                "{}",
                self.paint(
                    &format!("Emails claimed by several members ({})", report.ambiguous_keys().len()),
                    &Style::new().yellow().bold(),
                )
            );
            let rows: Vec<Vec<String>> = report
                .ambiguous_keys()
                .iter()
                .map(|a| vec![a.key.to_string(), a.kept.clone(), a.duplicate.clone()])
                .collect();
            self.write_table(&mut out, &["Email", "Matched as", "Also claimed by"], &rows);
            out.push('\n');
        }

        let summary = report.summary();
        let totals = [
            ("Members", summary.total_members),
            ("SCIM identities", summary.total_scim_identities),
            ("Active SCIM identities", summary.active_scim_identities),
            ("Matched", summary.matched),
            ("Without SCIM", summary.without_scim),
            ("Without verified email", summary.without_verified_email),
        ];
        let label_style = Style::new().bold();
        for (label, value) in totals {
            let _ = writeln!(out, "  {}: {}", self.paint(label, &label_style), value);
        }

        out
    }

    fn write_table(&self, out: &mut String, headers: &[&str], rows: &[Vec<String>]) {
        if headers.is_empty() || rows.is_empty() {
            return;
        }

        // Column widths from the unstyled text
        let mut widths = headers.iter().map(|h| h.chars().count()).collect::<Vec<_>>();
        for row in rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(cell.chars().count());
                }
            }
        }

        let header_style = Style::new().bold();
        let header_cells: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, header)| self.paint(&pad(header, widths[i]), &header_style))
            .collect();
        let _ = writeln!(out, "  {}", header_cells.join("  ").trim_end());

        let separator: Vec<String> = widths.iter().map(|&width| "-".repeat(width)).collect();
        let _ = writeln!(out, "  {}", separator.join("  "));

        for row in rows {
            let cells: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(i, cell)| pad(cell, widths.get(i).copied().unwrap_or(0)))
                .collect();
            let _ = writeln!(out, "  {}", cells.join("  ").trim_end());
        }
    }
}

/// Plain text: one login per line under each heading.
pub fn render_txt(report: &DriftReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Members without SCIM identity:");
    for member in report.members_without_scim() {
        let _ = writeln!(out, "{}", member.login);
    }
    out.push('\n');

    let _ = writeln!(out, "Members without verified email:");
    for member in report.members_without_verified_email() {
        let _ = writeln!(out, "{}", member.login);
    }
    out.push('\n');

    let summary = report.summary();
    let _ = writeln!(
        out,
        "Total members: {}, SCIM identities: {}, without SCIM: {}, without verified email: {}",
        summary.total_members,
        summary.total_scim_identities,
        summary.without_scim,
        summary.without_verified_email
    );

    out
}

fn joined_emails(member: &OrgMember) -> String {
    member
        .verified_emails
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$}", text, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_core::{reconcile, ScimIdentity};

    fn report() -> DriftReport {
        let members = vec![
            OrgMember::new("alice", "U_a", ["a@x.com"]),
            OrgMember::new("bob", "U_b", Vec::<String>::new()),
            OrgMember::new("carol", "U_c", ["c@x.com"]),
        ];
        let identities = vec![ScimIdentity {
            id: "s1".to_string(),
            external_id: None,
            user_name: Some("a@x.com".to_string()),
            primary_email: Some("a@x.com".to_string()),
            active: true,
        }];
        reconcile(&members, &identities).for_organization("acme")
    }

    #[test]
    fn test_render_txt() {
        let rendered = render_txt(&report());
        let expected = "Members without SCIM identity:\nbob\ncarol\n\n\
                        Members without verified email:\nbob\n\n\
                        Total members: 3, SCIM identities: 1, without SCIM: 2, without verified email: 1\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_render_table_without_colors() {
        let formatter = OutputFormatter::new(OutputFormat::Table, false);
        let rendered = formatter.render(&report()).unwrap();

        assert!(rendered.starts_with("SCIM drift report for acme\n"));
        assert!(rendered.contains("Members without SCIM identity (2)"));
        assert!(rendered.contains("  Login  Verified emails\n"));
        assert!(rendered.contains("  carol  c@x.com\n"));
        assert!(rendered.contains("Members without verified email (1)"));
        assert!(rendered.contains("Matched: 1"));
        assert!(!rendered.contains('\u{1b}'));
    }

    #[test]
    fn test_render_table_no_drift() {
        let members = vec![OrgMember::new("alice", "U_a", ["a@x.com"])];
        let identities = vec![ScimIdentity {
            id: "s1".to_string(),
            external_id: None,
            user_name: None,
            primary_email: Some("A@X.com".to_string()),
            active: true,
        }];
        let report = reconcile(&members, &identities);

        let rendered = OutputFormatter::new(OutputFormat::Table, false)
            .render(&report)
            .unwrap();
        assert!(rendered.contains("Members without SCIM identity (0)\n  none\n"));
    }

    #[test]
    fn test_render_json() {
        let formatter = OutputFormatter::new(OutputFormat::Json, false);
        let rendered = formatter.render(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();

        assert_eq!(value["organization"], "acme");
        assert_eq!(value["total_members"], 3);
        assert_eq!(value["members_without_scim"][1]["login"], "carol");
    }

    #[test]
    fn test_spinner_only_for_tables() {
        let formatter = OutputFormatter::new(OutputFormat::Json, true);
        assert!(formatter.spinner("Fetching").is_none());
    }
}
