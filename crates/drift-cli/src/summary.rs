//! GitHub Actions job summary.
//!
//! Appends a Markdown section to the file named by `GITHUB_STEP_SUMMARY`.

use anyhow::{Context, Result};
use drift_core::{DriftReport, OrgMember};
use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::Path;

/// Render the report as a Markdown job summary.
pub fn render_markdown(report: &DriftReport) -> String {
    let mut out = String::new();

    match report.organization() {
        Some(org) => {
            let _ = writeln!(out, "## SCIM drift report for `{}`", org);
        }
        None => {
            let _ = writeln!(out, "## SCIM drift report");
        }
    }
    out.push('\n');

    let summary = report.summary();
    let _ = writeln!(out, "| Check | Count |");
    let _ = writeln!(out, "| --- | ---: |");
    let _ = writeln!(out, "| Members | {} |", summary.total_members);
    let _ = writeln!(out, "| SCIM identities | {} |", summary.total_scim_identities);
    let _ = writeln!(out, "| Matched | {} |", summary.matched);
    let _ = writeln!(out, "| Without SCIM identity | {} |", summary.without_scim);
    let _ = writeln!(out, "| Without verified email | {} |", summary.without_verified_email);
    out.push('\n');

    if !report.has_drift() {
        let _ = writeln!(out, "No drift: every member has a SCIM identity.");
        return out;
    }

    write_member_list(&mut out, "Members without SCIM identity", report.members_without_scim());
    write_member_list(
        &mut out,
        "Members without verified email",
        report.members_without_verified_email(),
    );

    out
}

fn write_member_list(out: &mut String, title: &str, members: &[OrgMember]) {
    if members.is_empty() {
        return;
    }

    let _ = writeln!(out, "<details><summary>{} ({})</summary>", title, members.len());
    out.push('\n');
    for member in members {
        let _ = writeln!(out, "- `{}`", member.login);
    }
    out.push('\n');
    let _ = writeln!(out, "</details>");
    out.push('\n');
}

/// Append the Markdown summary of `report` to `path`.
pub fn append_step_summary(path: &Path, report: &DriftReport) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open step summary file {}", path.display()))?;

    file.write_all(render_markdown(report).as_bytes())
        .with_context(|| format!("Failed to write step summary file {}", path.display()))?;

    Ok(())
}
