//! HTML and JSON run reports.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::runner::{Outcome, RunReport};

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
table { border-collapse: collapse; margin-bottom: 24px; }
th, td { border: 1px solid #999; padding: 4px 8px; text-align: left; vertical-align: top; }
.pass { color: green; }
.fail { color: red; }
.bug { background: #ffeeee; }
.muted { color: #777; }";

/// Render the whole report as a standalone HTML page
pub fn render_html(report: &RunReport) -> String {
    let summary = &report.summary;
    let mut html = String::new();

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Test Execution Report</title>\n<style>\n{}\n</style>\n</head>\n<body>\n\
         <h1>Test Execution Report</h1>\n",
        STYLE
    );
    let _ = writeln!(
        html,
        "<p>Generated: {}</p>",
        escape(&report.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    );
    let _ = writeln!(
        html,
        "<p>Device: {} &middot; Brain: {}</p>",
        escape(&report.device),
        if report.ai_enabled { "AI" } else { "fallback (no AI configured)" }
    );
    let _ = writeln!(html, "<p>Total tests: {}</p>", summary.total);
    let _ = writeln!(html, "<p class=\"pass\">Passed: {}</p>", summary.passed);
    let _ = writeln!(html, "<p class=\"fail\">Failed: {}</p>", summary.failed);
    let _ = writeln!(html, "<p>Bugs found: {}</p>", summary.bugs_found);
    if summary.errored > 0 {
        let _ = writeln!(html, "<p class=\"fail\">Device errors: {}</p>", summary.errored);
    }
    if report.aborted {
        let _ = writeln!(html, "<p class=\"fail\"><strong>Run aborted after a device error.</strong></p>");
    }

    for group in report.group_names() {
        let outcomes: Vec<&Outcome> = report.outcomes.iter().filter(|o| o.group == group).collect();
        if outcomes.is_empty() {
            continue;
        }
        if let Some(name) = &group {
            let _ = writeln!(html, "<h2>{}</h2>", escape(name));
        }
        render_table(&mut html, &outcomes);
    }

    if !report.failures.is_empty() {
        let _ = writeln!(html, "<h2>Device errors</h2>\n<ul>");
        for failure in &report.failures {
            let group = failure
                .group
                .as_deref()
                .map(|g| format!("{} / ", escape(g)))
                .unwrap_or_default();
            let _ = writeln!(
                html,
                "<li class=\"fail\">{}{}: {}</li>",
                group,
                escape(&failure.test_case),
                escape(&failure.error)
            );
        }
        let _ = writeln!(html, "</ul>");
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_table(html: &mut String, outcomes: &[&Outcome]) {
    html.push_str(
        "<table>\n<tr><th>Test</th><th>Action</th><th>Expected</th><th>Result</th>\
         <th>Screen</th><th>Bug?</th><th>Screenshot</th></tr>\n",
    );

    for outcome in outcomes {
        let (class, verdict) = if outcome.success { ("pass", "PASS") } else { ("fail", "FAIL") };
        let bug = if outcome.bug_found { "YES" } else { "&#10003;" };
        let screenshot = outcome
            .screenshot
            .as_ref()
            .map(|p| {
                let link = escape(&p.display().to_string());
                format!("<a href=\"{}\">{}</a>", link, escape(&file_name(p)))
            })
            .unwrap_or_default();

        let _ = writeln!(
            html,
            "<tr{}><td>{}</td><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td class=\"muted\">{}</td><td>{}</td><td>{}</td></tr>",
            if outcome.bug_found { " class=\"bug\"" } else { "" },
            escape(&outcome.test_case),
            escape(&outcome.action),
            escape(&outcome.expected),
            class,
            verdict,
            escape(&outcome.screen_type),
            bug,
            screenshot
        );

        if let Some(details) = &outcome.bug_details {
            let _ = writeln!(
                html,
                "<tr class=\"bug\"><td colspan=\"7\">{} ({}): {}</td></tr>",
                escape(details.bug_type.as_deref().unwrap_or("bug")),
                escape(details.severity.as_deref().unwrap_or("unknown severity")),
                escape(details.description.as_deref().unwrap_or("no description"))
            );
        }
    }

    html.push_str("</table>\n");
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Escape text for HTML element and attribute content
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Write the HTML report and return its path
pub fn write_html(report: &RunReport, path: &Path) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render_html(report))?;
    Ok(path.to_path_buf())
}

/// Write the report as pretty JSON next to the HTML one
pub fn write_json(report: &RunReport, path: &Path) -> std::io::Result<PathBuf> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(path.to_path_buf())
}
