use crate::diagnostics::Diagnostic;
use crate::types::{ResolutionReport, SkippedUse};

/// Formats a resolution report as a Markdown summary.
///
/// Lists the links that were made, then each group of skipped references,
/// then any diagnostics the pass emitted.
pub fn format_report_as_markdown(report: &ResolutionReport, diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();

    out.push_str("## @uses Resolution\n");
    out.push_str(&format!(
        "**Processed:** {} | **Linked:** {} | **Skipped:** {}\n\n",
        report.total,
        report.resolved_count(),
        report.skipped_count()
    ));

    out.push_str("### Linked\n");
    if report.links.is_empty() {
        out.push_str("_No references linked._\n\n");
    } else {
        for link in &report.links {
            out.push_str(&format!("- {} -> {}\n", link.origin_ref, link.refers));
        }
        out.push('\n');
    }

    push_skipped(&mut out, "Ambiguous", &report.ambiguous);
    push_skipped(&mut out, "Failed", &report.failed);
    push_skipped(&mut out, "Unresolved", &report.unresolved);

    if !diagnostics.is_empty() {
        out.push_str("### Diagnostics\n");
        for d in diagnostics {
            out.push_str(&format!("- [{}] {}\n", d.severity.as_str(), d.message));
        }
    }

    out
}

fn push_skipped(out: &mut String, title: &str, items: &[SkippedUse]) {
    if items.is_empty() {
        return;
    }

    out.push_str(&format!("### {}\n", title));
    for item in items {
        out.push_str(&format!("- {} -> {}", item.origin_ref, item.refers));
        if item.candidates > 1 {
            out.push_str(&format!(" ({} candidates)", item.candidates));
        }
        if let Some(ref reason) = item.reason {
            out.push_str(&format!(" ({})", reason));
        }
        out.push('\n');
    }
    out.push('\n');
}

/// Formats a resolution report and its diagnostics as pretty-printed JSON.
pub fn format_report_as_json(report: &ResolutionReport, diagnostics: &[Diagnostic]) -> String {
    let value = serde_json::json!({
        "report": report,
        "diagnostics": diagnostics,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}
