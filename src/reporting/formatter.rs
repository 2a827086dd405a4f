use serde_json::Value;

use crate::pipeline::state::RunSummary;

/// Render a vulnerability summary object as a two-column markdown table.
/// Non-object summaries are shown as compact JSON.
pub fn format_summary_table(summary: &Value) -> String {
    let map = match summary {
        Value::Object(map) => map,
        other => return other.to_string(),
    };

    let mut out = String::from("| Category | Count |\n|---|---|\n");
    for (key, value) in map {
        let cell = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&format!("| {} | {} |\n", key, cell));
    }
    out
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let elapsed = summary.finished_at - summary.started_at;
    let mut out = String::from("## Scan Summary\n\n| Test case | Scan | Phase | Issues |\n|---|---|---|---|\n");
    for session in &summary.sessions {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            session.testcase, session.scan_id, session.phase, session.issues
        ));
    }
    out.push_str(&format!(
        "| **Total** | | | **{}** |\n\nElapsed: {}s\n",
        summary.total_issues,
        elapsed.num_seconds()
    ));
    if !summary.reports.is_empty() {
        out.push_str("\nReports:\n");
        for path in &summary.reports {
            out.push_str(&format!("- {}\n", path.display()));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ScanId, ScanPhase, TestCaseId};
    use crate::pipeline::state::SessionOutcome;
    use chrono::{Duration, Utc};
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_summary_table() {
        let table = format_summary_table(&json!({"high": 2, "low": "1"}));
        assert!(table.contains("| high | 2 |"));
        assert!(table.contains("| low | 1 |"));
        assert_eq!(format_summary_table(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_run_summary_lists_sessions() {
        let now = Utc::now();
        let summary = RunSummary {
            started_at: now - Duration::seconds(90),
            finished_at: now,
            sessions: vec![SessionOutcome {
                testcase: TestCaseId(3),
                scan_id: ScanId::from("41"),
                phase: ScanPhase::Succeeded,
                issues: 5,
            }],
            total_issues: 5,
            reports: vec![PathBuf::from("stingray_scan_standard_report.json")],
        };
        let text = format_run_summary(&summary);
        assert!(text.contains("| 3 | 41 |"));
        assert!(text.contains("**5**"));
        assert!(text.contains("Elapsed: 90s"));
        assert!(text.contains("- stingray_scan_standard_report.json"));
    }
}
