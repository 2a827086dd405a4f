use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::errors::StingrayError;
use crate::models::{ScanId, TestCaseId};
use crate::pipeline::aggregator::MergePolicy;

pub fn aggregated_report_name(policy: MergePolicy) -> String {
    let kind = match policy {
        MergePolicy::Standard => "standard",
        MergePolicy::Grouping => "grouping",
    };
    format!("stingray_scan_{}_report.json", kind)
}

pub fn separate_report_name(testcase: TestCaseId) -> String {
    format!("stingray_scan_report-testcase_{}.json", testcase)
}

pub fn pdf_report_name(scan_id: &ScanId) -> String {
    format!("scan-report-{}.pdf", scan_id)
}

/// Serialize with four-space indentation.
pub fn to_report_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StingrayError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    Ok(buf)
}

/// Write a JSON report to `path`, creating parent directories as needed.
pub async fn write_json_report<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<PathBuf, StingrayError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let json = to_report_json(value)?;
    tokio::fs::write(path, &json)
        .await
        .map_err(|e| StingrayError::Report(format!("Failed to write {}: {}", path.display(), e)))?;
    debug!(path = %path.display(), bytes = json.len(), "JSON report saved");
    Ok(path.to_path_buf())
}

pub async fn write_pdf_report(dir: &Path, scan_id: &ScanId, pdf: &[u8]) -> Result<PathBuf, StingrayError> {
    if pdf.is_empty() {
        return Err(StingrayError::Report(format!("Empty PDF report for scan {}", scan_id)));
    }
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(pdf_report_name(scan_id));
    tokio::fs::write(&path, pdf)
        .await
        .map_err(|e| StingrayError::Report(format!("Failed to write {}: {}", path.display(), e)))?;
    Ok(path)
}
