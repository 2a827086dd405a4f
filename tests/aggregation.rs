use serde_json::json;
use stingray_scan::models::{Issue, RawIssue, ScanId, TestCaseId};
use stingray_scan::pipeline::{merge, MergePolicy, ResultAggregator};

fn tagged(testcase: u64, scan: &str, raw: serde_json::Value) -> Vec<Issue> {
    let raw: Vec<RawIssue> = serde_json::from_value(raw).unwrap();
    raw.into_iter()
        .map(|r| Issue::from_raw(r, TestCaseId(testcase), &ScanId::from(scan)))
        .collect()
}

#[test]
fn test_standard_merge_collects_identifiers_and_scans() {
    let report = merge(
        vec![
            tagged(1, "s1", json!([{"id": "1", "name": "A", "details": "x"}])),
            tagged(2, "s2", json!([{"id": "2", "name": "A", "details": "x"}])),
        ],
        MergePolicy::Standard,
    );

    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!([{"name": "A", "details": "x", "id": ["1-1", "2-2"], "scan_id": ["s1", "s2"]}])
    );
}

#[test]
fn test_grouping_merge_collects_distinct_details() {
    let report = merge(
        vec![
            tagged(1, "s1", json!([{"id": 1, "name": "A", "details": "x"}])),
            tagged(2, "s2", json!([{"id": 1, "name": "A", "details": "y"}])),
            tagged(3, "s3", json!([{"id": 1, "name": "A", "details": "x"}])),
        ],
        MergePolicy::Grouping,
    );

    assert_eq!(report.len(), 1);
    let value = serde_json::to_value(&report[0]).unwrap();
    assert_eq!(value["details"], json!(["x", "y"]));
    assert_eq!(value["id"], json!(["1-1", "2-1", "3-1"]));
    assert_eq!(value["scan_id"], json!(["s1", "s2", "s3"]));
}

#[test]
fn test_standard_merge_keeps_distinct_details_apart() {
    let report = merge(
        vec![
            tagged(1, "s1", json!([{"id": 1, "name": "A", "details": "x"}, {"id": 2, "name": "B", "details": "x"}])),
            tagged(2, "s2", json!([{"id": 3, "name": "A", "details": "y"}])),
        ],
        MergePolicy::Standard,
    );
    let names: Vec<&str> = report.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "A"]);
}

#[test]
fn test_structured_details_merge_by_value() {
    let report = merge(
        vec![
            tagged(1, "s1", json!([{"id": 1, "name": "Leak", "details": {"file": "a.xml", "line": 3}}])),
            tagged(2, "s2", json!([{"id": 9, "name": "Leak", "details": {"line": 3, "file": "a.xml"}}])),
        ],
        MergePolicy::Standard,
    );
    assert_eq!(report.len(), 1);
    assert_eq!(report[0].identifiers, vec!["1-1".to_string(), "2-9".to_string()]);
}

#[test]
fn test_incremental_aggregation_matches_batch_merge() {
    let scans = vec![
        tagged(1, "s1", json!([{"id": 1, "name": "A", "details": "x"}, {"id": 2, "name": "B", "details": "q"}])),
        tagged(2, "s2", json!([{"id": 1, "name": "B", "details": "r"}, {"id": 2, "name": "A", "details": "x"}])),
    ];

    for policy in [MergePolicy::Standard, MergePolicy::Grouping] {
        let mut aggregator = ResultAggregator::new(policy);
        for scan in scans.clone() {
            aggregator.add_scan(scan);
        }
        assert_eq!(aggregator.into_issues(), merge(scans.clone(), policy));
    }
}

#[test]
fn test_extra_fields_survive_merging() {
    let report = merge(
        vec![tagged(4, "s4", json!([{"id": 1, "name": "A", "details": "x", "severity": "high"}]))],
        MergePolicy::Standard,
    );
    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value[0]["severity"], "high");
}
