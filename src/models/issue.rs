use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::ids::{ScanId, TestCaseId};

/// Detail payload of a finding.
///
/// Raw findings always carry a single value, whatever its JSON shape. A
/// grouped collection only appears once name-grouping merged two distinct
/// values into one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Details {
    Single(Value),
    Grouped(Vec<Value>),
}

impl Details {
    /// Returns true if `value` is this detail or one of the grouped details.
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Details::Single(v) => v == value,
            Details::Grouped(values) => values.contains(value),
        }
    }

    /// Iterate over every detail value held.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        let slice: &[Value] = match self {
            Details::Single(v) => std::slice::from_ref(v),
            Details::Grouped(values) => values,
        };
        slice.iter()
    }

    /// Add a distinct value, promoting a single detail into a group the
    /// first time a second value arrives. Values already present are ignored.
    pub fn absorb(&mut self, value: Value) {
        if self.contains(&value) {
            return;
        }
        match self {
            Details::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Details::Grouped(vec![first, value]);
            }
            Details::Grouped(values) => values.push(value),
        }
    }

    /// Stable textual key, used when details take part in merge identity.
    pub fn merge_key(&self) -> String {
        match self {
            Details::Single(v) => v.to_string(),
            Details::Grouped(values) => Value::Array(values.clone()).to_string(),
        }
    }
}

impl Default for Details {
    fn default() -> Self {
        Details::Single(Value::Null)
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Details::Single(v) => v.serialize(serializer),
            Details::Grouped(values) => values.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Details {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Details::Single)
    }
}

/// A finding as returned by the scan service's issue listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIssue {
    pub id: Value,
    pub name: String,
    #[serde(default)]
    pub details: Value,
    /// Remaining service fields (severity, description, ...) carried through to reports.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawIssue {
    fn id_text(&self) -> String {
        match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// A consolidated finding as it appears in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub name: String,
    #[serde(default)]
    pub details: Details,
    /// Originating record ids, each prefixed with the test case that produced it.
    #[serde(rename = "id")]
    pub identifiers: Vec<String>,
    /// Scan sessions that reported this finding, without duplicates.
    #[serde(rename = "scan_id")]
    pub origin_scan_ids: Vec<ScanId>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Issue {
    /// Tag a raw finding with the test case and scan that produced it.
    pub fn from_raw(raw: RawIssue, testcase: TestCaseId, scan_id: &ScanId) -> Self {
        let identifier = format!("{}-{}", testcase, raw.id_text());
        Self {
            name: raw.name,
            details: Details::Single(raw.details),
            identifiers: vec![identifier],
            origin_scan_ids: vec![scan_id.clone()],
            extra: raw.extra,
        }
    }

    /// Record a scan id unless it is already listed.
    pub fn add_origin(&mut self, scan_id: &ScanId) {
        if !self.origin_scan_ids.contains(scan_id) {
            self.origin_scan_ids.push(scan_id.clone());
        }
    }
}
