//! Merging of per-scan issue lists into one consolidated report.
//!
//! Scans are folded in execution order and issues in their given order. Each
//! incoming issue is looked up by merge key in the accumulated output and is
//! either merged into the existing entry or appended as a new one, so output
//! order is first-seen order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Issue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// One entry per exact `(name, details)` pair.
    Standard,
    /// One entry per `name`, collecting every distinct detail value.
    Grouping,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MergeKey {
    Identity { name: String, details: String },
    Name(String),
}

impl MergePolicy {
    fn key(&self, issue: &Issue) -> MergeKey {
        match self {
            Self::Standard => MergeKey::Identity {
                name: issue.name.clone(),
                details: issue.details.merge_key(),
            },
            Self::Grouping => MergeKey::Name(issue.name.clone()),
        }
    }
}

/// Accumulates issues from successive scans under one policy.
#[derive(Debug, Clone)]
pub struct ResultAggregator {
    policy: MergePolicy,
    entries: Vec<Issue>,
    index: HashMap<MergeKey, usize>,
}

impl ResultAggregator {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    /// Fold one scan's issues into the accumulated report.
    pub fn add_scan<I>(&mut self, issues: I)
    where
        I: IntoIterator<Item = Issue>,
    {
        for issue in issues {
            self.add_issue(issue);
        }
    }

    pub fn add_issue(&mut self, issue: Issue) {
        let key = self.policy.key(&issue);
        match self.index.get(&key).copied() {
            Some(position) => merge_into(&mut self.entries[position], issue, self.policy),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(issue);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn issues(&self) -> &[Issue] {
        &self.entries
    }

    pub fn into_issues(self) -> Vec<Issue> {
        self.entries
    }
}

fn merge_into(entry: &mut Issue, incoming: Issue, policy: MergePolicy) {
    if policy == MergePolicy::Grouping {
        for value in incoming.details.values() {
            entry.details.absorb(value.clone());
        }
    }
    entry.identifiers.extend(incoming.identifiers);
    for scan_id in &incoming.origin_scan_ids {
        entry.add_origin(scan_id);
    }
}

/// Merge scan result lists, given in execution order, under `policy`.
pub fn merge(scans: Vec<Vec<Issue>>, policy: MergePolicy) -> Vec<Issue> {
    let mut aggregator = ResultAggregator::new(policy);
    for scan in scans {
        aggregator.add_scan(scan);
    }
    aggregator.into_issues()
}
