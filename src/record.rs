use crate::{parser::ParsedStatus, util::parse_percent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status names reported by the status command, in the order they are
/// listed on the dashboard. `CrabStatus` only appears when the status
/// command itself could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKey {
    Finished,
    Running,
    Transferring,
    Failed,
    Killed,
    Idle,
    Unsubmitted,
    ToRetry,
    #[serde(rename = "crab status")]
    CrabStatus,
}

impl StatusKey {
    pub const JOB_STATES: [StatusKey; 8] = [
        StatusKey::Finished,
        StatusKey::Running,
        StatusKey::Transferring,
        StatusKey::Failed,
        StatusKey::Killed,
        StatusKey::Idle,
        StatusKey::Unsubmitted,
        StatusKey::ToRetry,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKey::Finished => "finished",
            StatusKey::Running => "running",
            StatusKey::Transferring => "transferring",
            StatusKey::Failed => "failed",
            StatusKey::Killed => "killed",
            StatusKey::Idle => "idle",
            StatusKey::Unsubmitted => "unsubmitted",
            StatusKey::ToRetry => "toRetry",
            StatusKey::CrabStatus => "crab status",
        }
    }
}

impl fmt::Display for StatusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type StatusMap = BTreeMap<StatusKey, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRecord {
    pub status: StatusMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_link: Option<String>,
}

impl SampleRecord {
    /// The state of a sample before its status has been read: `finished: 0%`.
    pub fn pending() -> Self {
        Self {
            status: BTreeMap::from([(StatusKey::Finished, "0%".to_string())]),
            monitoring_link: None,
        }
    }

    pub fn from_status<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (StatusKey, String)>,
    {
        Self {
            status: entries.into_iter().collect(),
            monitoring_link: None,
        }
    }

    /// Replaces the status with the single `crab status: failed` entry.
    pub fn mark_unreachable(&mut self) {
        self.status = BTreeMap::from([(StatusKey::CrabStatus, "failed".to_string())]);
    }

    pub fn apply(&mut self, parsed: &ParsedStatus) {
        for (key, frac) in &parsed.status {
            self.status.insert(*key, frac.clone());
        }
        if let Some(link) = &parsed.monitoring_link {
            self.monitoring_link = Some(link.clone());
        }
    }

    /// True when the only entry is a zero `finished` fraction, which is what
    /// a sample whose status can no longer be retrieved looks like.
    pub fn looks_irretrievable(&self) -> bool {
        if self.status.len() != 1 {
            return false;
        }
        self.status
            .get(&StatusKey::Finished)
            .and_then(|v| parse_percent(v))
            .is_some_and(|v| v == 0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorData {
    pub meta: BTreeMap<String, String>,
    pub samples: BTreeMap<String, SampleRecord>,
}

impl MonitorData {
    pub fn new(meta: BTreeMap<String, String>) -> Self {
        Self {
            meta,
            samples: BTreeMap::new(),
        }
    }
}
