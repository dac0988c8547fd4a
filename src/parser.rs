use crate::{
    record::{StatusKey, StatusMap},
    util::parse_percent,
};

pub const JOBS_STATUS_MARKER: &str = "Jobs status:";
pub const MONITORING_URL_MARKER: &str = "Dashboard monitoring URL";
pub const SCHEDULER_STATUS_MARKER: &str = "Status on the scheduler";
pub const COMPLETED_MARKER: &str = "COMPLETED";
/// Stored when a status keyword is not followed by a fraction.
pub const MISSING_FRACTION: &str = "<none>";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedStatus {
    pub status: StatusMap,
    pub monitoring_link: Option<String>,
    pub scheduler_completed: bool,
}

impl ParsedStatus {
    /// A `failed` entry counts unless its fraction reads as zero.
    pub fn has_failed_jobs(&self) -> bool {
        self.status
            .get(&StatusKey::Failed)
            .is_some_and(|frac| parse_percent(frac).is_none_or(|v| v > 0.0))
    }
}

pub fn status_line_count(output: &str) -> usize {
    output
        .lines()
        .filter(|l| l.starts_with(JOBS_STATUS_MARKER))
        .count()
}

/// Output is only trusted when it carries exactly one `Jobs status:` line.
pub fn is_usable(output: &str) -> bool {
    status_line_count(output) == 1
}

pub fn parse_status(output: &str) -> ParsedStatus {
    let mut parsed = ParsedStatus::default();

    for raw in output.lines() {
        if raw.contains(SCHEDULER_STATUS_MARKER) && raw.contains(COMPLETED_MARKER) {
            parsed.scheduler_completed = true;
        }

        let line = raw.replacen(JOBS_STATUS_MARKER, "", 1);
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = words.first() else {
            continue;
        };

        if line.starts_with(MONITORING_URL_MARKER) {
            if let Some(link) = words.get(3) {
                parsed.monitoring_link = Some((*link).to_string());
            }
            continue;
        }

        for key in StatusKey::JOB_STATES {
            if first.contains(key.as_str()) {
                let frac = words.get(1).copied().unwrap_or(MISSING_FRACTION);
                parsed.status.insert(key, frac.to_string());
            }
        }
    }

    parsed
}
