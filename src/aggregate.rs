use crate::{
    config::Config,
    discover::Submission,
    parser::{self, ParsedStatus},
    record::{MonitorData, SampleRecord},
    runner::StatusRunner,
};
use tracing::{debug, info, warn};

pub struct Aggregator<R: StatusRunner> {
    cfg: Config,
    runner: R,
    resubmit: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: usize,
    pub unreachable: usize,
    pub resubmitted: usize,
    pub completed_missing_results: usize,
}

impl<R: StatusRunner> Aggregator<R> {
    pub fn new(cfg: &Config, runner: R, resubmit: bool) -> Self {
        Self {
            cfg: cfg.clone(),
            runner,
            resubmit,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Polls every submission in order and records the result in `data`.
    /// A sample whose status cannot be read is marked and skipped; it never
    /// stops the loop.
    pub fn poll_all(&self, submissions: &[Submission], data: &mut MonitorData) -> PollSummary {
        for s in submissions {
            data.samples.insert(s.name.clone(), SampleRecord::pending());
        }

        let mut summary = PollSummary::default();
        let total = submissions.len();

        for (i, s) in submissions.iter().enumerate() {
            info!("processing sample {} of {} ({})", i + 1, total, s.path.display());
            summary.polled += 1;

            // A later submission with the same name replaces the earlier record.
            let record = data
                .samples
                .entry(s.name.clone())
                .or_insert_with(SampleRecord::pending);
            *record = SampleRecord::pending();

            let Some(output) = self.fetch_status(s) else {
                warn!("status for {} could not be read; skipping this sample", s.name);
                record.mark_unreachable();
                summary.unreachable += 1;
                continue;
            };

            let parsed = parser::parse_status(&output);
            for (key, frac) in &parsed.status {
                info!("percentage {key}: {frac}");
            }
            record.apply(&parsed);

            if parsed.has_failed_jobs() {
                if self.resubmit && self.resubmit_failed(s) {
                    summary.resubmitted += 1;
                } else if !self.resubmit {
                    info!("found failed jobs for {}; resubmission disabled", s.name);
                }
            }

            if self.completed_without_results(s, &parsed) {
                summary.completed_missing_results += 1;
            }
        }

        info!(
            "polled={} unreachable={} resubmitted={} completed_missing_results={}",
            summary.polled,
            summary.unreachable,
            summary.resubmitted,
            summary.completed_missing_results
        );
        summary
    }

    /// Runs the status command up to `max_attempts` times until its output
    /// is usable.
    pub fn fetch_status(&self, submission: &Submission) -> Option<String> {
        let attempts = self.cfg.status.max_attempts.max(1);
        for attempt in 1..=attempts {
            match self.runner.status(submission) {
                Ok(output) if parser::is_usable(&output) => return Some(output),
                Ok(output) => {
                    debug!("unusable status output:\n{}", output.trim_end());
                    warn!(
                        "status output has {} '{}' lines (attempt {}/{}); retrying",
                        parser::status_line_count(&output),
                        parser::JOBS_STATUS_MARKER,
                        attempt,
                        attempts
                    );
                }
                Err(err) => {
                    warn!(
                        "status command failed (attempt {}/{}): {:#}; retrying",
                        attempt, attempts, err
                    );
                }
            }
        }
        None
    }

    fn resubmit_failed(&self, submission: &Submission) -> bool {
        info!("found failed jobs for {}; resubmitting", submission.name);
        match self.runner.resubmit(submission) {
            Ok(output) => {
                debug!("resubmit output:\n{}", output.trim_end());
                info!("resubmission of {} done", submission.name);
                true
            }
            Err(err) => {
                warn!("resubmission of {} failed: {:#}", submission.name, err);
                false
            }
        }
    }

    fn completed_without_results(&self, submission: &Submission, parsed: &ParsedStatus) -> bool {
        if !parsed.scheduler_completed {
            return false;
        }
        let marker = submission.path.join(&self.cfg.status.results_marker);
        if marker.is_file() {
            return false;
        }
        warn!(
            "task {} is COMPLETED on the scheduler but {} is missing",
            submission.name,
            marker.display()
        );
        true
    }
}
