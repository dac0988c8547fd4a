pub mod shell;

use crate::discover::Submission;
use anyhow::Result;

pub use shell::ShellRunner;

/// Invokes the external CRAB scripts for a submission and returns their
/// combined text output.
pub trait StatusRunner {
    fn status(&self, submission: &Submission) -> Result<String>;
    fn resubmit(&self, submission: &Submission) -> Result<String>;
}
