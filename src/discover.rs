use crate::config::Config;
use anyhow::{Context, Result, anyhow};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// One job submission found under a `crab_logs` directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Directory name of the submission, used as the sample key.
    pub name: String,
    pub path: PathBuf,
    /// Parent of the `crab_logs` directory; the status scripts live here.
    pub workdir: PathBuf,
}

/// Finds every directory inside a `crab_logs` folder at any depth below
/// `simpack`, sorted by the plain path string.
pub fn find_submissions(cfg: &Config, simpack: &Path) -> Result<Vec<Submission>> {
    let logs_name = cfg.paths.logs_dir_name.as_str();
    let mut out = Vec::new();

    for entry in WalkDir::new(simpack).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", simpack.display()))?;
        if !entry.file_type().is_dir() || entry.file_name() != logs_name {
            continue;
        }

        let logs_dir = entry.path();
        let workdir = logs_dir.parent().unwrap_or(simpack).to_path_buf();
        debug!("found {} in {}", logs_name, workdir.display());

        let children = std::fs::read_dir(logs_dir)
            .with_context(|| format!("read_dir {}", logs_dir.display()))?;
        for child in children {
            let child = child.with_context(|| format!("read_dir {}", logs_dir.display()))?;
            if !child.file_type()?.is_dir() {
                continue;
            }
            out.push(Submission {
                name: child.file_name().to_string_lossy().into_owned(),
                path: child.path(),
                workdir: workdir.clone(),
            });
        }
    }

    out.sort_by(|a, b| a.path.as_os_str().cmp(b.path.as_os_str()));

    let mut seen = HashSet::new();
    for s in &out {
        if !seen.insert(s.name.as_str()) {
            warn!(
                "sample name {} appears more than once; later entries overwrite earlier ones ({})",
                s.name,
                s.path.display()
            );
        }
    }

    Ok(out)
}

/// Every submission's working directory must hold the status script.
pub fn check_status_scripts(cfg: &Config, submissions: &[Submission]) -> Result<()> {
    for s in submissions {
        let exe = s.workdir.join(&cfg.status.script);
        if !exe.is_file() {
            return Err(anyhow!(
                "could not find {} at {} for sample {}",
                cfg.status.script,
                exe.display(),
                s.path.display()
            ));
        }
    }
    Ok(())
}
