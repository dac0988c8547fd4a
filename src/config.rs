use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub resubmit: Resubmit,
    #[serde(default)]
    pub proxy: Proxy,
    #[serde(default)]
    pub report: Report,
    #[serde(default)]
    pub logging: Logging,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    /// Number of samples processed in test mode.
    pub test_sample_limit: usize,
    pub print_summary: bool,
    pub dump_data: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            test_sample_limit: 3,
            print_summary: true,
            dump_data: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub out_dir: String,
    pub report_filename: String,
    pub logs_dir_name: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            out_dir: "monitor_crab_jobs".into(),
            report_filename: "index.html".into(),
            logs_dir_name: "crab_logs".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub shell: String,
    pub script: String,
    pub max_attempts: u32,
    /// 0 waits for the status command indefinitely.
    pub timeout_seconds: u64,
    /// Relative to the submission directory.
    pub results_marker: String,
}
impl Default for Status {
    fn default() -> Self {
        Self {
            shell: "bash".into(),
            script: "crab_status.sh".into(),
            max_attempts: 5,
            timeout_seconds: 0,
            results_marker: "results/processedLumis.json".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Resubmit {
    pub script: String,
    pub args: Vec<String>,
}
impl Default for Resubmit {
    fn default() -> Self {
        Self {
            script: "crab_command.sh".into(),
            args: vec!["resubmit".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Proxy {
    pub env_var: String,
}
impl Default for Proxy {
    fn default() -> Self {
        Self {
            env_var: "X509_USER_PROXY".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Report {
    pub title: String,
    pub version_prefix: String,
    pub remote_host: String,
}
impl Default for Report {
    fn default() -> Self {
        Self {
            title: "Status of ntuple production".into(),
            version_prefix: "crab_".into(),
            remote_host: "lxplus.cern.ch".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}
