use super::StatusRunner;
use crate::{config::Config, discover::Submission};
use anyhow::{Context, Result, anyhow};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Runs the per-submission shell scripts from the submission's working
/// directory. The proxy, if any, is only exported into the child's
/// environment.
pub struct ShellRunner {
    shell: String,
    status_script: String,
    resubmit_script: String,
    resubmit_args: Vec<String>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
}

impl ShellRunner {
    pub fn new(cfg: &Config, proxy: Option<&Path>) -> Self {
        let env = proxy
            .map(|p| vec![(cfg.proxy.env_var.clone(), p.display().to_string())])
            .unwrap_or_default();
        let timeout = if cfg.status.timeout_seconds > 0 {
            Some(Duration::from_secs(cfg.status.timeout_seconds))
        } else {
            None
        };
        Self {
            shell: cfg.status.shell.clone(),
            status_script: cfg.status.script.clone(),
            resubmit_script: cfg.resubmit.script.clone(),
            resubmit_args: cfg.resubmit.args.clone(),
            env,
            timeout,
        }
    }

    fn run_script(&self, submission: &Submission, script: &str, args: &[String]) -> Result<String> {
        debug!(
            "{} {} {:?} {} (cwd={}) timeout={:?}",
            self.shell,
            script,
            args,
            submission.path.display(),
            submission.workdir.display(),
            self.timeout
        );
        let mut cmd = Command::new(&self.shell);
        cmd.arg(script);
        cmd.args(args);
        cmd.arg(&submission.path);
        cmd.current_dir(&submission.workdir);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        for (k, v) in &self.env {
            cmd.env(k, v);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {} {}", self.shell, script))?;

        let output = match self.timeout {
            Some(timeout) => wait_with_timeout(&mut child, timeout)?,
            None => child
                .wait_with_output()
                .with_context(|| format!("waiting for {}", script))?,
        };

        if !output.status.success() {
            debug!("{} exited with {}", script, output.status);
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if !output.stderr.is_empty() {
            if !text.is_empty() && !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&String::from_utf8_lossy(&output.stderr));
        }
        Ok(text)
    }
}

impl StatusRunner for ShellRunner {
    fn status(&self, submission: &Submission) -> Result<String> {
        self.run_script(submission, &self.status_script, &[])
    }

    fn resubmit(&self, submission: &Submission) -> Result<String> {
        self.run_script(submission, &self.resubmit_script, &self.resubmit_args)
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> Result<Output> {
    // Drain pipes while waiting so chatty scripts can't block on a full buffer.
    let stdout_reader = child.stdout.take();
    let stderr_reader = child.stderr.take();

    let stdout_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout_reader {
            out.read_to_end(&mut buf).with_context(|| "read stdout")?;
        }
        Ok(buf)
    });

    let stderr_thread = std::thread::spawn(move || -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr_reader {
            err.read_to_end(&mut buf).with_context(|| "read stderr")?;
        }
        Ok(buf)
    });

    let start = Instant::now();
    loop {
        if let Some(status) = child.try_wait().with_context(|| "try_wait")? {
            let stdout = stdout_thread
                .join()
                .map_err(|_| anyhow!("stdout reader thread panicked"))??;
            let stderr = stderr_thread
                .join()
                .map_err(|_| anyhow!("stderr reader thread panicked"))??;
            return Ok(Output {
                status,
                stdout,
                stderr,
            });
        }

        if start.elapsed() > timeout {
            warn!("status command timed out after {:?}", timeout);
            let _ = child.kill();
            child.wait().with_context(|| "wait after kill")?;
            // Grandchildren may still hold the pipes open; the readers are left detached.
            return Err(anyhow!("status command exceeded timeout ({:?})", timeout));
        }

        std::thread::sleep(Duration::from_millis(50));
    }
}
