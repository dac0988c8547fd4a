use crate::{
    aggregate::Aggregator,
    config::Config,
    discover,
    record::MonitorData,
    report,
    runner::ShellRunner,
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "crab-monitor")]
#[command(about = "Monitor CRAB job submissions and publish a status webpage")]
pub struct Args {
    /// Simpack directory; every folder inside a crab_logs folder below it is a sample.
    #[arg(short = 'i', long)]
    pub simpackdir: PathBuf,

    /// Resubmit failed jobs (default: only monitor).
    #[arg(short, long)]
    pub resubmit: bool,

    /// Path to your proxy (default: do not export a proxy explicitly).
    #[arg(short, long)]
    pub proxy: Option<PathBuf>,

    /// Test mode: process only the first few samples.
    #[arg(short, long)]
    pub test: bool,

    /// Write the webpage even if some sample status looks irretrievable.
    #[arg(short, long)]
    pub force: bool,

    /// Path to config TOML. If omitted, uses ./crab-monitor.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override the output directory of the webpage.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Still report the failure through the default subscriber.
            if init_logging(&args, &Config::default(), None).is_err() {
                eprintln!("error: {err:#}");
            }
            return Err(err);
        }
    };
    let out_dir = args
        .out_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&cfg.paths.out_dir));
    let log_path = resolve_log_path(&cfg, &out_dir);
    let _guard = match init_logging(&args, &cfg, log_path.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            // No subscriber is installed, so `error!` in main would be dropped.
            eprintln!("error: {err:#}");
            return Err(err);
        }
    };
    run(&args, &cfg, &out_dir)
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    match resolve_config_path(user) {
        Some(path) => Config::load(&path),
        None => Ok(Config::default()),
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("crab-monitor.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let stdout_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config, out_dir: &Path) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(out_dir.join("crab-monitor.log"))
}

fn run(args: &Args, cfg: &Config, out_dir: &Path) -> Result<()> {
    info!(
        "running with simpackdir={} resubmit={} proxy={:?} test={} force={} out_dir={}",
        args.simpackdir.display(),
        args.resubmit,
        args.proxy,
        args.test,
        args.force,
        out_dir.display()
    );
    info!(
        "effective config:\n{}",
        toml::to_string(cfg).unwrap_or_default()
    );

    let simpack = std::path::absolute(&args.simpackdir)
        .with_context(|| format!("resolving {}", args.simpackdir.display()))?;
    if !simpack.is_dir() {
        return Err(anyhow!("simpack directory {} does not exist", simpack.display()));
    }

    let proxy = match &args.proxy {
        Some(p) => {
            let p = std::path::absolute(p).with_context(|| format!("resolving {}", p.display()))?;
            if !p.exists() {
                return Err(anyhow!("provided proxy {} does not exist", p.display()));
            }
            Some(p)
        }
        None => None,
    };

    let mut submissions = discover::find_submissions(cfg, &simpack)?;
    if submissions.is_empty() {
        return Err(anyhow!(
            "no samples found in simpack directory {}",
            simpack.display()
        ));
    }

    if args.test {
        let n = cfg.global.test_sample_limit.min(submissions.len());
        warn!(
            "running in test mode, will only process {} out of {} samples",
            n,
            submissions.len()
        );
        submissions.truncate(n);
    }

    discover::check_status_scripts(cfg, &submissions)?;

    let runner = ShellRunner::new(cfg, proxy.as_deref());
    let aggregator = Aggregator::new(cfg, runner, args.resubmit);

    let mut data = MonitorData::new(meta_info(args, &simpack));
    aggregator.poll_all(&submissions, &mut data);
    info!("loop over all samples completed");

    if cfg.global.dump_data {
        info!("retrieved data:\n{}", serde_json::to_string_pretty(&data)?);
    }

    let path = report::write_report(cfg, &data, out_dir, args.force)?;
    info!("sample status written to {}", path.display());

    if cfg.global.print_summary {
        let abs = std::path::absolute(&path).unwrap_or(path);
        let user = std::env::var("USER").unwrap_or_default();
        println!(
            "Use scp -r {}@{}:{} to download the results",
            user,
            cfg.report.remote_host,
            abs.display()
        );
    }

    Ok(())
}

fn meta_info(args: &Args, simpack: &Path) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "generating program".to_string(),
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        ),
        ("command-line arguments".to_string(), format!("{args:?}")),
        ("simpack directory".to_string(), simpack.display().to_string()),
        ("started".to_string(), now_rfc3339()),
    ])
}
