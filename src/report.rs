use crate::{
    config::Config,
    record::{MonitorData, StatusKey, StatusMap},
    util::{ensure_dir, escape_html, now_display, parse_percent},
};
use anyhow::{Context, Result, anyhow};
use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stacked bar segments, in drawing order.
const BAR_SEGMENTS: [(StatusKey, &str); 4] = [
    (StatusKey::Finished, "lightgreen"),
    (StatusKey::Transferring, "turquoise"),
    (StatusKey::Running, "deepskyblue"),
    (StatusKey::Failed, "crimson"),
];

const STYLE: &str = "\
body {
margin: 0;
padding: 0;
width: 100%;
font-family: Arial, Helvetica, sans-serif;
}
h1 {
width: 100%;
text-align: center;
font-size: 20px;
margin: 0;
padding: 0;
background: red;
color: #FFF;
display: inline-block;
}
.divide { width: 100%; }
.divide tr td { width: 60%; }
.progress-container {
width: 100%;
height: 20px;
border: 1px solid black;
position: relative;
padding: 3px;
}
.progress-text {
position: absolute;
left: 5%;
}
.progress-bar {
position: absolute;
height: 20px;
}
";

/// Display names derived from a `production/sample/version` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleLabel {
    pub short_name: String,
    pub short_version: String,
}

pub fn sample_label(key: &str, version_prefix: &str) -> SampleLabel {
    let parts: Vec<&str> = key.split('/').collect();
    if parts.len() != 3 {
        return SampleLabel {
            short_name: key.to_string(),
            short_version: "-".to_string(),
        };
    }
    let short_name = parts[1].split('_').next().unwrap_or(parts[1]).to_string();
    let version = if version_prefix.is_empty() {
        parts[2].to_string()
    } else {
        parts[2].replace(version_prefix, "")
    };
    let short_version = version.split('-').next().unwrap_or("").to_string();
    SampleLabel {
        short_name,
        short_version,
    }
}

/// Refuses to publish when a sample only carries `finished: 0%`, unless
/// `force` is set. That shape means the status could not be retrieved and
/// would overwrite a previously good page.
pub fn check_retrievable(data: &MonitorData, force: bool) -> Result<()> {
    if force {
        return Ok(());
    }
    for (key, record) in &data.samples {
        if record.looks_irretrievable() {
            return Err(anyhow!(
                "the status for sample {} seems to be irretrievable, perhaps the submission \
                 is too long ago? Will not update the webpage to avoid overwriting useful \
                 information (use --force to override)",
                key
            ));
        }
    }
    Ok(())
}

pub fn progress_bar(status: &StatusMap) -> String {
    let text = status
        .iter()
        .map(|(k, v)| format!("{}: {}", k, escape_html(v)))
        .collect::<Vec<_>>()
        .join(" ");

    let mut html = String::from("<td> <div class=\"progress-container\">");
    let mut cumul = 0.0_f64;
    for (key, color) in BAR_SEGMENTS {
        let Some(raw) = status.get(&key) else {
            continue;
        };
        let Some(val) = parse_percent(raw) else {
            debug!("skipping {key} segment with unreadable fraction {raw}");
            continue;
        };
        html.push_str(&format!(
            "<div class=\"progress-bar\" style=\"left: {cumul}%; width: {val}%; background-color: {color}\"></div>"
        ));
        cumul += val;
    }
    html.push_str(&format!("<div class=\"progress-text\">{text}</div>"));
    html.push_str("</div></td>");
    html
}

/// Renders the dashboard. `generated_at` is the only time-dependent part of
/// the output.
pub fn render_html(
    cfg: &Config,
    data: &MonitorData,
    generated_at: &str,
    force: bool,
) -> Result<String> {
    check_retrievable(data, force)?;

    let mut html = String::with_capacity(16 * 1024);
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html>")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>{}</title>", escape_html(&cfg.report.title))?;
    writeln!(html, "<style>\n{STYLE}</style>")?;
    writeln!(html, "</head>")?;
    writeln!(html, "<body>")?;
    writeln!(
        html,
        "<table style=\"background-color:#2C3E50;color:#EAECEE;font-size:40px;width:100%;text-align:center;\">"
    )?;
    writeln!(html, "<tr><td>{}</td></tr>", escape_html(&cfg.report.title))?;
    writeln!(
        html,
        "<tr><td style=\"font-size:15px;\">Last update: {}</td></tr>",
        escape_html(generated_at)
    )?;
    writeln!(html, "</table>")?;

    writeln!(html, "<div id=\"meta-info\"><h1>Meta-info</h1></div>")?;
    writeln!(html, "<table class=\"divide\" cellpadding=\"5px\" cellspacing=\"0\">")?;
    if data.meta.is_empty() {
        writeln!(html, "<tr><td>(nothing to display)</td></tr>")?;
    }
    for (key, val) in &data.meta {
        writeln!(
            html,
            "<tr><td style=\"width:30%\">{}</td><td style=\"width:70%\">{}</td></tr>",
            escape_html(key),
            escape_html(val)
        )?;
    }
    writeln!(html, "</table>")?;

    let mut keys: Vec<&String> = data.samples.keys().collect();
    keys.sort_by_key(|k| k.to_lowercase());

    writeln!(html, "<div id=\"samples\"><h1>Samples</h1></div>")?;
    writeln!(html, "<table class=\"divide\" cellpadding=\"5px\" cellspacing=\"0\">")?;
    for key in keys {
        let record = &data.samples[key];
        let label = sample_label(key, &cfg.report.version_prefix);
        let link = match &record.monitoring_link {
            Some(url) if !url.is_empty() => format!(
                "<a href=\"{}\" target=\"_blank\">Monitoring</a>",
                escape_html(url)
            ),
            _ => "-".to_string(),
        };
        writeln!(html, "<tr>")?;
        writeln!(
            html,
            "<td style=\"width:20%\">{}</td><td style=\"width:20%\">{}</td>{}<td style=\"width:20%\"> {} </td>",
            escape_html(&label.short_name),
            escape_html(&label.short_version),
            progress_bar(&record.status),
            link
        )?;
        writeln!(html, "</tr>")?;
    }
    writeln!(html, "</table>")?;
    writeln!(html, "</body>")?;
    write!(html, "</html>")?;

    Ok(html)
}

/// Renders and writes the dashboard into `out_dir`, creating it if needed.
/// Nothing is written when the stale-data check fails.
pub fn write_report(cfg: &Config, data: &MonitorData, out_dir: &Path, force: bool) -> Result<PathBuf> {
    let html = render_html(cfg, data, &now_display(), force)?;
    ensure_dir(out_dir)?;
    let path = out_dir.join(&cfg.paths.report_filename);
    std::fs::write(&path, html).with_context(|| format!("writing {}", path.display()))?;
    Ok(path)
}
