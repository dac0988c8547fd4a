use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9]+(?:\.[0-9]+)?)\s*%?\s*$").expect("static percent regex")
});

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Local wall-clock time as `dd/mm/YYYY HH:MM:SS`, falling back to UTC when
/// the local offset cannot be determined.
pub fn now_display() -> String {
    let now = time::OffsetDateTime::now_local()
        .unwrap_or_else(|_| time::OffsetDateTime::now_utc());
    now.format(format_description!(
        "[day]/[month]/[year] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "01/01/1970 00:00:00".to_string())
}

/// Parses fractions such as `73.3%`, `100%` or `50`.
pub fn parse_percent(raw: &str) -> Option<f64> {
    let caps = PERCENT_RE.captures(raw)?;
    caps.get(1)?.as_str().parse().ok()
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
