use crab_monitor::{
    config::Config,
    record::{MonitorData, SampleRecord, StatusKey},
    report::{progress_bar, render_html, write_report},
};
use std::collections::BTreeMap;
use std::fs;
use tempfile::TempDir;

fn record(entries: &[(StatusKey, &str)]) -> SampleRecord {
    SampleRecord::from_status(entries.iter().map(|(k, v)| (*k, v.to_string())))
}

fn data_with(samples: Vec<(&str, SampleRecord)>) -> MonitorData {
    let mut data = MonitorData::new(BTreeMap::from([(
        "generating program".to_string(),
        "crab-monitor test".to_string(),
    )]));
    for (k, r) in samples {
        data.samples.insert(k.to_string(), r);
    }
    data
}

#[test]
fn bar_segments_are_stacked() {
    let status = record(&[(StatusKey::Finished, "50%"), (StatusKey::Running, "50%")]).status;
    let html = progress_bar(&status);
    assert!(html.contains("left: 0%; width: 50%; background-color: lightgreen"));
    assert!(html.contains("left: 50%; width: 50%; background-color: deepskyblue"));
    assert!(html.contains("<div class=\"progress-text\">finished: 50% running: 50%</div>"));
}

#[test]
fn bar_uses_fixed_priority_order() {
    let status = record(&[
        (StatusKey::Failed, "10%"),
        (StatusKey::Running, "20%"),
        (StatusKey::Transferring, "30%"),
        (StatusKey::Finished, "40%"),
        (StatusKey::Idle, "5%"),
    ])
    .status;
    let html = progress_bar(&status);
    let finished = html.find("lightgreen").unwrap();
    let transferring = html.find("turquoise").unwrap();
    let running = html.find("deepskyblue").unwrap();
    let failed = html.find("crimson").unwrap();
    assert!(finished < transferring && transferring < running && running < failed);
    assert!(html.contains("left: 70%; width: 20%; background-color: deepskyblue"));
    assert!(html.contains("left: 90%; width: 10%; background-color: crimson"));
    assert!(html.contains("idle: 5%"));
}

#[test]
fn rendering_is_deterministic() {
    let cfg = Config::default();
    let data = data_with(vec![
        ("sampleB", record(&[(StatusKey::Finished, "20%")])),
        ("sampleA", record(&[(StatusKey::Finished, "100%")])),
    ]);
    let a = render_html(&cfg, &data, "01/01/2026 10:00:00", false).unwrap();
    let b = render_html(&cfg, &data, "01/01/2026 10:00:00", false).unwrap();
    assert_eq!(a, b);

    let c = render_html(&cfg, &data, "02/01/2026 11:00:00", false).unwrap();
    assert_eq!(
        a.replace("01/01/2026 10:00:00", ""),
        c.replace("02/01/2026 11:00:00", "")
    );
}

#[test]
fn samples_sorted_case_insensitively() {
    let cfg = Config::default();
    let data = data_with(vec![
        ("beta", record(&[(StatusKey::Finished, "1%")])),
        ("Gamma", record(&[(StatusKey::Finished, "1%")])),
        ("alpha", record(&[(StatusKey::Finished, "1%")])),
    ]);
    let html = render_html(&cfg, &data, "now", false).unwrap();
    let a = html.find(">alpha<").unwrap();
    let b = html.find(">beta<").unwrap();
    let g = html.find(">Gamma<").unwrap();
    assert!(a < b && b < g);
}

#[test]
fn full_keys_render_short_labels() {
    let cfg = Config::default();
    let data = data_with(vec![(
        "prod_v5/WWG_TuneCP5_13TeV/crab_RunIISummer20UL17-106X",
        record(&[(StatusKey::Finished, "10%")]),
    )]);
    let html = render_html(&cfg, &data, "now", false).unwrap();
    assert!(html.contains("<td style=\"width:20%\">WWG</td>"));
    assert!(html.contains("<td style=\"width:20%\">RunIISummer20UL17</td>"));
}

#[test]
fn meta_info_is_listed() {
    let cfg = Config::default();
    let html = render_html(&cfg, &data_with(vec![]), "now", false).unwrap();
    assert!(html.contains("generating program"));
    assert!(html.contains("crab-monitor test"));

    let html = render_html(&cfg, &MonitorData::default(), "now", false).unwrap();
    assert!(html.contains("(nothing to display)"));
}

#[test]
fn irretrievable_status_keeps_previous_page() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("monitor_crab_jobs");
    let cfg = Config::default();

    let good = data_with(vec![("sampleA", record(&[(StatusKey::Finished, "73%")]))]);
    let path = write_report(&cfg, &good, &out, false).unwrap();
    let before = fs::read_to_string(&path).unwrap();
    assert!(before.contains("finished: 73%"));

    let stale = data_with(vec![("sampleA", SampleRecord::pending())]);
    let err = write_report(&cfg, &stale, &out, false).unwrap_err();
    assert!(err.to_string().contains("irretrievable"));
    assert_eq!(fs::read_to_string(&path).unwrap(), before);

    write_report(&cfg, &stale, &out, true).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("finished: 0%"));
}

#[test]
fn guard_failure_creates_nothing() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("fresh");
    let stale = data_with(vec![("s", SampleRecord::pending())]);
    assert!(write_report(&Config::default(), &stale, &out, false).is_err());
    assert!(!out.exists());
}

#[test]
fn unreachable_sample_still_renders() {
    let mut rec = SampleRecord::pending();
    rec.mark_unreachable();
    let data = data_with(vec![("s", rec)]);
    let html = render_html(&Config::default(), &data, "now", false).unwrap();
    assert!(html.contains("crab status: failed"));
    assert!(!html.contains("progress-bar\""));
}
