use s2s::core::report::{OutputFormat, PipelineReport};
use std::path::Path;

#[test]
fn test_text_report_layout() {
    let mut report = PipelineReport::new();
    report.record(Path::new("/repo/a.c"), true);
    report.record(Path::new("/repo/b.c"), false);
    report.record(Path::new("/repo/c.c"), true);
    report.record_skip();

    assert_eq!(
        report.render_text(),
        "\nFailures\n/repo/b.c\n\nSuccesses\n/repo/a.c\n/repo/c.c\nSuccess rate 66.666667\n"
    );
}

#[test]
fn test_only_failures() {
    let mut report = PipelineReport::new();
    report.record(Path::new("/repo/a.c"), false);
    assert_eq!(report.success_rate(), Some(0.0));
    assert_eq!(
        report.render(OutputFormat::Text).unwrap(),
        "\nFailures\n/repo/a.c\n\nSuccesses\nSuccess rate 0.000000\n"
    );
}

#[test]
fn test_skips_do_not_count_as_work() {
    let mut report = PipelineReport::new();
    report.record_skip();
    report.record_skip();
    assert_eq!(report.processed(), 0);
    assert_eq!(report.render_text(), "No work done\n");
}

#[test]
fn test_overwrite_does_not_change_classification() {
    let mut report = PipelineReport::new();
    report.record(Path::new("/repo/a.c"), true);
    report.record_overwrite();
    report.record(Path::new("/repo/b.c"), true);
    assert_eq!(report.successes.len(), 2);
    assert_eq!(report.overwritten, 1);
    assert_eq!(report.success_rate(), Some(100.0));
}

#[test]
fn test_json_report_fields() {
    let mut report = PipelineReport::new();
    report.record(Path::new("/repo/a.c"), true);
    report.record_skip();
    report.finish();

    let value: serde_json::Value =
        serde_json::from_str(&report.render(OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(value["successes"][0], "/repo/a.c");
    assert_eq!(value["failures"].as_array().unwrap().len(), 0);
    assert_eq!(value["skipped"], 1);
    assert_eq!(value["success_rate"], 100.0);
    assert!(value["finished_at"].is_string());
}

#[test]
fn test_json_rate_is_null_without_work() {
    let report = PipelineReport::new();
    let value: serde_json::Value = serde_json::from_str(&report.render_json().unwrap()).unwrap();
    assert!(value["success_rate"].is_null());
}
