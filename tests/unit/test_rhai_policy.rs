use s2s::core::policy::{PolicyProvider, RhaiPolicy};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const POLICY: &str = r#"
fn GetS2SExtension() { "stdout" }

fn GetS2SCommandLine(args, input, output, exe) {
    let cl = ["clang-query", input, "--"];
    cl += args;
    cl
}

fn IsS2SOk(code) { code == 0 }

fn GetEditorExtension() { "stdin" }

fn GetEditorCommandLine(args, input, output, exe) {
    ["apply-edits", "--in-place", output]
}

fn IsEditorOk(code) { if code == 0 { 1 } else { 0 } }

fn GetTestConfigurations(exe, ext) {
    if ext == ".c" { ["debug", "release"] } else { [] }
}

fn GetTestStages(config) { ["compile", "link"] }

fn GetTestExtension(stage) {
    switch stage { "compile" => ".o", _ => ".out" }
}

fn GetTestCommandLine(args, config, stage, input, output) {
    [exe_for(stage), input, "-o", output]
}

fn exe_for(stage) { if stage == "compile" { "cc" } else { "ld" } }

fn IsTestOk(code, stage) { code == 0 || stage == "link" }

fn GetDiffCommandLine(a, b) { ["diff", "-q", a, b] }

fn IsDiffOk(code) { code == 1 }

fn IsOverWriteOk() { true }
"#;

fn write(dir: &TempDir, name: &str, code: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, code).unwrap();
    path
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_full_policy_answers() {
    let dir = TempDir::new().unwrap();
    let policy = RhaiPolicy::load(&write(&dir, "policy.rhai", POLICY), None).unwrap();

    assert_eq!(policy.s2s_extension().as_deref(), Some("stdout"));
    assert_eq!(
        policy.s2s_command_line(&strings(&["-I/src"]), Path::new("/tmp/w.c"), None, "cc"),
        Some(strings(&["clang-query", "/tmp/w.c", "--", "-I/src"]))
    );
    assert!(policy.is_s2s_ok(0));
    assert!(!policy.is_s2s_ok(1));

    assert_eq!(policy.editor_extension().as_deref(), Some("stdin"));
    assert_eq!(
        policy.editor_command_line(&[], None, Path::new("/tmp/w.c"), "cc"),
        Some(strings(&["apply-edits", "--in-place", "/tmp/w.c"]))
    );
    assert!(policy.is_editor_ok(0));

    assert_eq!(policy.test_configurations("cc", ".c"), strings(&["debug", "release"]));
    assert!(policy.test_configurations("cc", ".cpp").is_empty());
    assert_eq!(policy.test_stages("debug"), strings(&["compile", "link"]));
    assert_eq!(policy.test_extension("compile").as_deref(), Some(".o"));
    assert_eq!(
        policy.test_command_line(
            &[],
            "debug",
            "link",
            Path::new("/tmp/a.o"),
            Path::new("/tmp/a.out")
        ),
        Some(strings(&["ld", "/tmp/a.o", "-o", "/tmp/a.out"]))
    );
    assert!(policy.is_test_ok(2, "link"));
    assert!(!policy.is_test_ok(2, "compile"));

    assert_eq!(
        policy.diff_command_line(Path::new("/src/a.c"), Path::new("/tmp/w.c")),
        Some(strings(&["diff", "-q", "/src/a.c", "/tmp/w.c"]))
    );
    assert!(policy.is_diff_ok(1));
    assert!(policy.is_overwrite_ok());
    assert_eq!(policy.defined_functions().len(), 14);
}

#[test]
fn test_filter_script_decides_entries() {
    let dir = TempDir::new().unwrap();
    let filter = write(
        &dir,
        "filter.rhai",
        r#"fn FilterDBEntry(argv, file, dir, exe) { !file.ends_with("_test.c") && argv.len() > 1 }"#,
    );
    let policy =
        RhaiPolicy::load(&write(&dir, "policy.rhai", POLICY), Some(filter.as_path())).unwrap();

    let argv = strings(&["cc", "-c", "a.c"]);
    assert!(policy.filter_db_entry(&argv, "a.c", "/src", "cc"));
    assert!(!policy.filter_db_entry(&argv, "a_test.c", "/src", "cc"));
    assert!(!policy.filter_db_entry(&strings(&["cc"]), "a.c", "/src", "cc"));
}

#[test]
fn test_missing_script_is_fatal() {
    let dir = TempDir::new().unwrap();
    let err = RhaiPolicy::load(&dir.path().join("nope.rhai"), None)
        .err()
        .unwrap();
    assert_eq!(err.code, "POL-001");
    assert!(err.is_fatal());
}

#[test]
fn test_top_level_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "policy.rhai", "let x = 1 / 0;");
    let err = RhaiPolicy::load(&path, None).err().unwrap();
    assert_eq!(err.code, "POL-003");
}

#[test]
fn test_absent_paths_are_empty_strings() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "policy.rhai",
        r#"fn GetEditorCommandLine(args, input, output, exe) { ["ed", "[" + input + "]", output] }"#,
    );
    let policy = RhaiPolicy::load(&path, None).unwrap();
    assert_eq!(
        policy.editor_command_line(&[], None, Path::new("/w.c"), "cc"),
        Some(strings(&["ed", "[]", "/w.c"]))
    );
}
