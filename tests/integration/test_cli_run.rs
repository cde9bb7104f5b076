#![cfg(unix)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Upper-cases the file: S2S prints it, the editor rewrites the working copy from stdin,
/// one test stage copies it, and the overwrite happens only when the content changed.
const UPPERCASE_POLICY: &str = r#"
fn GetS2SExtension() { "stdout" }
fn GetS2SCommandLine(args, input, output, exe) { ["sh", "-c", "cat \"$0\"", input] }
fn IsS2SOk(code) { code == 0 }

fn GetEditorExtension() { "stdin" }
fn GetEditorCommandLine(args, input, output, exe) { [EDITOR_PROGRAM, "-c", "tr a-z A-Z > \"$0\"", output] }
fn IsEditorOk(code) { code == 0 }

fn GetTestConfigurations(exe, ext) { ["copy"] }
fn GetTestStages(config) { ["cp"] }
fn GetTestExtension(stage) { ".txt" }
fn GetTestCommandLine(args, config, stage, input, output) { ["cp", input, output] }
fn IsTestOk(code, stage) { code == 0 }

fn GetDiffCommandLine(a, b) { ["cmp", "-s", a, b] }
fn IsDiffOk(code) { code == 1 }
fn IsOverWriteOk() { true }
"#;

struct Project {
    root: TempDir,
    temps: PathBuf,
}

impl Project {
    fn new(editor_program: &str) -> Self {
        let root = TempDir::new().unwrap();
        let temps = root.path().join("tmp");
        fs::create_dir_all(&temps).unwrap();
        fs::create_dir_all(root.path().join("src")).unwrap();
        fs::write(
            root.path().join("policy.rhai"),
            UPPERCASE_POLICY.replace("EDITOR_PROGRAM", &format!("\"{}\"", editor_program)),
        )
        .unwrap();
        Project { root, temps }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.path().join(relative)
    }

    fn add_sources(&self, names: &[&str]) {
        let mut entries = Vec::new();
        for name in names {
            let file = self.path("src").join(name);
            fs::write(&file, "int answer = 42;\n").unwrap();
            entries.push(serde_json::json!({
                "directory": self.path("src"),
                "command": format!("cc -Iinclude -c {} -o {}.o", name, name),
                "file": file,
            }));
        }
        fs::write(
            self.path("compile_commands.json"),
            serde_json::to_string_pretty(&entries).unwrap(),
        )
        .unwrap();
    }

    fn command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::cargo_bin("s2s").unwrap();
        cmd.current_dir(self.root.path())
            .env_remove("RUST_LOG")
            .env_remove("S2S_KEEP_TEMPS")
            .env_remove("S2S_TEMP_DIR")
            .env_remove("S2S_SPAWN_FAILURE")
            .arg(subcommand)
            .arg("--script")
            .arg(self.path("policy.rhai"));
        cmd
    }

    fn run(&self) -> Command {
        let mut cmd = self.command("run");
        cmd.arg("--db")
            .arg(self.root.path())
            .arg("--temp-dir")
            .arg(&self.temps)
            .arg("--quiet-children");
        cmd
    }

    fn temps_left(&self) -> usize {
        fs::read_dir(&self.temps).unwrap().count()
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn test_run_overwrites_and_reports_success() {
    let project = Project::new("sh");
    project.add_sources(&["a.c"]);
    let source = project.path("src").join("a.c");

    project
        .run()
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "\nFailures\n\nSuccesses\n{}\nSuccess rate 100.000000\n",
            source.display()
        )));

    assert_eq!(read(&source), "INT ANSWER = 42;\n");
    assert_eq!(project.temps_left(), 0);
}

#[test]
fn test_throwing_test_command_line_blocks_overwrite() {
    let project = Project::new("sh");
    project.add_sources(&["a.c"]);
    let policy = read(&project.path("policy.rhai")).replace(
        r#"fn GetTestCommandLine(args, config, stage, input, output) { ["cp", input, output] }"#,
        r#"fn GetTestCommandLine(args, config, stage, input, output) { throw "no toolchain" }"#,
    );
    fs::write(project.path("policy.rhai"), policy).unwrap();
    let source = project.path("src").join("a.c");

    project
        .run()
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "\nFailures\n{}\n\nSuccesses\nSuccess rate 0.000000\n",
            source.display()
        )));
    assert_eq!(read(&source), "int answer = 42;\n");
    assert_eq!(project.temps_left(), 0);
}

#[test]
fn test_keep_temps_leaves_artifacts() {
    let project = Project::new("sh");
    project.add_sources(&["a.c"]);

    project.run().arg("--keep-temps").assert().success();
    assert!(project.temps_left() > 0);
}

#[test]
fn test_json_report() {
    let project = Project::new("sh");
    project.add_sources(&["a.c", "b.c"]);

    let output = project.run().arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["successes"].as_array().unwrap().len(), 2);
    assert_eq!(value["success_rate"], 100.0);
    assert_eq!(value["overwritten"], 2);
}

#[test]
fn test_empty_database_reports_no_work() {
    let project = Project::new("sh");
    project.add_sources(&[]);

    project
        .run()
        .assert()
        .success()
        .stdout(predicate::eq("No work done\n"));
}

#[test]
fn test_missing_database_exits_one() {
    let project = Project::new("sh");

    project
        .run()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("compilation database"));
}

#[test]
fn test_broken_script_exits_one() {
    let project = Project::new("sh");
    project.add_sources(&["a.c"]);
    fs::write(project.path("policy.rhai"), "fn GetS2SExtension( {").unwrap();

    project.run().assert().code(1);
    assert_eq!(read(&project.path("src").join("a.c")), "int answer = 42;\n");
}

#[test]
fn test_unstartable_editor_aborts_run() {
    let project = Project::new("s2s-editor-that-does-not-exist");
    project.add_sources(&["a.c"]);

    project.run().assert().code(1).stdout(predicate::str::contains("Success rate").not());
    assert_eq!(project.temps_left(), 0);
}

#[test]
fn test_contained_spawn_failure_records_failure() {
    let project = Project::new("s2s-editor-that-does-not-exist");
    project.add_sources(&["a.c"]);
    let source = project.path("src").join("a.c");

    project
        .run()
        .arg("--contain-spawn-failures")
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "\nFailures\n{}\n\nSuccesses\nSuccess rate 0.000000\n",
            source.display()
        )));
    assert_eq!(read(&source), "int answer = 42;\n");
}

#[test]
fn test_check_lists_defined_functions() {
    let project = Project::new("sh");
    project.add_sources(&["a.c", "b.c"]);

    project
        .command("check")
        .arg("--db")
        .arg(project.root.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("GetS2SExtension"))
        .stdout(predicate::str::contains("Environment overrides:"))
        .stdout(predicate::str::contains("S2S_SPAWN_FAILURE"))
        .stdout(predicate::str::contains("2 entries"));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("s2s").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check"));
}
