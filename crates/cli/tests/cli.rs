// End-to-end tests for the `locasync` binary against a CSV remote.
// Run with: cargo test -p locasync-cli --test cli

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG: &str = r#"
[remote]
spreadsheet = "loca"
sheets = ["Main"]

[export]
destination = "out/runtime"
editor_destination = "out/editor"
"#;

struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("locasync.toml"), CONFIG).unwrap();
        fs::create_dir_all(dir.path().join("remote/loca")).unwrap();
        fs::write(
            dir.path().join("remote/loca/Main.csv"),
            "key,*timestamp,en,de,comment\ngreet,100,Hello,,lobby\nbye,100,Bye,Tschüss,\n",
        )
        .unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_locasync"))
            .arg("--project")
            .arg(self.path())
            .arg("--store")
            .arg(self.path().join("state/db.loca"))
            .args(args)
            .env_remove("LOCASYNC_REMOTE")
            .env_remove("LOCASYNC_STORE")
            .env("RUST_LOG", "warn")
            .output()
            .expect("failed to run locasync")
    }

    fn remote_csv(&self) -> String {
        fs::read_to_string(self.path().join("remote/loca/Main.csv")).unwrap()
    }
}

fn assert_code(output: &Output, code: i32) {
    assert_eq!(
        output.status.code(),
        Some(code),
        "expected exit {code}, got {:?}\nstderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr),
    );
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn pull_edit_push_round_trip() {
    let project = Project::new();
    assert_code(&project.run(&["pull"]), 0);
    assert!(project.path().join("state/db.loca").exists());

    assert_code(&project.run(&["set", "greet", "de", "Hallo"]), 0);
    assert_code(&project.run(&["add", "menu.start"]), 0);
    assert_code(&project.run(&["push"]), 0);

    let csv = project.remote_csv();
    assert!(csv.starts_with("key,*timestamp,en,de,comment\n"), "{csv}");
    assert!(csv.contains("Hallo"), "{csv}");
    assert!(csv.contains("menu.start"), "{csv}");
    assert!(csv.contains("lobby"), "{csv}");
}

#[test]
fn find_lists_sheet_and_key() {
    let project = Project::new();
    assert_code(&project.run(&["pull"]), 0);

    let output = project.run(&["find", "tschüss"]);
    assert_code(&output, 0);
    assert_eq!(stdout(&output).trim(), "Main\tbye");

    let output = project.run(&["find", "hello", "--json"]);
    assert_code(&output, 0);
    let hits: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(hits[0]["key"], "greet");
}

#[test]
fn export_writes_runtime_files() {
    let project = Project::new();
    assert_code(&project.run(&["pull"]), 0);
    assert_code(&project.run(&["export"]), 0);

    assert!(project.path().join("out/editor/Main_Editor.json").exists());
    let de = fs::read_to_string(project.path().join("out/runtime/Main_de.json")).unwrap();
    assert!(de.contains("Tschüss"), "{de}");
}

#[test]
fn editing_unknown_key_exits_20() {
    let project = Project::new();
    assert_code(&project.run(&["pull"]), 0);
    assert_code(&project.run(&["set", "nope", "en", "x"]), 20);
    assert_code(&project.run(&["set", "greet", "fr", "x"]), 20);
}

#[test]
fn push_without_pull_exits_5() {
    let project = Project::new();
    let output = project.run(&["push"]);
    assert_code(&output, 5);
    assert!(String::from_utf8_lossy(&output.stderr).contains("locasync pull"));
}

#[test]
fn broken_config_exits_4() {
    let project = Project::new();
    fs::write(project.path().join("locasync.toml"), "[header]\nkey_column = \"\"\n").unwrap();
    assert_code(&project.run(&["status"]), 4);
}

#[test]
fn missing_remote_exits_11() {
    let project = Project::new();
    fs::remove_dir_all(project.path().join("remote")).unwrap();
    assert_code(&project.run(&["pull"]), 11);
}

#[test]
fn bad_args_exit_2() {
    let project = Project::new();
    assert_code(&project.run(&["rename", "only-one"]), 2);
}

#[test]
fn watch_stops_after_ticks() {
    let project = Project::new();
    assert_code(&project.run(&["pull"]), 0);
    let output = project.run(&["watch", "--ticks", "1"]);
    assert_code(&output, 0);
    assert!(stdout(&output).contains("up to date"), "{}", stdout(&output));
}

#[test]
fn watch_records_remote_changes_in_store() {
    let project = Project::new();
    let output = project.run(&["watch", "--ticks", "1"]);
    assert_code(&output, 0);
    assert!(stdout(&output).contains("remote has changes"), "{}", stdout(&output));

    let output = project.run(&["status", "--json"]);
    assert_code(&output, 0);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["has_online_changes"], true);

    assert_code(&project.run(&["pull"]), 0);
    let output = project.run(&["status", "--json"]);
    let status: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(status["has_online_changes"], false);
}
