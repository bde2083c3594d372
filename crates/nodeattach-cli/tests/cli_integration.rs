#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const OUTLINE: &str = r#"{
  "properties": {},
  "entries": [
    { "start": 1, "level": 1, "title": "Parent" },
    { "start": 50, "level": 2, "title": "Child" }
  ]
}"#;

/// A document with two entries and an empty configuration directory.
struct Fixture {
    temp: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp.path().join("notes.json"), OUTLINE).unwrap();
        std::fs::create_dir(temp.path().join("config")).unwrap();
        Self { temp }
    }

    fn path(&self) -> &Path {
        self.temp.path()
    }

    fn doc(&self) -> PathBuf {
        self.path().join("notes.json")
    }

    fn write_config(&self, content: &str) {
        std::fs::write(self.path().join("config/config.toml"), content).unwrap();
    }

    /// A source file outside the attachment area.
    fn source(&self, name: &str, content: &str) -> PathBuf {
        let dir = self.path().join("inbox");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("nodeattach").unwrap();
        cmd.env("NODEATTACH_CONFIG_DIR", self.path().join("config"))
            .env_remove("NODEATTACH_DOC")
            .env_remove("RUST_LOG")
            .arg("--doc")
            .arg(self.doc());
        cmd
    }

    /// Command on the entry starting at `at`.
    fn at(&self, at: usize) -> Command {
        let mut cmd = self.cmd();
        cmd.arg("--at").arg(at.to_string());
        cmd
    }

    fn dir_of(&self, at: usize) -> PathBuf {
        let output = self.at(at).arg("dir").output().unwrap();
        assert!(output.status.success(), "dir failed: {output:?}");
        PathBuf::from(String::from_utf8(output.stdout).unwrap().trim())
    }

    fn outline(&self) -> Value {
        serde_json::from_str(&std::fs::read_to_string(self.doc()).unwrap()).unwrap()
    }

    fn entry(&self, index: usize) -> Value {
        self.outline()["entries"][index].clone()
    }
}

fn tags(entry: &Value) -> Vec<String> {
    entry["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_help() {
    Command::cargo_bin("nodeattach")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Attachment directories for outline documents"))
        .stdout(predicate::str::contains("attach"))
        .stdout(predicate::str::contains("set-dir"))
        .stdout(predicate::str::contains("sync"));
}

#[test]
fn test_version() {
    Command::cargo_bin("nodeattach")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nodeattach"));
}

#[test]
fn test_missing_doc() {
    let fixture = Fixture::new();
    Command::cargo_bin("nodeattach")
        .unwrap()
        .env("NODEATTACH_CONFIG_DIR", fixture.path().join("config"))
        .env_remove("NODEATTACH_DOC")
        .arg("ls")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No outline document"));
}

#[test]
fn test_nonexistent_doc() {
    let fixture = Fixture::new();
    std::fs::remove_file(fixture.doc()).unwrap();
    fixture.cmd().arg("ls").assert().code(7);
}

#[test]
fn test_invalid_config_value() {
    let fixture = Fixture::new();
    fixture.write_config("[attach]\nmax-concurrency = 0\n");
    fixture
        .cmd()
        .arg("ls")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("max-concurrency"));
}

// ============================================================================
// Directory commands
// ============================================================================

#[test]
fn test_dir_without_attachments() {
    let fixture = Fixture::new();
    fixture
        .at(1)
        .arg("dir")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("No attachment directory"));
}

#[test]
fn test_dir_create_assigns_id() {
    let fixture = Fixture::new();
    fixture.at(1).args(["dir", "--create"]).assert().success();

    let entry = fixture.entry(0);
    let id = entry["properties"]["ID"].as_str().unwrap();
    let dir = fixture.dir_of(1);
    assert!(dir.is_dir());
    assert!(dir.starts_with(fixture.path().join("data")));
    // The first two characters of the ID name an intermediate directory
    assert!(dir.ends_with(&id[2..]));
}

#[test]
fn test_id_is_stable() {
    let fixture = Fixture::new();
    let first = fixture.at(50).arg("id").output().unwrap();
    let second = fixture.at(50).arg("id").output().unwrap();
    assert!(first.status.success());
    assert!(!first.stdout.is_empty());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn test_set_dir_moves_attachments() {
    let fixture = Fixture::new();
    let source = fixture.source("report.txt", "quarterly");
    fixture.at(1).arg("attach").arg(&source).assert().success();
    let old_dir = fixture.dir_of(1);

    let new_dir = fixture.path().join("papers/parent");
    fixture
        .at(1)
        .arg("set-dir")
        .arg(&new_dir)
        .args(["--copy", "always", "--delete", "always"])
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(new_dir.join("report.txt")).unwrap(),
        "quarterly"
    );
    assert!(!old_dir.exists());
    assert_eq!(
        fixture.entry(0)["properties"]["DIR"].as_str().unwrap(),
        new_dir.to_str().unwrap()
    );
}

#[test]
fn test_set_dir_prompt_cancelled_by_eof() {
    let fixture = Fixture::new();
    let source = fixture.source("report.txt", "quarterly");
    fixture.at(1).arg("attach").arg(&source).assert().success();
    let old_dir = fixture.dir_of(1);

    fixture
        .at(1)
        .arg("set-dir")
        .arg(fixture.path().join("elsewhere"))
        .write_stdin("")
        .assert()
        .code(8)
        .stderr(predicate::str::contains("Error").not());

    assert!(old_dir.join("report.txt").exists());
    assert!(fixture.entry(0)["properties"].get("DIR").is_none());
}

#[test]
fn test_set_dir_with_yes_flag() {
    let fixture = Fixture::new();
    let source = fixture.source("a.txt", "a");
    fixture.at(1).arg("attach").arg(&source).assert().success();

    let new_dir = fixture.path().join("moved");
    fixture
        .at(1)
        .arg("--yes")
        .arg("set-dir")
        .arg(&new_dir)
        .assert()
        .success();
    assert!(new_dir.join("a.txt").exists());
}

// ============================================================================
// Attachments
// ============================================================================

#[test]
fn test_attach_copies_and_tags() {
    let fixture = Fixture::new();
    let source = fixture.source("report.txt", "quarterly");

    fixture
        .at(1)
        .arg("attach")
        .arg(&source)
        .assert()
        .success()
        .stderr(predicate::str::contains("Attached report.txt"));

    assert!(source.exists());
    let dir = fixture.dir_of(1);
    assert_eq!(
        std::fs::read_to_string(dir.join("report.txt")).unwrap(),
        "quarterly"
    );
    assert_eq!(tags(&fixture.entry(0)), vec!["ATTACH".to_string()]);
    assert!(tags(&fixture.entry(1)).is_empty());
}

#[test]
fn test_attach_move_method() {
    let fixture = Fixture::new();
    let source = fixture.source("moved.txt", "m");

    fixture
        .at(50)
        .args(["attach", "--method", "mv"])
        .arg(&source)
        .assert()
        .success();

    assert!(!source.exists());
    assert!(fixture.dir_of(50).join("moved.txt").exists());
}

#[test]
fn test_attach_many_reports_failures() {
    let fixture = Fixture::new();
    let good = fixture.source("good.txt", "g");
    let missing = fixture.path().join("inbox/missing.txt");

    fixture
        .at(1)
        .arg("attach")
        .arg(&good)
        .arg(&missing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 attachments failed"));

    assert!(fixture.dir_of(1).join("good.txt").exists());
}

#[test]
fn test_attach_missing_source() {
    let fixture = Fixture::new();
    fixture
        .at(1)
        .arg("attach")
        .arg(fixture.path().join("nope.txt"))
        .assert()
        .code(7);
}

#[test]
fn test_attach_buffer_from_stdin() {
    let fixture = Fixture::new();
    fixture
        .at(1)
        .args(["attach-buffer", "snippet.txt"])
        .write_stdin("pasted text")
        .assert()
        .success();

    assert_eq!(
        std::fs::read_to_string(fixture.dir_of(1).join("snippet.txt")).unwrap(),
        "pasted text"
    );

    // Taken names are refused
    fixture
        .at(1)
        .args(["attach-buffer", "snippet.txt"])
        .write_stdin("other")
        .assert()
        .code(6);
}

#[test]
fn test_attach_url_file_scheme() {
    let fixture = Fixture::new();
    let source = fixture.source("remote.txt", "fetched");
    let url = format!("file://{}", source.display());

    fixture
        .at(1)
        .arg("attach-url")
        .arg(&url)
        .assert()
        .success();
    assert_eq!(
        std::fs::read_to_string(fixture.dir_of(1).join("remote.txt")).unwrap(),
        "fetched"
    );
}

#[test]
fn test_new_and_open() {
    let fixture = Fixture::new();
    let output = fixture.at(1).args(["new", "todo.md"]).output().unwrap();
    assert!(output.status.success());
    let path = PathBuf::from(String::from_utf8(output.stdout).unwrap().trim());
    assert!(path.is_file());

    fixture
        .at(1)
        .args(["open", "todo.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("todo.md"));
    fixture.at(1).args(["open", "absent.md"]).assert().code(7);
}

#[test]
fn test_ls_plain_and_json() {
    let fixture = Fixture::new();
    for name in ["b.txt", "a.txt"] {
        let source = fixture.source(name, name);
        fixture.at(1).arg("attach").arg(&source).assert().success();
    }
    std::fs::write(fixture.dir_of(1).join("a.txt~"), "backup").unwrap();

    fixture
        .at(1)
        .arg("ls")
        .assert()
        .success()
        .stdout("a.txt\nb.txt\n");

    let output = fixture.at(1).args(["ls", "--json"]).output().unwrap();
    assert!(output.status.success());
    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    let entries = listing["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["name"], "a.txt");
    assert_eq!(entries[0]["type"], "-");
    assert_eq!(entries[0]["size"], 5);
}

// ============================================================================
// Deletion and sync
// ============================================================================

#[test]
fn test_rm_single_attachment() {
    let fixture = Fixture::new();
    let source = fixture.source("gone.txt", "x");
    fixture.at(1).arg("attach").arg(&source).assert().success();

    fixture.at(1).args(["rm", "gone.txt"]).assert().success();
    assert!(!fixture.dir_of(1).join("gone.txt").exists());
}

#[test]
fn test_rm_all_recursive() {
    let fixture = Fixture::new();
    let source = fixture.source("doomed.txt", "x");
    fixture.at(1).arg("attach").arg(&source).assert().success();
    let dir = fixture.dir_of(1);

    // Declining leaves everything in place
    fixture
        .at(1)
        .args(["rm", "--all", "--recursive", "never"])
        .assert()
        .failure();
    assert!(dir.join("doomed.txt").exists());

    fixture
        .at(1)
        .args(["rm", "--all", "--recursive", "always"])
        .assert()
        .success();
    assert!(!dir.exists());
    assert!(tags(&fixture.entry(0)).is_empty());
}

#[test]
fn test_sync_all_clears_stale_tags() {
    let fixture = Fixture::new();
    let source = fixture.source("x.txt", "x");
    fixture.at(1).arg("attach").arg(&source).assert().success();
    let dir = fixture.dir_of(1);
    std::fs::remove_file(dir.join("x.txt")).unwrap();

    fixture
        .cmd()
        .args(["sync", "--all", "--delete-empty", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Synced 3 nodes"));

    assert!(tags(&fixture.entry(0)).is_empty());
    assert!(dir.is_dir());
}

#[test]
fn test_archive_policy_never_keeps_files() {
    let fixture = Fixture::new();
    let source = fixture.source("keep.txt", "x");
    fixture.at(1).arg("attach").arg(&source).assert().success();
    let dir = fixture.dir_of(1);

    fixture.at(1).arg("archive").assert().success();
    assert!(dir.join("keep.txt").exists());

    fixture.write_config("[attach]\narchive-delete = \"always\"\n");
    fixture.at(1).arg("archive").assert().success();
    assert!(!dir.exists());
}
