use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn guidance(root: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("guidance"));
    cmd.arg("--root").arg(root).arg("--quiet");
    cmd
}

fn write_fresh(dir: &Path, name: &str, hash: &str, comment: Option<&str>) -> std::path::PathBuf {
    let comment = comment
        .map(|c| format!(r#", "comment": "{c}""#))
        .unwrap_or_default();
    let path = dir.join(name);
    fs::write(
        &path,
        format!(
            r#"{{"meta": {{"module": "lexer", "source": "src/lexer.zig"}},
                "members": [{{"type": "fn", "name": "lex", "match_hash": "{hash}", "line": 3{comment}}}]}}"#
        ),
    )
    .unwrap();
    path
}

#[test]
fn sync_creates_guidance_and_reports_json() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let fresh = write_fresh(root, "fresh.json", "h1", Some("Lexes source."));

    let output = guidance(root).arg("sync").arg(&fresh).output().unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["summary"]["files"], 1);
    assert_eq!(body["summary"]["created"], 1);
    assert_eq!(body["reports"][0]["stats"]["added"], 1);
    assert!(root.join(".guidance/src/lexer.zig.json").is_file());

    // Implementation changed and no new inline doc: the comment goes stale.
    let changed = write_fresh(root, "changed.json", "h2", None);
    let output = guidance(root).arg("sync").arg(&changed).output().unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(body["reports"][0]["stats"]["stale"], 1);
    assert_eq!(body["reports"][0]["missing_comments"], 1);
}

#[test]
fn merge_writes_reconciled_document() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let existing = write_fresh(root, "existing.json", "h1", Some("Lexes source."));
    let fresh = write_fresh(root, "fresh.json", "h1", None);
    let out = root.join("out/merged.json");

    guidance(root)
        .args(["merge", "--fresh"])
        .arg(&fresh)
        .arg("--existing")
        .arg(&existing)
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicates::str::contains("changed=false"));

    let merged: Value = serde_json::from_slice(&fs::read(&out).unwrap()).unwrap();
    assert_eq!(merged["members"][0]["comment"], "Lexes source.");

    guidance(root)
        .args(["merge", "--no-preserve", "--fresh"])
        .arg(&fresh)
        .arg("--existing")
        .arg(&existing)
        .assert()
        .success()
        .stdout(predicates::str::contains("Lexes source.").not())
        .stderr(predicates::str::contains("changed=true"));
}

#[test]
fn merge_warns_on_leaked_existing_and_keeps_fresh_comments() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let fresh = write_fresh(
        root,
        "fresh.json",
        "h1",
        Some("We need to write the header before lexing."),
    );
    let existing = root.join("existing.json");
    fs::write(
        &existing,
        r#"{"meta": {"module": "lexer", "source": "src/lexer.zig"},
            "comment": "Let's write a summary of this file",
            "members": [{"type": "fn", "name": "lex", "match_hash": "h1"}]}"#,
    )
    .unwrap();

    guidance(root)
        .args(["merge", "--fresh"])
        .arg(&fresh)
        .arg("--existing")
        .arg(&existing)
        .assert()
        .success()
        .stdout(predicates::str::contains("We need to write the header before lexing."))
        .stdout(predicates::str::contains("Let's write a summary").not())
        .stderr(predicates::str::contains("dropped leaked prompt text"));
}

#[test]
fn sync_rejects_invalid_fresh_document() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let bad = root.join("bad.json");
    fs::write(&bad, r#"{"meta": {"module": "m"}}"#).unwrap();

    guidance(root)
        .arg("sync")
        .arg(&bad)
        .assert()
        .failure()
        .stderr(predicates::str::contains("is not a valid guidance document"));
}

#[test]
fn check_and_clean_handle_leaked_prompts() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    let dir = root.join(".guidance/src");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("lexer.zig.json"),
        r#"{"meta": {"module": "lexer", "source": "src/lexer.zig"},
            "comment": "We need to write a summary",
            "members": [{"type": "fn", "name": "lex"}]}"#,
    )
    .unwrap();

    let output = guidance(root).arg("check").output().unwrap();
    assert!(output.status.success());
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body[0]["source"], "src/lexer.zig");
    assert_eq!(body[0]["status"], "ok");
    assert_eq!(body[0]["leaked_prompt_detected"], true);
    assert_eq!(body[0]["missing_comments"], 1);

    let output = guidance(root).arg("clean").output().unwrap();
    let body: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["summary"]["written"], 1);

    let stored = fs::read_to_string(dir.join("lexer.zig.json")).unwrap();
    assert!(!stored.contains("We need to write"));
}

#[test]
fn sanitize_accepts_tagged_answer_and_rejects_junk() {
    let temp = tempdir().unwrap();
    let root = temp.path();

    guidance(root)
        .arg("sanitize")
        .write_stdin("<think>plan</think>\nLet me think.\n<comment>Lexes source.</comment>")
        .assert()
        .success()
        .stdout("Lexes source.\n");

    guidance(root)
        .args(["sanitize", "--no-tag"])
        .write_stdin("Reads the input from")
        .assert()
        .code(2)
        .stderr(predicates::str::contains("rejected"));
}
