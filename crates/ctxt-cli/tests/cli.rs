//! Drives the `ctxt` binary end to end against temporary key directories.

use std::path::Path;
use std::process::Command;

fn ctxt(dir: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_ctxt"))
        .args(args)
        .env("CTXT_DATA_DIR", dir)
        .env("CTXT_WORKER_THREADS", "1")
        .env("RUST_LOG", "off")
        .output()
        .expect("run ctxt");
    (
        output.status.code().unwrap_or(-1),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).trim().to_string(),
    )
}

fn ok(dir: &Path, args: &[&str]) -> String {
    let (code, stdout, stderr) = ctxt(dir, args);
    assert_eq!(code, 0, "ctxt {args:?} failed: {stderr}");
    stdout
}

fn json(dir: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    serde_json::from_str(&ok(dir, &full)).expect("json output")
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let out = ok(dir.path(), &["--help"]);
    for command in ["init", "seal", "open", "export", "import"] {
        assert!(out.contains(command), "help should mention {command}");
    }
}

#[test]
fn whoami_before_init_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = ctxt(dir.path(), &["--json", "whoami"]);
    assert_eq!(code, 1);
    let err: serde_json::Value = serde_json::from_str(&stderr).unwrap();
    assert!(err["error"].as_str().unwrap().contains("ctxt init"));
}

#[test]
fn bad_number_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (code, _, stderr) = ctxt(dir.path(), &["fingerprint", "call-me"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("invalid phone number"), "{stderr}");
}

#[test]
fn two_devices_exchange_a_message() {
    let alice = tempfile::tempdir().unwrap();
    let bob = tempfile::tempdir().unwrap();

    let me = json(alice.path(), &["init", "+44 7700 900001"]);
    assert_eq!(me["number"], "447700900001");
    assert_eq!(json(alice.path(), &["whoami"])["fingerprint"], me["fingerprint"]);
    json(bob.path(), &["init", "+1 555 555 0100"]);

    let share = ok(bob.path(), &["export"]);
    let imported = json(alice.path(), &["import", &share]);
    assert_eq!(imported["number"], "15555550100");

    let contacts = json(alice.path(), &["contacts"]);
    assert_eq!(contacts.as_array().unwrap().len(), 2);

    let body = json(alice.path(), &["seal", "15555550100", "see you at 8"]);
    let body = body["body"].as_str().unwrap();
    assert_eq!(body.chars().count(), 152);

    assert_eq!(ok(bob.path(), &["open", body]), "see you at 8");
}

#[test]
fn add_reads_der_file_and_refuses_duplicates() {
    let peer = tempfile::tempdir().unwrap();
    let me = tempfile::tempdir().unwrap();
    let record = json(peer.path(), &["init", "15555550100"]);

    let key_file = me.path().join("peer.der");
    let der = base64_decode(record["public_key"].as_str().unwrap());
    std::fs::write(&key_file, der).unwrap();
    let key_path = key_file.to_str().unwrap();

    let added = json(me.path(), &["add", "15555550100", key_path]);
    assert_eq!(added["fingerprint"], record["fingerprint"]);

    let (code, _, stderr) = ctxt(me.path(), &["add", "15555550100", key_path]);
    assert_eq!(code, 1);
    assert!(stderr.contains("already stored"), "{stderr}");
}

fn base64_decode(s: &str) -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(s).unwrap()
}
