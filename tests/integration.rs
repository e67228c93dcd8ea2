//! End-to-end tests driving the `paperchat` binary: database init, PDF
//! upload and re-upload, rejection of bad uploads, session management, and
//! the chat command's clean failure without an API key.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn paperchat_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("paperchat");
    path
}

/// Minimal valid PDF containing the given phrase. Builds the body then the
/// xref with correct byte offsets so pdf-extract can parse it.
fn minimal_pdf_with_phrase(phrase: &str) -> Vec<u8> {
    let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET\n", phrase);
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n");
    let o4 = out.len();
    out.extend_from_slice(
        format!(
            "4 0 obj << /Length {} >> stream\n{}endstream endobj\n",
            stream.len(),
            stream
        )
        .as_bytes(),
    );
    let o5 = out.len();
    out.extend_from_slice(
        b"5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o1).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o2).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o3).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o4).as_bytes());
    out.extend_from_slice(format!("{:010} 00000 n \n", o5).as_bytes());
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    fs::create_dir_all(root.join("config")).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::create_dir_all(root.join("files")).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/paperchat.sqlite"

[uploads]
dir = "{root}/uploads"

[chunking]
chunk_size = 1000
overlap = 200

[retrieval]
context_chunks = 10

[server]
bind = "127.0.0.1:7878"
"#,
        root = root.display()
    );

    let config_path = root.join("config").join("paperchat.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_paperchat(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = paperchat_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run paperchat binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_paperchat(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("paperchat.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_paperchat(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_paperchat(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_upload_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let pdf_path = tmp.path().join("files").join("report.pdf");
    fs::write(&pdf_path, minimal_pdf_with_phrase("quarterly invoice total")).unwrap();

    let (stdout, stderr, success) =
        run_paperchat(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(
        success,
        "upload failed: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(stdout.contains("uploaded report.pdf"));
    assert!(stdout.contains("chunks written: 1"));

    // The raw file is persisted under the uploads directory.
    assert!(tmp.path().join("uploads").join("report.pdf").exists());
}

#[test]
fn test_reupload_replaces_document() {
    let (tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let pdf_path = tmp.path().join("files").join("report.pdf");
    fs::write(&pdf_path, minimal_pdf_with_phrase("first version")).unwrap();
    let (_, _, ok1) = run_paperchat(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(ok1);

    fs::write(&pdf_path, minimal_pdf_with_phrase("second version, slightly longer")).unwrap();
    let (stdout, _, ok2) = run_paperchat(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(ok2);
    assert!(stdout.contains("uploaded report.pdf"));

    // Still exactly one document.
    let (stdout, _, success) = run_paperchat(&config_path, &["documents"]);
    assert!(success);
    assert_eq!(stdout.matches("report.pdf").count(), 1);
}

#[test]
fn test_upload_rejects_non_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let txt_path = tmp.path().join("files").join("notes.txt");
    fs::write(&txt_path, "plain text, not a pdf").unwrap();

    let (_, stderr, success) = run_paperchat(&config_path, &["upload", txt_path.to_str().unwrap()]);
    assert!(!success, "non-PDF upload should fail");
    assert!(
        stderr.contains("unsupported content-type"),
        "Should mention content type, got: {}",
        stderr
    );
}

#[test]
fn test_upload_rejects_corrupt_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let pdf_path = tmp.path().join("files").join("broken.pdf");
    fs::write(&pdf_path, b"not really a pdf").unwrap();

    let (_, stderr, success) = run_paperchat(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(!success, "corrupt PDF upload should fail");
    assert!(
        stderr.contains("PDF"),
        "Should mention PDF failure, got: {}",
        stderr
    );
}

#[test]
fn test_upload_rejects_textless_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    // Structurally valid PDF whose only text operator draws an empty string,
    // so extraction succeeds but yields nothing to chunk.
    let pdf_path = tmp.path().join("files").join("blank.pdf");
    fs::write(&pdf_path, minimal_pdf_with_phrase("")).unwrap();

    let (_, stderr, success) = run_paperchat(&config_path, &["upload", pdf_path.to_str().unwrap()]);
    assert!(!success, "textless PDF upload should fail");
    assert!(
        stderr.contains("empty or unreadable"),
        "Should report an empty document, got: {}",
        stderr
    );
}

#[test]
fn test_documents_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let (stdout, _, success) = run_paperchat(&config_path, &["documents"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_sessions_list_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let (stdout, _, success) = run_paperchat(&config_path, &["sessions", "list"]);
    assert!(success);
    assert!(stdout.contains("No sessions."));
}

#[test]
fn test_sessions_delete_missing() {
    let (_tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let (_, stderr, success) = run_paperchat(&config_path, &["sessions", "delete", "nope"]);
    assert!(!success, "deleting a missing session should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_chat_requires_api_key() {
    let (_tmp, config_path) = setup_test_env();
    run_paperchat(&config_path, &["init"]);

    let (_, stderr, success) = run_paperchat(&config_path, &["chat", "hello"]);
    assert!(!success, "chat without an API key should fail");
    assert!(
        stderr.contains("OPENAI_API_KEY"),
        "Should mention the missing key, got: {}",
        stderr
    );
}

#[test]
fn test_missing_config_errors() {
    let (tmp, _) = setup_test_env();
    let bogus = tmp.path().join("does-not-exist.toml");

    let (_, stderr, success) = run_paperchat(&bogus, &["init"]);
    assert!(!success);
    assert!(
        stderr.contains("Failed to read config file"),
        "Should mention the config file, got: {}",
        stderr
    );
}
