use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const ASSIGNMENT: &str = "5b1e0f0a-9c33-4a51-9a0e-6f2f7f0d8a11";
const STUDENT_A: &str = "0d6c9a3e-2b7a-4c1f-8e55-1f9b7c2d4e01";
const STUDENT_B: &str = "7a2f4c91-5d3e-4b8a-b6c2-9e1d0f3a5b02";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(
        files_dir.join("original.txt"),
        "Rust programs are built with cargo, and crates are shared on crates.io by the community.",
    )
    .unwrap();
    fs::write(
        files_dir.join("copy.md"),
        "Rust programs are built with cargo, and crates are shared on crates.io by the community.",
    )
    .unwrap();
    fs::write(
        files_dir.join("other.txt"),
        "Python notebooks make exploratory data analysis quick and interactive for researchers.",
    )
    .unwrap();
    fs::write(files_dir.join("slides.pdf"), "%PDF-1.4").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/copycheck.sqlite"

[storage]
root = "{root}/data/blobs"

[detection]
threshold = 0.85

[server]
bind = "127.0.0.1:7341"
"#,
        root = root.display()
    );

    let config_path = config_dir.join("copycheck.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_copycheck(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = env!("CARGO_BIN_EXE_copycheck");
    let output = Command::new(binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run copycheck binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn submit(config: &Path, file: &Path, student: &str) -> (String, String, bool) {
    run_copycheck(
        config,
        &[
            "submit",
            file.to_str().unwrap(),
            "--assignment",
            ASSIGNMENT,
            "--student",
            student,
        ],
    )
}

/// Value of a `key: value` line in CLI output.
fn field<'a>(stdout: &'a str, key: &str) -> &'a str {
    stdout
        .lines()
        .find_map(|l| l.strip_prefix(&format!("{}:", key)))
        .map(str::trim)
        .unwrap_or_else(|| panic!("no {} in output: {}", key, stdout))
}

#[test]
fn test_init_creates_database() {
    let (tmp, config) = setup_test_env();
    let (stdout, stderr, success) = run_copycheck(&config, &["init"]);
    assert!(success, "init failed: {}", stderr);
    assert!(stdout.contains("Database initialized successfully"));
    assert!(tmp.path().join("data/copycheck.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config) = setup_test_env();
    let (_, _, first) = run_copycheck(&config, &["init"]);
    let (_, stderr, second) = run_copycheck(&config, &["init"]);
    assert!(first);
    assert!(second, "second init failed: {}", stderr);
}

#[test]
fn test_submit_and_report() {
    let (tmp, config) = setup_test_env();
    let files = tmp.path().join("files");
    run_copycheck(&config, &["init"]);

    let (first, stderr, success) = submit(&config, &files.join("original.txt"), STUDENT_A);
    assert!(success, "submit failed: {}", stderr);
    assert_eq!(field(&first, "is_plagiarized"), "false");
    let first_id = field(&first, "work_id").to_string();

    let (second, stderr, success) = submit(&config, &files.join("copy.md"), STUDENT_B);
    assert!(success, "submit failed: {}", stderr);
    assert_eq!(field(&second, "is_plagiarized"), "true");
    assert_eq!(field(&second, "score"), "1.0000");
    assert_eq!(field(&second, "matched_work"), first_id);
    assert_eq!(field(&first, "content_hash"), field(&second, "content_hash"));
    let second_id = field(&second, "work_id").to_string();

    let (report, stderr, success) = run_copycheck(&config, &["report", &second_id]);
    assert!(success, "report failed: {}", stderr);
    assert_eq!(field(&report, "matched_work_id"), first_id);
    assert_eq!(field(&report, "algorithm"), "shingle");

    let (listed, _, success) = run_copycheck(&config, &["reports", "--assignment", ASSIGNMENT]);
    assert!(success);
    assert!(listed.contains(&first_id));
    assert!(listed.contains(&second_id));
}

#[test]
fn test_unrelated_submission_is_not_flagged() {
    let (tmp, config) = setup_test_env();
    let files = tmp.path().join("files");

    submit(&config, &files.join("original.txt"), STUDENT_A);
    let (stdout, stderr, success) = submit(&config, &files.join("other.txt"), STUDENT_B);
    assert!(success, "submit failed: {}", stderr);
    assert_eq!(field(&stdout, "is_plagiarized"), "false");
    assert!(!stdout.contains("matched_work"));
}

#[test]
fn test_submit_rejects_unsupported_file() {
    let (tmp, config) = setup_test_env();
    let (_, stderr, success) = submit(&config, &tmp.path().join("files/slides.pdf"), STUDENT_A);
    assert!(!success);
    assert!(stderr.contains("unsupported media type"), "stderr: {}", stderr);
}

#[test]
fn test_submit_rejects_bad_uuid() {
    let (tmp, config) = setup_test_env();
    let (_, stderr, success) = submit(&config, &tmp.path().join("files/original.txt"), "bob");
    assert!(!success);
    assert!(stderr.contains("invalid student id"), "stderr: {}", stderr);
}

#[test]
fn test_report_for_unknown_work() {
    let (_tmp, config) = setup_test_env();
    let (_, stderr, success) = run_copycheck(
        &config,
        &["report", "00000000-0000-4000-8000-000000000000"],
    );
    assert!(!success);
    assert!(stderr.contains("not found"), "stderr: {}", stderr);
}

#[test]
fn test_compare_needs_no_config() {
    let (tmp, _config) = setup_test_env();
    let files = tmp.path().join("files");
    let missing_config = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_copycheck(
        &missing_config,
        &[
            "compare",
            files.join("original.txt").to_str().unwrap(),
            files.join("copy.md").to_str().unwrap(),
        ],
    );
    assert!(success, "compare failed: {}", stderr);
    assert_eq!(stdout.trim(), "1.0000");

    let (stdout, _, success) = run_copycheck(
        &missing_config,
        &[
            "compare",
            files.join("original.txt").to_str().unwrap(),
            files.join("other.txt").to_str().unwrap(),
            "--shingle-len",
            "1",
        ],
    );
    assert!(success);
    let score: f64 = stdout.trim().parse().unwrap();
    assert!(score > 0.0 && score < 1.0, "score: {}", score);
}

#[test]
fn test_wordcloud_url() {
    let (tmp, config) = setup_test_env();
    let (stdout, _, _) = submit(&config, &tmp.path().join("files/original.txt"), STUDENT_A);
    let work_id = field(&stdout, "work_id").to_string();

    let (stdout, stderr, success) = run_copycheck(&config, &["wordcloud", &work_id]);
    assert!(success, "wordcloud failed: {}", stderr);
    assert!(stdout.trim().starts_with("https://quickchart.io/wordcloud?text=Rust+programs"));
}
