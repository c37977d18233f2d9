use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn videostudio() -> Command {
    let mut cmd = Command::cargo_bin("videostudio").unwrap();
    cmd.env_remove("VIDEOSTUDIO_OUTPUT_DIR")
        .env_remove("VIDEOSTUDIO_MERGE_PREFLIGHT");
    cmd
}

#[test]
fn test_help_lists_commands() {
    videostudio()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("trim")
                .and(predicate::str::contains("merge"))
                .and(predicate::str::contains("preview"))
                .and(predicate::str::contains("scrub"))
                .and(predicate::str::contains("inspect")),
        );
}

#[test]
fn test_trim_rejects_bad_start_time() {
    videostudio()
        .args(["trim", "--input", "clip.mp4", "--start", "1:xx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid start time"));
}

#[test]
fn test_trim_missing_input_fails() {
    let dir = TempDir::new().unwrap();
    videostudio()
        .arg("--out-dir")
        .arg(dir.path())
        .args(["trim", "--input"])
        .arg(dir.path().join("absent.mp4"))
        .assert()
        .failure();
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_merge_needs_an_input() {
    videostudio()
        .arg("merge")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--input"));
}

#[test]
fn test_merge_single_clip_fails() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("only.mp4");
    std::fs::write(&clip, b"not really a video").unwrap();

    videostudio()
        .arg("--out-dir")
        .arg(dir.path())
        .args(["merge", "--input"])
        .arg(&clip)
        .assert()
        .failure();
    assert!(!dir.path().join("merged-video.mp4").exists());
}

#[test]
fn test_preview_count_is_bounded() {
    videostudio()
        .args(["preview", "--input", "clip.mp4", "--count", "0"])
        .assert()
        .failure();
}

#[test]
fn test_bad_move_syntax_is_rejected() {
    videostudio()
        .args(["merge", "-i", "a.mp4", "-i", "b.mp4", "--move", "2-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("FROM:TO"));
}
