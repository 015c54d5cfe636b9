// Tests for progress sinks
//
// Tests cover: splash names, null and fan-out sinks, recording order,
// terminal splash de-duplication, and atomic status-file rewrites.

use super::*;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

// ==================== STATE TESTS ====================

#[test]
fn test_splash_names() {
    assert_eq!(ProgressState::Idle.splash_name(), "roth_splash.bmp");
    assert_eq!(ProgressState::Updating.splash_name(), "update_splash.bmp");
    assert_eq!(ProgressState::Warning.splash_name(), "warning_splash.bmp");
}

#[test]
fn test_state_display() {
    assert_eq!(ProgressState::Warning.to_string(), "warning");
    assert_eq!(
        serde_json::to_string(&ProgressState::Updating).unwrap(),
        "\"updating\""
    );
}

// ==================== SINK COMPOSITION TESTS ====================

#[test]
fn test_recording_sink_keeps_order() {
    let sink = RecordingSink::new();
    assert_eq!(sink.current(), None);

    sink.notify(ProgressState::Idle);
    sink.notify(ProgressState::Warning);
    sink.notify(ProgressState::Idle);

    assert_eq!(
        sink.states(),
        vec![ProgressState::Idle, ProgressState::Warning, ProgressState::Idle]
    );
    assert_eq!(sink.current(), Some(ProgressState::Idle));
}

#[test]
fn test_multi_sink_fans_out() {
    let first = Arc::new(RecordingSink::new());
    let second = Arc::new(RecordingSink::new());

    let multi = MultiSink::new()
        .with(first.clone())
        .with(NullSink)
        .with(second.clone());
    assert_eq!(multi.len(), 3);

    multi.notify(ProgressState::Updating);

    assert_eq!(first.states(), vec![ProgressState::Updating]);
    assert_eq!(second.states(), vec![ProgressState::Updating]);
}

#[test]
fn test_empty_multi_sink() {
    let multi = MultiSink::new();
    assert!(multi.is_empty());
    multi.notify(ProgressState::Idle);
}

// ==================== TERMINAL SPLASH TESTS ====================

#[test]
fn test_terminal_splash_last_write_wins() {
    let splash = TerminalSplash::hidden();
    assert_eq!(splash.current(), None);

    splash.notify(ProgressState::Updating);
    splash.notify(ProgressState::Warning);

    assert_eq!(splash.current(), Some(ProgressState::Warning));
    assert!(splash.message().contains("warning_splash.bmp"));
}

#[test]
fn test_terminal_splash_ignores_repeats() {
    let splash = TerminalSplash::hidden();
    splash.notify(ProgressState::Warning);
    let first = splash.message();
    splash.notify(ProgressState::Warning);

    assert_eq!(splash.message(), first);
    splash.finish();
}

#[test]
fn test_terminal_render_mentions_splash() {
    for state in [ProgressState::Idle, ProgressState::Updating, ProgressState::Warning] {
        assert!(TerminalSplash::render(state).contains(state.splash_name()));
    }
}

// ==================== STATUS FILE TESTS ====================

#[test]
fn test_status_file_written_and_replaced() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("run/splash.status");
    let sink = StatusFileSink::new(&path);

    sink.notify(ProgressState::Warning);
    let content = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "warning_splash.bmp");
    assert_eq!(lines[1], "warning");
    assert!(chrono::DateTime::parse_from_rfc3339(lines[2]).is_ok());

    sink.notify(ProgressState::Idle);
    let content = fs::read_to_string(&path).unwrap();
    assert!(content.starts_with("roth_splash.bmp\n"));

    // Only the status file remains; temporaries were persisted over it
    let entries = fs::read_dir(path.parent().unwrap()).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn test_status_file_failure_is_swallowed() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not-a-dir");
    fs::write(&blocker, "x").unwrap();

    let sink = StatusFileSink::new(blocker.join("splash.status"));
    sink.notify(ProgressState::Warning);
    assert!(!sink.path().exists());
}
