use std::sync::Mutex;

use tempfile::TempDir;

use lanesnpeds::cli::execute;
use lanesnpeds::{Program, StopReason};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn cpu_env() {
    std::env::remove_var("LANESNPEDS_CONFIG");
    std::env::remove_var("LANESNPEDS_WORKERS");
    std::env::remove_var("LANESNPEDS_LOG_BATCH");
    std::env::remove_var("LANESNPEDS_BAND_POLICY");
    std::env::set_var("LANESNPEDS_BACKEND", "cpu");
}

#[test]
fn merged_program_runs_headless_over_walkers() {
    let _guard = ENV_LOCK.lock().unwrap();
    cpu_env();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("walkers.txt");

    let summary = execute(
        Program::Merged,
        [
            "lanesnpeds".to_string(),
            "--headless".to_string(),
            "--ui=plain".to_string(),
            "--video=stub://walkers".to_string(),
            format!("--store={}", store.display()),
        ],
    )
    .expect("run")
    .expect("summary");

    assert_eq!(summary.stop, StopReason::EndOfStream);
    assert_eq!(summary.frames, 10);
    let text = std::fs::read_to_string(&store).unwrap();
    assert!(text.starts_with("Frame 5: 2 pedestrians detected\n"));
}

#[test]
fn quit_key_script_stops_early() {
    let _guard = ENV_LOCK.lock().unwrap();
    cpu_env();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("log.txt");

    let summary = execute(
        Program::Pedestrians,
        [
            "people_detect".to_string(),
            "--headless".to_string(),
            "--ui=plain".to_string(),
            "-v".to_string(),
            "stub://blank".to_string(),
            "--keys=3:q".to_string(),
            format!("--store={}", store.display()),
        ],
    )
    .expect("run")
    .expect("summary");

    assert_eq!(summary.stop, StopReason::QuitKey);
    assert_eq!(summary.frames, 3);
}

#[test]
fn lane_program_creates_no_log() {
    let _guard = ENV_LOCK.lock().unwrap();
    cpu_env();
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("never.txt");

    execute(
        Program::Lanes,
        [
            "lane_detect".to_string(),
            "--headless".to_string(),
            "--ui=plain".to_string(),
            "--video=stub://blank".to_string(),
            format!("--store={}", store.display()),
        ],
    )
    .expect("run");

    assert!(!store.exists());
}

#[test]
fn unopenable_source_exits_two() {
    let _guard = ENV_LOCK.lock().unwrap();
    cpu_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.mp4");

    let err = execute(
        Program::Merged,
        [
            "lanesnpeds".to_string(),
            "--headless".to_string(),
            "--ui=plain".to_string(),
            format!("--video={}", missing.display()),
        ],
    )
    .unwrap_err();

    assert_eq!(err.exit_code(), 2);
    assert_eq!(
        err.to_string(),
        format!("Can not open video stream: '{}'", missing.display())
    );
}

#[test]
fn bad_config_exits_one() {
    let _guard = ENV_LOCK.lock().unwrap();
    cpu_env();
    std::env::set_var("LANESNPEDS_WORKERS", "0");

    let err = execute(
        Program::Merged,
        ["lanesnpeds", "--headless", "--video=stub://blank"],
    )
    .unwrap_err();
    assert_eq!(err.exit_code(), 1);

    std::env::remove_var("LANESNPEDS_WORKERS");
}

#[test]
fn help_exits_cleanly() {
    assert!(execute(Program::Merged, ["lanesnpeds", "--help"])
        .unwrap()
        .is_none());
}
