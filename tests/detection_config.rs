use std::sync::Mutex;

use tempfile::NamedTempFile;

use lanesnpeds::config::{BackendChoice, DetectionConfig};
use lanesnpeds::tiling::RemainderPolicy;

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "LANESNPEDS_CONFIG",
        "LANESNPEDS_WORKERS",
        "LANESNPEDS_LOG_BATCH",
        "LANESNPEDS_BACKEND",
        "LANESNPEDS_BAND_POLICY",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "workers": 4,
            "log_batch": 20,
            "band_policy": "truncate",
            "hough": { "threshold": 60, "min_line_length": 40.0 },
            "lanes": { "roi_top": 0.55, "roi_height": 0.3 }
        }"#,
    );

    std::env::set_var("LANESNPEDS_CONFIG", file.path());
    std::env::set_var("LANESNPEDS_WORKERS", "6");
    std::env::set_var("LANESNPEDS_BACKEND", "cpu");

    let cfg = DetectionConfig::load(None).expect("load config");

    assert_eq!(cfg.workers, 6);
    assert_eq!(cfg.log_batch, 20);
    assert_eq!(cfg.band_policy, RemainderPolicy::Truncate);
    assert_eq!(cfg.backend, BackendChoice::Cpu);
    assert_eq!(cfg.hough.threshold, 60);
    assert_eq!(cfg.hough.min_line_length, 40.0);
    // untouched fields keep their defaults
    assert_eq!(cfg.hough.max_line_gap, 5.0);
    assert_eq!(cfg.edges.high, 200.0);
    assert_eq!(cfg.lanes.roi_top, 0.55);
    assert_eq!(cfg.lanes.min_angle_deg, 25.0);

    clear_env();
}

#[test]
fn explicit_path_wins_over_env_path() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let from_env = write_config(r#"{ "workers": 2 }"#);
    let explicit = write_config(r#"{ "workers": 5 }"#);
    std::env::set_var("LANESNPEDS_CONFIG", from_env.path());

    let cfg = DetectionConfig::load(Some(explicit.path())).expect("load config");
    assert_eq!(cfg.workers, 5);

    clear_env();
}

#[test]
fn defaults_without_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = DetectionConfig::load(None).expect("defaults");
    assert_eq!(cfg.workers, 3);
    assert_eq!(cfg.log_batch, 50);
    assert_eq!(cfg.band_policy, RemainderPolicy::Absorb);
}

#[test]
fn rejects_invalid_values() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let zero_workers = write_config(r#"{ "workers": 0 }"#);
    assert!(DetectionConfig::load(Some(zero_workers.path())).is_err());

    let bad_angles = write_config(r#"{ "lanes": { "min_angle_deg": 170.0 } }"#);
    assert!(DetectionConfig::load(Some(bad_angles.path())).is_err());

    let not_json = write_config("workers = 3");
    assert!(DetectionConfig::load(Some(not_json.path())).is_err());

    std::env::set_var("LANESNPEDS_LOG_BATCH", "lots");
    assert!(DetectionConfig::load(None).is_err());
    std::env::set_var("LANESNPEDS_LOG_BATCH", "0");
    assert!(DetectionConfig::load(None).is_err());

    clear_env();
}
