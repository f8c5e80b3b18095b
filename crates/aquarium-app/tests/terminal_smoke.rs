use std::env;
use std::fs;
use std::process::Command;

#[test]
fn terminal_headless_demo_smoke() {
    let bin = env!("CARGO_BIN_EXE_aquarium");
    let mut cmd = Command::new(bin);
    cmd.arg("--demo")
        .args(["--rows", "6", "--seed", "7"])
        .env("AQUARIUM_HEADLESS", "1")
        .env_remove("AQUARIUM_REPORT_FILE")
        .env("TERM", "xterm-256color")
        .env("RUST_LOG", "off");

    let status = cmd.status().expect("failed to run aquarium binary");
    assert!(status.success(), "terminal headless run failed");
}

#[test]
fn terminal_headless_dataset_file_smoke() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = dir.path().join("catch.json");
    fs::write(
        &data,
        r#"{
            "categories": {"labels": ["Cod", "Eel", "Pike"]},
            "series": [
                {"name": "Weight", "values": [10, -4, null]},
                {"name": "Length", "values": [3, 8, 2]}
            ]
        }"#,
    )
    .expect("write dataset");
    let report = dir.path().join("report.json");

    let status = Command::new(env!("CARGO_BIN_EXE_aquarium"))
        .arg("--data")
        .arg(&data)
        .arg("--no-watch")
        .env("AQUARIUM_HEADLESS", "1")
        .env("AQUARIUM_HEADLESS_FRAMES", "20")
        .env("AQUARIUM_REPORT_FILE", &report)
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run aquarium binary");
    assert!(status.success(), "dataset headless run failed");

    let raw = fs::read_to_string(&report).expect("report written");
    let json: serde_json::Value = serde_json::from_str(&raw).expect("report is json");
    assert_eq!(json["summary"]["frame_count"], 20);
    assert_eq!(json["summary"]["final_fish"], 5);
}

#[test]
fn missing_source_is_rejected() {
    let status = Command::new(env!("CARGO_BIN_EXE_aquarium"))
        .env_remove("AQUARIUM_DATA")
        .env("RUST_LOG", "off")
        .status()
        .expect("failed to run aquarium binary");
    assert!(!status.success());
}
