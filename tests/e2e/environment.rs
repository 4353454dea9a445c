//! Environment variable behavior end-to-end tests.

use image::ImageFormat;

use crate::common::assertions::assert_no_ansi;
use crate::common::cli::CliRunner;
use crate::common::fixtures::TestImages;
use crate::common::init_test_logging;

#[test]
fn avatar_format_env_sets_compact_json() {
    init_test_logging();
    let cli = CliRunner::new().with_env("AVATAR_FORMAT", "json-compact");
    let result = cli.run(&["version"]);
    result.assert_success();

    let stdout = result.stdout.trim_end();
    let json: serde_json::Value =
        serde_json::from_str(stdout).expect("Expected JSON output with AVATAR_FORMAT");
    assert!(json.get("version").is_some());
    assert_eq!(stdout.lines().count(), 1, "Expected compact JSON single line");
}

#[test]
fn cli_format_flag_overrides_env() {
    init_test_logging();
    let cli = CliRunner::new().with_env("AVATAR_FORMAT", "json");
    let result = cli.run(&["version", "--format=text"]);
    result.assert_success();
    assert!(
        serde_json::from_str::<serde_json::Value>(result.stdout.trim()).is_err(),
        "--format=text should override AVATAR_FORMAT=json"
    );
}

#[test]
fn avatar_data_dir_env_selects_root() {
    init_test_logging();
    let cli = CliRunner::new().without_data_dir_flag();
    let dir = cli.data_dir().display().to_string();
    let cli = cli.with_env("AVATAR_DATA_DIR", &dir);

    let json = cli.run_robot(&["paths", "42"]).json();
    assert_eq!(json["root"], dir.as_str());
}

#[test]
fn config_file_data_dir_is_used() {
    init_test_logging();
    let images = TestImages::new();
    let src = images.solid("a.png", 4, [3, 3, 3], ImageFormat::Png);
    let store_dir = images.path().join("configured");
    let config = images.path().join("avatar.toml");
    std::fs::write(
        &config,
        format!("data_dir = {:?}\n", store_dir.display().to_string()),
    )
    .unwrap();

    let cli = CliRunner::new()
        .without_data_dir_flag()
        .with_env("AVATAR_CONFIG", config.to_str().unwrap());
    cli.run(&["save", "42", src.to_str().unwrap()]).assert_success();
    assert!(store_dir.join("avatars/42/profile.png").exists());
}

#[test]
fn data_dir_flag_overrides_config_file() {
    init_test_logging();
    let images = TestImages::new();
    let config = images.path().join("avatar.toml");
    std::fs::write(&config, "data_dir = \"/nonexistent/avatar-root\"\n").unwrap();

    let cli = CliRunner::new();
    let json = cli
        .run_robot(&["--config", config.to_str().unwrap(), "paths", "42"])
        .json();
    assert_eq!(json["root"], cli.data_dir().display().to_string().as_str());
}

#[test]
fn missing_config_file_is_an_error() {
    init_test_logging();
    let cli = CliRunner::new().with_env("AVATAR_CONFIG", "/nonexistent/avatar.toml");
    cli.run(&["paths", "42"])
        .assert_failure()
        .assert_stderr_contains("could not read settings");
}

#[test]
fn no_color_env_disables_ansi() {
    init_test_logging();
    let cli = CliRunner::new().with_env("NO_COLOR", "1");
    let result = cli.run(&["load", "42"]);
    result.assert_success();
    assert_no_ansi(&result.stdout);
    assert_no_ansi(&result.stderr);
}

#[test]
fn completions_generate_for_bash() {
    use assert_cmd::Command;
    use predicates::prelude::*;

    Command::cargo_bin("avatar")
        .unwrap()
        .env("RUST_LOG", "off")
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_avatar()").and(predicate::str::contains("save")));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    use assert_cmd::Command;
    use predicates::prelude::*;

    Command::cargo_bin("avatar")
        .unwrap()
        .env("RUST_LOG", "off")
        .arg("frobnicate")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}
