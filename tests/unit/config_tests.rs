//! Unit tests for configuration parsing and validation.

use std::path::PathBuf;
use std::time::Duration;

use worker_intercom::config::GlobalConfig;
use worker_intercom::AppError;

const MINIMAL: &str = r#"
[worker]
program = "python3"
"#;

const FULL: &str = r#"
[worker]
program = "python/venv/bin/python"
args = ["-u", "python/worker.py"]
entry_point = "python/worker.py"

[worker.env]
PYTHONUNBUFFERED = "1"

[credential]
name = "GOOGLE_API_KEY"
service = "git-helper"
prompt = false
required = false

[interaction]
timeout_seconds = 120

[discovery]
root_markers = [".git", ".hg"]
"#;

#[test]
fn minimal_config_gets_defaults() {
    let config = GlobalConfig::from_toml_str(MINIMAL).expect("minimal config");

    assert_eq!(config.worker.program, PathBuf::from("python3"));
    assert!(config.worker.args.is_empty());
    assert!(config.worker.entry_point.is_none());
    assert!(config.credential.is_none());
    assert_eq!(config.discovery.root_markers, vec![".git"]);
    assert_eq!(config.interaction_timeout(), None);
}

#[test]
fn full_config_parses_every_section() {
    let config = GlobalConfig::from_toml_str(FULL).expect("full config");

    assert_eq!(config.worker.args, vec!["-u", "python/worker.py"]);
    assert_eq!(
        config.worker.env.get("PYTHONUNBUFFERED").map(String::as_str),
        Some("1")
    );

    let credential = config.credential.as_ref().expect("credential section");
    assert_eq!(credential.name, "GOOGLE_API_KEY");
    assert_eq!(credential.service, "git-helper");
    assert!(!credential.prompt);
    assert!(!credential.required);

    assert_eq!(config.interaction_timeout(), Some(Duration::from_secs(120)));
    assert_eq!(config.discovery.root_markers, vec![".git", ".hg"]);

    let spec = config.worker_spec();
    assert_eq!(spec.program, PathBuf::from("python/venv/bin/python"));
    assert_eq!(spec.entry_point, Some(PathBuf::from("python/worker.py")));
}

#[test]
fn credential_defaults_to_prompting_and_required() {
    let raw = format!("{MINIMAL}\n[credential]\nname = \"API_KEY\"\n");
    let config = GlobalConfig::from_toml_str(&raw).expect("config");
    let credential = config.credential.expect("credential");

    assert_eq!(credential.service, "worker-intercom");
    assert!(credential.prompt);
    assert!(credential.required);
}

#[test]
fn empty_program_is_rejected() {
    let err = GlobalConfig::from_toml_str("[worker]\nprogram = \"\"\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("worker.program")));
}

#[test]
fn empty_root_markers_are_rejected() {
    let raw = format!("{MINIMAL}\n[discovery]\nroot_markers = []\n");
    let err = GlobalConfig::from_toml_str(&raw).unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("root_markers")));
}

#[test]
fn blank_credential_name_is_rejected() {
    let raw = format!("{MINIMAL}\n[credential]\nname = \"  \"\n");
    let err = GlobalConfig::from_toml_str(&raw).unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("credential.name")));
}

#[test]
fn missing_worker_section_is_invalid_toml() {
    let err = GlobalConfig::from_toml_str("[discovery]\nroot_markers = [\".git\"]\n").unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")));
}

/// Paths with a directory component resolve against the config file; a
/// bare program name stays as-is for `PATH` lookup.
#[test]
fn load_from_path_resolves_relative_paths() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.toml");

    std::fs::write(
        &path,
        "[worker]\nprogram = \"python3\"\nentry_point = \"python/worker.py\"\n",
    )
    .expect("write config");
    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.worker.program, PathBuf::from("python3"));
    assert_eq!(
        config.worker.entry_point,
        Some(dir.path().join("python/worker.py"))
    );

    std::fs::write(&path, "[worker]\nprogram = \"venv/bin/python\"\n").expect("write config");
    let config = GlobalConfig::load_from_path(&path).expect("load");
    assert_eq!(config.worker.program, dir.path().join("venv/bin/python"));
}

#[test]
fn load_from_missing_path_is_config_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = GlobalConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, AppError::Config(ref msg) if msg.contains("failed to read config")));
}
