//! Unit tests for error display and conversions.

use worker_intercom::AppError;

#[test]
fn display_prefixes_identify_the_failure_area() {
    assert_eq!(
        AppError::Config("bad".into()).to_string(),
        "config: bad"
    );
    assert_eq!(
        AppError::Secret("locked".into()).to_string(),
        "secret: locked"
    );
    assert_eq!(
        AppError::Discovery("no root".into()).to_string(),
        "discovery: no root"
    );
    assert_eq!(
        AppError::Spawn("worker entry point not found: w.py".into()).to_string(),
        "spawn: worker entry point not found: w.py"
    );
    assert_eq!(
        AppError::Protocol("line too long".into()).to_string(),
        "protocol: line too long"
    );
}

/// The worker's own message is surfaced verbatim.
#[test]
fn worker_error_shows_worker_message() {
    assert_eq!(AppError::Worker("disk full".into()).to_string(), "disk full");
}

/// Abnormal exit is generic and never confused with a spawn failure.
#[test]
fn abnormal_exit_is_generic() {
    let exit = AppError::AbnormalExit(Some(3)).to_string();
    let killed = AppError::AbnormalExit(None).to_string();

    assert_eq!(exit, "worker process failed");
    assert_eq!(killed, exit);
    assert!(!exit.contains("spawn"));
}

#[test]
fn io_error_converts() {
    let err: AppError = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed").into();
    assert!(matches!(err, AppError::Io(ref msg) if msg == "pipe closed"));
}

#[test]
fn toml_error_converts_to_config() {
    let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
    let err: AppError = toml_err.into();
    assert!(matches!(err, AppError::Config(ref msg) if msg.starts_with("invalid config")));
}
