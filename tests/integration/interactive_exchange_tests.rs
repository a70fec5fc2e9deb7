//! Interactive request/response exchanges with real shell workers.
//!
//! Workers read the response line from stdin and echo it to stderr, so the
//! recorded `stderr:` entry is exactly what the worker received.

#![cfg(unix)]

use std::sync::Arc;
use std::time::Duration;

use worker_intercom::interaction::handler::{ChoiceOutcome, InteractiveHandler};
use worker_intercom::supervisor::FINISHED_MESSAGE;
use worker_intercom::AppError;

use super::test_helpers::{sh, supervisor, Recorder, ScriptedUi, SilentUi, RUN_LIMIT};

const ASK_AND_ECHO: &str = r#"
    printf '%s\n' '{"type":"input_request","key":"files","prompt":"Select files to stage","options":["src/a.txt","src/b.txt"]}'
    read -r reply
    echo "$reply" >&2
"#;

#[tokio::test]
async fn selected_option_is_written_back_to_worker() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let ui = ScriptedUi::new(recorder.clone(), [ChoiceOutcome::Accepted(vec![3])]);

    supervisor(sh(ASK_AND_ECHO), dir.path(), InteractiveHandler::new(ui), &recorder)
        .run()
        .await
        .expect("session completes");

    assert_eq!(
        recorder.with_prefix("stderr:"),
        vec![r#"{"key":"files","value":["src/b.txt"]}"#]
    );
    assert_eq!(recorder.with_prefix("ui:"), vec!["Select files to stage"]);
}

#[tokio::test]
async fn select_all_returns_every_option() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let ui = ScriptedUi::new(recorder.clone(), [ChoiceOutcome::Accepted(vec![0])]);

    supervisor(sh(ASK_AND_ECHO), dir.path(), InteractiveHandler::new(ui), &recorder)
        .run()
        .await
        .expect("session completes");

    assert_eq!(
        recorder.with_prefix("stderr:"),
        vec![r#"{"key":"files","value":["src/a.txt","src/b.txt"]}"#]
    );
}

/// Dismissing, or a UI that drops the reply, still answers the worker.
#[tokio::test]
async fn dismissed_and_dropped_replies_answer_empty() {
    for script in [vec![ChoiceOutcome::Dismissed], Vec::new()] {
        let dir = tempfile::tempdir().unwrap();
        let recorder = Recorder::new();
        let ui = ScriptedUi::new(recorder.clone(), script);

        tokio::time::timeout(
            RUN_LIMIT,
            supervisor(sh(ASK_AND_ECHO), dir.path(), InteractiveHandler::new(ui), &recorder)
                .run(),
        )
        .await
        .expect("worker is never left waiting")
        .expect("session completes");

        assert_eq!(
            recorder.with_prefix("stderr:"),
            vec![r#"{"key":"files","value":[]}"#]
        );
    }
}

#[tokio::test]
async fn timed_out_exchange_answers_empty() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let handler = InteractiveHandler::new(Arc::new(SilentUi::default()))
        .with_timeout(Some(Duration::from_millis(100)));

    tokio::time::timeout(
        RUN_LIMIT,
        supervisor(sh(ASK_AND_ECHO), dir.path(), handler, &recorder).run(),
    )
    .await
    .expect("timeout resolves the exchange")
    .expect("session completes");

    assert_eq!(
        recorder.with_prefix("stderr:"),
        vec![r#"{"key":"files","value":[]}"#]
    );
}

/// Output sent after a request is dispatched only once the request has
/// been answered.
#[tokio::test]
async fn events_after_request_wait_for_the_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let ui = ScriptedUi::new(recorder.clone(), [ChoiceOutcome::Accepted(vec![2])]);
    let script = r#"
        printf '%s\n' '{"type":"status","message":"before"}'
        printf '%s\n' '{"type":"input_request","key":"files","prompt":"Pick","options":["x"]}'
        printf '%s\n' '{"type":"status","message":"queued"}'
        read -r reply
        printf '%s\n' '{"type":"status","message":"after reply"}'
    "#;

    supervisor(sh(script), dir.path(), InteractiveHandler::new(ui), &recorder)
        .run()
        .await
        .expect("session completes");

    let finished = format!("progress:{FINISHED_MESSAGE}");
    assert_eq!(
        recorder.entries(),
        vec![
            "progress:before",
            "ui:Pick",
            "progress:queued",
            "progress:after reply",
            finished.as_str(),
        ]
    );
}

/// Two requests back to back are answered in order, each with its own key.
#[tokio::test]
async fn consecutive_requests_are_answered_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let ui = ScriptedUi::new(
        recorder.clone(),
        [
            ChoiceOutcome::Accepted(vec![2]),
            ChoiceOutcome::Accepted(vec![1]),
        ],
    );
    let script = r#"
        printf '%s\n' '{"type":"input_request","key":"first","prompt":"One","options":["a"]}'
        printf '%s\n' '{"type":"input_request","key":"second","prompt":"Two","options":["b"]}'
        read -r one
        read -r two
        echo "$one" >&2
        echo "$two" >&2
    "#;

    supervisor(sh(script), dir.path(), InteractiveHandler::new(ui), &recorder)
        .run()
        .await
        .expect("session completes");

    assert_eq!(
        recorder.with_prefix("stderr:"),
        vec![
            r#"{"key":"first","value":["a"]}"#,
            r#"{"key":"second","value":[]}"#,
        ]
    );
}

/// A worker that exits mid-exchange is not written to, and its exit code
/// decides the outcome.
#[tokio::test]
async fn worker_exit_abandons_outstanding_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let recorder = Recorder::new();
    let script = r#"
        printf '%s\n' '{"type":"input_request","key":"files","prompt":"Pick","options":["x"]}'
        exit 4
    "#;

    let err = tokio::time::timeout(
        RUN_LIMIT,
        supervisor(
            sh(script),
            dir.path(),
            InteractiveHandler::new(Arc::new(SilentUi::default())),
            &recorder,
        )
        .run(),
    )
    .await
    .expect("exit ends the exchange")
    .unwrap_err();

    assert!(matches!(err, AppError::AbnormalExit(Some(4))), "got {err:?}");
}
