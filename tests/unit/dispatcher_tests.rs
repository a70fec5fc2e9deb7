//! Unit tests for event dispatch, driven over an in-memory stdin pipe.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader, DuplexStream};

use worker_intercom::interaction::handler::{ChoiceOutcome, InteractiveHandler};
use worker_intercom::protocol::event::{decode_line, InputRequest, WorkerEvent};
use worker_intercom::supervisor::dispatcher::{Dispatcher, Flow};
use worker_intercom::supervisor::session::{SessionState, SessionStatus};

use super::support::{Recorder, ScriptedUi};

fn dispatcher(
    script: Vec<ChoiceOutcome>,
) -> (Dispatcher<DuplexStream>, Arc<Recorder>, BufReader<DuplexStream>) {
    let recorder = Recorder::new();
    let (stdin, worker_side) = tokio::io::duplex(4096);
    let mut session = SessionState::new(std::env::temp_dir(), HashMap::new());
    session.mark_running();

    let dispatcher = Dispatcher::new(
        session,
        recorder.clone(),
        recorder.clone(),
        InteractiveHandler::new(ScriptedUi::new(script)),
        stdin,
    );
    (dispatcher, recorder, BufReader::new(worker_side))
}

#[tokio::test]
async fn status_goes_to_progress_sink() {
    let (mut d, recorder, _worker) = dispatcher(Vec::new());

    let flow = d
        .dispatch(decode_line(r#"{"type":"status","message":"Listing unstaged files"}"#))
        .await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(recorder.entries(), vec!["progress:Listing unstaged files"]);
}

/// Non-JSON output is diagnostic only and never terminal.
#[tokio::test]
async fn unrecognized_goes_to_diagnostic_sink() {
    let (mut d, recorder, _worker) = dispatcher(Vec::new());

    let flow = d.dispatch(decode_line("Generated commit message: fix bug")).await;

    assert_eq!(flow, Flow::Continue);
    assert_eq!(recorder.entries(), vec!["diag:Generated commit message: fix bug"]);
    assert!(!d.session().is_terminated());
}

#[tokio::test]
async fn error_terminates_and_later_events_are_ignored() {
    let (mut d, recorder, _worker) = dispatcher(Vec::new());

    let flow = d
        .dispatch(decode_line(r#"{"type":"error","message":"disk full"}"#))
        .await;
    assert_eq!(flow, Flow::Terminate("disk full".to_owned()));
    assert_eq!(d.session().status(), SessionStatus::Failed);

    let later = [
        r#"{"type":"status","message":"too late"}"#,
        r#"{"type":"error","message":"second error"}"#,
        "plain text",
        r#"{"type":"input_request","key":"k","prompt":"p","options":["a"]}"#,
    ];
    for line in later {
        assert_eq!(d.dispatch(decode_line(line)).await, Flow::Ignored);
    }
    assert!(recorder.entries().is_empty(), "no side effects after termination");
}

/// A session completed by process exit ignores stragglers too.
#[tokio::test]
async fn events_after_completion_are_ignored() {
    let (mut d, recorder, _worker) = dispatcher(Vec::new());
    assert!(d.session_mut().complete());

    let flow = d
        .dispatch(WorkerEvent::Status {
            message: "late".to_owned(),
            node: None,
        })
        .await;
    assert_eq!(flow, Flow::Ignored);
    assert!(recorder.entries().is_empty());
}

#[tokio::test]
async fn input_request_writes_correlated_response_line() {
    let (mut d, _recorder, mut worker) = dispatcher(vec![ChoiceOutcome::Accepted(vec![3])]);

    let flow = d
        .dispatch(WorkerEvent::InputRequest(InputRequest {
            key: "files".to_owned(),
            prompt: "Select".to_owned(),
            options: vec!["a.txt".to_owned(), "b.txt".to_owned()],
        }))
        .await;
    assert_eq!(flow, Flow::Continue);

    let mut line = String::new();
    worker.read_line(&mut line).await.expect("read response");
    assert_eq!(line, "{\"key\":\"files\",\"value\":[\"b.txt\"]}\n");
}

/// Two requests in a row are answered one after the other, never merged.
#[tokio::test]
async fn sequential_requests_each_get_their_own_response() {
    let (mut d, _recorder, mut worker) = dispatcher(vec![
        ChoiceOutcome::Accepted(vec![1]),
        ChoiceOutcome::Accepted(vec![0]),
    ]);

    for key in ["first", "second"] {
        d.dispatch(WorkerEvent::InputRequest(InputRequest {
            key: key.to_owned(),
            prompt: "Pick".to_owned(),
            options: vec!["x".to_owned()],
        }))
        .await;
    }

    let mut first = String::new();
    worker.read_line(&mut first).await.expect("first");
    let mut second = String::new();
    worker.read_line(&mut second).await.expect("second");

    assert_eq!(first, "{\"key\":\"first\",\"value\":[]}\n");
    assert_eq!(second, "{\"key\":\"second\",\"value\":[\"x\"]}\n");
}

/// A closed stdin is logged, not fatal; the exit path decides the outcome.
#[tokio::test]
async fn closed_stdin_does_not_terminate_session() {
    let (mut d, _recorder, worker) = dispatcher(vec![ChoiceOutcome::Dismissed]);
    drop(worker);

    let flow = d
        .dispatch(WorkerEvent::InputRequest(InputRequest {
            key: "k".to_owned(),
            prompt: "p".to_owned(),
            options: Vec::new(),
        }))
        .await;

    assert_eq!(flow, Flow::Continue);
    assert!(!d.session().is_terminated());
}
