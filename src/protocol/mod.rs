//! Worker control protocol.
//!
//! Line-delimited JSON in both directions over the worker's stdio:
//! - `codec`: [`LineFramer`](codec::LineFramer) and the bounded NDJSON codec.
//! - `event`: the closed [`WorkerEvent`](event::WorkerEvent) model and its decode boundary.
//! - `writer`: the single stdin writer for [`InputResponse`](event::InputResponse)s.

pub mod codec;
pub mod event;
pub mod writer;
