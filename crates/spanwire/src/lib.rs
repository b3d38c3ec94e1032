//! Client library for shipping trace spans to a remote collector.
//!
//! # Example
//!
//! ```no_run
//! use spanwire::{marshal_event, Collector, Event, RemoteCollector, SpanId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let collector = RemoteCollector::connect("localhost:7701");
//!
//!     let span = SpanId::new_root();
//!     collector.collect(span, marshal_event(&Event::Msg { msg: "hello".into() }));
//!
//!     // Packets are batched and flushed by a background task; the call
//!     // above never blocks and never fails.
//! }
//! ```

mod collector;
mod recorder;

pub use spanwire_protocol::*;
pub use collector::{Collector, CollectorConfig, RemoteCollector};
pub use recorder::{RawSpan, Recorder, SpanContext};
