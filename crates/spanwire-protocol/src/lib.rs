//! Protocol definitions for the spanwire trace-delivery client.
//!
//! This crate defines span identifiers, the annotation wire model, typed
//! tracing events, and the varint stream framing.

pub mod event;
pub mod framing;
pub mod packet;
pub mod span_id;

pub use event::*;
pub use framing::*;
pub use packet::*;
pub use span_id::*;
