//! Bridges a generic span-recording interface onto a [`Collector`].
//!
//! The embedding application's tracer decides sampling and carries the
//! trace/span/parent identifiers, tags, and baggage; this adapter turns
//! one finished span into a single `collect` call and keeps the wire
//! schema out of instrumentation call sites.

use std::collections::BTreeMap;
use std::time::Duration;

use spanwire_protocol::{marshal_event, Annotation, Event, SpanId};
use time::OffsetDateTime;

use crate::collector::Collector;

/// Identifiers and propagation state handed down by the embedding tracer.
#[derive(Clone, Debug)]
pub struct SpanContext {
    pub trace_id: u64,
    pub span_id: u64,
    /// Zero for a root span.
    pub parent_span_id: u64,
    /// Upstream sampling decision; unsampled spans are never recorded.
    pub sampled: bool,
    /// Key/value pairs propagated across process boundaries with the
    /// trace.
    pub baggage: BTreeMap<String, String>,
}

/// A finished span as produced by the embedding tracer.
#[derive(Clone, Debug)]
pub struct RawSpan {
    pub context: SpanContext,
    pub operation_name: String,
    pub start_time: OffsetDateTime,
    pub duration: Duration,
    pub tags: BTreeMap<String, String>,
}

/// Translates finished spans into collection packets.
pub struct Recorder<C: Collector> {
    collector: C,
}

impl<C: Collector> Recorder<C> {
    pub fn new(collector: C) -> Self {
        Self { collector }
    }

    /// Record a finished span: a span-name event, a timespan event, one
    /// annotation per tag, and one per baggage item, delivered as a
    /// single packet.
    ///
    /// Unsampled spans are discarded with no side effects.
    pub fn record_span(&self, span: &RawSpan) {
        if !span.context.sampled {
            return;
        }

        let span_id = SpanId {
            trace: span.context.trace_id,
            span: span.context.span_id,
            parent: span.context.parent_span_id,
        };

        let mut annotations = marshal_event(&Event::SpanName {
            name: span.operation_name.clone(),
        });
        annotations.extend(marshal_event(&Event::Timespan {
            start: span.start_time,
            end: span.start_time + span.duration,
        }));
        for (key, value) in &span.tags {
            annotations.push(Annotation::new(key.clone(), value.clone()));
        }
        for (key, value) in &span.context.baggage {
            annotations.push(Annotation::new(key.clone(), value.clone()));
        }

        self.collector.collect(span_id, annotations);
    }
}
