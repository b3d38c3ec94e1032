//! Typed tracing events and their translation into wire annotations.
//!
//! An event marshals to one annotation per declared field, in declared
//! order, followed by a schema-marker annotation the collector side uses
//! to pick the right decoder for the preceding fields.

use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::packet::Annotation;

/// Key prefix of the schema-marker annotation appended after an event's
/// fields.
pub const SCHEMA_PREFIX: &str = "_schema:";

/// Format a timestamp as an RFC 3339 / UTC-offset string, the
/// cross-process representation used by every timestamped field.
pub fn time_string(t: OffsetDateTime) -> String {
    t.to_offset(UtcOffset::UTC)
        .format(&Rfc3339)
        .expect("RFC 3339 formatting of a UTC timestamp cannot fail")
}

/// A record of something that occurred during a span.
#[derive(Clone, Debug)]
pub enum Event {
    /// Sets the span's name.
    SpanName { name: String },
    /// A human-readable message.
    Msg { msg: String },
    /// A human-readable message stamped with its creation time.
    Log { msg: String, time: OffsetDateTime },
    /// The time range the span covers.
    Timespan {
        start: OffsetDateTime,
        end: OffsetDateTime,
    },
    /// An SQL query with client-side send and receive times and an
    /// optional user tag.
    Sql {
        sql: String,
        tag: String,
        client_send: OffsetDateTime,
        client_recv: OffsetDateTime,
    },
}

impl Event {
    /// A log event stamped with the current time.
    pub fn log(msg: impl Into<String>) -> Self {
        Event::Log {
            msg: msg.into(),
            time: OffsetDateTime::now_utc(),
        }
    }

    /// An SQL event sent at `client_send`, received just now, untagged.
    pub fn sql(sql: impl Into<String>, client_send: OffsetDateTime) -> Self {
        Event::Sql {
            sql: sql.into(),
            tag: String::new(),
            client_send,
            client_recv: OffsetDateTime::now_utc(),
        }
    }

    /// Schema name the collector uses to interpret this event's fields.
    pub fn schema(&self) -> &'static str {
        match self {
            Event::SpanName { .. } => "name",
            Event::Msg { .. } => "msg",
            Event::Log { .. } => "log",
            Event::Timespan { .. } => "timespan",
            Event::Sql { .. } => "SQL",
        }
    }

    /// Field annotations in declared order, without the schema marker.
    fn fields(&self) -> Vec<Annotation> {
        match self {
            Event::SpanName { name } => vec![Annotation::new("Name", name.clone())],
            Event::Msg { msg } => vec![Annotation::new("Msg", msg.clone())],
            Event::Log { msg, time } => vec![
                Annotation::new("Msg", msg.clone()),
                Annotation::new("Time", time_string(*time)),
            ],
            Event::Timespan { start, end } => vec![
                Annotation::new("Span.Start", time_string(*start)),
                Annotation::new("Span.End", time_string(*end)),
            ],
            Event::Sql {
                sql,
                tag,
                client_send,
                client_recv,
            } => vec![
                Annotation::new("SQL", sql.clone()),
                Annotation::new("Tag", tag.clone()),
                Annotation::new("ClientSend", time_string(*client_send)),
                Annotation::new("ClientRecv", time_string(*client_recv)),
            ],
        }
    }
}

/// Marshal an event into annotations: one per field, then the schema
/// marker, always last.
pub fn marshal_event(event: &Event) -> Vec<Annotation> {
    let mut annotations = event.fields();
    annotations.push(Annotation::new(
        format!("{}{}", SCHEMA_PREFIX, event.schema()),
        "",
    ));
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(annotations: &[Annotation]) -> Vec<&str> {
        annotations.iter().map(|a| a.key.as_str()).collect()
    }

    fn epoch(seconds: i64) -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(seconds).unwrap()
    }

    #[test]
    fn time_string_is_rfc3339_utc() {
        assert_eq!(time_string(epoch(1)), "1970-01-01T00:00:01Z");
        assert_eq!(time_string(epoch(1_400_000_000)), "2014-05-13T16:53:20Z");
    }

    #[test]
    fn span_name_marshals_to_name_and_marker() {
        let annotations = marshal_event(&Event::SpanName {
            name: "test".into(),
        });
        assert_eq!(
            annotations,
            vec![
                Annotation::new("Name", "test"),
                Annotation::new("_schema:name", ""),
            ]
        );
    }

    #[test]
    fn msg_marshals_to_msg_and_marker() {
        let annotations = marshal_event(&Event::Msg { msg: "hello".into() });
        assert_eq!(
            annotations,
            vec![
                Annotation::new("Msg", "hello"),
                Annotation::new("_schema:msg", ""),
            ]
        );
    }

    #[test]
    fn log_marshals_msg_then_time() {
        let annotations = marshal_event(&Event::Log {
            msg: "m".into(),
            time: epoch(1),
        });
        assert_eq!(
            annotations,
            vec![
                Annotation::new("Msg", "m"),
                Annotation::new("Time", "1970-01-01T00:00:01Z"),
                Annotation::new("_schema:log", ""),
            ]
        );
    }

    #[test]
    fn timespan_marshals_start_then_end() {
        let annotations = marshal_event(&Event::Timespan {
            start: epoch(1),
            end: epoch(2),
        });
        assert_eq!(keys(&annotations), ["Span.Start", "Span.End", "_schema:timespan"]);
        assert_eq!(annotations[0].value, "1970-01-01T00:00:01Z");
        assert_eq!(annotations[1].value, "1970-01-01T00:00:02Z");
    }

    #[test]
    fn sql_marshals_declared_field_order() {
        let annotations = marshal_event(&Event::Sql {
            sql: "SELECT 1".into(),
            tag: "t".into(),
            client_send: epoch(1),
            client_recv: epoch(2),
        });
        assert_eq!(
            keys(&annotations),
            ["SQL", "Tag", "ClientSend", "ClientRecv", "_schema:SQL"]
        );
    }

    #[test]
    fn marker_is_always_last_with_empty_value() {
        let events = [
            Event::SpanName { name: "n".into() },
            Event::Msg { msg: "m".into() },
            Event::log("m"),
            Event::Timespan {
                start: epoch(0),
                end: epoch(1),
            },
            Event::sql("SELECT 1", epoch(0)),
        ];
        for event in &events {
            let annotations = marshal_event(event);
            let marker = annotations.last().unwrap();
            assert_eq!(marker.key, format!("_schema:{}", event.schema()));
            assert_eq!(marker.value, "");
        }
    }
}
