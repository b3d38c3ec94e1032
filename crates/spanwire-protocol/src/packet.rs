use serde::{Deserialize, Serialize};

use crate::span_id::SpanId;

/// A key/value fact attached to a span. Order within a packet is
/// significant and preserved as produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub key: String,
    pub value: String,
}

impl Annotation {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// One delivery unit: a span's identifiers plus the annotations ready to
/// ship for it. This is the message the wire framer delimits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPacket {
    #[serde(rename = "spanid")]
    pub span_id: SpanId,
    #[serde(rename = "annotation")]
    pub annotations: Vec<Annotation>,
}
