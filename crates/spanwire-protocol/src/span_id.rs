use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Generate a random 64-bit identifier from the OS secure RNG.
///
/// No uniqueness check is made; the collision probability at realistic
/// trace volume is accepted as negligible.
pub fn generate_id() -> u64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("failed to generate random span ID");
    u64::from_le_bytes(bytes)
}

/// Identifies one span: the trace it belongs to, the span itself, and its
/// parent within that trace. A `parent` of zero marks a root span.
#[derive(Clone, Copy, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SpanId {
    pub trace: u64,
    pub span: u64,
    pub parent: u64,
}

impl SpanId {
    /// Create an ID for the root span of a new trace.
    pub fn new_root() -> Self {
        Self {
            trace: generate_id(),
            span: generate_id(),
            parent: 0,
        }
    }

    /// Create an ID for a child of this span, in the same trace.
    pub fn new_child(&self) -> Self {
        Self {
            trace: self.trace,
            span: generate_id(),
            parent: self.span,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent == 0
    }
}

impl fmt::Display for SpanId {
    /// Formats as `trace/span` for root spans and `trace/span/parent`
    /// otherwise, all lowercase hex.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            write!(f, "{:x}/{:x}", self.trace, self.span)
        } else {
            write!(f, "{:x}/{:x}/{:x}", self.trace, self.span, self.parent)
        }
    }
}

impl fmt::Debug for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SpanId({})", self)
    }
}

impl FromStr for SpanId {
    type Err = ParseSpanIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(ParseSpanIdError::InvalidFormat);
        }

        let field = |p: &str| u64::from_str_radix(p, 16).map_err(|_| ParseSpanIdError::InvalidHex);

        Ok(Self {
            trace: field(parts[0])?,
            span: field(parts[1])?,
            parent: match parts.get(2) {
                Some(p) => field(p)?,
                None => 0,
            },
        })
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseSpanIdError {
    #[error("span ID must have 2 or 3 '/'-separated parts")]
    InvalidFormat,
    #[error("invalid hex encoding")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_do_not_collide() {
        let ids: HashSet<u64> = (0..1024).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1024);
    }

    #[test]
    fn root_and_child_relationships() {
        let root = SpanId::new_root();
        assert!(root.is_root());
        assert_eq!(root.parent, 0);

        let child = root.new_child();
        assert!(!child.is_root());
        assert_eq!(child.trace, root.trace);
        assert_eq!(child.parent, root.span);
        assert_ne!(child.span, root.span);
    }

    #[test]
    fn display_and_parse_round_trip() {
        let id = SpanId {
            trace: 0x1f,
            span: 0x2a,
            parent: 0x3b,
        };
        assert_eq!(id.to_string(), "1f/2a/3b");
        assert_eq!("1f/2a/3b".parse::<SpanId>().unwrap(), id);

        let root = SpanId {
            trace: 1,
            span: 2,
            parent: 0,
        };
        assert_eq!(root.to_string(), "1/2");
        assert_eq!("1/2".parse::<SpanId>().unwrap(), root);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert_eq!(
            "1".parse::<SpanId>(),
            Err(ParseSpanIdError::InvalidFormat)
        );
        assert_eq!(
            "1/2/3/4".parse::<SpanId>(),
            Err(ParseSpanIdError::InvalidFormat)
        );
        assert_eq!(
            "xyz/2".parse::<SpanId>(),
            Err(ParseSpanIdError::InvalidHex)
        );
    }
}
