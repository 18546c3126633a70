//! The unit flowing through the ingestion pipeline.

use std::fmt;

/// Maximum size of a decoded program-log payload.
pub const EVENT_PAYLOAD_MAX: usize = 4096;
/// Maximum length of a `program_id` string.
pub const PROGRAM_ID_MAX: usize = 63;
/// Maximum length of a transaction `signature` string.
pub const SIGNATURE_MAX: usize = 127;

/// Which configured on-chain program an event's logs matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventKind {
    #[default]
    Unknown,
    Pumpfun,
    Raydium,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::Unknown => "unknown",
            EventKind::Pumpfun => "pumpfun",
            EventKind::Raydium => "raydium",
        };
        f.write_str(s)
    }
}

/// A decoded program-log record, value-typed once enqueued.
#[derive(Debug, Clone, Default)]
pub struct Event {
    pub kind: EventKind,
    pub program_id: String,
    pub signature: String,
    pub slot: u64,
    pub data: Vec<u8>,
}

impl Event {
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// An event is complete when it carries a non-empty payload and a
    /// recognized program kind.
    pub fn is_complete(&self) -> bool {
        !self.data.is_empty() && self.kind != EventKind::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_without_payload() {
        let event = Event {
            kind: EventKind::Pumpfun,
            ..Default::default()
        };
        assert!(!event.is_complete());
    }

    #[test]
    fn incomplete_when_unknown_kind() {
        let event = Event {
            kind: EventKind::Unknown,
            data: vec![1, 2, 3],
            ..Default::default()
        };
        assert!(!event.is_complete());
    }

    #[test]
    fn complete_with_payload_and_kind() {
        let event = Event {
            kind: EventKind::Raydium,
            data: vec![1, 2, 3],
            ..Default::default()
        };
        assert!(event.is_complete());
        assert_eq!(event.data_len(), 3);
    }
}
