//! Parses JSON-RPC responses/notifications from either upstream source,
//! extracts base64 program-log payloads, and enqueues completed events.
//!
//! Accepts both wire shapes a JSON-RPC peer may send (see spec.md §4.2):
//! a `result` response and a `params.result` notification, each with
//! `value` as either a single log object or an array of them.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;

use crate::config::Config;
use crate::event::{Event, EventKind, EVENT_PAYLOAD_MAX};
use crate::queue::BoundedQueue;

const PROGRAM_DATA_MARKER: &str = "Program data:";

/// Decodes a base64 payload, rejecting anything over `EVENT_PAYLOAD_MAX`
/// bytes so a single oversized log line can't blow up the event's buffer.
fn decode_base64(input: &str) -> Result<Vec<u8>, ()> {
    let decoded = STANDARD.decode(input.trim()).map_err(|_| ())?;
    if decoded.len() > EVENT_PAYLOAD_MAX {
        return Err(());
    }
    Ok(decoded)
}

fn program_to_kind(program_id: &str, config: &Config) -> EventKind {
    if !config.pumpfun_program.is_empty()
        && program_id.eq_ignore_ascii_case(&config.pumpfun_program)
    {
        EventKind::Pumpfun
    } else if !config.raydium_program.is_empty()
        && program_id.eq_ignore_ascii_case(&config.raydium_program)
    {
        EventKind::Raydium
    } else {
        EventKind::Unknown
    }
}

struct ParseContext<'a> {
    config: &'a Config,
    queue: &'a BoundedQueue,
    highest_slot: u64,
}

fn enqueue_from_log(
    ctx: &mut ParseContext<'_>,
    program_id: Option<&str>,
    signature: Option<&str>,
    slot: u64,
    log_line: &str,
    event_count: &mut usize,
) {
    let Some(marker_pos) = log_line.find(PROGRAM_DATA_MARKER) else {
        return;
    };
    let after_marker = &log_line[marker_pos + PROGRAM_DATA_MARKER.len()..];
    let b64 = after_marker.trim_start();
    if b64.is_empty() {
        return;
    }

    // Absent programId defaults to pumpfun for wire compatibility — a
    // surprising choice preserved per spec.md §4.2/§9.
    let effective_program_id = program_id.unwrap_or(&ctx.config.pumpfun_program);
    let kind = program_to_kind(effective_program_id, ctx.config);

    let data = match decode_base64(b64) {
        Ok(data) => data,
        Err(()) => {
            tracing::warn!(signature = signature.unwrap_or(""), "base64 payload exceeded maximum size");
            return;
        }
    };

    let event = Event {
        kind,
        program_id: effective_program_id.to_string(),
        signature: signature.unwrap_or("").to_string(),
        slot,
        data,
    };

    match ctx.queue.push(event) {
        Ok(()) => {
            *event_count += 1;
            if slot > ctx.highest_slot {
                ctx.highest_slot = slot;
            }
        }
        Err(()) => {
            tracing::warn!(slot, "queue closed; dropping event");
        }
    }
}

fn process_logs_array(
    logs: &Value,
    program_id: Option<&str>,
    signature: Option<&str>,
    slot: u64,
    ctx: &mut ParseContext<'_>,
    event_count: &mut usize,
) {
    let Some(logs) = logs.as_array() else {
        return;
    };
    for log in logs {
        let Some(log_str) = log.as_str() else {
            continue;
        };
        enqueue_from_log(ctx, program_id, signature, slot, log_str, event_count);
    }
}

fn process_value_object(
    value: &Value,
    ctx: &mut ParseContext<'_>,
    event_count: &mut usize,
    fallback_slot: u64,
) {
    let Some(obj) = value.as_object() else {
        return;
    };

    let slot = obj
        .get("slot")
        .and_then(Value::as_u64)
        .unwrap_or(fallback_slot);
    let signature = obj.get("signature").and_then(Value::as_str);
    let program_id = obj.get("programId").and_then(Value::as_str);

    if let Some(logs) = obj.get("logs") {
        process_logs_array(logs, program_id, signature, slot, ctx, event_count);
    }
}

fn process_result_object(result: &Value, ctx: &mut ParseContext<'_>, event_count: &mut usize) {
    let context_slot = result
        .get("context")
        .and_then(|c| c.get("slot"))
        .and_then(Value::as_u64)
        .unwrap_or(0);

    match result.get("value") {
        Some(Value::Object(_)) => {
            let value = &result["value"];
            let slot = value
                .get("slot")
                .and_then(Value::as_u64)
                .unwrap_or(context_slot);
            process_value_object(value, ctx, event_count, slot);
        }
        Some(Value::Array(entries)) => {
            for entry in entries {
                process_value_object(entry, ctx, event_count, context_slot);
            }
        }
        _ => {}
    }
}

/// Parses one JSON-RPC message (response or notification), enqueues every
/// completed event found, and returns the number enqueued, or `-1` on
/// malformed top-level JSON. `highest_slot_seed` seeds the returned highest
/// slot so callers can thread their own cursor through.
pub fn handle_message(
    json: &str,
    config: &Config,
    queue: &BoundedQueue,
    highest_slot_seed: u64,
) -> (i64, u64) {
    let root: Value = match serde_json::from_str(json) {
        Ok(v) => v,
        Err(_) => {
            tracing::warn!("failed to parse JSON-RPC payload");
            return (-1, highest_slot_seed);
        }
    };

    let mut ctx = ParseContext {
        config,
        queue,
        highest_slot: highest_slot_seed,
    };
    let mut event_count = 0usize;

    if let Some(result) = root.get("result") {
        if result.is_object() {
            process_result_object(result, &mut ctx, &mut event_count);
        } else if let Some(entries) = result.as_array() {
            for entry in entries {
                process_value_object(entry, &mut ctx, &mut event_count, 0);
            }
        }
    } else if let Some(params_result) = root.get("params").and_then(|p| p.get("result")) {
        if params_result.is_object() {
            process_result_object(params_result, &mut ctx, &mut event_count);
        }
    }

    (event_count as i64, ctx.highest_slot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Popped;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.pumpfun_program = "P1".to_string();
        config.raydium_program = "R1".to_string();
        config
    }

    #[test]
    fn s1_http_happy_path() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let json = r#"{"result":{"context":{"slot":100},"value":[{"logs":["Program data: YWJj"],"signature":"sigA","programId":"P1"}]}}"#;

        let (count, highest_slot) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 1);
        assert_eq!(highest_slot, 100);

        match queue.pop() {
            Popped::Event(e) => {
                assert_eq!(e.kind, EventKind::Pumpfun);
                assert_eq!(e.signature, "sigA");
                assert_eq!(e.slot, 100);
                assert_eq!(e.data, vec![0x61, 0x62, 0x63]);
                assert_eq!(e.data_len(), 3);
            }
            Popped::EndOfStream => panic!("expected an event"),
        }
    }

    #[test]
    fn s2_malformed_json_returns_negative_one() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let (count, _) = handle_message("{not-json", &config, &queue, 0);
        assert_eq!(count, -1);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn s3_unknown_program_still_enqueues_as_unknown() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let json = r#"{"result":{"context":{"slot":5},"value":{"logs":["Program data: YWJj"],"signature":"sigZ","programId":"Z9"}}}"#;

        let (count, _) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 1);
        match queue.pop() {
            Popped::Event(e) => assert_eq!(e.kind, EventKind::Unknown),
            Popped::EndOfStream => panic!("expected an event"),
        }
    }

    #[test]
    fn notification_shape_is_accepted() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let json = r#"{"params":{"result":{"context":{"slot":42},"value":{"logs":["Program data: YWJj"],"signature":"sigN","programId":"R1"}}}}"#;

        let (count, highest_slot) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 1);
        assert_eq!(highest_slot, 42);
    }

    #[test]
    fn absent_program_id_defaults_to_pumpfun() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let json = r#"{"result":{"context":{"slot":1},"value":{"logs":["Program data: YWJj"],"signature":"sigD"}}}"#;

        handle_message(json, &config, &queue, 0);
        match queue.pop() {
            Popped::Event(e) => assert_eq!(e.kind, EventKind::Pumpfun),
            Popped::EndOfStream => panic!("expected an event"),
        }
    }

    #[test]
    fn malformed_sub_tree_is_skipped_not_fatal() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        // `logs` is a string, not an array — must be silently skipped.
        let json = r#"{"result":{"context":{"slot":1},"value":{"logs":"not-an-array","signature":"sigX","programId":"P1"}}}"#;

        let (count, _) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 0);
    }

    #[test]
    fn non_string_log_entries_are_skipped() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        let json = r#"{"result":{"context":{"slot":1},"value":{"logs":[42,"Program data: YWJj"],"signature":"sigY","programId":"P1"}}}"#;

        let (count, _) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 1);
    }

    #[test]
    fn base64_exactly_4096_bytes_succeeds() {
        let raw = vec![0u8; EVENT_PAYLOAD_MAX];
        let encoded = STANDARD.encode(&raw);
        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded.len(), EVENT_PAYLOAD_MAX);
    }

    #[test]
    fn base64_4097_bytes_fails() {
        let raw = vec![0u8; EVENT_PAYLOAD_MAX + 1];
        let encoded = STANDARD.encode(&raw);
        assert!(decode_base64(&encoded).is_err());
    }

    #[test]
    fn queue_closed_drops_event_without_panicking() {
        let config = test_config();
        let queue = BoundedQueue::new(8);
        queue.close();
        let json = r#"{"result":{"context":{"slot":1},"value":{"logs":["Program data: YWJj"],"signature":"sigC","programId":"P1"}}}"#;

        let (count, _) = handle_message(json, &config, &queue, 0);
        assert_eq!(count, 0);
    }
}
