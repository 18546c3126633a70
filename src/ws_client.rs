//! WebSocket client (C4): maintains a `logsSubscribe` connection with
//! exponential backoff reconnect, handing each received text frame to the
//! parser. Runs on its own thread; `tungstenite`'s blocking socket means
//! a read blocks only this thread, matching spec.md §5's thread-per-worker
//! model.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tungstenite::{connect, Message};

use crate::config::Config;
use crate::metrics::Metrics;
use crate::parser;
use crate::queue::BoundedQueue;

fn build_subscribe_message(config: &Config) -> String {
    let mentions = config.program_ids();
    let mentions = if mentions.is_empty() {
        vec![config.pumpfun_program.as_str()]
    } else {
        mentions
    };
    json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "logsSubscribe",
        "params": [{ "mentions": mentions }, { "commitment": "confirmed" }],
    })
    .to_string()
}

/// How a session ended, so the caller knows whether to count a reconnect.
enum SessionEnd {
    /// The peer sent a close frame; a reconnect will follow.
    PeerClosed,
    /// `running` was cleared; the process is shutting down, not reconnecting.
    Shutdown,
}

/// Runs a single connect-subscribe-receive session. Returns once the
/// connection drops or `running` is cleared, so the caller can apply
/// backoff and retry. Resets `backoff_ms` to the configured floor as soon
/// as the connection is established, per spec.md §4.4/§3.
fn run_session(
    config: &Config,
    queue: &BoundedQueue,
    metrics: &Metrics,
    running: &AtomicBool,
    highest_slot: &mut u64,
    backoff_ms: &mut u64,
) -> Result<SessionEnd, tungstenite::Error> {
    let (mut socket, _response) = connect(config.wss_endpoint.as_str())?;
    *backoff_ms = config.ws_backoff_ms as u64;
    tracing::info!(endpoint = %config.wss_endpoint, "WebSocket connected");

    let subscribe = build_subscribe_message(config);
    socket.send(Message::Text(subscribe))?;

    while running.load(Ordering::Relaxed) {
        let message = socket.read()?;
        match message {
            Message::Text(text) => {
                metrics.record_bytes(text.len() as u64);
                let (count, slot) =
                    parser::handle_message(&text, config, queue, *highest_slot);
                if count > 0 {
                    *highest_slot = slot;
                    for _ in 0..count {
                        metrics.record_event();
                    }
                }
            }
            Message::Binary(data) => {
                metrics.record_bytes(data.len() as u64);
            }
            Message::Ping(payload) => {
                socket.send(Message::Pong(payload))?;
            }
            Message::Pong(_) => {}
            Message::Close(frame) => {
                tracing::info!(?frame, "WebSocket closed by peer");
                return Ok(SessionEnd::PeerClosed);
            }
            Message::Frame(_) => {}
        }
    }
    let _ = socket.close(None);
    Ok(SessionEnd::Shutdown)
}

/// Runs the reconnect loop until `running` is cleared.
pub fn run(config: Arc<Config>, queue: Arc<BoundedQueue>, metrics: Arc<Metrics>, running: Arc<AtomicBool>) {
    let mut backoff_ms = config.ws_backoff_ms as u64;
    let mut highest_slot: u64 = 0;

    while running.load(Ordering::Relaxed) {
        match run_session(&config, &queue, &metrics, &running, &mut highest_slot, &mut backoff_ms) {
            Ok(SessionEnd::PeerClosed) => {
                metrics.record_ws_reconnect();
            }
            Ok(SessionEnd::Shutdown) => {}
            Err(err) => {
                metrics.record_ws_reconnect();
                tracing::warn!(error = %err, backoff_ms, "WebSocket connection error, retrying");
            }
        }

        if !running.load(Ordering::Relaxed) {
            break;
        }
        std::thread::sleep(Duration::from_millis(backoff_ms));
        backoff_ms = (backoff_ms * 2).min(config.ws_backoff_max_ms as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.pumpfun_program = "P1".to_string();
        config.raydium_program = "R1".to_string();
        config
    }

    #[test]
    fn subscribe_message_includes_configured_programs() {
        let config = test_config();
        let msg = build_subscribe_message(&config);
        assert!(msg.contains("logsSubscribe"));
        assert!(msg.contains("P1"));
        assert!(msg.contains("R1"));
        assert!(msg.contains("confirmed"));
    }

    #[test]
    fn subscribe_falls_back_to_pumpfun_when_both_unset() {
        let mut config = test_config();
        config.pumpfun_program.clear();
        config.raydium_program.clear();
        let msg = build_subscribe_message(&config);
        assert!(msg.contains(r#""mentions":[""]"#));
    }

    #[test]
    fn backoff_doubles_and_clamps() {
        let mut backoff = 1000u64;
        let max = 8000u64;
        for expected in [2000, 4000, 8000, 8000] {
            backoff = (backoff * 2).min(max);
            assert_eq!(backoff, expected);
        }
    }
}
