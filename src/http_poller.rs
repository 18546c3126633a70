//! HTTP poller (C3): periodically calls `getLogs` over JSON-RPC and hands
//! the response to the parser. Runs on its own thread; every call is
//! synchronous and blocks that thread only.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::json;

use crate::config::Config;
use crate::metrics::Metrics;
use crate::parser;
use crate::queue::BoundedQueue;
use crate::rate_limiter::RateLimiter;

/// Mirrors the teacher's `RpcRequest` shape in `network_submitter.rs`.
#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'a str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

fn build_mentions(config: &Config) -> Vec<&str> {
    let ids = config.program_ids();
    if ids.is_empty() {
        vec![config.pumpfun_program.as_str()]
    } else {
        ids
    }
}

fn build_payload(config: &Config, last_slot: u64) -> serde_json::Value {
    let mentions = build_mentions(config);
    let mut filter = json!({ "mentions": mentions, "limit": 50 });
    if last_slot > 0 {
        filter["startSlot"] = json!(last_slot);
    }
    let request = RpcRequest {
        jsonrpc: "2.0",
        id: 1,
        method: "getLogs",
        params: json!([filter, { "commitment": "confirmed" }]),
    };
    serde_json::to_value(&request).expect("RpcRequest always serializes")
}

/// Runs the poll loop until `running` is cleared. Intended to be the body
/// of a dedicated `std::thread`.
pub fn run(
    config: Arc<Config>,
    queue: Arc<BoundedQueue>,
    metrics: Arc<Metrics>,
    rate_limiter: Arc<RateLimiter>,
    running: Arc<AtomicBool>,
) {
    let client = match reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            tracing::error!(error = %err, "failed to build HTTP client; poller exiting");
            return;
        }
    };

    let mut last_slot: u64 = 0;
    let mut url = config.rpc_endpoint.clone();
    if !config.rpc_api_key.is_empty() {
        let separator = if url.contains('?') { '&' } else { '?' };
        url = format!("{url}{separator}api-key={}", config.rpc_api_key);
    }

    while running.load(Ordering::Relaxed) {
        rate_limiter.wait();

        let payload = build_payload(&config, last_slot);
        let start = Instant::now();
        let response = client.post(&url).json(&payload).send();
        let latency_us = start.elapsed().as_micros() as u64;

        match response.and_then(|r| r.error_for_status()).and_then(|r| r.text()) {
            Ok(body) => {
                metrics.record_request(true, latency_us);
                metrics.record_bytes(body.len() as u64);
                let (count, highest_slot) =
                    parser::handle_message(&body, &config, &queue, last_slot);
                if count > 0 && highest_slot > last_slot {
                    last_slot = highest_slot;
                }
                if count > 0 {
                    for _ in 0..count {
                        metrics.record_event();
                    }
                }
            }
            Err(err) => {
                metrics.record_request(false, latency_us);
                tracing::warn!(error = %err, "HTTP poll failed");
            }
        }

        std::thread::sleep(Duration::from_millis(config.poll_interval_ms as u64));
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
    fn payload_omits_start_slot_on_first_poll() {
        let config = test_config();
        let payload = build_payload(&config, 0);
        assert!(payload["params"][0].get("startSlot").is_none());
        assert_eq!(payload["params"][0]["mentions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn payload_includes_start_slot_once_known() {
        let config = test_config();
        let payload = build_payload(&config, 555);
        assert_eq!(payload["params"][0]["startSlot"], 555);
    }

    #[test]
    fn mentions_falls_back_to_pumpfun_when_both_empty() {
        let mut config = test_config();
        config.pumpfun_program.clear();
        config.raydium_program.clear();
        let mentions = build_mentions(&config);
        assert_eq!(mentions, vec![""]);
    }
}
