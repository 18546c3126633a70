//! Configuration loading: built-in defaults, then `.env`-style file,
//! then process-environment overrides (file/process order matches
//! spec.md §6: "Process environment overrides file").

use std::collections::HashMap;
use std::fmt;
use std::fs;

use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMode {
    Ws,
    Http,
    Dual,
}

impl fmt::Display for RpcMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RpcMode::Ws => "ws",
            RpcMode::Http => "http",
            RpcMode::Dual => "dual",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for RpcMode {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ws" => Ok(RpcMode::Ws),
            "http" => Ok(RpcMode::Http),
            "dual" => Ok(RpcMode::Dual),
            other => Err(IngestError::ConfigInvalid(format!(
                "unrecognized mode '{other}', expected ws|http|dual"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_endpoint: String,
    pub wss_endpoint: String,
    pub rpc_api_key: String,
    pub rpc_mode: RpcMode,
    pub poll_interval_ms: u32,
    pub ws_backoff_ms: u32,
    pub ws_backoff_max_ms: u32,
    pub queue_capacity: usize,
    pub batch_size: u32,
    pub rate_limit_rps: u32,
    pub log_color: bool,
    pub log_level: LogLevel,
    pub pumpfun_program: String,
    pub raydium_program: String,
    pub pumpfun_table: String,
    pub raydium_table: String,
    pub pg_conninfo: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rpc_endpoint: "https://mainnet.helius-rpc.com".to_string(),
            wss_endpoint: "wss://mainnet.helius-rpc.com".to_string(),
            rpc_api_key: String::new(),
            rpc_mode: RpcMode::Ws,
            poll_interval_ms: 1000,
            ws_backoff_ms: 1000,
            ws_backoff_max_ms: 60000,
            queue_capacity: 1024,
            batch_size: 20,
            rate_limit_rps: 10,
            log_color: true,
            log_level: LogLevel::Info,
            pumpfun_program: "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P".to_string(),
            raydium_program: "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8".to_string(),
            pumpfun_table: "pumpfun_trades".to_string(),
            raydium_table: "raydium_swaps".to_string(),
            pg_conninfo: "host=127.0.0.1 port=5432 dbname=yurei user=yurei password=secret"
                .to_string(),
        }
    }
}

const ENV_KEYS: &[&str] = &[
    "RPC_ENDPOINT",
    "WSS_ENDPOINT",
    "RPC_API_KEY",
    "RPC_MODE",
    "POLL_INTERVAL_MS",
    "WS_BACKOFF_MS",
    "WS_BACKOFF_MAX_MS",
    "QUEUE_CAPACITY",
    "BATCH_SIZE",
    "RATE_LIMIT",
    "LOG_COLOR",
    "LOG_LEVEL",
    "PUMPFUN_PROGRAM",
    "RAYDIUM_PROGRAM",
    "PUMPFUN_TABLE",
    "RAYDIUM_TABLE",
    "PG_CONNINFO",
];

impl Config {
    /// Load defaults, then apply `path` (an `.env`-style file, if present),
    /// then process-environment overrides.
    pub fn load(path: &str) -> Result<Config, IngestError> {
        let mut config = Config::default();

        if let Ok(contents) = fs::read_to_string(path) {
            let file_values = parse_env_file(&contents);
            for (key, value) in &file_values {
                apply_key_value(&mut config, key, value)?;
            }
        }

        for key in ENV_KEYS {
            if let Ok(value) = std::env::var(key) {
                if !value.is_empty() {
                    apply_key_value(&mut config, key, &value)?;
                }
            }
        }

        Ok(config)
    }

    pub fn program_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        if !self.pumpfun_program.is_empty() {
            ids.push(self.pumpfun_program.as_str());
        }
        if !self.raydium_program.is_empty() {
            ids.push(self.raydium_program.as_str());
        }
        ids
    }
}

/// Parses a shell-style `KEY=VALUE` file: `#` line comments, blank lines
/// skipped, optional matching single/double quotes stripped from values.
fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut values = HashMap::new();
    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };
        let key = key.trim().to_string();
        let value = strip_quotes(value.trim());
        values.insert(key, value.to_string());
    }
    values
}

fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn apply_key_value(config: &mut Config, key: &str, value: &str) -> Result<(), IngestError> {
    // Accept both the bare keys used in ENV_KEYS and the YUREI_-prefixed
    // spelling carried over from the original env-file convention.
    let key = key.strip_prefix("YUREI_").unwrap_or(key);

    match key.to_ascii_uppercase().as_str() {
        "RPC_ENDPOINT" => config.rpc_endpoint = value.to_string(),
        "WSS_ENDPOINT" => config.wss_endpoint = value.to_string(),
        "RPC_API_KEY" => config.rpc_api_key = value.to_string(),
        "RPC_MODE" => config.rpc_mode = value.parse()?,
        "POLL_INTERVAL_MS" => config.poll_interval_ms = parse_u32(key, value)?,
        "WS_BACKOFF_MS" => config.ws_backoff_ms = parse_u32(key, value)?,
        "WS_BACKOFF_MAX_MS" => config.ws_backoff_max_ms = parse_u32(key, value)?,
        "QUEUE_CAPACITY" => config.queue_capacity = parse_usize(key, value)?,
        "BATCH_SIZE" => config.batch_size = parse_u32(key, value)?,
        "RATE_LIMIT" | "RATE_LIMIT_RPS" => config.rate_limit_rps = parse_u32(key, value)?,
        "LOG_COLOR" => {
            config.log_color = matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
        }
        "LOG_LEVEL" => {
            config.log_level = match value.to_ascii_lowercase().as_str() {
                "trace" => LogLevel::Trace,
                "debug" => LogLevel::Debug,
                "info" => LogLevel::Info,
                "warn" => LogLevel::Warn,
                "error" => LogLevel::Error,
                other => {
                    return Err(IngestError::ConfigInvalid(format!(
                        "unrecognized log level '{other}'"
                    )))
                }
            }
        }
        "PUMPFUN_PROGRAM" => config.pumpfun_program = value.to_string(),
        "RAYDIUM_PROGRAM" => config.raydium_program = value.to_string(),
        "PUMPFUN_TABLE" => config.pumpfun_table = value.to_string(),
        "RAYDIUM_TABLE" => config.raydium_table = value.to_string(),
        "PG_CONNINFO" | "PG_CONN" => config.pg_conninfo = value.to_string(),
        _ => {} // unrecognized keys are ignored, matching the original's silent skip
    }
    Ok(())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, IngestError> {
    value
        .parse()
        .map_err(|_| IngestError::ConfigInvalid(format!("{key} must be a non-negative integer")))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, IngestError> {
    value
        .parse()
        .map_err(|_| IngestError::ConfigInvalid(format!("{key} must be a non-negative integer")))
}
