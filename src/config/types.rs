//! Configuration type definitions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::channel::chunk::CHANNEL_CHUNK_LENGTH;
use crate::channel::pump::{DEFAULT_MAX_CHUNKS_PER_PUMP, DEFAULT_MAX_MESSAGE_SIZE};

/// Clipboard channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Largest reassembled message in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Outbound chunk length for chunking transports
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Capacity of each event queue (0 = unbounded)
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Chunks read per pump call
    #[serde(default = "default_max_chunks_per_pump")]
    pub max_chunks_per_pump: usize,

    /// Send our Capabilities PDU when the server reports MonitorReady
    #[serde(default = "default_true")]
    pub announce_capabilities: bool,

    /// General capability flags we advertise (passed through as-is)
    #[serde(default)]
    pub client_general_flags: u32,

    /// PDUs held back while the handshake is incomplete
    #[serde(default = "default_max_early_messages")]
    pub max_early_messages: usize,
}

fn default_max_message_size() -> usize {
    DEFAULT_MAX_MESSAGE_SIZE
}

fn default_chunk_size() -> usize {
    CHANNEL_CHUNK_LENGTH
}

fn default_event_queue_capacity() -> usize {
    256
}

fn default_max_chunks_per_pump() -> usize {
    DEFAULT_MAX_CHUNKS_PER_PUMP
}

fn default_true() -> bool {
    true
}

fn default_max_early_messages() -> usize {
    32
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            chunk_size: default_chunk_size(),
            event_queue_capacity: default_event_queue_capacity(),
            max_chunks_per_pump: default_max_chunks_per_pump(),
            announce_capabilities: true,
            client_general_flags: 0,
            max_early_messages: default_max_early_messages(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// Single-line output
    Compact,
    /// JSON lines
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("Invalid log format: {} (expected pretty, compact or json)", other)),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console output format
    #[serde(default)]
    pub format: LogFormat,

    /// Also write logs to this file
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_file: None,
        }
    }
}
