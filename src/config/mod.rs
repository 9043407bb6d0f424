//! Configuration management
//!
//! Handles loading, validation, and merging of configuration from:
//! - TOML files
//! - Environment variables (through the CLI)
//! - CLI arguments

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::channel::pump::PumpConfig;
use crate::cliprdr::pdu::PDU_HEADER_SIZE;
use crate::cliprdr::{GeneralFlags, SessionConfig};

pub mod types;

pub use types::{ChannelConfig, LogFormat, LoggingConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Clipboard channel configuration
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration
    pub fn default_config() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let channel = &self.channel;

        if channel.chunk_size == 0 {
            anyhow::bail!("Invalid config: chunk_size must be greater than 0");
        }

        if channel.max_message_size < PDU_HEADER_SIZE {
            anyhow::bail!(
                "Invalid config: max_message_size ({}) is smaller than a PDU header ({})",
                channel.max_message_size,
                PDU_HEADER_SIZE
            );
        }

        if channel.max_chunks_per_pump == 0 {
            anyhow::bail!("Invalid config: max_chunks_per_pump must be greater than 0");
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level in config: {}", self.logging.level),
        }

        Ok(())
    }

    /// Override config with CLI arguments
    pub fn with_overrides(
        mut self,
        chunk_size: Option<usize>,
        log_format: Option<LogFormat>,
        log_file: Option<std::path::PathBuf>,
    ) -> Self {
        if let Some(chunk_size) = chunk_size {
            self.channel.chunk_size = chunk_size;
        }
        if let Some(format) = log_format {
            self.logging.format = format;
        }
        if log_file.is_some() {
            self.logging.log_file = log_file;
        }

        self
    }

    /// Protocol session settings
    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            announce_capabilities: self.channel.announce_capabilities,
            client_general_flags: GeneralFlags::from_bits(self.channel.client_general_flags),
            max_early_messages: self.channel.max_early_messages,
        }
    }

    /// Pump limits
    pub fn to_pump_config(&self) -> PumpConfig {
        PumpConfig {
            max_message_size: self.channel.max_message_size,
            max_chunks_per_pump: self.channel.max_chunks_per_pump,
        }
    }
}
