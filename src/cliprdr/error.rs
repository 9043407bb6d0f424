//! CLIPRDR Error Types
//!
//! Errors raised while decoding clipboard PDUs or driving the clipboard
//! channel state machine. None of them terminate the host: every variant is
//! returned as a value and the caller decides whether to drop the PDU or
//! close the channel.

use thiserror::Error;

/// Result type for clipboard protocol operations
pub type Result<T> = std::result::Result<T, CliprdrError>;

/// Clipboard protocol error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CliprdrError {
    /// PDU is structurally invalid (length mismatch, truncated capability set, ...)
    #[error("Malformed {pdu} PDU: {reason}")]
    MalformedMessage {
        /// PDU being decoded
        pdu: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Message type is not one this engine understands
    #[error("Unknown clipboard message type: {0:#06x}")]
    UnknownMessageType(u16),

    /// PDU arrived when the protocol does not expect it
    #[error("Protocol sequence anomaly: {0}")]
    ProtocolSequence(String),

    /// A request of the same kind is already in flight
    #[error("{0} already outstanding")]
    Busy(&'static str),

    /// Operation requires the Ready phase
    #[error("Clipboard channel not ready (phase: {0})")]
    NotReady(&'static str),

    /// Channel was closed
    #[error("Clipboard channel closed")]
    ChannelClosed,
}

impl CliprdrError {
    pub(crate) fn malformed(pdu: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedMessage {
            pdu,
            reason: reason.into(),
        }
    }

    /// Returns true if the error invalidates only the current PDU
    ///
    /// Malformed and unknown PDUs, sequence anomalies and busy rejections
    /// leave the connection usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ChannelClosed)
    }

    /// Returns true if this error came from decoding wire bytes
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::MalformedMessage { .. } | Self::UnknownMessageType(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CliprdrError::malformed("FormatList", "length 40 is not a multiple of 36");
        assert_eq!(
            err.to_string(),
            "Malformed FormatList PDU: length 40 is not a multiple of 36"
        );

        let err = CliprdrError::UnknownMessageType(9);
        assert_eq!(err.to_string(), "Unknown clipboard message type: 0x0009");

        let err = CliprdrError::Busy("FormatList");
        assert_eq!(err.to_string(), "FormatList already outstanding");
    }

    #[test]
    fn test_classification() {
        assert!(CliprdrError::UnknownMessageType(9).is_decode_error());
        assert!(CliprdrError::UnknownMessageType(9).is_recoverable());
        assert!(!CliprdrError::Busy("FormatList").is_decode_error());
        assert!(!CliprdrError::ChannelClosed.is_recoverable());
    }
}
