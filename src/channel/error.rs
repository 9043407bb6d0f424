//! Channel Error Types

use thiserror::Error;

use crate::cliprdr::CliprdrError;

/// Result type for channel operations
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors raised by the channel-manager layer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// Clipboard protocol error for the current PDU
    #[error(transparent)]
    Protocol(#[from] CliprdrError),

    /// Reassembled length differs from the declared total length
    #[error("Reassembly length mismatch: declared {declared} bytes, received {received}")]
    ReassemblyLengthMismatch {
        /// Total length declared on the first chunk
        declared: u32,
        /// Bytes actually accumulated
        received: usize,
    },

    /// Continuation chunk without a preceding first chunk
    #[error("Chunk of {0} bytes arrived without a first chunk")]
    UnexpectedContinuation(usize),

    /// Declared message length exceeds the configured limit
    #[error("Message of {declared} bytes exceeds maximum {max}")]
    MessageTooLarge {
        /// Declared or accumulated length
        declared: usize,
        /// Configured limit
        max: usize,
    },

    /// Bounded event queue is full
    #[error("Event queue overflow ({capacity} events)")]
    QueueOverflow {
        /// Queue capacity
        capacity: usize,
    },

    /// Transport failed to deliver bytes
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ChannelError {
    /// Returns true if only the current message was lost
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Protocol(e) => e.is_recoverable(),
            Self::ReassemblyLengthMismatch { .. }
            | Self::UnexpectedContinuation(_)
            | Self::MessageTooLarge { .. } => true,
            Self::QueueOverflow { .. } | Self::Transport(_) => false,
        }
    }
}

impl From<std::io::Error> for ChannelError {
    fn from(e: std::io::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChannelError::ReassemblyLengthMismatch {
            declared: 24,
            received: 20,
        };
        assert_eq!(
            err.to_string(),
            "Reassembly length mismatch: declared 24 bytes, received 20"
        );

        let err: ChannelError = CliprdrError::UnknownMessageType(9).into();
        assert_eq!(err.to_string(), "Unknown clipboard message type: 0x0009");
    }

    #[test]
    fn test_is_recoverable() {
        assert!(ChannelError::UnexpectedContinuation(3).is_recoverable());
        assert!(ChannelError::from(CliprdrError::Busy("FormatList")).is_recoverable());
        assert!(!ChannelError::QueueOverflow { capacity: 1 }.is_recoverable());
        assert!(!ChannelError::from(CliprdrError::ChannelClosed).is_recoverable());
        assert!(!ChannelError::from(std::io::Error::other("pipe")).is_recoverable());
    }
}
