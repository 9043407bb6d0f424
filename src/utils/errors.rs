//! User-Friendly Error Formatting
//!
//! Turns a fatal error from the replay tool into a message with
//! troubleshooting hints for the common cases.

use std::fmt::Write;

use crate::channel::ChannelError;
use crate::cliprdr::CliprdrError;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    // Header
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    match classify(error) {
        ErrorKind::Protocol => format_protocol_error(&mut output),
        ErrorKind::Reassembly => format_reassembly_error(&mut output),
        ErrorKind::QueueOverflow => format_queue_error(&mut output),
        ErrorKind::Transport => format_transport_error(&mut output),
        ErrorKind::Config => format_config_error(&mut output),
        ErrorKind::Other => format_generic_error(&mut output, &error.to_string()),
    }

    // Technical details
    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    // Footer with help
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: cliprdr-replay -vvv"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Trace-level logs include a hex dump of every PDU"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Report issues: https://github.com/lamco-admin/lamco-cliprdr/issues"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorKind {
    Protocol,
    Reassembly,
    QueueOverflow,
    Transport,
    Config,
    Other,
}

fn classify(error: &anyhow::Error) -> ErrorKind {
    for cause in error.chain() {
        if let Some(e) = cause.downcast_ref::<ChannelError>() {
            return match e {
                ChannelError::Protocol(CliprdrError::ChannelClosed) | ChannelError::Transport(_) => {
                    ErrorKind::Transport
                }
                ChannelError::Protocol(_) => ErrorKind::Protocol,
                ChannelError::ReassemblyLengthMismatch { .. }
                | ChannelError::UnexpectedContinuation(_)
                | ChannelError::MessageTooLarge { .. } => ErrorKind::Reassembly,
                ChannelError::QueueOverflow { .. } => ErrorKind::QueueOverflow,
            };
        }
        if let Some(e) = cause.downcast_ref::<CliprdrError>() {
            return match e {
                CliprdrError::ChannelClosed => ErrorKind::Transport,
                _ => ErrorKind::Protocol,
            };
        }
    }

    let message = error.to_string();
    if message.contains("config") || message.contains("TOML") {
        ErrorKind::Config
    } else {
        ErrorKind::Other
    }
}

fn format_protocol_error(output: &mut String) {
    writeln!(output, "Clipboard Protocol Error").ok();
    writeln!(output).ok();
    writeln!(output, "The peer sent a clipboard PDU that could not be used.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Truncated or corrupted trace").ok();
    writeln!(output, "     → The declared PDU length must match the body").ok();
    writeln!(output, "     → FormatList bodies are a multiple of 36 bytes").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Unsupported message type").ok();
    writeln!(
        output,
        "     → File contents and lock PDUs are not handled"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Unexpected message order").ok();
    writeln!(
        output,
        "     → A response arrived with nothing outstanding"
    )
    .ok();
}

fn format_reassembly_error(output: &mut String) {
    writeln!(output, "Channel Reassembly Error").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "Virtual channel chunks did not add up to a complete message."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Missing first or last chunk flag").ok();
    writeln!(output, "     → Every message starts with CHANNEL_FLAG_FIRST").ok();
    writeln!(output, "     → and ends with CHANNEL_FLAG_LAST").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Message larger than the configured limit").ok();
    writeln!(
        output,
        "     → Raise [channel] max_message_size in config.toml"
    )
    .ok();
}

fn format_queue_error(output: &mut String) {
    writeln!(output, "Event Queue Overflow").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "The UI did not consume clipboard events fast enough."
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "Troubleshooting:").ok();
    writeln!(output).ok();
    writeln!(
        output,
        "  1. Raise [channel] event_queue_capacity (0 = unbounded)"
    )
    .ok();
    writeln!(output, "  2. Drain events between pump calls").ok();
}

fn format_transport_error(output: &mut String) {
    writeln!(output, "Channel Transport Error").ok();
    writeln!(output).ok();
    writeln!(output, "The clipboard channel is no longer usable.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Peer disconnected").ok();
    writeln!(output, "  2. Channel was closed before the request ran").ok();
}

fn format_config_error(output: &mut String) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Configuration file not found").ok();
    writeln!(
        output,
        "     → Or specify: cliprdr-replay -c /path/to/config.toml"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  2. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Value out of range").ok();
    writeln!(
        output,
        "     → chunk_size and max_message_size must be non-zero"
    )
    .ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Replay Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred while replaying the clipboard trace.").ok();
    writeln!(output).ok();
    writeln!(output, "Error: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_error() {
        let error = anyhow::anyhow!("Something unexpected");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("ERROR"));
        assert!(formatted.contains("Replay Error"));
    }

    #[test]
    fn test_channel_error_classified() {
        let error = anyhow::Error::new(ChannelError::UnexpectedContinuation(4)).context("Pump failed");
        assert_eq!(classify(&error), ErrorKind::Reassembly);
        assert!(format_user_error(&error).contains("CHANNEL_FLAG_FIRST"));

        let error = anyhow::Error::new(ChannelError::from(CliprdrError::UnknownMessageType(8)));
        assert_eq!(classify(&error), ErrorKind::Protocol);

        let error = anyhow::Error::new(ChannelError::Transport("reset".to_string()));
        assert_eq!(classify(&error), ErrorKind::Transport);
    }

    #[test]
    fn test_config_error_formatting() {
        let error = anyhow::anyhow!("Failed to parse config file");
        let formatted = format_user_error(&error);
        assert!(formatted.contains("Configuration Error"));
    }
}
