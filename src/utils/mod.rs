//! Utility Functions
//!
//! User-friendly error formatting and hex dumps for trace logs.
//!
//! ## Error Formatting
//!
//! The [`errors`] module provides user-friendly error messages:
//!
//! ```rust
//! use lamco_cliprdr::utils::format_user_error;
//!
//! let error = anyhow::anyhow!("Failed to parse config file");
//! eprintln!("{}", format_user_error(&error));
//! ```
//!
//! Channel and protocol errors are recognized by type anywhere in the
//! error chain, so `.context(...)` wrappers keep their hints.
//!
//! ## Hex Dumps
//!
//! [`HexDump`] renders raw PDUs in `trace!` output:
//!
//! ```rust
//! use lamco_cliprdr::utils::HexDump;
//!
//! let pdu = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
//! tracing::trace!("MonitorReady:\n{}", HexDump(&pdu));
//! ```

pub mod errors;
pub mod hexdump;

pub use errors::format_user_error;
pub use hexdump::HexDump;
