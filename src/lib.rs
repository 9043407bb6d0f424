//! # lamco-cliprdr
//!
//! RDP clipboard redirection (CLIPRDR) virtual channel, client side.
//!
//! The crate is split in two layers:
//! - [`cliprdr`] - sans-IO protocol engine: PDU codec, capability
//!   negotiation, handshake state machine, format list and data exchange
//! - [`channel`] - channel plumbing: chunk reassembly, the transport
//!   boundary, the UI event bridge and the cooperative channel pump
//!
//! # Architecture
//!
//! ```text
//! lamco-cliprdr
//!   ├─> ChannelTransport (chunks in, PDUs out)
//!   ├─> Reassembler (chunks → complete PDUs)
//!   ├─> CliprdrSession (handshake, format lists, data requests)
//!   ├─> EventBridge (inbound events ↔ UI requests, thread-safe)
//!   └─> ChannelPump (drives all of the above, one step per call)
//! ```
//!
//! # Data Flow
//!
//! **Inbound:** Transport → Reassembler → Codec → Session → EventBridge → UI
//!
//! **Outbound:** UI → EventBridge → Session → Codec → Transport
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lamco_cliprdr::channel::{ChannelPump, EventBridge, MemoryTransport, PumpConfig};
//! use lamco_cliprdr::cliprdr::{CliprdrSession, InboundEvent};
//!
//! let (transport, server) = MemoryTransport::pair();
//! let bridge = Arc::new(EventBridge::unbounded());
//! let mut pump = ChannelPump::new(transport, CliprdrSession::default(), bridge.clone(), PumpConfig::default());
//!
//! server.deliver_pdu(vec![0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 1600);
//! pump.drive().unwrap();
//! assert_eq!(bridge.pop_inbound(), Some(InboundEvent::SyncReady));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Clipboard protocol engine
pub mod cliprdr;

/// Virtual channel plumbing
pub mod channel;

/// Configuration
pub mod config;

/// Scripted server for replaying the reference exchange
pub mod replay;

/// Utility functions
pub mod utils;

pub use channel::{ChannelError, ChannelPump, EventBridge};
pub use cliprdr::{CliprdrError, CliprdrSession, InboundEvent, OutboundEvent};
