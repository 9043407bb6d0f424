//! Virtual Channel Plumbing
//!
//! Everything between the raw static virtual channel and the
//! [`crate::cliprdr`] engine:
//!
//! ```text
//! ChannelTransport ──chunks──► Reassembler ──PDU──► CliprdrSession
//!        ▲                                              │
//!        └──────────── pending writes ◄─────────────────┤
//!                                                       ▼
//!                     UI ◄──── inbound ──── EventBridge ◄── events
//!                     UI ───── outbound ──► EventBridge ──► next drive()
//! ```
//!
//! [`ChannelPump`] owns one connection's state and runs the three steps on
//! every `drive()` call. [`EventBridge`] is the only structure shared with
//! other threads or tasks.

pub mod bridge;
pub mod chunk;
pub mod error;
pub mod pump;
pub mod reassembler;
pub mod transport;

pub use bridge::{CompletionCallback, EventBridge, OutboundRequest};
pub use chunk::{
    split_into_chunks, ChannelChunk, CHANNEL_CHUNK_LENGTH, CHANNEL_FLAG_FIRST, CHANNEL_FLAG_LAST,
    CHANNEL_FLAG_ONLY,
};
pub use error::ChannelError;
pub use pump::{ChannelPump, ChannelStats, PumpConfig, PumpReport};
pub use reassembler::Reassembler;
pub use transport::{ChannelTransport, MemoryTransport, MemoryTransportHandle};
