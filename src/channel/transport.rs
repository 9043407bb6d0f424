//! Channel transport boundary
//!
//! The pump talks to the underlying static virtual channel through
//! [`ChannelTransport`]. Implementations must never block: `read_chunk`
//! returns `Ok(None)` when nothing is available right now.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::debug;

use crate::channel::chunk::{split_into_chunks, ChannelChunk};
use crate::channel::error::{ChannelError, Result};

/// Non-blocking access to one virtual channel
#[cfg_attr(test, mockall::automock)]
pub trait ChannelTransport: Send {
    /// Next received chunk, or None if nothing is pending
    fn read_chunk(&mut self) -> Result<Option<ChannelChunk>>;

    /// Send one complete logical message
    fn write_bytes(&mut self, data: Bytes) -> Result<()>;
}

impl<T: ChannelTransport + ?Sized> ChannelTransport for Box<T> {
    fn read_chunk(&mut self) -> Result<Option<ChannelChunk>> {
        (**self).read_chunk()
    }

    fn write_bytes(&mut self, data: Bytes) -> Result<()> {
        (**self).write_bytes(data)
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    incoming: VecDeque<ChannelChunk>,
    written: Vec<Bytes>,
    disconnected: bool,
}

/// In-process transport fed through a [`MemoryTransportHandle`]
///
/// Used by the replay tool and the tests in place of a real RDP channel.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

/// Peer side of a [`MemoryTransport`]
#[derive(Debug, Clone)]
pub struct MemoryTransportHandle {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryTransport {
    /// Create a transport and the handle that plays the peer
    pub fn pair() -> (Self, MemoryTransportHandle) {
        let state = Arc::new(Mutex::new(MemoryState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MemoryTransportHandle { state },
        )
    }
}

impl ChannelTransport for MemoryTransport {
    fn read_chunk(&mut self) -> Result<Option<ChannelChunk>> {
        Ok(self.state.lock().incoming.pop_front())
    }

    fn write_bytes(&mut self, data: Bytes) -> Result<()> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(ChannelError::Transport("peer disconnected".to_string()));
        }
        state.written.push(data);
        Ok(())
    }
}

impl MemoryTransportHandle {
    /// Queue one chunk for the next `read_chunk`
    pub fn deliver(&self, chunk: ChannelChunk) {
        self.state.lock().incoming.push_back(chunk);
    }

    /// Queue a chunk built from raw channel flags
    pub fn deliver_flags(&self, data: impl Into<Bytes>, flags: u32, total_length: u32) {
        self.deliver(ChannelChunk::from_flags(data, flags, total_length));
    }

    /// Queue a complete PDU split into chunks of at most `chunk_size` bytes
    pub fn deliver_pdu(&self, pdu: impl Into<Bytes>, chunk_size: usize) {
        let chunks = split_into_chunks(pdu.into(), chunk_size);
        debug!("Delivering PDU as {} chunks", chunks.len());
        self.state.lock().incoming.extend(chunks);
    }

    /// Chunks not yet read by the transport
    pub fn pending(&self) -> usize {
        self.state.lock().incoming.len()
    }

    /// Take everything written so far
    pub fn take_written(&self) -> Vec<Bytes> {
        std::mem::take(&mut self.state.lock().written)
    }

    /// Make further writes fail
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::chunk::CHANNEL_FLAG_ONLY;

    #[test]
    fn test_memory_transport_delivery_order() {
        let (mut transport, handle) = MemoryTransport::pair();
        handle.deliver_flags(vec![1u8, 0, 0, 0, 0, 0, 0, 0], CHANNEL_FLAG_ONLY, 8);
        handle.deliver_pdu(vec![0u8; 10], 4);
        assert_eq!(handle.pending(), 4);

        let first = transport.read_chunk().unwrap().unwrap();
        assert_eq!(first.data[0], 1);
        for _ in 0..3 {
            assert!(transport.read_chunk().unwrap().is_some());
        }
        assert!(transport.read_chunk().unwrap().is_none());
    }

    #[test]
    fn test_memory_transport_writes() {
        let (mut transport, handle) = MemoryTransport::pair();
        transport.write_bytes(Bytes::from_static(b"ab")).unwrap();
        assert_eq!(handle.take_written(), vec![Bytes::from_static(b"ab")]);
        assert!(handle.take_written().is_empty());

        handle.disconnect();
        assert!(matches!(
            transport.write_bytes(Bytes::new()),
            Err(ChannelError::Transport(_))
        ));
    }
}
