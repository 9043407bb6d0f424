//! Fragment reassembly
//!
//! Accumulates channel chunks into one logical message. A first chunk
//! always starts a fresh buffer; the last chunk completes it if the
//! accumulated length equals the declared total. Any mismatch discards the
//! partial message. Nothing survives from one logical message to the next.

use bytes::{Bytes, BytesMut};
use tracing::{trace, warn};

use crate::channel::chunk::ChannelChunk;
use crate::channel::error::{ChannelError, Result};

/// Per-channel reassembly buffer
#[derive(Debug)]
pub struct Reassembler {
    buffer: BytesMut,
    total_length: Option<u32>,
    max_message_size: usize,
}

impl Reassembler {
    /// Create a reassembler that refuses messages larger than `max_message_size`
    pub fn new(max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            total_length: None,
            max_message_size,
        }
    }

    /// True while a message is partially accumulated
    pub fn in_progress(&self) -> bool {
        self.total_length.is_some()
    }

    /// Bytes accumulated for the current message
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Feed one chunk
    ///
    /// Returns `Ok(Some(message))` when a message completes, `Ok(None)` while
    /// more chunks are needed.
    pub fn feed(&mut self, chunk: ChannelChunk) -> Result<Option<Bytes>> {
        if chunk.is_first {
            if self.in_progress() {
                warn!(
                    "New message started with {} bytes of the previous one pending, discarding",
                    self.buffer.len()
                );
            }

            let declared = chunk.total_length as usize;
            if declared > self.max_message_size {
                self.reset();
                return Err(ChannelError::MessageTooLarge {
                    declared,
                    max: self.max_message_size,
                });
            }

            self.buffer.clear();
            self.buffer.reserve(declared);
            self.total_length = Some(chunk.total_length);
        }

        let Some(total_length) = self.total_length else {
            return Err(ChannelError::UnexpectedContinuation(chunk.data.len()));
        };

        if self.buffer.len() + chunk.data.len() > self.max_message_size {
            let declared = self.buffer.len() + chunk.data.len();
            self.reset();
            return Err(ChannelError::MessageTooLarge {
                declared,
                max: self.max_message_size,
            });
        }

        self.buffer.extend_from_slice(&chunk.data);
        trace!(
            "Chunk of {} bytes ({}/{})",
            chunk.data.len(),
            self.buffer.len(),
            total_length
        );

        if !chunk.is_last {
            return Ok(None);
        }

        let received = self.buffer.len();
        let message = self.buffer.split().freeze();
        self.total_length = None;

        if received != total_length as usize {
            return Err(ChannelError::ReassemblyLengthMismatch {
                declared: total_length,
                received,
            });
        }

        Ok(Some(message))
    }

    /// Drop any partial message
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.total_length = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::chunk::{split_into_chunks, CHANNEL_FLAG_FIRST, CHANNEL_FLAG_LAST};

    const MAX: usize = 1024;

    #[test]
    fn test_single_chunk() {
        let mut reassembler = Reassembler::new(MAX);
        let msg = reassembler
            .feed(ChannelChunk::whole(Bytes::from_static(&[1, 0, 0, 0, 0, 0, 0, 0])))
            .unwrap();
        assert_eq!(msg.unwrap().len(), 8);
        assert!(!reassembler.in_progress());
    }

    #[test]
    fn test_multi_chunk() {
        let mut reassembler = Reassembler::new(MAX);
        let message = Bytes::from((0u8..50).collect::<Vec<_>>());
        let mut chunks = split_into_chunks(message.clone(), 16).into_iter();

        for _ in 0..3 {
            assert!(reassembler.feed(chunks.next().unwrap()).unwrap().is_none());
            assert!(reassembler.in_progress());
        }
        let complete = reassembler.feed(chunks.next().unwrap()).unwrap().unwrap();
        assert_eq!(complete, message);
        assert_eq!(reassembler.buffered_len(), 0);
    }

    #[test]
    fn test_length_mismatch_discards() {
        let mut reassembler = Reassembler::new(MAX);
        reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 4], CHANNEL_FLAG_FIRST, 10))
            .unwrap();
        let err = reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 4], CHANNEL_FLAG_LAST, 10))
            .unwrap_err();

        assert_eq!(
            err,
            ChannelError::ReassemblyLengthMismatch {
                declared: 10,
                received: 8
            }
        );
        assert!(!reassembler.in_progress());
        assert_eq!(reassembler.buffered_len(), 0);
    }

    #[test]
    fn test_continuation_without_first() {
        let mut reassembler = Reassembler::new(MAX);
        let err = reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 3], CHANNEL_FLAG_LAST, 3))
            .unwrap_err();
        assert_eq!(err, ChannelError::UnexpectedContinuation(3));
    }

    #[test]
    fn test_first_chunk_restarts_message() {
        let mut reassembler = Reassembler::new(MAX);
        reassembler
            .feed(ChannelChunk::from_flags(vec![9u8; 4], CHANNEL_FLAG_FIRST, 100))
            .unwrap();

        let msg = reassembler
            .feed(ChannelChunk::whole(Bytes::from_static(&[3, 0, 1, 0, 0, 0, 0, 0])))
            .unwrap()
            .unwrap();
        assert_eq!(msg.as_ref(), &[3, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_declared_length_too_large() {
        let mut reassembler = Reassembler::new(16);
        let err = reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 4], CHANNEL_FLAG_FIRST, 17))
            .unwrap_err();
        assert!(matches!(err, ChannelError::MessageTooLarge { declared: 17, max: 16 }));
        assert!(!reassembler.in_progress());
    }

    #[test]
    fn test_accumulated_length_too_large() {
        let mut reassembler = Reassembler::new(16);
        reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 10], CHANNEL_FLAG_FIRST, 12))
            .unwrap();
        let err = reassembler
            .feed(ChannelChunk::from_flags(vec![0u8; 10], 0, 12))
            .unwrap_err();
        assert!(matches!(err, ChannelError::MessageTooLarge { .. }));
        assert!(!reassembler.in_progress());
    }
}
