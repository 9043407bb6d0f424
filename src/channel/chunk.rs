//! Static virtual channel chunks.
//!
//! The transport delivers each logical channel message as one or more chunks.
//! The first chunk carries `CHANNEL_FLAG_FIRST`, the last `CHANNEL_FLAG_LAST`
//! (a single-chunk message carries both), and every chunk repeats the total
//! length of the logical message.

use bytes::Bytes;

/// Chunk starts a logical message
pub const CHANNEL_FLAG_FIRST: u32 = 0x0000_0001;

/// Chunk ends a logical message
pub const CHANNEL_FLAG_LAST: u32 = 0x0000_0002;

/// Both flags: the whole message in one chunk
pub const CHANNEL_FLAG_ONLY: u32 = CHANNEL_FLAG_FIRST | CHANNEL_FLAG_LAST;

/// Default maximum chunk payload for static virtual channels
pub const CHANNEL_CHUNK_LENGTH: usize = 1600;

/// One transport-level delivery unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelChunk {
    /// Chunk payload
    pub data: Bytes,
    /// First chunk of a message
    pub is_first: bool,
    /// Last chunk of a message
    pub is_last: bool,
    /// Length of the whole logical message
    pub total_length: u32,
}

impl ChannelChunk {
    /// Chunk holding a complete message
    pub fn whole(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let total_length = data.len() as u32;
        Self {
            data,
            is_first: true,
            is_last: true,
            total_length,
        }
    }

    /// Build a chunk from wire flags
    pub fn from_flags(data: impl Into<Bytes>, flags: u32, total_length: u32) -> Self {
        Self {
            data: data.into(),
            is_first: flags & CHANNEL_FLAG_FIRST != 0,
            is_last: flags & CHANNEL_FLAG_LAST != 0,
            total_length,
        }
    }

    /// Wire flags for this chunk
    pub fn flags(&self) -> u32 {
        let mut flags = 0;
        if self.is_first {
            flags |= CHANNEL_FLAG_FIRST;
        }
        if self.is_last {
            flags |= CHANNEL_FLAG_LAST;
        }
        flags
    }
}

/// Split a logical message into flagged chunks of at most `chunk_size` bytes
///
/// An empty message still yields one chunk carrying both flags.
pub fn split_into_chunks(message: Bytes, chunk_size: usize) -> Vec<ChannelChunk> {
    let chunk_size = chunk_size.max(1);
    let total_length = message.len() as u32;

    if message.is_empty() {
        return vec![ChannelChunk::whole(message)];
    }

    let count = message.len().div_ceil(chunk_size);
    (0..count)
        .map(|i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(message.len());
            ChannelChunk {
                data: message.slice(start..end),
                is_first: i == 0,
                is_last: i + 1 == count,
                total_length,
            }
        })
        .collect()
}
