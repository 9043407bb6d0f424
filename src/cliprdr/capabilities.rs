//! Clipboard Capability Sets
//!
//! The Capabilities PDU carries a list of self-length-delimited capability
//! sets. Only the General set is defined; any other set type is kept as raw
//! bytes so the PDU re-encodes to exactly what was received.
//!
//! ```text
//! Capabilities body:
//! ┌──────────┬──────────┬─────────────────────────────────────────┐
//! │ count:u16│ pad:u16  │ count × { type:u16, len:u16, body }     │
//! └──────────┴──────────┴─────────────────────────────────────────┘
//!
//! General set body (len = 12): { version:u32, generalFlags:u32 }
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;

use crate::cliprdr::error::{CliprdrError, Result};

/// Capability set type: General
pub const CB_CAPSTYPE_GENERAL: u16 = 0x0001;

/// Size of a capability set header (type + length)
pub const CAPSET_HEADER_SIZE: usize = 4;

/// Size of the General capability set including its header
pub const GENERAL_CAPSET_LENGTH: usize = 12;

/// General capability set version 1
pub const CB_CAPS_VERSION_1: u32 = 0x0000_0001;

/// General capability set version 2
pub const CB_CAPS_VERSION_2: u32 = 0x0000_0002;

const PDU_NAME: &str = "Capabilities";

// =============================================================================
// General capability flags
// =============================================================================

/// Opaque General capability flags
///
/// The engine stores and forwards these bits without acting on them. The
/// named constants exist so logs and hosts can read them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GeneralFlags(u32);

impl GeneralFlags {
    /// Long format names may be used in FormatList PDUs
    pub const USE_LONG_FORMAT_NAMES: Self = Self(0x0000_0002);
    /// File contents streaming is supported
    pub const STREAM_FILECLIP_ENABLED: Self = Self(0x0000_0004);
    /// Source paths are stripped from file lists
    pub const FILECLIP_NO_FILE_PATHS: Self = Self(0x0000_0008);
    /// Lock/Unlock clipboard data PDUs are supported
    pub const CAN_LOCK_CLIPDATA: Self = Self(0x0000_0010);
    /// Files larger than 4 GiB are supported
    pub const HUGE_FILE_SUPPORT_ENABLED: Self = Self(0x0000_0020);

    const NAMES: [(Self, &'static str); 5] = [
        (Self::USE_LONG_FORMAT_NAMES, "USE_LONG_FORMAT_NAMES"),
        (Self::STREAM_FILECLIP_ENABLED, "STREAM_FILECLIP_ENABLED"),
        (Self::FILECLIP_NO_FILE_PATHS, "FILECLIP_NO_FILE_PATHS"),
        (Self::CAN_LOCK_CLIPDATA, "CAN_LOCK_CLIPDATA"),
        (Self::HUGE_FILE_SUPPORT_ENABLED, "HUGE_FILE_SUPPORT_ENABLED"),
    ];

    /// Conservative default assumed when the peer never sends a General set
    pub const fn minimal() -> Self {
        Self(0)
    }

    /// Wrap raw bits (unknown bits are preserved)
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether all bits of `other` are set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for GeneralFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for GeneralFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "GeneralFlags({:#010x}: {})", self.0, names.join(" | "))
    }
}

// =============================================================================
// Capability sets
// =============================================================================

/// General capability set body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneralCapabilitySet {
    /// Protocol version advertised by the sender
    pub version: u32,
    /// Feature flags
    pub general_flags: GeneralFlags,
}

impl GeneralCapabilitySet {
    /// Create a version 2 General set with the given flags
    pub fn new(general_flags: GeneralFlags) -> Self {
        Self {
            version: CB_CAPS_VERSION_2,
            general_flags,
        }
    }
}

/// A single capability set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CapabilitySet {
    /// General set (type 1)
    General(GeneralCapabilitySet),
    /// Set type this engine does not define; body kept verbatim
    ///
    /// `set_type` must not be [`CB_CAPSTYPE_GENERAL`]; encoding rejects it.
    Unknown {
        /// Capability set type
        set_type: u16,
        /// Body bytes following the 4-byte set header
        body: Bytes,
    },
}

impl CapabilitySet {
    /// Capability set type code
    pub fn set_type(&self) -> u16 {
        match self {
            Self::General(_) => CB_CAPSTYPE_GENERAL,
            Self::Unknown { set_type, .. } => *set_type,
        }
    }

    /// Encoded length of this set including its header
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::General(_) => GENERAL_CAPSET_LENGTH,
            Self::Unknown { body, .. } => CAPSET_HEADER_SIZE + body.len(),
        }
    }
}

/// Body of a Capabilities PDU
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Capability sets in wire order
    pub sets: Vec<CapabilitySet>,
}

impl Capabilities {
    /// Capabilities carrying a single General set
    pub fn general(flags: GeneralFlags) -> Self {
        Self {
            sets: vec![CapabilitySet::General(GeneralCapabilitySet::new(flags))],
        }
    }

    /// First General set, if any
    pub fn general_set(&self) -> Option<&GeneralCapabilitySet> {
        self.sets.iter().find_map(|set| match set {
            CapabilitySet::General(general) => Some(general),
            CapabilitySet::Unknown { .. } => None,
        })
    }

    /// Encoded body length
    pub fn encoded_len(&self) -> usize {
        4 + self.sets.iter().map(CapabilitySet::encoded_len).sum::<usize>()
    }

    pub(crate) fn encode_body(&self, dst: &mut BytesMut) -> Result<()> {
        let count = u16::try_from(self.sets.len())
            .map_err(|_| CliprdrError::malformed(PDU_NAME, "too many capability sets"))?;

        dst.put_u16_le(count);
        dst.put_u16_le(0); // pad

        for set in &self.sets {
            // A type-1 set would decode back as General
            if let CapabilitySet::Unknown {
                set_type: CB_CAPSTYPE_GENERAL,
                ..
            } = set
            {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    "unknown capability set cannot use the General set type",
                ));
            }

            let set_len = u16::try_from(set.encoded_len()).map_err(|_| {
                CliprdrError::malformed(PDU_NAME, format!("capability set {} too long", set.set_type()))
            })?;
            dst.put_u16_le(set.set_type());
            dst.put_u16_le(set_len);
            match set {
                CapabilitySet::General(general) => {
                    dst.put_u32_le(general.version);
                    dst.put_u32_le(general.general_flags.bits());
                }
                CapabilitySet::Unknown { body, .. } => dst.put_slice(body),
            }
        }

        Ok(())
    }

    pub(crate) fn decode_body(mut src: &[u8]) -> Result<Self> {
        if src.remaining() < 4 {
            return Err(CliprdrError::malformed(
                PDU_NAME,
                format!("body of {} bytes is shorter than the 4-byte preamble", src.len()),
            ));
        }

        let count = src.get_u16_le();
        let _pad = src.get_u16_le();
        let mut sets = Vec::with_capacity((count as usize).min(src.remaining() / CAPSET_HEADER_SIZE));

        for index in 0..count {
            if src.remaining() < CAPSET_HEADER_SIZE {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    format!("capability set {} of {} is truncated", index + 1, count),
                ));
            }

            let set_type = src.get_u16_le();
            let set_len = src.get_u16_le() as usize;

            if set_len < CAPSET_HEADER_SIZE {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    format!("capability set length {} is smaller than its header", set_len),
                ));
            }

            let body_len = set_len - CAPSET_HEADER_SIZE;
            if body_len > src.remaining() {
                return Err(CliprdrError::malformed(
                    PDU_NAME,
                    format!(
                        "capability set length {} overruns the {} remaining bytes",
                        set_len,
                        src.remaining() + CAPSET_HEADER_SIZE
                    ),
                ));
            }

            let set = if set_type == CB_CAPSTYPE_GENERAL {
                if set_len != GENERAL_CAPSET_LENGTH {
                    return Err(CliprdrError::malformed(
                        PDU_NAME,
                        format!("General capability set length {} (expected 12)", set_len),
                    ));
                }
                CapabilitySet::General(GeneralCapabilitySet {
                    version: src.get_u32_le(),
                    general_flags: GeneralFlags::from_bits(src.get_u32_le()),
                })
            } else {
                let body = Bytes::copy_from_slice(&src[..body_len]);
                src.advance(body_len);
                CapabilitySet::Unknown { set_type, body }
            };

            sets.push(set);
        }

        if src.has_remaining() {
            return Err(CliprdrError::malformed(
                PDU_NAME,
                format!("{} trailing bytes after {} capability sets", src.remaining(), count),
            ));
        }

        Ok(Self { sets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_general_set() {
        let body = [
            0x01, 0x00, 0x00, 0x00, // count, pad
            0x01, 0x00, 0x0C, 0x00, // General, len 12
            0x02, 0x00, 0x00, 0x00, // version 2
            0x0E, 0x00, 0x00, 0x00, // flags
        ];

        let caps = Capabilities::decode_body(&body).unwrap();
        assert_eq!(caps.sets.len(), 1);

        let general = caps.general_set().unwrap();
        assert_eq!(general.version, CB_CAPS_VERSION_2);
        assert_eq!(general.general_flags.bits(), 0x0000_000E);
        assert!(general
            .general_flags
            .contains(GeneralFlags::USE_LONG_FORMAT_NAMES | GeneralFlags::FILECLIP_NO_FILE_PATHS));
        assert!(!general.general_flags.contains(GeneralFlags::CAN_LOCK_CLIPDATA));
    }

    #[test]
    fn test_unknown_set_preserved() {
        let caps = Capabilities {
            sets: vec![
                CapabilitySet::Unknown {
                    set_type: 0x7F,
                    body: Bytes::from_static(&[1, 2, 3]),
                },
                CapabilitySet::General(GeneralCapabilitySet::new(GeneralFlags::minimal())),
            ],
        };

        let mut buf = BytesMut::new();
        caps.encode_body(&mut buf).unwrap();
        assert_eq!(buf.len(), caps.encoded_len());
        assert_eq!(Capabilities::decode_body(&buf).unwrap(), caps);
    }

    #[test]
    fn test_unknown_set_with_general_type_rejected() {
        for body in [&[2u8, 0, 0, 0, 0x0E, 0, 0, 0][..], &[1, 2, 3][..]] {
            let caps = Capabilities {
                sets: vec![CapabilitySet::Unknown {
                    set_type: CB_CAPSTYPE_GENERAL,
                    body: Bytes::copy_from_slice(body),
                }],
            };

            let mut buf = BytesMut::new();
            let err = caps.encode_body(&mut buf).unwrap_err();
            assert!(matches!(err, CliprdrError::MalformedMessage { pdu: "Capabilities", .. }));
        }
    }

    #[test]
    fn test_huge_count_with_short_body() {
        let body = [
            0xFF, 0xFF, 0x00, 0x00, // claims 65535 sets
            0x01, 0x00, 0x0C, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let err = Capabilities::decode_body(&body).unwrap_err();
        assert!(err.to_string().contains("2 of 65535 is truncated"));
    }

    #[test]
    fn test_set_length_smaller_than_header() {
        let body = [0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x00];
        let err = Capabilities::decode_body(&body).unwrap_err();
        assert!(matches!(err, CliprdrError::MalformedMessage { .. }));
    }

    #[test]
    fn test_set_length_overrun() {
        let body = [
            0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x0C, 0x00, 0x02, 0x00, 0x00, 0x00,
        ];
        let err = Capabilities::decode_body(&body).unwrap_err();
        assert!(err.to_string().contains("overruns"));
    }

    #[test]
    fn test_count_exceeds_sets() {
        let body = [
            0x02, 0x00, 0x00, 0x00, // claims two sets
            0x01, 0x00, 0x0C, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        let err = Capabilities::decode_body(&body).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_no_general_set() {
        let caps = Capabilities::default();
        assert!(caps.general_set().is_none());
        assert_eq!(caps.encoded_len(), 4);
    }

    #[test]
    fn test_flags_debug_names() {
        let flags = GeneralFlags::from_bits(0x0E);
        let text = format!("{:?}", flags);
        assert!(text.contains("0x0000000e"));
        assert!(text.contains("STREAM_FILECLIP_ENABLED"));
    }
}
