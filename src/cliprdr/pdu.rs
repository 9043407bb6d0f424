//! CLIPRDR PDU codec
//!
//! Every clipboard PDU starts with an 8-byte little-endian header followed by
//! exactly `dataLen` bytes of body:
//!
//! ```text
//! ┌────────────┬─────────────┬─────────────┬──────────────────┐
//! │ msgType:u16│ msgFlags:u16│ dataLen:u32 │ body (dataLen)   │
//! └────────────┴─────────────┴─────────────┴──────────────────┘
//! ```
//!
//! | Type | PDU                 | Body                                   |
//! |------|---------------------|----------------------------------------|
//! | 1    | MonitorReady        | empty                                  |
//! | 2    | FormatList          | n × 36-byte short-name entries         |
//! | 3    | FormatListResponse  | empty, flags carry OK/FAIL             |
//! | 4    | FormatDataRequest   | requestedFormatId:u32                  |
//! | 5    | FormatDataResponse  | raw data, flags carry OK/FAIL          |
//! | 7    | Capabilities        | see [`capabilities`](super::capabilities) |
//!
//! Decoding is strict: the declared length must match the buffer exactly.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::cliprdr::capabilities::Capabilities;
use crate::cliprdr::error::{CliprdrError, Result};
use crate::cliprdr::formats::FormatList;

/// Size of the common PDU header
pub const PDU_HEADER_SIZE: usize = 8;

/// Monitor Ready PDU
pub const CB_MONITOR_READY: u16 = 0x0001;
/// Format List PDU
pub const CB_FORMAT_LIST: u16 = 0x0002;
/// Format List Response PDU
pub const CB_FORMAT_LIST_RESPONSE: u16 = 0x0003;
/// Format Data Request PDU
pub const CB_FORMAT_DATA_REQUEST: u16 = 0x0004;
/// Format Data Response PDU
pub const CB_FORMAT_DATA_RESPONSE: u16 = 0x0005;
/// Clipboard Capabilities PDU
pub const CB_CLIP_CAPS: u16 = 0x0007;

/// Response flag: request succeeded
pub const CB_RESPONSE_OK: u16 = 0x0001;
/// Response flag: request failed
pub const CB_RESPONSE_FAIL: u16 = 0x0002;

// =============================================================================
// Header
// =============================================================================

/// Common clipboard PDU header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PduHeader {
    /// Message type
    pub msg_type: u16,
    /// Message-specific flags
    pub msg_flags: u16,
    /// Body length in bytes
    pub data_len: u32,
}

impl PduHeader {
    /// Parse the header from the start of `src`
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        if src.len() < PDU_HEADER_SIZE {
            return Err(CliprdrError::malformed(
                "clipboard",
                format!("{} bytes is shorter than the 8-byte header", src.len()),
            ));
        }

        Ok(Self {
            msg_type: src.get_u16_le(),
            msg_flags: src.get_u16_le(),
            data_len: src.get_u32_le(),
        })
    }

    fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.msg_type);
        dst.put_u16_le(self.msg_flags);
        dst.put_u32_le(self.data_len);
    }
}

// =============================================================================
// Response status
// =============================================================================

/// Outcome carried in the flags of response PDUs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// `CB_RESPONSE_OK`
    Ok,
    /// `CB_RESPONSE_FAIL`, or any flags without the OK bit
    Fail,
}

impl ResponseStatus {
    /// Interpret response flags; only bit 0 means success
    pub fn from_flags(flags: u16) -> Self {
        if flags & CB_RESPONSE_OK != 0 {
            Self::Ok
        } else {
            Self::Fail
        }
    }

    /// Wire flags for this status
    pub fn flags(self) -> u16 {
        match self {
            Self::Ok => CB_RESPONSE_OK,
            Self::Fail => CB_RESPONSE_FAIL,
        }
    }

    /// True for [`ResponseStatus::Ok`]
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl From<bool> for ResponseStatus {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Ok
        } else {
            Self::Fail
        }
    }
}

// =============================================================================
// PDUs
// =============================================================================

/// Decoded clipboard PDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardPdu {
    /// Server is ready for clipboard traffic
    MonitorReady,
    /// Formats now available on the sender's clipboard
    FormatList(FormatList),
    /// Acknowledgment of a FormatList
    FormatListResponse(ResponseStatus),
    /// Request for clipboard data in one format
    FormatDataRequest {
        /// Requested format ID
        format_id: u32,
    },
    /// Clipboard data answering a FormatDataRequest
    FormatDataResponse {
        /// Outcome
        status: ResponseStatus,
        /// Data bytes (empty on failure)
        data: Bytes,
    },
    /// Capability sets
    Capabilities(Capabilities),
}

impl ClipboardPdu {
    /// Wire message type
    pub fn msg_type(&self) -> u16 {
        match self {
            Self::MonitorReady => CB_MONITOR_READY,
            Self::FormatList(_) => CB_FORMAT_LIST,
            Self::FormatListResponse(_) => CB_FORMAT_LIST_RESPONSE,
            Self::FormatDataRequest { .. } => CB_FORMAT_DATA_REQUEST,
            Self::FormatDataResponse { .. } => CB_FORMAT_DATA_RESPONSE,
            Self::Capabilities(_) => CB_CLIP_CAPS,
        }
    }

    /// Short PDU name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::MonitorReady => "MonitorReady",
            Self::FormatList(_) => "FormatList",
            Self::FormatListResponse(_) => "FormatListResponse",
            Self::FormatDataRequest { .. } => "FormatDataRequest",
            Self::FormatDataResponse { .. } => "FormatDataResponse",
            Self::Capabilities(_) => "Capabilities",
        }
    }

    fn msg_flags(&self) -> u16 {
        match self {
            Self::FormatListResponse(status) => status.flags(),
            Self::FormatDataResponse { status, .. } => status.flags(),
            _ => 0,
        }
    }

    /// Encoded body length
    pub fn body_len(&self) -> usize {
        match self {
            Self::MonitorReady | Self::FormatListResponse(_) => 0,
            Self::FormatList(list) => list.encoded_len(),
            Self::FormatDataRequest { .. } => 4,
            Self::FormatDataResponse { data, .. } => data.len(),
            Self::Capabilities(caps) => caps.encoded_len(),
        }
    }

    /// Serialize header and body
    ///
    /// The header length is computed from the serialized body, never from
    /// [`Self::body_len`], so the two cannot disagree.
    pub fn encode(&self) -> Result<Bytes> {
        let mut body = BytesMut::with_capacity(self.body_len());

        match self {
            Self::MonitorReady | Self::FormatListResponse(_) => {}
            Self::FormatList(list) => list.encode_body(&mut body)?,
            Self::FormatDataRequest { format_id } => body.put_u32_le(*format_id),
            Self::FormatDataResponse { data, .. } => body.put_slice(data),
            Self::Capabilities(caps) => caps.encode_body(&mut body)?,
        }

        let data_len = u32::try_from(body.len())
            .map_err(|_| CliprdrError::malformed(self.name(), "body exceeds u32 length"))?;

        let mut buf = BytesMut::with_capacity(PDU_HEADER_SIZE + body.len());
        PduHeader {
            msg_type: self.msg_type(),
            msg_flags: self.msg_flags(),
            data_len,
        }
        .encode(&mut buf);
        buf.put_slice(&body);

        Ok(buf.freeze())
    }

    /// Parse one complete PDU
    ///
    /// `src` must hold exactly one PDU: header plus `dataLen` bytes.
    pub fn decode(src: &[u8]) -> Result<Self> {
        let header = PduHeader::decode(src)?;
        let body = &src[PDU_HEADER_SIZE..];
        let name = pdu_name(header.msg_type).ok_or(CliprdrError::UnknownMessageType(header.msg_type))?;

        if header.data_len as usize != body.len() {
            return Err(CliprdrError::malformed(
                name,
                format!(
                    "declared length {} does not match {} remaining bytes",
                    header.data_len,
                    body.len()
                ),
            ));
        }

        match header.msg_type {
            CB_MONITOR_READY => {
                expect_empty(name, body)?;
                Ok(Self::MonitorReady)
            }
            CB_FORMAT_LIST => Ok(Self::FormatList(FormatList::decode_body(body)?)),
            CB_FORMAT_LIST_RESPONSE => {
                expect_empty(name, body)?;
                Ok(Self::FormatListResponse(ResponseStatus::from_flags(header.msg_flags)))
            }
            CB_FORMAT_DATA_REQUEST => {
                if body.len() != 4 {
                    return Err(CliprdrError::malformed(
                        name,
                        format!("body length {} (expected 4)", body.len()),
                    ));
                }
                let mut body = body;
                Ok(Self::FormatDataRequest {
                    format_id: body.get_u32_le(),
                })
            }
            CB_FORMAT_DATA_RESPONSE => Ok(Self::FormatDataResponse {
                status: ResponseStatus::from_flags(header.msg_flags),
                data: Bytes::copy_from_slice(body),
            }),
            CB_CLIP_CAPS => Ok(Self::Capabilities(Capabilities::decode_body(body)?)),
            other => Err(CliprdrError::UnknownMessageType(other)),
        }
    }
}

fn pdu_name(msg_type: u16) -> Option<&'static str> {
    match msg_type {
        CB_MONITOR_READY => Some("MonitorReady"),
        CB_FORMAT_LIST => Some("FormatList"),
        CB_FORMAT_LIST_RESPONSE => Some("FormatListResponse"),
        CB_FORMAT_DATA_REQUEST => Some("FormatDataRequest"),
        CB_FORMAT_DATA_RESPONSE => Some("FormatDataResponse"),
        CB_CLIP_CAPS => Some("Capabilities"),
        _ => None,
    }
}

fn expect_empty(name: &'static str, body: &[u8]) -> Result<()> {
    if body.is_empty() {
        Ok(())
    } else {
        Err(CliprdrError::malformed(
            name,
            format!("unexpected {}-byte body", body.len()),
        ))
    }
}
