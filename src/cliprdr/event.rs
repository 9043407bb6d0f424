//! Events exchanged between the clipboard engine and the UI.

use bytes::Bytes;
use std::fmt;

use crate::cliprdr::formats::FormatList;

/// Notification from the protocol side to the UI
#[derive(Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Handshake complete; the UI should advertise its clipboard
    SyncReady,

    /// Peer announced new clipboard content
    RemoteFormatList(FormatList),

    /// Peer answered one of our format lists with FAIL
    FormatListRejected(FormatList),

    /// Peer wants our clipboard data in a format
    DataRequest {
        /// Requested format ID
        format_id: u32,
    },

    /// Peer answered our data request
    DataResponse {
        /// Format that was requested
        format_id: u32,
        /// Data, `None` if the peer failed the request
        data: Option<Bytes>,
    },
}

impl InboundEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SyncReady => "SyncReady",
            Self::RemoteFormatList(_) => "RemoteFormatList",
            Self::FormatListRejected(_) => "FormatListRejected",
            Self::DataRequest { .. } => "DataRequest",
            Self::DataResponse { .. } => "DataResponse",
        }
    }
}

impl fmt::Debug for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyncReady => write!(f, "SyncReady"),
            Self::RemoteFormatList(list) => write!(f, "RemoteFormatList({:x?})", list.ids()),
            Self::FormatListRejected(list) => write!(f, "FormatListRejected({:x?})", list.ids()),
            Self::DataRequest { format_id } => write!(f, "DataRequest({:#x})", format_id),
            Self::DataResponse { format_id, data } => match data {
                Some(data) => write!(f, "DataResponse({:#x}, {} bytes)", format_id, data.len()),
                None => write!(f, "DataResponse({:#x}, failed)", format_id),
            },
        }
    }
}

/// Request from the UI for protocol action
#[derive(Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Advertise the local clipboard formats
    SendFormatList(FormatList),

    /// Ask the peer for clipboard data
    SendDataRequest {
        /// Format to request
        format_id: u32,
    },

    /// Answer the oldest pending peer data request
    SendDataResponse {
        /// Data, `None` to fail the request
        data: Option<Bytes>,
    },
}

impl OutboundEvent {
    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::SendFormatList(_) => "SendFormatList",
            Self::SendDataRequest { .. } => "SendDataRequest",
            Self::SendDataResponse { .. } => "SendDataResponse",
        }
    }
}

impl fmt::Debug for OutboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFormatList(list) => write!(f, "SendFormatList({:x?})", list.ids()),
            Self::SendDataRequest { format_id } => write!(f, "SendDataRequest({:#x})", format_id),
            Self::SendDataResponse { data: Some(data) } => {
                write!(f, "SendDataResponse({} bytes)", data.len())
            }
            Self::SendDataResponse { data: None } => write!(f, "SendDataResponse(failed)"),
        }
    }
}
