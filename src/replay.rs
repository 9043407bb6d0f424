//! Scripted clipboard server
//!
//! Plays the server side of a short reference session over a
//! [`MemoryTransport`]: it announces capabilities and readiness, answers the
//! client's format list, then advertises its own list (plain text and
//! "HTML Format"). Used by `cliprdr-replay` and the integration tests.

use tracing::{debug, info};

use crate::channel::transport::MemoryTransportHandle;
use crate::cliprdr::{ClipboardPdu, CliprdrError, FormatList, GeneralFlags, ResponseStatus};

/// Server Capabilities PDU: one General set, version 2, flags 0x0E
pub const SERVER_CAPABILITIES: [u8; 24] = [
    0x07, 0x00, 0x00, 0x00, 0x10, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x0C, 0x00,
    0x02, 0x00, 0x00, 0x00, 0x0E, 0x00, 0x00, 0x00,
];

/// Monitor Ready PDU
pub const MONITOR_READY: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Format List Response PDU with CB_RESPONSE_OK
pub const FORMAT_LIST_RESPONSE_OK: [u8; 8] = [0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Server Format List PDU: CF_TEXT (unnamed) and 0xD010 "HTML Format"
pub const SERVER_FORMAT_LIST: [u8; 80] = [
    0x02, 0x00, 0x00, 0x00, 0x48, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0xd0, 0x00, 0x00,
    0x48, 0x00, 0x54, 0x00, 0x4D, 0x00, 0x4C, 0x00, 0x20, 0x00, 0x46, 0x00, 0x6F, 0x00, 0x72, 0x00,
    0x6D, 0x00, 0x61, 0x00, 0x74, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Server side of the reference exchange
#[derive(Debug)]
pub struct ScriptedServer {
    peer: MemoryTransportHandle,
    chunk_size: usize,
    client_flags: Option<GeneralFlags>,
    client_formats: Option<FormatList>,
    ack: Option<ResponseStatus>,
}

impl ScriptedServer {
    /// Create a server that delivers PDUs in chunks of at most `chunk_size`
    pub fn new(peer: MemoryTransportHandle, chunk_size: usize) -> Self {
        Self {
            peer,
            chunk_size,
            client_flags: None,
            client_formats: None,
            ack: None,
        }
    }

    /// Send Capabilities and MonitorReady
    pub fn start(&self) {
        info!("Server: sending Capabilities and MonitorReady");
        self.peer.deliver_pdu(SERVER_CAPABILITIES.to_vec(), self.chunk_size);
        self.peer.deliver_pdu(MONITOR_READY.to_vec(), self.chunk_size);
    }

    /// React to everything the client wrote since the last call
    ///
    /// # Returns
    ///
    /// Number of client PDUs handled
    ///
    /// # Errors
    ///
    /// Fails if the client wrote bytes that do not decode as a PDU.
    pub fn step(&mut self) -> Result<usize, CliprdrError> {
        let written = self.peer.take_written();

        for bytes in &written {
            match ClipboardPdu::decode(bytes)? {
                ClipboardPdu::Capabilities(caps) => {
                    let flags = caps.general_set().map(|set| set.general_flags);
                    info!("Server: client capabilities {:?}", flags);
                    self.client_flags = Some(flags.unwrap_or_default());
                }
                ClipboardPdu::FormatList(list) => {
                    info!("Server: client offers formats {:x?}", list.ids());
                    self.client_formats = Some(list);
                    self.peer.deliver_pdu(FORMAT_LIST_RESPONSE_OK.to_vec(), self.chunk_size);
                    self.peer.deliver_pdu(SERVER_FORMAT_LIST.to_vec(), self.chunk_size);
                }
                ClipboardPdu::FormatListResponse(status) => {
                    info!("Server: client answered our format list with {:?}", status);
                    self.ack = Some(status);
                }
                other => debug!("Server: ignoring {}", other.name()),
            }
        }

        Ok(written.len())
    }

    /// General flags the client announced, if it did
    pub fn client_flags(&self) -> Option<GeneralFlags> {
        self.client_flags
    }

    /// Format list the client advertised, if any
    pub fn client_formats(&self) -> Option<&FormatList> {
        self.client_formats.as_ref()
    }

    /// True once the client acknowledged the server's format list
    pub fn is_finished(&self) -> bool {
        self.ack.is_some()
    }

    /// The client's acknowledgement status
    pub fn ack(&self) -> Option<ResponseStatus> {
        self.ack
    }
}
