//! Per-connection clipboard engine
//!
//! [`CliprdrSession`] is the connection state of one clipboard channel: the
//! handshake phase, the peer's capability flags, the format catalogs and the
//! outstanding-response bookkeeping. It performs no I/O. Each call returns a
//! [`SessionOutput`] holding the events for the UI and the encoded PDUs to
//! write, in the order they were produced.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cliprdr::capabilities::{Capabilities, GeneralFlags};
use crate::cliprdr::error::{CliprdrError, Result};
use crate::cliprdr::event::{InboundEvent, OutboundEvent};
use crate::cliprdr::format_data::FormatDataTracker;
use crate::cliprdr::format_list::{FormatListManager, FormatListOutcome};
use crate::cliprdr::formats::FormatList;
use crate::cliprdr::pdu::ClipboardPdu;
use crate::cliprdr::state::{ChannelPhase, HandshakeState};

/// Session behavior knobs
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Answer the peer's Capabilities with our own when MonitorReady arrives
    pub announce_capabilities: bool,
    /// General flags we advertise (opaque)
    pub client_general_flags: GeneralFlags,
    /// PDUs that may be parked before Ready
    pub max_early_messages: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            announce_capabilities: true,
            client_general_flags: GeneralFlags::minimal(),
            max_early_messages: 32,
        }
    }
}

/// Everything one session call produced
#[derive(Debug, Default)]
pub struct SessionOutput {
    /// Events for the UI, in order
    pub events: Vec<InboundEvent>,
    /// Encoded PDUs for the transport, in order
    pub writes: Vec<Bytes>,
    /// Resolved FormatList sends
    pub outcomes: Vec<FormatListOutcome>,
    /// Non-fatal errors raised while replaying parked PDUs
    pub errors: Vec<CliprdrError>,
}

impl SessionOutput {
    /// True if nothing was produced
    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.writes.is_empty() && self.outcomes.is_empty() && self.errors.is_empty()
    }
}

/// Clipboard protocol engine for one channel
#[derive(Debug)]
pub struct CliprdrSession {
    config: SessionConfig,
    handshake: HandshakeState,
    formats: FormatListManager,
    data: FormatDataTracker,
}

impl CliprdrSession {
    /// Create a session for a freshly opened channel
    pub fn new(config: SessionConfig) -> Self {
        let handshake = HandshakeState::new(config.max_early_messages);
        Self {
            config,
            handshake,
            formats: FormatListManager::new(),
            data: FormatDataTracker::new(),
        }
    }

    /// Current phase
    pub fn phase(&self) -> ChannelPhase {
        self.handshake.phase()
    }

    /// Peer's General flags (minimal if never received)
    pub fn remote_flags(&self) -> GeneralFlags {
        self.handshake.remote_flags()
    }

    /// Format list bookkeeping
    pub fn format_lists(&self) -> &FormatListManager {
        &self.formats
    }

    /// Data request bookkeeping
    pub fn format_data(&self) -> &FormatDataTracker {
        &self.data
    }

    /// Decode and process one complete PDU
    pub fn process_bytes(&mut self, pdu: &[u8]) -> Result<SessionOutput> {
        let pdu = ClipboardPdu::decode(pdu)?;
        self.process(pdu)
    }

    /// Process one decoded PDU from the peer
    pub fn process(&mut self, pdu: ClipboardPdu) -> Result<SessionOutput> {
        let mut out = SessionOutput::default();
        debug!("Received {} in phase {}", pdu.name(), self.phase());

        match pdu {
            ClipboardPdu::Capabilities(caps) => self.handshake.on_capabilities(&caps)?,
            ClipboardPdu::MonitorReady => self.on_monitor_ready(&mut out)?,
            other if self.handshake.is_ready() => self.dispatch_ready(other, &mut out)?,
            other => {
                if self.phase() == ChannelPhase::Closed {
                    return Err(CliprdrError::ChannelClosed);
                }
                self.handshake.park_early(other)?;
            }
        }

        Ok(out)
    }

    /// Act on a UI request
    pub fn submit(&mut self, request: OutboundEvent) -> Result<SessionOutput> {
        match self.phase() {
            ChannelPhase::Ready => {}
            ChannelPhase::Closed => return Err(CliprdrError::ChannelClosed),
            phase => return Err(CliprdrError::NotReady(phase.as_str())),
        }

        debug!("Submitting {:?}", request);

        let pdu = match request {
            OutboundEvent::SendFormatList(list) => self.formats.send_format_list(list)?,
            OutboundEvent::SendDataRequest { format_id } => self.data.send_request(format_id)?,
            OutboundEvent::SendDataResponse { data } => self.data.respond(data)?,
        };

        Ok(SessionOutput {
            writes: vec![pdu],
            ..Default::default()
        })
    }

    /// Shorthand for submitting [`OutboundEvent::SendFormatList`]
    pub fn send_format_list(&mut self, list: FormatList) -> Result<Bytes> {
        let mut out = self.submit(OutboundEvent::SendFormatList(list))?;
        out.writes
            .pop()
            .ok_or_else(|| CliprdrError::ProtocolSequence("FormatList produced no PDU".to_string()))
    }

    /// Close the channel, dropping all outstanding bookkeeping
    pub fn close(&mut self) {
        debug!("Closing clipboard session in phase {}", self.phase());
        self.handshake.close();
        self.formats.reset();
        self.data.reset();
    }

    fn on_monitor_ready(&mut self, out: &mut SessionOutput) -> Result<()> {
        if !self.handshake.on_monitor_ready()? {
            return Ok(());
        }

        // Only a peer that announced its capabilities gets ours back
        if self.config.announce_capabilities && self.handshake.has_remote_capabilities() {
            let caps = ClipboardPdu::Capabilities(Capabilities::general(self.config.client_general_flags));
            out.writes.push(caps.encode()?);
        }

        out.events.push(InboundEvent::SyncReady);

        for early in self.handshake.take_early() {
            let name = early.name();
            if let Err(e) = self.dispatch_ready(early, out) {
                warn!("Early {} could not be processed: {}", name, e);
                out.errors.push(e);
            }
        }

        Ok(())
    }

    fn dispatch_ready(&mut self, pdu: ClipboardPdu, out: &mut SessionOutput) -> Result<()> {
        match pdu {
            ClipboardPdu::FormatList(list) => {
                let ack = self.formats.on_remote_format_list(list.clone())?;
                out.writes.push(ack);
                out.events.push(InboundEvent::RemoteFormatList(list));
            }
            ClipboardPdu::FormatListResponse(status) => {
                let outcome = self.formats.on_format_list_response(status).map_err(|e| {
                    warn!("{}", e);
                    e
                })?;
                if !outcome.status.is_ok() {
                    out.events.push(InboundEvent::FormatListRejected(outcome.list.clone()));
                }
                out.outcomes.push(outcome);
            }
            ClipboardPdu::FormatDataRequest { format_id } => {
                self.data.on_remote_request(format_id);
                out.events.push(InboundEvent::DataRequest { format_id });
            }
            ClipboardPdu::FormatDataResponse { status, data } => {
                let (format_id, data) = self.data.on_response(status, data).map_err(|e| {
                    warn!("{}", e);
                    e
                })?;
                out.events.push(InboundEvent::DataResponse { format_id, data });
            }
            ClipboardPdu::Capabilities(caps) => self.handshake.on_capabilities(&caps)?,
            ClipboardPdu::MonitorReady => self.on_monitor_ready(out)?,
        }

        Ok(())
    }
}

impl Default for CliprdrSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}
