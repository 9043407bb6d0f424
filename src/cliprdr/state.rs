//! Capability & handshake state machine
//!
//! ```text
//!                Capabilities            MonitorReady
//! Disconnected ───────────────► Negotiating ───────────► Ready
//!      │                                                   ▲
//!      └──────────────────── MonitorReady ─────────────────┘
//!
//! close() from any phase ──► Closed
//! ```
//!
//! Capability exchange is optional: MonitorReady moves straight to Ready.
//! Anything else that arrives before Ready is parked and replayed once the
//! channel becomes ready.

use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info};

use crate::cliprdr::capabilities::{Capabilities, GeneralFlags};
use crate::cliprdr::error::{CliprdrError, Result};
use crate::cliprdr::pdu::ClipboardPdu;

/// Connection phase of a clipboard channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Channel opened, nothing received yet
    Disconnected,
    /// Capabilities received, waiting for MonitorReady
    Negotiating,
    /// Handshake complete; format lists may be exchanged
    Ready,
    /// Channel closed
    Closed,
}

impl ChannelPhase {
    /// Lower-case phase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Negotiating => "negotiating",
            Self::Ready => "ready",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ChannelPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handshake tracking for one channel
#[derive(Debug)]
pub struct HandshakeState {
    phase: ChannelPhase,
    remote_flags: GeneralFlags,
    remote_version: Option<u32>,
    remote_capabilities: bool,
    early: VecDeque<ClipboardPdu>,
    max_early: usize,
}

impl HandshakeState {
    /// Create handshake state for a freshly opened channel
    ///
    /// `max_early` bounds how many PDUs may be parked before Ready.
    pub fn new(max_early: usize) -> Self {
        Self {
            phase: ChannelPhase::Disconnected,
            remote_flags: GeneralFlags::minimal(),
            remote_version: None,
            remote_capabilities: false,
            early: VecDeque::new(),
            max_early,
        }
    }

    /// Current phase
    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    /// True once MonitorReady has been processed
    pub fn is_ready(&self) -> bool {
        self.phase == ChannelPhase::Ready
    }

    /// Peer's General flags, or the minimal set if none were received
    pub fn remote_flags(&self) -> GeneralFlags {
        self.remote_flags
    }

    /// Peer's General capability version, if it sent one
    pub fn remote_version(&self) -> Option<u32> {
        self.remote_version
    }

    /// True once the peer has sent a Capabilities PDU
    pub fn has_remote_capabilities(&self) -> bool {
        self.remote_capabilities
    }

    /// Number of PDUs parked until Ready
    pub fn early_len(&self) -> usize {
        self.early.len()
    }

    /// Record the peer's capabilities
    ///
    /// Never regresses the phase: after Ready only the flags are updated.
    pub fn on_capabilities(&mut self, caps: &Capabilities) -> Result<()> {
        self.ensure_open()?;
        self.remote_capabilities = true;

        match caps.general_set() {
            Some(general) => {
                self.remote_flags = general.general_flags;
                self.remote_version = Some(general.version);
            }
            None => {
                debug!("Capabilities without a General set, assuming minimal features");
                self.remote_flags = GeneralFlags::minimal();
                self.remote_version = None;
            }
        }

        debug!("Remote clipboard capabilities: {:?}", self.remote_flags);

        if self.phase == ChannelPhase::Disconnected {
            self.phase = ChannelPhase::Negotiating;
        }

        Ok(())
    }

    /// Handle MonitorReady
    ///
    /// Returns `true` only on the transition into Ready.
    pub fn on_monitor_ready(&mut self) -> Result<bool> {
        self.ensure_open()?;

        if self.phase == ChannelPhase::Ready {
            debug!("Duplicate MonitorReady ignored");
            return Ok(false);
        }

        info!("Clipboard channel ready (was {})", self.phase);
        self.phase = ChannelPhase::Ready;
        Ok(true)
    }

    /// Park a PDU that arrived before Ready
    pub fn park_early(&mut self, pdu: ClipboardPdu) -> Result<()> {
        self.ensure_open()?;

        if self.early.len() >= self.max_early {
            return Err(CliprdrError::ProtocolSequence(format!(
                "{} received before MonitorReady and {} PDUs already queued",
                pdu.name(),
                self.early.len()
            )));
        }

        debug!("Queueing early {} until MonitorReady", pdu.name());
        self.early.push_back(pdu);
        Ok(())
    }

    /// Take every parked PDU in arrival order
    pub fn take_early(&mut self) -> VecDeque<ClipboardPdu> {
        std::mem::take(&mut self.early)
    }

    /// Close the channel and drop parked PDUs
    pub fn close(&mut self) {
        self.phase = ChannelPhase::Closed;
        self.early.clear();
    }

    fn ensure_open(&self) -> Result<()> {
        if self.phase == ChannelPhase::Closed {
            Err(CliprdrError::ChannelClosed)
        } else {
            Ok(())
        }
    }
}
