//! Channel Pump
//!
//! [`ChannelPump`] is the per-connection context: it owns the transport, the
//! reassembly buffer and the protocol session, and shares an
//! [`EventBridge`] with the UI. The host calls [`ChannelPump::drive`]
//! repeatedly; each call
//!
//! 1. reads whatever chunks the transport has, reassembles and decodes them,
//!    and queues the resulting events for the UI,
//! 2. drains the UI's outbound requests into the session,
//! 3. writes every pending PDU to the transport.
//!
//! `drive` never waits for data. Waiting is up to the caller.

use std::collections::VecDeque;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::channel::bridge::{CompletionCallback, EventBridge};
use crate::channel::error::{ChannelError, Result};
use crate::channel::reassembler::Reassembler;
use crate::channel::transport::ChannelTransport;
use crate::cliprdr::{ChannelPhase, CliprdrError, CliprdrSession, FormatListOutcome, SessionOutput};
use crate::utils::HexDump;

/// Default cap on a reassembled message (16 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default number of chunks read per `drive` call
pub const DEFAULT_MAX_CHUNKS_PER_PUMP: usize = 64;

/// Pump limits
#[derive(Debug, Clone)]
pub struct PumpConfig {
    /// Largest logical message accepted by the reassembler
    pub max_message_size: usize,
    /// Chunks read per `drive` call before yielding
    pub max_chunks_per_pump: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_chunks_per_pump: DEFAULT_MAX_CHUNKS_PER_PUMP,
        }
    }
}

/// What one `drive` call did
#[derive(Debug, Default)]
pub struct PumpReport {
    /// Chunks taken from the transport
    pub chunks_read: usize,
    /// Complete PDUs processed by the session
    pub pdus_processed: usize,
    /// UI requests taken from the bridge
    pub requests_submitted: usize,
    /// Bytes handed to the transport
    pub bytes_written: usize,
    /// Events queued for the UI
    pub events: usize,
    /// Recoverable errors; each cost at most one message or request
    pub errors: Vec<ChannelError>,
    /// FormatList sends resolved by the peer
    pub outcomes: Vec<FormatListOutcome>,
}

impl PumpReport {
    /// True if the call found nothing to do
    pub fn is_idle(&self) -> bool {
        self.chunks_read == 0 && self.requests_submitted == 0 && self.bytes_written == 0
    }
}

/// Cumulative counters for one channel
#[derive(Debug, Default, Clone, Serialize)]
pub struct ChannelStats {
    /// Number of `drive` calls
    pub drives: u64,
    /// Chunks read from the transport
    pub chunks_read: u64,
    /// PDUs accepted by the session
    pub pdus_processed: u64,
    /// PDUs written to the transport
    pub pdus_written: u64,
    /// Bytes written to the transport
    pub bytes_written: u64,
    /// Events queued for the UI
    pub events_delivered: u64,
    /// UI requests taken from the bridge
    pub requests_submitted: u64,
    /// UI requests the session refused
    pub requests_rejected: u64,
    /// FormatList sends answered with FAIL
    pub format_lists_rejected: u64,
    /// Recoverable errors
    pub errors: u64,
}

impl ChannelStats {
    fn record(&mut self, report: &PumpReport) {
        self.drives += 1;
        self.chunks_read += report.chunks_read as u64;
        self.pdus_processed += report.pdus_processed as u64;
        self.bytes_written += report.bytes_written as u64;
        self.events_delivered += report.events as u64;
        self.requests_submitted += report.requests_submitted as u64;
        self.errors += report.errors.len() as u64;
        self.format_lists_rejected += report.outcomes.iter().filter(|o| !o.status.is_ok()).count() as u64;
    }
}

struct PendingWrite {
    data: Bytes,
    callback: Option<CompletionCallback>,
}

/// Per-connection driver for one clipboard channel
pub struct ChannelPump<T: ChannelTransport> {
    transport: T,
    reassembler: Reassembler,
    session: CliprdrSession,
    bridge: Arc<EventBridge>,
    pending: VecDeque<PendingWrite>,
    max_chunks_per_pump: usize,
    stats: ChannelStats,
}

impl<T: ChannelTransport> ChannelPump<T> {
    /// Assemble a pump around an opened channel
    pub fn new(transport: T, session: CliprdrSession, bridge: Arc<EventBridge>, config: PumpConfig) -> Self {
        Self {
            transport,
            reassembler: Reassembler::new(config.max_message_size),
            session,
            bridge,
            pending: VecDeque::new(),
            max_chunks_per_pump: config.max_chunks_per_pump.max(1),
            stats: ChannelStats::default(),
        }
    }

    /// Bridge shared with the UI
    pub fn bridge(&self) -> Arc<EventBridge> {
        Arc::clone(&self.bridge)
    }

    /// Protocol session
    pub fn session(&self) -> &CliprdrSession {
        &self.session
    }

    /// Current handshake phase
    pub fn phase(&self) -> ChannelPhase {
        self.session.phase()
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Counters accumulated over all `drive` calls
    pub fn stats(&self) -> &ChannelStats {
        &self.stats
    }

    /// PDUs queued but not yet written
    pub fn pending_writes(&self) -> usize {
        self.pending.len()
    }

    /// Run one cooperative processing step
    ///
    /// # Returns
    ///
    /// A report of the work done. Per-message failures (malformed PDUs,
    /// reassembly mismatches, sequence anomalies, rejected requests) are
    /// listed in the report and processing continues.
    ///
    /// # Errors
    ///
    /// Transport failures, inbound queue overflow and use after
    /// [`ChannelPump::close`]. The caller decides whether to close.
    pub fn drive(&mut self) -> Result<PumpReport> {
        if self.phase() == ChannelPhase::Closed {
            return Err(CliprdrError::ChannelClosed.into());
        }

        let mut report = PumpReport::default();

        let result = self
            .read_inbound(&mut report)
            .and_then(|()| self.submit_outbound(&mut report))
            .and_then(|()| self.flush(&mut report));

        self.stats.record(&report);
        if !report.is_idle() {
            debug!(
                "Pump: {} chunks, {} PDUs, {} requests, {} bytes written, {} events, {} errors",
                report.chunks_read,
                report.pdus_processed,
                report.requests_submitted,
                report.bytes_written,
                report.events,
                report.errors.len()
            );
        }

        result.map(|()| report)
    }

    /// Close the channel
    ///
    /// Drops the partial reassembly buffer and all outstanding-response
    /// bookkeeping, fails unsent writes with `ChannelClosed`, and closes the
    /// bridge. Calling it twice is harmless.
    pub fn close(&mut self) {
        if self.phase() == ChannelPhase::Closed {
            return;
        }

        info!("Closing clipboard channel");
        self.session.close();
        self.reassembler.reset();

        for write in self.pending.drain(..) {
            if let Some(callback) = write.callback {
                callback(Err(CliprdrError::ChannelClosed));
            }
        }

        self.bridge.close();
    }

    fn read_inbound(&mut self, report: &mut PumpReport) -> Result<()> {
        for _ in 0..self.max_chunks_per_pump {
            let Some(chunk) = self.transport.read_chunk()? else {
                break;
            };
            report.chunks_read += 1;

            match self.reassembler.feed(chunk) {
                Ok(Some(message)) => self.process_message(&message, report)?,
                Ok(None) => {}
                Err(e) => {
                    warn!("Dropping channel message: {}", e);
                    report.errors.push(e);
                }
            }
        }

        Ok(())
    }

    fn process_message(&mut self, message: &[u8], report: &mut PumpReport) -> Result<()> {
        trace!("Received {} bytes:\n{}", message.len(), HexDump(message));

        match self.session.process_bytes(message) {
            Ok(output) => {
                report.pdus_processed += 1;
                self.apply_output(output, None, report)
            }
            Err(e) => {
                warn!("Dropping clipboard PDU: {}", e);
                report.errors.push(e.into());
                Ok(())
            }
        }
    }

    fn submit_outbound(&mut self, report: &mut PumpReport) -> Result<()> {
        // Only what was queued before this call; later requests wait for the next one
        let queued = self.bridge.outbound_len();

        for _ in 0..queued {
            let Some(request) = self.bridge.pop_outbound() else {
                break;
            };
            let (event, callback) = request.into_parts();
            let name = event.name();
            report.requests_submitted += 1;

            match self.session.submit(event) {
                Ok(output) => self.apply_output(output, callback, report)?,
                Err(e) => {
                    warn!("Rejected {} request: {}", name, e);
                    self.stats.requests_rejected += 1;
                    if let Some(callback) = callback {
                        callback(Err(e.clone()));
                    }
                    report.errors.push(e.into());
                }
            }
        }

        Ok(())
    }

    fn apply_output(
        &mut self,
        output: SessionOutput,
        callback: Option<CompletionCallback>,
        report: &mut PumpReport,
    ) -> Result<()> {
        let SessionOutput {
            events,
            writes,
            outcomes,
            errors,
        } = output;

        // The callback rides on the last write of the request
        let mut callback = callback;
        let count = writes.len();
        for (i, data) in writes.into_iter().enumerate() {
            let callback = if i + 1 == count { callback.take() } else { None };
            self.pending.push_back(PendingWrite { data, callback });
        }
        if let Some(callback) = callback {
            callback(Ok(()));
        }

        for event in events {
            self.bridge.push_inbound(event)?;
            report.events += 1;
        }

        report.errors.extend(errors.into_iter().map(ChannelError::from));
        report.outcomes.extend(outcomes);
        Ok(())
    }

    fn flush(&mut self, report: &mut PumpReport) -> Result<()> {
        while let Some(write) = self.pending.pop_front() {
            let len = write.data.len();
            trace!("Writing {} bytes:\n{}", len, HexDump(&write.data));

            if let Err(e) = self.transport.write_bytes(write.data) {
                warn!("Transport write failed: {}", e);
                if let Some(callback) = write.callback {
                    callback(Err(CliprdrError::ChannelClosed));
                }
                return Err(e);
            }

            report.bytes_written += len;
            self.stats.pdus_written += 1;
            if let Some(callback) = write.callback {
                callback(Ok(()));
            }
        }

        Ok(())
    }
}

impl<T: ChannelTransport> Drop for ChannelPump<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: ChannelTransport> std::fmt::Debug for ChannelPump<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPump")
            .field("phase", &self.phase())
            .field("pending_writes", &self.pending.len())
            .field("reassembling", &self.reassembler.in_progress())
            .field("bridge", &self.bridge)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::chunk::ChannelChunk;
    use crate::channel::transport::{MemoryTransport, MemoryTransportHandle, MockChannelTransport};
    use crate::cliprdr::{
        ClipboardPdu, FormatEntry, FormatList, InboundEvent, OutboundEvent, ResponseStatus, SessionConfig,
    };
    use std::sync::Mutex;

    const MONITOR_READY: [u8; 8] = [0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

    fn quiet_session() -> CliprdrSession {
        CliprdrSession::new(SessionConfig {
            announce_capabilities: false,
            ..Default::default()
        })
    }

    fn memory_pump() -> (ChannelPump<MemoryTransport>, MemoryTransportHandle) {
        let (transport, handle) = MemoryTransport::pair();
        let pump = ChannelPump::new(
            transport,
            quiet_session(),
            Arc::new(EventBridge::unbounded()),
            PumpConfig::default(),
        );
        (pump, handle)
    }

    fn recorder() -> (
        Arc<Mutex<Vec<std::result::Result<(), CliprdrError>>>>,
        impl FnOnce(std::result::Result<(), CliprdrError>) + Send + 'static,
    ) {
        let results = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&results);
        (results, move |r| sink.lock().unwrap().push(r))
    }

    #[test]
    fn test_idle_drive() {
        let (mut pump, _handle) = memory_pump();
        let report = pump.drive().unwrap();
        assert!(report.is_idle());
        assert_eq!(pump.stats().drives, 1);
    }

    #[test]
    fn test_monitor_ready_reaches_ui() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_pdu(MONITOR_READY.to_vec(), 3);

        let report = pump.drive().unwrap();
        assert_eq!(report.chunks_read, 3);
        assert_eq!(report.pdus_processed, 1);
        assert_eq!(pump.phase(), ChannelPhase::Ready);
        assert_eq!(pump.bridge().pop_inbound(), Some(InboundEvent::SyncReady));
    }

    #[test]
    fn test_format_list_request_written_with_callback() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_pdu(MONITOR_READY.to_vec(), 1600);
        pump.drive().unwrap();

        let (results, callback) = recorder();
        let list = FormatList::new(vec![FormatEntry::text(), FormatEntry::html()]);
        pump.bridge()
            .push_outbound_with_callback(OutboundEvent::SendFormatList(list.clone()), callback)
            .unwrap();
        assert!(results.lock().unwrap().is_empty());

        let report = pump.drive().unwrap();
        assert_eq!(report.requests_submitted, 1);
        assert_eq!(*results.lock().unwrap(), vec![Ok(())]);

        let written = handle.take_written();
        assert_eq!(written.len(), 1);
        assert_eq!(
            ClipboardPdu::decode(&written[0]).unwrap(),
            ClipboardPdu::FormatList(list)
        );
    }

    #[test]
    fn test_second_format_list_rejected_busy() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_pdu(MONITOR_READY.to_vec(), 1600);
        pump.drive().unwrap();

        let (results, callback) = recorder();
        let bridge = pump.bridge();
        bridge
            .push_outbound(OutboundEvent::SendFormatList(FormatList::new(vec![FormatEntry::text()])))
            .unwrap();
        bridge
            .push_outbound_with_callback(OutboundEvent::SendFormatList(FormatList::default()), callback)
            .unwrap();

        let report = pump.drive().unwrap();
        assert_eq!(report.errors, vec![ChannelError::Protocol(CliprdrError::Busy("FormatList"))]);
        assert_eq!(*results.lock().unwrap(), vec![Err(CliprdrError::Busy("FormatList"))]);
        assert_eq!(pump.stats().requests_rejected, 1);
        assert_eq!(handle.take_written().len(), 1);
    }

    #[test]
    fn test_request_before_ready_rejected() {
        let (mut pump, _handle) = memory_pump();
        let (results, callback) = recorder();
        pump.bridge()
            .push_outbound_with_callback(OutboundEvent::SendDataRequest { format_id: 1 }, callback)
            .unwrap();

        pump.drive().unwrap();
        assert_eq!(*results.lock().unwrap(), vec![Err(CliprdrError::NotReady("disconnected"))]);
    }

    #[test]
    fn test_fail_response_reported() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_pdu(MONITOR_READY.to_vec(), 1600);
        pump.drive().unwrap();

        let list = FormatList::new(vec![FormatEntry::unicode_text()]);
        pump.bridge()
            .push_outbound(OutboundEvent::SendFormatList(list.clone()))
            .unwrap();
        pump.drive().unwrap();
        pump.bridge().pop_inbound();

        handle.deliver_pdu(vec![0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00], 1600);
        let report = pump.drive().unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.outcomes[0].status, ResponseStatus::Fail);
        assert_eq!(
            pump.bridge().pop_inbound(),
            Some(InboundEvent::FormatListRejected(list))
        );
        assert_eq!(pump.stats().format_lists_rejected, 1);
    }

    #[test]
    fn test_malformed_pdu_does_not_stop_pump() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_pdu(vec![0x02, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 1, 2, 3, 4, 5], 1600);
        handle.deliver_pdu(MONITOR_READY.to_vec(), 1600);

        let report = pump.drive().unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors[0],
            ChannelError::Protocol(CliprdrError::MalformedMessage { .. })
        ));
        assert_eq!(pump.phase(), ChannelPhase::Ready);
    }

    #[test]
    fn test_chunk_budget_per_drive() {
        let (transport, handle) = MemoryTransport::pair();
        let mut pump = ChannelPump::new(
            transport,
            quiet_session(),
            Arc::new(EventBridge::unbounded()),
            PumpConfig {
                max_chunks_per_pump: 2,
                ..Default::default()
            },
        );
        handle.deliver_pdu(MONITOR_READY.to_vec(), 2);

        assert_eq!(pump.drive().unwrap().chunks_read, 2);
        assert_eq!(pump.phase(), ChannelPhase::Disconnected);
        assert_eq!(pump.drive().unwrap().chunks_read, 2);
        assert_eq!(pump.phase(), ChannelPhase::Ready);
    }

    #[test]
    fn test_write_failure_fails_callback() {
        let mut ready = Some(ChannelChunk::whole(MONITOR_READY.to_vec()));
        let mut transport = MockChannelTransport::new();
        transport.expect_read_chunk().returning(move || Ok(ready.take()));
        transport
            .expect_write_bytes()
            .returning(|_| Err(ChannelError::Transport("broken pipe".to_string())));

        let mut pump = ChannelPump::new(
            transport,
            quiet_session(),
            Arc::new(EventBridge::unbounded()),
            PumpConfig::default(),
        );
        pump.drive().unwrap();

        let (results, callback) = recorder();
        pump.bridge()
            .push_outbound_with_callback(OutboundEvent::SendDataRequest { format_id: 13 }, callback)
            .unwrap();

        let err = pump.drive().unwrap_err();
        assert_eq!(err, ChannelError::Transport("broken pipe".to_string()));
        assert_eq!(*results.lock().unwrap(), vec![Err(CliprdrError::ChannelClosed)]);
    }

    #[test]
    fn test_close_discards_state() {
        let (mut pump, handle) = memory_pump();
        handle.deliver_flags(vec![0x02, 0x00], crate::channel::chunk::CHANNEL_FLAG_FIRST, 80);
        pump.drive().unwrap();

        pump.close();
        assert_eq!(pump.phase(), ChannelPhase::Closed);
        assert!(pump.bridge().is_closed());
        assert_eq!(
            pump.drive().unwrap_err(),
            ChannelError::Protocol(CliprdrError::ChannelClosed)
        );
        pump.close();
    }
}
