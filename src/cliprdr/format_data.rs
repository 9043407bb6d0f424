//! Format data request/response tracking.
//!
//! One local data request may be in flight at a time. Requests from the peer
//! are queued in arrival order and answered oldest-first.

use bytes::Bytes;
use std::collections::VecDeque;
use tracing::{debug, warn};

use crate::cliprdr::error::{CliprdrError, Result};
use crate::cliprdr::pdu::{ClipboardPdu, ResponseStatus};

/// Bookkeeping for FormatDataRequest/FormatDataResponse exchanges
#[derive(Debug, Default)]
pub struct FormatDataTracker {
    /// Format we asked the peer for
    outstanding: Option<u32>,
    /// Peer requests not yet answered
    remote_requests: VecDeque<u32>,
}

impl FormatDataTracker {
    /// Create an idle tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Format ID of our in-flight request
    pub fn outstanding(&self) -> Option<u32> {
        self.outstanding
    }

    /// Number of peer requests awaiting an answer
    pub fn pending_remote_requests(&self) -> usize {
        self.remote_requests.len()
    }

    /// Build a FormatDataRequest PDU and mark it outstanding
    pub fn send_request(&mut self, format_id: u32) -> Result<Bytes> {
        if let Some(pending) = self.outstanding {
            debug!(
                "Data request for {:#x} rejected, {:#x} still outstanding",
                format_id, pending
            );
            return Err(CliprdrError::Busy("FormatDataRequest"));
        }

        let pdu = ClipboardPdu::FormatDataRequest { format_id }.encode()?;
        self.outstanding = Some(format_id);
        Ok(pdu)
    }

    /// Resolve our in-flight request
    ///
    /// Returns the requested format and the data (`None` on FAIL).
    pub fn on_response(&mut self, status: ResponseStatus, data: Bytes) -> Result<(u32, Option<Bytes>)> {
        let format_id = self.outstanding.take().ok_or_else(|| {
            CliprdrError::ProtocolSequence("FormatDataResponse without an outstanding request".to_string())
        })?;

        if status.is_ok() {
            debug!("Data response for {:#x}: {} bytes", format_id, data.len());
            Ok((format_id, Some(data)))
        } else {
            warn!("Peer failed data request for {:#x}", format_id);
            Ok((format_id, None))
        }
    }

    /// Record a request from the peer
    pub fn on_remote_request(&mut self, format_id: u32) {
        debug!("Peer requests data for {:#x}", format_id);
        self.remote_requests.push_back(format_id);
    }

    /// Build the answer to the oldest peer request
    pub fn respond(&mut self, data: Option<Bytes>) -> Result<Bytes> {
        let format_id = self.remote_requests.pop_front().ok_or_else(|| {
            CliprdrError::ProtocolSequence("FormatDataResponse without a pending peer request".to_string())
        })?;

        let pdu = match data {
            Some(data) => ClipboardPdu::FormatDataResponse {
                status: ResponseStatus::Ok,
                data,
            },
            None => ClipboardPdu::FormatDataResponse {
                status: ResponseStatus::Fail,
                data: Bytes::new(),
            },
        };

        debug!("Answering data request for {:#x}", format_id);
        pdu.encode()
    }

    /// Forget all state (channel closed)
    pub fn reset(&mut self) {
        self.outstanding = None;
        self.remote_requests.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_response() {
        let mut tracker = FormatDataTracker::new();
        tracker.send_request(13).unwrap();
        assert_eq!(tracker.outstanding(), Some(13));

        let (format_id, data) = tracker
            .on_response(ResponseStatus::Ok, Bytes::from_static(b"h\0i\0"))
            .unwrap();
        assert_eq!(format_id, 13);
        assert_eq!(data.unwrap().as_ref(), b"h\0i\0");
        assert!(tracker.outstanding().is_none());
    }

    #[test]
    fn test_second_request_busy() {
        let mut tracker = FormatDataTracker::new();
        tracker.send_request(13).unwrap();
        assert_eq!(tracker.send_request(1), Err(CliprdrError::Busy("FormatDataRequest")));
    }

    #[test]
    fn test_failed_response() {
        let mut tracker = FormatDataTracker::new();
        tracker.send_request(1).unwrap();
        let (_, data) = tracker.on_response(ResponseStatus::Fail, Bytes::new()).unwrap();
        assert!(data.is_none());
    }

    #[test]
    fn test_unsolicited_response() {
        let mut tracker = FormatDataTracker::new();
        assert!(tracker.on_response(ResponseStatus::Ok, Bytes::new()).is_err());
    }

    #[test]
    fn test_remote_requests_answered_in_order() {
        let mut tracker = FormatDataTracker::new();
        tracker.on_remote_request(1);
        tracker.on_remote_request(0xD010);
        assert_eq!(tracker.pending_remote_requests(), 2);

        let first = tracker.respond(Some(Bytes::from_static(b"abc"))).unwrap();
        assert_eq!(&first[..8], &[0x05, 0x00, 0x01, 0x00, 0x03, 0x00, 0x00, 0x00]);

        let second = tracker.respond(None).unwrap();
        assert_eq!(second.as_ref(), &[0x05, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00]);

        assert!(tracker.respond(None).is_err());
    }
}
