//! Format List Manager
//!
//! Owns the local and remote format catalogs of one connection.
//!
//! - Every remote FormatList is acknowledged with exactly one
//!   `FormatListResponse(OK)`, produced synchronously while the list is
//!   handled, independent of how fast the UI consumes events.
//! - At most one local FormatList is in flight. A second send while a
//!   response is outstanding is rejected with [`CliprdrError::Busy`].
//! - A FAIL response resolves the send as failed; nothing is retried.

use bytes::Bytes;
use tracing::{debug, warn};

use crate::cliprdr::error::{CliprdrError, Result};
use crate::cliprdr::formats::FormatList;
use crate::cliprdr::pdu::{ClipboardPdu, ResponseStatus};

/// Resolution of a FormatList we sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatListOutcome {
    /// The list that was sent
    pub list: FormatList,
    /// Peer's answer
    pub status: ResponseStatus,
}

/// Local/remote format catalogs and the outstanding-send bookkeeping
#[derive(Debug, Default)]
pub struct FormatListManager {
    /// Last list the peer acknowledged
    local: Option<FormatList>,
    /// Most recent list received from the peer
    remote: Option<FormatList>,
    /// List sent and awaiting a response
    outstanding: Option<FormatList>,
    last_outcome: Option<FormatListOutcome>,
    acks_sent: u64,
}

impl FormatListManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recent remote format list
    pub fn remote_format_list(&self) -> Option<&FormatList> {
        self.remote.as_ref()
    }

    /// Last local format list acknowledged by the peer
    pub fn local_format_list(&self) -> Option<&FormatList> {
        self.local.as_ref()
    }

    /// List currently awaiting a response
    pub fn outstanding(&self) -> Option<&FormatList> {
        self.outstanding.as_ref()
    }

    /// Resolution of the most recent send
    pub fn last_outcome(&self) -> Option<&FormatListOutcome> {
        self.last_outcome.as_ref()
    }

    /// Number of FormatListResponse(OK) PDUs produced so far
    pub fn acks_sent(&self) -> u64 {
        self.acks_sent
    }

    /// Store a remote format list and build its acknowledgment
    ///
    /// Returns the encoded `FormatListResponse(OK)` PDU, which must be
    /// written before the next remote list is accepted.
    pub fn on_remote_format_list(&mut self, list: FormatList) -> Result<Bytes> {
        debug!("Remote format list: {} formats {:x?}", list.len(), list.ids());

        let ack = ClipboardPdu::FormatListResponse(ResponseStatus::Ok).encode()?;
        self.remote = Some(list);
        self.acks_sent += 1;

        Ok(ack)
    }

    /// Resolve the outstanding send with the peer's answer
    pub fn on_format_list_response(&mut self, status: ResponseStatus) -> Result<FormatListOutcome> {
        let Some(list) = self.outstanding.take() else {
            return Err(CliprdrError::ProtocolSequence(
                "FormatListResponse without an outstanding FormatList".to_string(),
            ));
        };

        if status.is_ok() {
            debug!("Format list acknowledged: {:x?}", list.ids());
            self.local = Some(list.clone());
        } else {
            warn!("Peer rejected format list {:x?}", list.ids());
        }

        let outcome = FormatListOutcome { list, status };
        self.last_outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Build a FormatList PDU and mark it outstanding
    pub fn send_format_list(&mut self, list: FormatList) -> Result<Bytes> {
        if self.outstanding.is_some() {
            return Err(CliprdrError::Busy("FormatList"));
        }

        let pdu = ClipboardPdu::FormatList(list.clone()).encode()?;
        debug!("Sending format list: {:x?}", list.ids());
        self.outstanding = Some(list);

        Ok(pdu)
    }

    /// Forget all state (channel closed)
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cliprdr::formats::FormatEntry;

    fn text_and_html() -> FormatList {
        FormatList::new(vec![FormatEntry::text(), FormatEntry::html()])
    }

    #[test]
    fn test_remote_list_is_acknowledged_once() {
        let mut manager = FormatListManager::new();
        let ack = manager.on_remote_format_list(text_and_html()).unwrap();

        assert_eq!(ack.as_ref(), &[0x03, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(manager.acks_sent(), 1);
        assert_eq!(manager.remote_format_list(), Some(&text_and_html()));

        manager.on_remote_format_list(FormatList::default()).unwrap();
        assert_eq!(manager.acks_sent(), 2);
        assert!(manager.remote_format_list().unwrap().is_empty());
    }

    #[test]
    fn test_send_then_ok() {
        let mut manager = FormatListManager::new();
        let pdu = manager.send_format_list(text_and_html()).unwrap();
        assert_eq!(pdu.len(), 8 + 72);
        assert_eq!(manager.outstanding(), Some(&text_and_html()));

        let outcome = manager.on_format_list_response(ResponseStatus::Ok).unwrap();
        assert_eq!(outcome.status, ResponseStatus::Ok);
        assert!(manager.outstanding().is_none());
        assert_eq!(manager.local_format_list(), Some(&text_and_html()));
    }

    #[test]
    fn test_send_then_fail_is_not_retried() {
        let mut manager = FormatListManager::new();
        manager.send_format_list(text_and_html()).unwrap();

        let outcome = manager.on_format_list_response(ResponseStatus::Fail).unwrap();
        assert_eq!(outcome.status, ResponseStatus::Fail);
        assert!(manager.outstanding().is_none());
        assert!(manager.local_format_list().is_none());
        assert_eq!(manager.last_outcome(), Some(&outcome));
    }

    #[test]
    fn test_second_send_is_busy() {
        let mut manager = FormatListManager::new();
        manager.send_format_list(text_and_html()).unwrap();

        let err = manager.send_format_list(FormatList::default()).unwrap_err();
        assert_eq!(err, CliprdrError::Busy("FormatList"));
        assert_eq!(manager.outstanding(), Some(&text_and_html()));

        manager.on_format_list_response(ResponseStatus::Ok).unwrap();
        assert!(manager.send_format_list(FormatList::default()).is_ok());
    }

    #[test]
    fn test_unsolicited_response() {
        let mut manager = FormatListManager::new();
        let err = manager.on_format_list_response(ResponseStatus::Ok).unwrap_err();
        assert!(matches!(err, CliprdrError::ProtocolSequence(_)));
    }

    #[test]
    fn test_unencodable_list_is_not_outstanding() {
        let mut manager = FormatListManager::new();
        let list = FormatList::new(vec![FormatEntry::with_name(0xC000, "This name is longer than sixteen")]);
        assert!(manager.send_format_list(list).is_err());
        assert!(manager.outstanding().is_none());
    }
}
