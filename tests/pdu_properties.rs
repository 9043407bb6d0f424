//! Property tests for the codec, reassembly and session invariants

use bytes::Bytes;
use proptest::prelude::*;

use lamco_cliprdr::channel::{ChannelChunk, Reassembler, CHANNEL_FLAG_FIRST, CHANNEL_FLAG_LAST};
use lamco_cliprdr::cliprdr::{
    Capabilities, CapabilitySet, ClipboardPdu, CliprdrSession, FormatEntry, FormatList,
    GeneralCapabilitySet, GeneralFlags, InboundEvent, ResponseStatus, SessionConfig,
};

fn format_entry() -> impl Strategy<Value = FormatEntry> {
    (any::<u32>(), proptest::option::of("[A-Za-z0-9 _]{1,16}")).prop_map(|(id, name)| match name {
        Some(name) => FormatEntry::with_name(id, name),
        None => FormatEntry::new(id),
    })
}

fn format_list() -> impl Strategy<Value = FormatList> {
    proptest::collection::vec(format_entry(), 0..8).prop_map(FormatList::new)
}

fn capability_set() -> impl Strategy<Value = CapabilitySet> {
    prop_oneof![
        (any::<u32>(), any::<u32>()).prop_map(|(version, flags)| {
            CapabilitySet::General(GeneralCapabilitySet {
                version,
                general_flags: GeneralFlags::from_bits(flags),
            })
        }),
        (2u16..=u16::MAX, proptest::collection::vec(any::<u8>(), 0..16)).prop_map(|(set_type, body)| {
            CapabilitySet::Unknown {
                set_type,
                body: Bytes::from(body),
            }
        }),
    ]
}

fn capabilities() -> impl Strategy<Value = Capabilities> {
    prop_oneof![
        any::<u32>().prop_map(|flags| Capabilities::general(GeneralFlags::from_bits(flags))),
        proptest::collection::vec(capability_set(), 0..4).prop_map(|sets| Capabilities { sets }),
    ]
}

/// Split `message` at arbitrary points into correctly flagged chunks
fn chunk_at(message: &Bytes, cuts: &[prop::sample::Index]) -> Vec<ChannelChunk> {
    let total = message.len() as u32;

    let mut bounds: Vec<usize> = cuts
        .iter()
        .filter(|_| message.len() > 1)
        .map(|cut| cut.index(message.len() - 1) + 1)
        .collect();
    bounds.push(0);
    bounds.push(message.len());
    bounds.sort_unstable();
    bounds.dedup();

    let last = bounds.len() - 2;
    bounds
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let mut flags = 0;
            if i == 0 {
                flags |= CHANNEL_FLAG_FIRST;
            }
            if i == last {
                flags |= CHANNEL_FLAG_LAST;
            }
            ChannelChunk::from_flags(message.slice(w[0]..w[1]), flags, total)
        })
        .collect()
}

fn reassemble(chunks: Vec<ChannelChunk>) -> Vec<Bytes> {
    let mut reassembler = Reassembler::new(1 << 20);
    chunks
        .into_iter()
        .filter_map(|chunk| reassembler.feed(chunk).unwrap())
        .collect()
}

fn pdu() -> impl Strategy<Value = ClipboardPdu> {
    prop_oneof![
        Just(ClipboardPdu::MonitorReady),
        format_list().prop_map(ClipboardPdu::FormatList),
        any::<bool>().prop_map(|ok| ClipboardPdu::FormatListResponse(ResponseStatus::from(ok))),
        any::<u32>().prop_map(|format_id| ClipboardPdu::FormatDataRequest { format_id }),
        (any::<bool>(), proptest::collection::vec(any::<u8>(), 0..256)).prop_map(|(ok, data)| {
            ClipboardPdu::FormatDataResponse {
                status: ResponseStatus::from(ok),
                data: Bytes::from(data),
            }
        }),
        capabilities().prop_map(ClipboardPdu::Capabilities),
    ]
}

fn quiet_session() -> CliprdrSession {
    CliprdrSession::new(SessionConfig {
        announce_capabilities: false,
        ..Default::default()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn pdu_roundtrip(message in pdu()) {
        let encoded = message.encode().unwrap();
        prop_assert_eq!(ClipboardPdu::decode(&encoded).unwrap(), message);
    }

    #[test]
    fn any_split_reassembles_to_same_pdu(
        message in pdu(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let encoded = message.encode().unwrap();

        let completed = reassemble(chunk_at(&encoded, &cuts));

        prop_assert_eq!(completed.len(), 1);
        prop_assert_eq!(&completed[0], &encoded);
        prop_assert_eq!(ClipboardPdu::decode(&completed[0]).unwrap(), message);
    }

    #[test]
    fn split_format_list_reaches_ui_intact(
        list in format_list(),
        cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let mut session = quiet_session();
        session.process(ClipboardPdu::MonitorReady).unwrap();

        let encoded = ClipboardPdu::FormatList(list.clone()).encode().unwrap();
        let completed = reassemble(chunk_at(&encoded, &cuts));
        prop_assert_eq!(completed.len(), 1);

        let out = session.process_bytes(&completed[0]).unwrap();
        prop_assert_eq!(out.events, vec![InboundEvent::RemoteFormatList(list)]);
        prop_assert_eq!(out.writes.len(), 1);
    }

    #[test]
    fn repeated_monitor_ready_syncs_once(repeats in 1usize..6) {
        let mut session = quiet_session();
        let mut sync_events = 0;

        for _ in 0..repeats {
            let out = session.process(ClipboardPdu::MonitorReady).unwrap();
            sync_events += out.events.iter().filter(|e| **e == InboundEvent::SyncReady).count();
        }

        prop_assert_eq!(sync_events, 1);
    }

    #[test]
    fn every_remote_format_list_acked_once(lists in proptest::collection::vec(format_list(), 1..6)) {
        let mut session = quiet_session();
        session.process(ClipboardPdu::MonitorReady).unwrap();

        for list in lists {
            let out = session.process(ClipboardPdu::FormatList(list.clone())).unwrap();
            prop_assert_eq!(out.writes.len(), 1);
            prop_assert_eq!(
                ClipboardPdu::decode(&out.writes[0]).unwrap(),
                ClipboardPdu::FormatListResponse(ResponseStatus::Ok)
            );
            prop_assert_eq!(out.events, vec![InboundEvent::RemoteFormatList(list)]);
        }
    }

    #[test]
    fn misaligned_format_list_rejected(extra in 1usize..36, entries in 0usize..4) {
        let body_len = entries * 36 + extra;
        let mut raw = vec![0x02, 0x00, 0x00, 0x00];
        raw.extend_from_slice(&(body_len as u32).to_le_bytes());
        raw.resize(8 + body_len, 0);

        let is_malformed = matches!(
            ClipboardPdu::decode(&raw),
            Err(lamco_cliprdr::CliprdrError::MalformedMessage { .. })
        );
        prop_assert!(is_malformed);
    }
}
