//! Tests for the sync codec: byte layout, error handling and edge cases.

use multipart_core::PartDescriptor;
use multipart_sync::codec::{decode, encode};
use multipart_sync::{ProtocolError, SyncConfig, SyncError, SyncMessage};
use multipart_types::PartTypeId;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn descriptor(id: &str, payload: &[u8]) -> PartDescriptor {
    PartDescriptor::new(PartTypeId::new(id).unwrap(), payload.to_vec())
}

fn protocol_error(result: Result<SyncMessage, SyncError>) -> ProtocolError {
    match result {
        Err(SyncError::Protocol(e)) => e,
        other => panic!("expected protocol error, got {:?}", other),
    }
}

// ── Layout ────────────────────────────────────────────────────────

#[test]
fn test_redraw_is_a_single_tag_byte() {
    let frame = encode(&SyncMessage::Redraw, &SyncConfig::default()).unwrap();
    assert_eq!(frame, vec![3]);
}

#[test]
fn test_add_layout() {
    let frame = encode(&SyncMessage::Add(descriptor("a:b", b"xy")), &SyncConfig::default()).unwrap();
    assert_eq!(frame, vec![1, 3, b'a', b':', b'b', 0, 0, 0, 2, b'x', b'y']);
}

#[test]
fn test_snapshot_layout() {
    let message = SyncMessage::Snapshot(vec![descriptor("a:b", b""), descriptor("c:d", b"z")]);
    let frame = encode(&message, &SyncConfig::default()).unwrap();
    assert_eq!(
        frame,
        vec![
            0, 2, //
            3, b'a', b':', b'b', 0, 0, 0, 0, //
            3, b'c', b':', b'd', 0, 0, 0, 1, b'z',
        ]
    );
    assert_eq!(decode(&frame, &SyncConfig::default()).unwrap(), message);
}

#[test]
fn test_empty_snapshot() {
    let config = SyncConfig::default();
    let frame = encode(&SyncMessage::Snapshot(Vec::new()), &config).unwrap();
    assert_eq!(frame, vec![0, 0]);
    assert_eq!(decode(&frame, &config).unwrap(), SyncMessage::Snapshot(Vec::new()));
}

// ── Decode errors ─────────────────────────────────────────────────

#[test]
fn test_empty_frame_is_truncated() {
    let err = protocol_error(decode(&[], &SyncConfig::default()));
    assert_eq!(err, ProtocolError::Truncated { needed: 1, remaining: 0 });
}

#[test]
fn test_unknown_tag() {
    let err = protocol_error(decode(&[9], &SyncConfig::default()));
    assert_eq!(err, ProtocolError::UnknownTag(9));
}

#[test]
fn test_trailing_bytes() {
    let err = protocol_error(decode(&[3, 0, 0], &SyncConfig::default()));
    assert_eq!(err, ProtocolError::TrailingBytes(2));
}

#[test]
fn test_remove_without_index() {
    let err = protocol_error(decode(&[2], &SyncConfig::default()));
    assert!(matches!(err, ProtocolError::Truncated { .. }));
}

#[test]
fn test_truncated_payload() {
    let frame = vec![1, 3, b'a', b':', b'b', 0, 0, 0, 5, b'x'];
    let err = protocol_error(decode(&frame, &SyncConfig::default()));
    assert_eq!(err, ProtocolError::Truncated { needed: 5, remaining: 1 });
}

#[test]
fn test_snapshot_shorter_than_its_count() {
    let frame = vec![0, 2, 3, b'a', b':', b'b', 0, 0, 0, 0];
    let err = protocol_error(decode(&frame, &SyncConfig::default()));
    assert!(matches!(err, ProtocolError::Truncated { .. }));
}

#[test]
fn test_invalid_type_id() {
    let frame = vec![1, 3, b'A', b'B', b'C', 0, 0, 0, 0];
    let err = protocol_error(decode(&frame, &SyncConfig::default()));
    assert_eq!(err, ProtocolError::InvalidTypeId("ABC".to_string()));

    let frame = vec![1, 2, 0xff, 0xfe, 0, 0, 0, 0];
    let err = protocol_error(decode(&frame, &SyncConfig::default()));
    assert!(matches!(err, ProtocolError::InvalidTypeId(_)));
}

// ── Size limits ───────────────────────────────────────────────────

#[test]
fn test_payload_limit_applies_on_encode() {
    let config = SyncConfig {
        max_payload_len: 4,
        ..SyncConfig::default()
    };
    let err = encode(&SyncMessage::Add(descriptor("a:b", b"12345")), &config).unwrap_err();
    assert!(matches!(err, SyncError::PayloadTooLarge { len: 5, max: 4 }));
}

#[test]
fn test_payload_limit_applies_on_decode() {
    let frame = encode(&SyncMessage::Add(descriptor("a:b", b"12345")), &SyncConfig::default()).unwrap();
    let config = SyncConfig {
        max_payload_len: 4,
        ..SyncConfig::default()
    };
    let err = decode(&frame, &config).unwrap_err();
    assert!(matches!(err, SyncError::PayloadTooLarge { len: 5, max: 4 }));
}

#[test]
fn test_huge_declared_payload_is_refused_before_reading() {
    let mut frame = vec![1, 3, b'a', b':', b'b'];
    frame.extend_from_slice(&u32::MAX.to_be_bytes());
    let err = decode(&frame, &SyncConfig::default()).unwrap_err();
    assert!(matches!(err, SyncError::PayloadTooLarge { .. }));
}

#[test]
fn test_message_size_limit() {
    let config = SyncConfig {
        max_message_size: 8,
        ..SyncConfig::default()
    };
    let message = SyncMessage::Add(descriptor("a:b", b"0123456789"));
    assert!(matches!(
        encode(&message, &config),
        Err(SyncError::MessageTooLarge { max: 8, .. })
    ));

    let frame = encode(&message, &SyncConfig::default()).unwrap();
    assert!(matches!(
        decode(&frame, &config),
        Err(SyncError::MessageTooLarge { max: 8, .. })
    ));
}

#[test]
fn test_payload_limit_is_clamped_to_the_length_prefix() {
    let config = SyncConfig {
        max_payload_len: usize::MAX,
        ..SyncConfig::default()
    };
    assert_eq!(config.effective_max_payload_len(), u32::MAX as usize);

    let message = SyncMessage::Add(descriptor("a:b", b"xyz"));
    let frame = encode(&message, &config).unwrap();
    assert_eq!(&frame[5..9], &[0, 0, 0, 3]);
    assert_eq!(decode(&frame, &config).unwrap(), message);
}

#[test]
fn test_snapshot_over_255_parts_is_refused() {
    let parts = vec![descriptor("a:b", b""); 256];
    let err = encode(&SyncMessage::Snapshot(parts), &SyncConfig::default()).unwrap_err();
    assert!(matches!(err, SyncError::Protocol(ProtocolError::TooManyParts(256))));
}

#[test]
fn test_snapshot_of_exactly_255_parts() {
    let config = SyncConfig::default();
    let message = SyncMessage::Snapshot(vec![descriptor("a:b", b"p"); 255]);
    let frame = encode(&message, &config).unwrap();
    assert_eq!(frame[1], 255);
    assert_eq!(decode(&frame, &config).unwrap(), message);
}

// ── Properties ────────────────────────────────────────────────────

fn arb_descriptor() -> impl Strategy<Value = PartDescriptor> {
    (
        "[a-z]{1,8}:[a-z0-9_/]{1,16}",
        prop::collection::vec(any::<u8>(), 0..64),
    )
        .prop_map(|(id, payload)| PartDescriptor::new(PartTypeId::new(id).unwrap(), payload))
}

fn arb_message() -> impl Strategy<Value = SyncMessage> {
    prop_oneof![
        prop::collection::vec(arb_descriptor(), 0..8).prop_map(SyncMessage::Snapshot),
        arb_descriptor().prop_map(SyncMessage::Add),
        any::<u8>().prop_map(SyncMessage::Remove),
        Just(SyncMessage::Redraw),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(message in arb_message()) {
        let config = SyncConfig::default();
        let frame = encode(&message, &config).unwrap();
        prop_assert_eq!(decode(&frame, &config).unwrap(), message);
    }

    #[test]
    fn decode_never_panics_on_garbage(frame in prop::collection::vec(any::<u8>(), 0..128)) {
        let _ = decode(&frame, &SyncConfig::default());
    }

    #[test]
    fn any_strict_prefix_fails_to_decode(message in arb_message()) {
        let config = SyncConfig::default();
        let frame = encode(&message, &config).unwrap();
        for len in 0..frame.len() {
            prop_assert!(decode(&frame[..len], &config).is_err());
        }
    }
}
