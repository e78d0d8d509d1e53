//! Integration tests for the message lifecycle across an outage.
//!
//! Exercises the path a record-only message follows when the backend is
//! unreachable: encoded, queued, snapshotted to persistent storage, restored
//! after a reboot, and drained oldest-first.

use fabomatic_core::CardUid;
use fabomatic_protocol::{BufferedMsg, MessageBuffer, Query, Response, SimpleResponse};

const TOPIC: &str = "/machine/laser1";

fn buffered(query: &Query) -> BufferedMsg {
    BufferedMsg::new(
        query.payload().expect("encodable query"),
        TOPIC.to_string(),
        query.wait_for_reply(),
    )
}

#[test]
fn test_outage_queue_survives_reboot_in_order() {
    let uid = CardUid::new(0xAABBCCD1);
    let mut buf = MessageBuffer::new();

    // Session recorded while offline.
    buf.push_back(buffered(&Query::StartUse { uid }));
    buf.push_back(buffered(&Query::StopUse { uid, duration: 120 }));
    buf.push_back(buffered(&Query::Maintenance { uid }));

    // Reboot: snapshot, then restore.
    let snapshot = buf.to_json().expect("encodable snapshot");
    let mut restored = MessageBuffer::from_json(&snapshot).expect("valid snapshot");
    assert_eq!(restored.len(), 3);

    // Drained oldest-first so the server sees events in causal order.
    let first = restored.pop_front().expect("start message");
    let parsed: Query = serde_json::from_str(&first.payload).expect("valid payload");
    assert_eq!(parsed, Query::StartUse { uid });

    let second = restored.pop_front().expect("stop message");
    let parsed: Query = serde_json::from_str(&second.payload).expect("valid payload");
    assert_eq!(parsed, Query::StopUse { uid, duration: 120 });

    let third = restored.pop_front().expect("maintenance message");
    let parsed: Query = serde_json::from_str(&third.payload).expect("valid payload");
    assert_eq!(parsed, Query::Maintenance { uid });
}

#[test]
fn test_failed_retransmission_keeps_position() {
    let uid = CardUid::new(0x1111);
    let mut buf = MessageBuffer::new();
    buf.push_back(buffered(&Query::StartUse { uid }));
    buf.push_back(buffered(&Query::StopUse { uid, duration: 7 }));

    // Retransmission attempt fails: the message goes back to the front so
    // ordering is preserved for the next attempt.
    let taken = buf.pop_front().expect("queued message");
    buf.push_front(taken.clone());
    assert_eq!(buf.pop_front().as_ref(), Some(&taken));
}

#[test]
fn test_record_reply_roundtrip() {
    let reply = SimpleResponse::from_payload(r#"{"request_ok":true}"#);
    assert!(reply.request_ok());

    let reply = SimpleResponse::from_payload("garbage");
    assert!(!reply.request_ok());
}
