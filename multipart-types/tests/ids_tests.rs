use multipart_types::{ContainerId, OwnerKey, PartId, PeerId, PropertyId};
use std::collections::HashSet;
use std::str::FromStr;

// ── PartId ────────────────────────────────────────────────────────

#[test]
fn part_id_new_is_unique() {
    let a = PartId::new();
    let b = PartId::new();
    assert_ne!(a, b);
}

#[test]
fn part_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    let id = PartId::from_uuid(uuid);
    assert_eq!(id.as_uuid(), uuid);
}

#[test]
fn part_id_display_and_parse() {
    let id = PartId::new();
    let parsed = PartId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn part_id_parse_invalid() {
    assert!(PartId::parse("not-a-uuid").is_err());
    assert!(PartId::from_str("garbage").is_err());
}

#[test]
fn part_id_serde_is_transparent() {
    let id = PartId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
    let back: PartId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

// ── OwnerKey ─────────────────────────────────────────────────────

#[test]
fn owner_key_from_part_id_is_stable() {
    let part = PartId::new();
    assert_eq!(OwnerKey::from(part), OwnerKey::from(part));
    assert_eq!(OwnerKey::from(part).as_uuid(), part.as_uuid());
}

#[test]
fn owner_keys_are_distinct_identities() {
    let keys: HashSet<OwnerKey> = (0..64).map(|_| OwnerKey::new()).collect();
    assert_eq!(keys.len(), 64);
}

// ── Other ids ────────────────────────────────────────────────────

#[test]
fn default_ids_are_unique() {
    assert_ne!(ContainerId::default(), ContainerId::default());
    assert_ne!(PeerId::default(), PeerId::default());
    assert_ne!(PropertyId::default(), PropertyId::default());
}

#[test]
fn ids_are_time_ordered() {
    let first = PeerId::new();
    std::thread::sleep(std::time::Duration::from_millis(2));
    let second = PeerId::new();
    assert!(first < second);
}
