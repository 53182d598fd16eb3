//! Tests for KeyDir
//!
//! These tests verify:
//! - Insert/get/remove semantics
//! - Compare-and-swap relocation
//! - Snapshots are independent of later changes

use emberkv::keydir::{KeyDir, Location};

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_new_keydir_is_empty() {
    let keydir = KeyDir::new();
    assert!(keydir.is_empty());
    assert_eq!(keydir.len(), 0);
    assert_eq!(keydir.live_bytes(), 0);
}

#[test]
fn test_insert_and_get() {
    let mut keydir = KeyDir::new();
    let location = Location::new(1, 0, 30);

    assert_eq!(keydir.insert(b"key".to_vec(), location), None);
    assert_eq!(keydir.get(b"key"), Some(location));
    assert!(keydir.contains(b"key"));
    assert_eq!(keydir.get(b"other"), None);
}

#[test]
fn test_insert_returns_replaced_location() {
    let mut keydir = KeyDir::new();
    let first = Location::new(1, 0, 30);
    let second = Location::new(1, 30, 40);

    keydir.insert(b"key".to_vec(), first);
    assert_eq!(keydir.insert(b"key".to_vec(), second), Some(first));
    assert_eq!(keydir.get(b"key"), Some(second));
    assert_eq!(keydir.len(), 1);
}

#[test]
fn test_remove() {
    let mut keydir = KeyDir::new();
    let location = Location::new(2, 10, 20);
    keydir.insert(b"key".to_vec(), location);

    assert_eq!(keydir.remove(b"key"), Some(location));
    assert_eq!(keydir.remove(b"key"), None);
    assert!(!keydir.contains(b"key"));
}

#[test]
fn test_live_bytes_sums_lengths() {
    let mut keydir = KeyDir::new();
    keydir.insert(b"a".to_vec(), Location::new(1, 0, 10));
    keydir.insert(b"b".to_vec(), Location::new(1, 10, 25));
    keydir.insert(b"a".to_vec(), Location::new(1, 35, 12));

    assert_eq!(keydir.live_bytes(), 37);
    assert_eq!(keydir.iter().count(), 2);
}

// =============================================================================
// Relocation Tests
// =============================================================================

#[test]
fn test_relocate_when_unchanged() {
    let mut keydir = KeyDir::new();
    let old = Location::new(1, 0, 30);
    let new = Location::new(5, 0, 30);
    keydir.insert(b"key".to_vec(), old);

    assert!(keydir.relocate(b"key", old, new));
    assert_eq!(keydir.get(b"key"), Some(new));
}

#[test]
fn test_relocate_skips_overwritten_key() {
    let mut keydir = KeyDir::new();
    let old = Location::new(1, 0, 30);
    let newer = Location::new(6, 0, 31);
    keydir.insert(b"key".to_vec(), old);
    keydir.insert(b"key".to_vec(), newer);

    assert!(!keydir.relocate(b"key", old, Location::new(5, 0, 30)));
    assert_eq!(keydir.get(b"key"), Some(newer));
}

#[test]
fn test_relocate_does_not_resurrect_removed_key() {
    let mut keydir = KeyDir::new();
    let old = Location::new(1, 0, 30);
    keydir.insert(b"key".to_vec(), old);
    keydir.remove(b"key");

    assert!(!keydir.relocate(b"key", old, Location::new(5, 0, 30)));
    assert!(!keydir.contains(b"key"));
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_is_point_in_time() {
    let mut keydir = KeyDir::new();
    keydir.insert(b"a".to_vec(), Location::new(1, 0, 10));
    keydir.insert(b"b".to_vec(), Location::new(1, 10, 10));

    let mut snapshot = keydir.snapshot();
    keydir.insert(b"c".to_vec(), Location::new(1, 20, 10));
    keydir.remove(b"a");

    snapshot.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        snapshot,
        vec![
            (b"a".to_vec(), Location::new(1, 0, 10)),
            (b"b".to_vec(), Location::new(1, 10, 10)),
        ]
    );
}
