#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use crate::config::PoolConfig;
use crate::view::with_str_view;
use crate::well_known::WellKnownName;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn store(pool: &NamePool, s: &str) -> NameEntryId {
    with_str_view(s, |view| pool.store(view))
}

fn max_length_ansi() -> String {
    "0123456789ABCDEF".repeat(64)[..crate::view::MAX_NAME_LEN].to_owned()
}

fn max_length_wide() -> String {
    let mut chars: Vec<char> = max_length_ansi().chars().collect();
    chars[200] = '\u{1F4}';
    chars.into_iter().collect()
}

#[test]
fn test_empty_batch() {
    let pool = NamePool::new();
    let batch = save_name_batch(&pool, &[]);
    assert!(batch.names.is_empty());
    assert_eq!(batch.hashes, HASH_ALGORITHM_ID.to_le_bytes());
    assert_eq!(batch.num_names(), 0);
    assert_eq!(load_name_batch(&pool, &batch.names, &batch.hashes), Ok(vec![]));
}

#[test]
fn test_round_trip() {
    let pool = NamePool::new();
    let mut ids = vec![NameEntryId::NONE, pool.well_known_id(WellKnownName::Box)];

    for long in [max_length_ansi(), max_length_wide()] {
        let units: Vec<char> = long.chars().collect();
        for skip in [0, 1023 - 255, 1023 - 256, 1023 - 257] {
            let tail: String = units[skip..].iter().collect();
            ids.push(store(&pool, &tail));
        }
    }

    // Wide names after odd and even sized narrow names.
    let wide = "Wide\u{EA60}";
    ids.push(store(&pool, wide));
    ids.push(store(&pool, "odd"));
    ids.push(store(&pool, wide));
    ids.push(store(&pool, "even"));
    ids.push(store(&pool, wide));

    let batch = save_name_batch(&pool, &ids);
    assert_eq!(batch.num_names(), ids.len());
    assert_eq!(load_name_batch(&pool, &batch.names, &batch.hashes), Ok(ids.clone()));

    // A foreign algorithm id forces recomputation and still round-trips.
    let mut hashes = batch.hashes.clone();
    hashes[0] = 0xBA;
    hashes[1] = 0xAD;
    assert_eq!(load_name_batch(&pool, &batch.names, &hashes), Ok(ids.clone()));

    let again = save_name_batch(&pool, &ids);
    assert_eq!(again, batch);
}

#[test]
fn test_round_trip_keeps_casing_in_case_preserving_pool() {
    let config = PoolConfig::default().with_case_preserving(true);
    let pool = NamePool::with_config(config.clone());
    let lower = store(&pool, "foo");
    let upper = store(&pool, "FOO");
    let wide = store(&pool, "W\u{3042}de");
    let wide_upper = store(&pool, "W\u{3042}DE");
    assert_ne!(lower, upper);

    let ids = [upper, lower, wide_upper, wide, upper];
    let batch = save_name_batch(&pool, &ids);
    assert_eq!(load_name_batch(&pool, &batch.names, &batch.hashes), Ok(ids.to_vec()));

    let fresh = NamePool::with_config(config);
    let loaded = load_name_batch(&fresh, &batch.names, &batch.hashes).unwrap();
    let strings: Vec<String> = loaded.iter().map(|id| fresh.resolve(*id).to_string()).collect();
    assert_eq!(strings, ["FOO", "foo", "W\u{3042}DE", "W\u{3042}de", "FOO"]);
    assert_eq!(loaded[0], loaded[4]);
    assert_eq!(fresh.comparison_id_of(loaded[0]), fresh.comparison_id_of(loaded[1]));
    assert_eq!(store(&fresh, "foo"), loaded[1]);
}

#[test]
fn test_load_into_fresh_pool() {
    let source = NamePool::new();
    let names = ["Alpha", "\u{3042}\u{3044}", "Beta_3", "gamma"];
    let ids: Vec<NameEntryId> = names.iter().map(|s| store(&source, s)).collect();
    let batch = save_name_batch(&source, &ids);

    let target = NamePool::new();
    let loaded = load_name_batch(&target, &batch.names, &batch.hashes).unwrap();
    let strings: Vec<String> = loaded.iter().map(|id| target.resolve(*id).to_string()).collect();
    assert_eq!(strings, names);
    for (s, id) in names.iter().zip(&loaded) {
        assert_eq!(store(&target, s), *id);
    }
}

#[test]
fn test_utf16_alignment() {
    let pool = NamePool::new();
    let ids = [store(&pool, "odd"), store(&pool, "\u{EA60}")];
    let batch = save_name_batch(&pool, &ids);
    // [hdr hdr o d d] [hdr hdr pad] [unit unit]
    assert_eq!(batch.names.len(), 2 + 3 + 2 + 1 + 2);
    assert_eq!(batch.names[7], 0);
    assert_eq!(&batch.names[8..], &0xEA60_u16.to_le_bytes());
    assert_eq!(batch.names[5], 0x80);
    assert_eq!(batch.names[6], 1);
}

#[test]
fn test_header_encodes_long_lengths() {
    let pool = NamePool::new();
    let id = store(&pool, &max_length_ansi());
    let batch = save_name_batch(&pool, &[id]);
    assert_eq!(&batch.names[..2], &[0x03, 0xFF]);
}

#[test]
fn test_wide_ascii_records_are_narrowed() {
    let pool = NamePool::new();
    let narrow = store(&pool, "Narrow");
    let mut names = vec![0x80, 6];
    for unit in "Narrow".encode_utf16() {
        names.extend_from_slice(&unit.to_le_bytes());
    }
    let mut hashes = HASH_ALGORITHM_ID.to_le_bytes().to_vec();
    hashes.extend_from_slice(&0u64.to_le_bytes());
    assert_eq!(load_name_batch(&pool, &names, &hashes), Ok(vec![narrow]));
}

#[test]
fn test_corrupt_inputs() {
    let pool = NamePool::new();
    let version = HASH_ALGORITHM_ID.to_le_bytes();

    assert_eq!(load_name_batch(&pool, &[], &[]), Err(BatchError::MissingVersion));
    assert_eq!(
        load_name_batch(&pool, &[], &version[..5]),
        Err(BatchError::MissingVersion)
    );
    assert_eq!(
        load_name_batch(&pool, &[], &[0u8; 12]),
        Err(BatchError::MisalignedHashData { len: 12 })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x00], &version),
        Err(BatchError::Truncated { index: 0, offset: 0 })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x00, 0x05, b'a'], &version),
        Err(BatchError::Truncated { index: 0, offset: 0 })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x00, 0x00], &version),
        Err(BatchError::EmptyName { index: 0 })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x7F, 0xFF], &version),
        Err(BatchError::NameTooLong {
            index: 0,
            len: 0x7FFF,
            max: crate::view::MAX_NAME_LEN
        })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x00, 0x01, 0xC3], &version),
        Err(BatchError::NonAsciiNarrow { index: 0 })
    );
    assert_eq!(
        load_name_batch(&pool, &[0x00, 0x01, b'a'], &version),
        Err(BatchError::HashCountMismatch { names: 1, hashes: 0 })
    );
}

#[test]
fn test_failed_load_interns_nothing() {
    let pool = NamePool::new();
    let before = pool.num_entries();
    let mut names = vec![0x00, 0x03];
    names.extend_from_slice(b"New");
    names.extend_from_slice(&[0x00, 0x00]);
    let mut hashes = vec![0xAB; 8];
    hashes.extend_from_slice(&[0u8; 16]);
    assert!(load_name_batch(&pool, &names, &hashes).is_err());
    assert_eq!(pool.num_entries(), before);
}

#[cfg(debug_assertions)]
#[test]
fn test_wrong_hash_is_rejected_in_debug_builds() {
    let pool = NamePool::new();
    let id = store(&pool, "Hashed");
    let mut batch = save_name_batch(&pool, &[id]);
    let last = batch.hashes.len() - 1;
    batch.hashes[last] ^= 0xFF;
    assert!(matches!(
        load_name_batch(&pool, &batch.names, &batch.hashes),
        Err(BatchError::HashMismatch { index: 0, .. })
    ));
}

#[test]
fn test_reserve_name_batch() {
    let pool = NamePool::new();
    let slots = pool.num_slots();
    reserve_name_batch(&pool, 1 << 20, 8 * 50_001);
    assert!(pool.num_slots() > slots);
    assert_eq!(pool.num_blocks(), 1);
}

proptest! {
    #[test]
    fn prop_batch_round_trips(names in prop::collection::vec("\\PC{1,40}", 0..40)) {
        let pool = NamePool::new();
        let ids: Vec<NameEntryId> = names.iter().map(|s| store(&pool, s)).collect();
        let batch = save_name_batch(&pool, &ids);
        prop_assert_eq!(load_name_batch(&pool, &batch.names, &batch.hashes), Ok(ids.clone()));
        prop_assert_eq!(save_name_batch(&pool, &ids), batch);
    }
}
