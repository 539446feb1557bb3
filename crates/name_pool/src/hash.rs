//! Name hashing.
//!
//! One 64-bit hash is split into the shard index, the probe start, a slot
//! guard and an entry header guard. Equal names under the same case mode
//! always produce equal [`NameHash`] values.

use rustc_hash::FxHasher;
use std::hash::Hasher;

use crate::entry::{EntryHeader, ENTRY_ID_BITS, ENTRY_ID_MASK};
use crate::view::{fold_narrow, fold_wide, Case, NameView, NAME_SIZE};

/// Identifies the hash algorithm in serialized batches.
///
/// `FxHasher` output depends on the pointer width, so the width is part of
/// the version.
pub const HASH_ALGORITHM_ID: u64 = 0xF8A5_1600_0000_0000 | POINTER_BITS;

#[cfg(target_pointer_width = "64")]
const POINTER_BITS: u64 = 64;
#[cfg(target_pointer_width = "32")]
const POINTER_BITS: u64 = 32;
#[cfg(target_pointer_width = "16")]
const POINTER_BITS: u64 = 16;

pub(crate) const SHARD_BITS: u32 = 4;
/// Number of shards per table set.
pub const NUM_SHARDS: usize = 1 << SHARD_BITS;
const SHARD_MASK: u32 = (1 << SHARD_BITS) - 1;

/// High slot bits not used by the entry id.
pub(crate) const PROBE_HASH_MASK: u32 = !ENTRY_ID_MASK;
/// Forced into the slot guard of any case variant of `None` so the slot for
/// entry id 0 is never the unused sentinel.
const IS_ANSI_NONE_BIT: u32 = 1 << ENTRY_ID_BITS;

/// Derived hash fields of one name.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NameHash {
    shard_index: u32,
    unmasked_slot_index: u32,
    slot_probe_hash: u32,
    entry_header: EntryHeader,
}

impl NameHash {
    /// Splits a full hash of `view`. Entry headers only carry hash bits
    /// when `entry_probe` is set.
    pub(crate) fn from_raw(view: NameView<'_>, hash: u64, entry_probe: bool) -> Self {
        #[expect(clippy::cast_possible_truncation, reason = "splitting into words")]
        let (hi, lo) = ((hash >> 32) as u32, hash as u32);
        let none_bit = if is_ansi_none(view) {
            IS_ANSI_NONE_BIT
        } else {
            0
        };
        #[expect(clippy::cast_possible_truncation, reason = "masked to 5 bits")]
        let probe = if entry_probe {
            ((hi >> SHARD_BITS) as u16) & EntryHeader::PROBE_HASH_MASK
        } else {
            0
        };
        NameHash {
            shard_index: hi & SHARD_MASK,
            unmasked_slot_index: lo,
            slot_probe_hash: (hi & PROBE_HASH_MASK) | none_bit,
            entry_header: EntryHeader::new(view.len(), view.is_wide(), probe),
        }
    }

    #[inline]
    pub fn shard_index(&self) -> usize {
        self.shard_index as usize
    }

    #[inline]
    pub fn unmasked_slot_index(&self) -> u32 {
        self.unmasked_slot_index
    }

    #[inline]
    pub fn slot_probe_hash(&self) -> u32 {
        self.slot_probe_hash
    }

    #[inline]
    pub fn entry_header(&self) -> EntryHeader {
        self.entry_header
    }
}

/// Hashes `view` under `case` and splits the result.
pub(crate) fn hash_name(view: NameView<'_>, case: Case, entry_probe: bool) -> NameHash {
    NameHash::from_raw(view, generate_hash(view, case), entry_probe)
}

/// Case-insensitive 64-bit hash, as stored in batch hash buffers.
pub fn lower_case_hash(view: NameView<'_>) -> u64 {
    generate_hash(view, Case::Ignore)
}

pub(crate) fn generate_hash(view: NameView<'_>, case: Case) -> u64 {
    let mut hasher = FxHasher::default();
    match (view, case) {
        (NameView::Narrow(bytes), Case::Sensitive) => hasher.write(bytes),
        (NameView::Narrow(bytes), Case::Ignore) => {
            let mut lower = [0u8; NAME_SIZE];
            let len = bytes.len().min(NAME_SIZE);
            for (dst, &src) in lower.iter_mut().zip(&bytes[..len]) {
                *dst = fold_narrow(src);
            }
            hasher.write(&lower[..len]);
        }
        (NameView::Wide(units), case) => {
            let mut payload = [0u8; NAME_SIZE * 2];
            let len = units.len().min(NAME_SIZE);
            for (dst, &unit) in payload.chunks_exact_mut(2).zip(&units[..len]) {
                let unit = match case {
                    Case::Ignore => fold_wide(unit),
                    Case::Sensitive => unit,
                };
                dst.copy_from_slice(&unit.to_le_bytes());
            }
            hasher.write(&payload[..len * 2]);
        }
    }
    hasher.finish()
}

/// True for narrow `None` in any casing.
#[inline]
pub(crate) fn is_ansi_none(view: NameView<'_>) -> bool {
    matches!(view, NameView::Narrow(bytes) if bytes.eq_ignore_ascii_case(b"none"))
}
