//! Open-addressing hash table shards.
//!
//! Each shard maps name hashes to entry ids with linear probing over a
//! power-of-two slot array. A slot packs the entry id with the high hash
//! bits so most mismatches are rejected without touching entry bytes.

use parking_lot::{RwLock, RwLockWriteGuard};

use crate::arena::{Cursor, EntryArena};
use crate::entry::{EntryHeader, NameEntryId, ENTRY_ID_MASK};
use crate::hash::{hash_name, NameHash, PROBE_HASH_MASK};
use crate::view::{Case, NameView};

const LOAD_FACTOR_QUOTIENT: u64 = 9;
const LOAD_FACTOR_DIVISOR: u64 = 10;

/// Entry id in the low bits, probe hash in the high bits. Zero is unused.
#[derive(Copy, Clone, Default, PartialEq, Eq)]
pub(crate) struct Slot(u32);

impl Slot {
    const UNUSED: Slot = Slot(0);

    #[inline]
    fn new(id: NameEntryId, probe_hash: u32) -> Self {
        debug_assert_eq!(id.to_unstable_int() & PROBE_HASH_MASK, 0);
        debug_assert_eq!(probe_hash & ENTRY_ID_MASK, 0);
        let slot = Slot(id.to_unstable_int() | probe_hash);
        debug_assert!(slot.is_used());
        slot
    }

    #[inline]
    fn is_used(self) -> bool {
        self.0 != 0
    }

    #[inline]
    fn id(self) -> NameEntryId {
        NameEntryId::from_unstable_int(self.0 & ENTRY_ID_MASK)
    }

    #[inline]
    fn probe_hash(self) -> u32 {
        self.0 & PROBE_HASH_MASK
    }
}

impl std::fmt::Debug for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_used() {
            write!(f, "Slot({:?}, probe={:#x})", self.id(), self.probe_hash())
        } else {
            f.write_str("Slot(unused)")
        }
    }
}

/// A name together with its hash, as looked up in or inserted into a shard.
#[derive(Copy, Clone, Debug)]
pub(crate) struct NameValue<'a> {
    pub view: NameView<'a>,
    pub hash: NameHash,
    /// Comparison sibling recorded in display entries.
    pub comparison_id: Option<NameEntryId>,
}

impl<'a> NameValue<'a> {
    pub(crate) fn new(view: NameView<'a>, hash: NameHash) -> Self {
        NameValue {
            view,
            hash,
            comparison_id: None,
        }
    }
}

/// Where a shard insert gets new entries from.
pub(crate) trait EntrySink {
    fn create(
        &mut self,
        arena: &EntryArena,
        view: NameView<'_>,
        comparison_id: Option<NameEntryId>,
        header: EntryHeader,
    ) -> NameEntryId;
}

/// Takes the arena cursor lock for each created entry.
pub(crate) struct LockOnCreate;

impl EntrySink for LockOnCreate {
    fn create(
        &mut self,
        arena: &EntryArena,
        view: NameView<'_>,
        comparison_id: Option<NameEntryId>,
        header: EntryHeader,
    ) -> NameEntryId {
        let mut cursor = arena.lock_cursor();
        arena.create(&mut cursor, view, comparison_id, header)
    }
}

/// A cursor already held by a batch.
impl EntrySink for Cursor {
    fn create(
        &mut self,
        arena: &EntryArena,
        view: NameView<'_>,
        comparison_id: Option<NameEntryId>,
        header: EntryHeader,
    ) -> NameEntryId {
        arena.create(self, view, comparison_id, header)
    }
}

/// Slot array and counters, guarded by the shard lock.
pub(crate) struct ShardTable {
    slots: Box<[Slot]>,
    used: u32,
    created: u32,
    created_wide: u32,
}

impl ShardTable {
    fn new(capacity: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        ShardTable {
            slots: vec![Slot::UNUSED; capacity].into_boxed_slice(),
            used: 0,
            created: 0,
            created_wide: 0,
        }
    }

    #[inline]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the first slot that is unused or satisfies `matches`.
    fn probe(&self, unmasked_slot_index: u32, mut matches: impl FnMut(Slot) -> bool) -> usize {
        let mask = self.capacity() - 1;
        let mut index = unmasked_slot_index as usize & mask;
        loop {
            let slot = self.slots[index];
            if !slot.is_used() || matches(slot) {
                return index;
            }
            index = (index + 1) & mask;
        }
    }

    fn probe_value(&self, arena: &EntryArena, value: &NameValue<'_>, case: Case) -> usize {
        self.probe(value.hash.unmasked_slot_index(), |slot| {
            slot.probe_hash() == value.hash.slot_probe_hash()
                && arena.header(slot.id()) == value.hash.entry_header()
                && arena.equals(slot.id(), value.view, case)
        })
    }

    fn claim(&mut self, index: usize, slot: Slot, arena: &EntryArena, case: Case) {
        debug_assert!(!self.slots[index].is_used());
        self.slots[index] = slot;
        self.used += 1;
        if u64::from(self.used) * LOAD_FACTOR_DIVISOR
            >= LOAD_FACTOR_QUOTIENT * self.capacity() as u64
        {
            self.grow(arena, case, self.capacity() * 2);
        }
    }

    /// Rebuilds the slot array at `new_capacity`, rehashing the entry behind
    /// every used slot.
    fn grow(&mut self, arena: &EntryArena, case: Case, new_capacity: usize) {
        let old_capacity = self.capacity();
        let old_used = self.used;
        let old_slots = std::mem::replace(
            &mut self.slots,
            vec![Slot::UNUSED; new_capacity].into_boxed_slice(),
        );
        self.used = 0;

        for &slot in old_slots.iter().filter(|slot| slot.is_used()) {
            let entry = arena.resolve(slot.id());
            let hash = hash_name(entry.view(), case, false);
            let index = self.probe(hash.unmasked_slot_index(), |_| false);
            self.slots[index] = slot;
            self.used += 1;
        }

        debug_assert_eq!(old_used, self.used);
        tracing::debug!(
            old_capacity,
            new_capacity,
            used = self.used,
            "grew name shard"
        );
    }
}

/// One lock-guarded shard of a table set.
pub(crate) struct NameShard {
    case: Case,
    table: RwLock<ShardTable>,
}

impl NameShard {
    pub(crate) fn new(case: Case, initial_capacity: usize) -> Self {
        NameShard {
            case,
            table: RwLock::new(ShardTable::new(initial_capacity.next_power_of_two())),
        }
    }

    pub(crate) fn find(&self, arena: &EntryArena, value: &NameValue<'_>) -> Option<NameEntryId> {
        let table = self.table.read();
        let slot = table.slots[table.probe_value(arena, value, self.case)];
        slot.is_used().then(|| slot.id())
    }

    /// Finds or creates the entry for `value`. The flag reports creation.
    pub(crate) fn insert(&self, arena: &EntryArena, value: &NameValue<'_>) -> (NameEntryId, bool) {
        let mut table = self.table.write();
        self.insert_into(&mut table, arena, value, &mut LockOnCreate)
    }

    /// Insert into a table whose write lock the caller already holds.
    pub(crate) fn insert_into(
        &self,
        table: &mut ShardTable,
        arena: &EntryArena,
        value: &NameValue<'_>,
        sink: &mut impl EntrySink,
    ) -> (NameEntryId, bool) {
        let index = table.probe_value(arena, value, self.case);
        let slot = table.slots[index];
        if slot.is_used() {
            return (slot.id(), false);
        }

        let id = sink.create(
            arena,
            value.view,
            value.comparison_id,
            value.hash.entry_header(),
        );
        table.created += 1;
        table.created_wide += u32::from(value.view.is_wide());
        table.claim(index, Slot::new(id, value.hash.slot_probe_hash()), arena, self.case);
        (id, true)
    }

    /// Links `hash` to an entry created elsewhere. Linking the same pair
    /// twice is a no-op.
    pub(crate) fn insert_existing(&self, arena: &EntryArena, hash: &NameHash, id: NameEntryId) {
        let new_slot = Slot::new(id, hash.slot_probe_hash());
        let mut table = self.table.write();
        let index = table.probe(hash.unmasked_slot_index(), |slot| slot == new_slot);
        if !table.slots[index].is_used() {
            table.claim(index, new_slot, arena, self.case);
        }
    }

    /// Grows the table so `num` entries fit below the load factor.
    pub(crate) fn reserve(&self, arena: &EntryArena, num: usize) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "entry counts are bounded by the 29-bit id space"
        )]
        let wanted = ((num as u64 * LOAD_FACTOR_DIVISOR / LOAD_FACTOR_QUOTIENT) as usize)
            .next_power_of_two();
        let mut table = self.table.write();
        if wanted > table.capacity() {
            table.grow(arena, self.case, wanted);
        }
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, ShardTable> {
        self.table.write()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.table.read().capacity()
    }

    #[cfg(test)]
    pub(crate) fn used_slots(&self) -> u32 {
        self.table.read().used
    }

    pub(crate) fn num_created(&self) -> u32 {
        self.table.read().created
    }

    pub(crate) fn num_created_wide(&self) -> u32 {
        self.table.read().created_wide
    }
}
