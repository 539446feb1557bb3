//! The name pool: shard routing, reserved names, batching and stats.

use parking_lot::{MutexGuard, RwLockWriteGuard};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::arena::{Cursor, EntryArena};
use crate::config::PoolConfig;
use crate::entry::{NameEntry, NameEntryId};
use crate::hash::{generate_hash, hash_name, NameHash, NUM_SHARDS};
use crate::shard::{NameShard, NameValue, ShardTable};
use crate::view::{Case, NameView, MAX_NAME_LEN};
use crate::well_known::WellKnownName;

/// Sharded, thread-safe string pool.
///
/// Every distinct name (compared case-insensitively) gets one comparison
/// entry. With [`PoolConfig::case_preserving`] set, a second set of
/// case-sensitive display shards maps each distinct spelling to an entry
/// that remembers its casing. Entries are never removed.
///
/// # Thread Safety
/// Every method may be called concurrently. Shards use one `RwLock` each;
/// the entry arena has one cursor mutex, always taken after shard locks.
pub struct NamePool {
    entries: EntryArena,
    comparison_shards: Box<[NameShard]>,
    display_shards: Option<Box<[NameShard]>>,
    well_known: Box<[NameEntryId]>,
    /// Comparison id to reserved index.
    well_known_lookup: FxHashMap<NameEntryId, usize>,
    largest_well_known: u32,
    config: PoolConfig,
}

/// Snapshot of pool counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub entries: u32,
    pub ansi_entries: u32,
    pub wide_entries: u32,
    pub blocks: usize,
    pub slots: usize,
    pub entry_memory_bytes: usize,
}

impl NamePool {
    /// Creates a pool with the default configuration.
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    pub fn with_config(config: PoolConfig) -> Self {
        let pool = Self::with_reserved(config, WellKnownName::STRINGS);
        debug_assert_eq!(pool.well_known[WellKnownName::None.index()], NameEntryId::NONE);
        pool
    }

    /// Builds a pool and registers `reserved` in order.
    ///
    /// # Panics
    /// Panics if two reserved names are equal ignoring case.
    pub(crate) fn with_reserved(config: PoolConfig, reserved: &[&str]) -> Self {
        let shards = |case| {
            (0..NUM_SHARDS)
                .map(|_| NameShard::new(case, config.initial_slots_per_shard))
                .collect::<Box<[_]>>()
        };
        let mut pool = NamePool {
            entries: EntryArena::new(config.case_preserving, Arc::clone(&config.codec)),
            comparison_shards: shards(Case::Ignore),
            display_shards: config.case_preserving.then(|| shards(Case::Sensitive)),
            well_known: Box::default(),
            well_known_lookup: FxHashMap::default(),
            largest_well_known: 0,
            config,
        };

        let mut well_known = Vec::with_capacity(reserved.len());
        let mut lookup = FxHashMap::default();
        let mut largest = 0;
        for (index, name) in reserved.iter().enumerate() {
            let id = pool.store(NameView::Narrow(name.as_bytes()));
            let comparison_id = pool.comparison_id_of(id);
            if let Some(previous) = lookup.insert(comparison_id, index) {
                tracing::error!(
                    name,
                    previous = reserved[previous],
                    "duplicate reserved name"
                );
                panic!(
                    "reserved name {name:?} duplicates {:?}",
                    reserved[previous]
                );
            }
            largest = largest.max(comparison_id.to_unstable_int());
            well_known.push(id);
        }
        pool.well_known = well_known.into_boxed_slice();
        pool.well_known_lookup = lookup;
        pool.largest_well_known = largest;

        tracing::debug!(
            reserved = reserved.len(),
            case_preserving = pool.config.case_preserving,
            "created name pool"
        );
        pool
    }

    #[inline]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    #[inline]
    pub fn is_case_preserving(&self) -> bool {
        self.display_shards.is_some()
    }

    #[inline]
    fn entry_probe(&self) -> bool {
        !self.config.case_preserving
    }

    fn comparison_value<'a>(&self, view: NameView<'a>) -> NameValue<'a> {
        NameValue::new(view, hash_name(view, Case::Ignore, self.entry_probe()))
    }

    fn display_value<'a>(&self, view: NameView<'a>) -> NameValue<'a> {
        NameValue::new(view, hash_name(view, Case::Sensitive, self.entry_probe()))
    }

    #[inline]
    fn comparison_shard(&self, hash: &NameHash) -> &NameShard {
        &self.comparison_shards[hash.shard_index()]
    }

    /// Finds or creates the entry for `view` and returns its display id,
    /// which equals the comparison id unless the casing is new.
    ///
    /// Wide views that are pure ASCII are stored narrow. An empty view
    /// yields [`NameEntryId::NONE`].
    ///
    /// # Panics
    /// Panics if `view` is longer than [`MAX_NAME_LEN`].
    pub fn store(&self, view: NameView<'_>) -> NameEntryId {
        assert_storable(view);
        if view.is_empty() {
            return NameEntryId::NONE;
        }
        match view {
            NameView::Wide(_) if view.is_pure_ansi() => {
                self.store_normalized(view.to_narrowest().as_view())
            }
            _ => self.store_normalized(view),
        }
    }

    fn store_normalized(&self, view: NameView<'_>) -> NameEntryId {
        let Some(display_shards) = &self.display_shards else {
            let value = self.comparison_value(view);
            return self.comparison_shard(&value.hash).insert(&self.entries, &value).0;
        };

        let display = self.display_value(view);
        let display_shard = &display_shards[display.hash.shard_index()];
        if let Some(existing) = display_shard.find(&self.entries, &display) {
            return existing;
        }

        // Display entries point at their comparison entry, so it goes first.
        let comparison = self.comparison_value(view);
        let (comparison_id, _) = self
            .comparison_shard(&comparison.hash)
            .insert(&self.entries, &comparison);
        self.link_display(display_shards, display, comparison_id)
    }

    /// Display id of `view`, whose comparison entry is `comparison_id`.
    /// Without display shards this is `comparison_id` itself.
    pub(crate) fn display_id_for(
        &self,
        view: NameView<'_>,
        comparison_id: NameEntryId,
    ) -> NameEntryId {
        match &self.display_shards {
            Some(display_shards) => {
                self.link_display(display_shards, self.display_value(view), comparison_id)
            }
            None => comparison_id,
        }
    }

    fn link_display(
        &self,
        display_shards: &[NameShard],
        mut display: NameValue<'_>,
        comparison_id: NameEntryId,
    ) -> NameEntryId {
        let display_shard = &display_shards[display.hash.shard_index()];
        if self.entries.equals(comparison_id, display.view, Case::Sensitive) {
            display_shard.insert_existing(&self.entries, &display.hash, comparison_id);
            comparison_id
        } else {
            display.comparison_id = Some(comparison_id);
            display_shard.insert(&self.entries, &display).0
        }
    }

    /// Looks `view` up without creating anything.
    pub fn find(&self, view: NameView<'_>) -> Option<NameEntryId> {
        if view.is_empty() || view.len() > MAX_NAME_LEN {
            return None;
        }
        match view {
            NameView::Wide(_) if view.is_pure_ansi() => {
                self.find_normalized(view.to_narrowest().as_view())
            }
            _ => self.find_normalized(view),
        }
    }

    fn find_normalized(&self, view: NameView<'_>) -> Option<NameEntryId> {
        if let Some(display_shards) = &self.display_shards {
            let display = self.display_value(view);
            let existing = display_shards[display.hash.shard_index()].find(&self.entries, &display);
            if existing.is_some() {
                return existing;
            }
        }
        let comparison = self.comparison_value(view);
        self.comparison_shard(&comparison.hash)
            .find(&self.entries, &comparison)
    }

    /// Decoded copy of the entry behind `id`.
    ///
    /// # Panics
    /// Panics if `id` was not issued by this pool.
    pub fn resolve(&self, id: NameEntryId) -> NameEntry {
        self.entries.resolve(id)
    }

    /// The case-insensitive entry `id` belongs to.
    pub fn comparison_id_of(&self, id: NameEntryId) -> NameEntryId {
        self.entries.comparison_id(id)
    }

    /// True when `id` lies inside an allocated block.
    pub fn is_valid(&self, id: NameEntryId) -> bool {
        (id.block() as usize) < self.entries.num_blocks()
    }

    /// Id of a reserved name.
    #[inline]
    pub fn well_known_id(&self, name: WellKnownName) -> NameEntryId {
        self.well_known[name.index()]
    }

    /// Reserved name whose comparison entry is `id`.
    pub fn find_well_known(&self, id: NameEntryId) -> Option<WellKnownName> {
        if id.to_unstable_int() > self.largest_well_known {
            return None;
        }
        self.well_known_lookup
            .get(&id)
            .and_then(|&index| WellKnownName::from_index(index))
    }

    /// Overwrites the stored casing of the comparison entry for `view`,
    /// creating it if needed.
    ///
    /// Not safe for threading in the logical sense: concurrent readers of the
    /// entry may observe either casing, or a mix of both.
    pub fn store_replacing(&self, view: NameView<'_>) -> NameEntryId {
        let display_id = self.store(view);
        if view.is_empty() {
            return display_id;
        }
        let comparison_id = self.comparison_id_of(display_id);
        match view {
            NameView::Wide(_) if view.is_pure_ansi() => {
                self.entries.replace(comparison_id, view.to_narrowest().as_view());
            }
            _ => self.entries.replace(comparison_id, view),
        }
        display_id
    }

    /// Locks every comparison shard and then the entry arena for a run of
    /// inserts.
    ///
    /// Calling other storing methods on this pool from the same thread while
    /// the guard lives deadlocks.
    pub fn batch(&self) -> NameBatchGuard<'_> {
        let shards = self
            .comparison_shards
            .iter()
            .map(NameShard::write)
            .collect();
        NameBatchGuard {
            cursor: self.entries.lock_cursor(),
            shards,
            pool: self,
        }
    }

    /// Preallocates arena blocks for `num_bytes` of entries and grows the
    /// shards to hold `num_entries` names.
    pub fn reserve(&self, num_bytes: usize, num_entries: usize) {
        let num_blocks = num_bytes / self.entries.block_size_bytes() + 1;
        self.entries.reserve_blocks(num_blocks);

        if (self.num_entries() as usize) < num_entries {
            let per_shard = num_entries / NUM_SHARDS + 1;
            for shard in self.all_shards() {
                shard.reserve(&self.entries, per_shard);
            }
        }
    }

    fn all_shards(&self) -> impl Iterator<Item = &NameShard> {
        self.comparison_shards
            .iter()
            .chain(self.display_shards.iter().flat_map(|shards| shards.iter()))
    }

    /// Entries created in comparison and display shards.
    pub fn num_entries(&self) -> u32 {
        self.all_shards().map(NameShard::num_created).sum()
    }

    pub fn num_wide_entries(&self) -> u32 {
        self.all_shards().map(NameShard::num_created_wide).sum()
    }

    pub fn num_ansi_entries(&self) -> u32 {
        self.num_entries() - self.num_wide_entries()
    }

    pub fn num_blocks(&self) -> usize {
        self.entries.num_blocks()
    }

    /// Total slot capacity over all shards.
    pub fn num_slots(&self) -> usize {
        self.all_shards().map(NameShard::capacity).sum()
    }

    /// Bytes held by allocated entry blocks.
    pub fn entry_memory_size(&self) -> usize {
        self.num_blocks() * self.entries.block_size_bytes()
    }

    pub fn stats(&self) -> PoolStats {
        let entries = self.num_entries();
        let wide_entries = self.num_wide_entries();
        PoolStats {
            entries,
            ansi_entries: entries - wide_entries,
            wide_entries,
            blocks: self.num_blocks(),
            slots: self.num_slots(),
            entry_memory_bytes: self.entry_memory_size(),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        tracing::info!(
            entries = stats.entries,
            wide = stats.wide_entries,
            blocks = stats.blocks,
            slots = stats.slots,
            entry_kb = stats.entry_memory_bytes / 1024,
            "name pool stats"
        );
    }

    /// Every entry in creation order.
    pub fn debug_dump(&self) -> Vec<NameEntry> {
        self.entries.debug_dump()
    }
}

impl Default for NamePool {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NamePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamePool")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

fn assert_storable(view: NameView<'_>) {
    assert!(
        view.len() <= MAX_NAME_LEN,
        "name of {} code units exceeds the maximum of {MAX_NAME_LEN}",
        view.len()
    );
}

/// Exclusive access to the comparison shards and the entry arena.
///
/// Stores only create comparison entries and return comparison ids.
/// Dropping the guard releases the arena lock, then the shard locks.
pub struct NameBatchGuard<'a> {
    cursor: MutexGuard<'a, Cursor>,
    shards: Vec<RwLockWriteGuard<'a, ShardTable>>,
    pool: &'a NamePool,
}

impl NameBatchGuard<'_> {
    pub fn store(&mut self, view: NameView<'_>) -> NameEntryId {
        assert_storable(view);
        if view.is_empty() {
            return NameEntryId::NONE;
        }
        match view {
            NameView::Wide(_) if view.is_pure_ansi() => {
                let narrow = view.to_narrowest();
                let hash = generate_hash(narrow.as_view(), Case::Ignore);
                self.store_hashed(narrow.as_view(), hash)
            }
            _ => self.store_hashed(view, generate_hash(view, Case::Ignore)),
        }
    }

    /// Stores `view` with its precomputed case-insensitive hash.
    ///
    /// `view` must already be in its narrowest width.
    pub fn store_hashed(&mut self, view: NameView<'_>, lower_case_hash: u64) -> NameEntryId {
        assert_storable(view);
        debug_assert_eq!(
            lower_case_hash,
            generate_hash(view, Case::Ignore),
            "precomputed hash of {view:?} is wrong"
        );
        if view.is_empty() {
            return NameEntryId::NONE;
        }
        let pool = self.pool;
        let hash = NameHash::from_raw(view, lower_case_hash, pool.entry_probe());
        let value = NameValue::new(view, hash);
        let shard_index = hash.shard_index();
        pool.comparison_shards[shard_index]
            .insert_into(
                &mut self.shards[shard_index],
                &pool.entries,
                &value,
                &mut *self.cursor,
            )
            .0
    }
}

/// Shared pool handle for use across threads.
#[derive(Clone, Debug, Default)]
pub struct SharedNamePool(Arc<NamePool>);

impl SharedNamePool {
    pub fn new() -> Self {
        SharedNamePool(Arc::new(NamePool::new()))
    }

    pub fn with_config(config: PoolConfig) -> Self {
        SharedNamePool(Arc::new(NamePool::with_config(config)))
    }
}

impl std::ops::Deref for SharedNamePool {
    type Target = NamePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
