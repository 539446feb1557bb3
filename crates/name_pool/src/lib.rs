//! Name Pool - sharded string interning
//!
//! Strings are stored once in an append-only arena and referred to by a
//! 32-bit [`NameEntryId`]. Lookups hash the case-insensitive form of a
//! string into one of [`NUM_SHARDS`] open-addressing tables, each behind
//! its own `RwLock`.
//!
//! - [`NamePool`]: the pool itself; [`SharedNamePool`] for sharing
//! - [`Name`]: comparison entry, display entry and number suffix
//! - [`WellKnownName`]: names reserved at fixed ids, `None` first
//! - [`save_name_batch`] / [`load_name_batch`]: compact wire format
//! - [`global_pool`]: lazily built process-wide pool
//!
//! # Case Handling
//!
//! Comparison is ASCII case-insensitive. A pool built with
//! [`PoolConfig::with_case_preserving`] also remembers every distinct
//! spelling so names print the way they were written.

/// Compile-time assertion that a type has a specific size.
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

mod arena;
mod batch;
mod config;
mod entry;
mod error;
mod global;
mod hash;
mod name;
mod pool;
mod shard;
mod view;
mod well_known;

pub use batch::{load_name_batch, reserve_name_batch, save_name_batch, NameBatch};
pub use config::{PoolConfig, ENV_CASE_PRESERVING, ENV_MAX_NAME_LEN, ENV_SCRAMBLE_KEY};
pub use entry::{EntryCodec, EntryHeader, NameEntry, NameEntryId, PlainCodec, ScrambleCodec};
pub use error::{BatchError, NameError};
pub use global::{global_pool, is_available, tear_down};
pub use hash::{lower_case_hash, HASH_ALGORITHM_ID, NUM_SHARDS};
pub use name::{
    name_external_to_internal, name_internal_to_external, split_number, FindName, Name,
    NAME_NO_NUMBER,
};
pub use pool::{NameBatchGuard, NamePool, PoolStats, SharedNamePool};
pub use view::{with_str_view, NameBuf, NameView, Units, MAX_NAME_LEN, NAME_SIZE};
pub use well_known::WellKnownName;

static_assert_size!(NameEntryId, 4);
static_assert_size!(EntryHeader, 2);
static_assert_size!(Name, 12);
