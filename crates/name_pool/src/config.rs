//! Pool configuration.

use std::sync::Arc;

use crate::entry::{EntryCodec, PlainCodec, ScrambleCodec};
use crate::view::MAX_NAME_LEN;

/// Enables display shards when set to `1`/`true`.
pub const ENV_CASE_PRESERVING: &str = "NAME_POOL_CASE_PRESERVING";
/// Lowers the longest accepted name.
pub const ENV_MAX_NAME_LEN: &str = "NAME_POOL_MAX_NAME_LEN";
/// Hex key that switches payloads to [`ScrambleCodec`].
pub const ENV_SCRAMBLE_KEY: &str = "NAME_POOL_SCRAMBLE_KEY";

const DEFAULT_SLOTS_PER_SHARD: usize = 256;

/// Settings fixed at pool construction.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Keep a second, case-sensitive table set so names resolve with the
    /// casing they were first interned with in every distinct spelling.
    pub case_preserving: bool,
    /// Longest name accepted by `intern`, at most [`MAX_NAME_LEN`].
    pub max_name_len: usize,
    /// Initial slot count of every shard, rounded up to a power of two.
    pub initial_slots_per_shard: usize,
    pub codec: Arc<dyn EntryCodec>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            case_preserving: false,
            max_name_len: MAX_NAME_LEN,
            initial_slots_per_shard: DEFAULT_SLOTS_PER_SHARD,
            codec: Arc::new(PlainCodec),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_case_preserving(mut self, case_preserving: bool) -> Self {
        self.case_preserving = case_preserving;
        self
    }

    /// Values above [`MAX_NAME_LEN`] are clamped.
    #[must_use]
    pub fn with_max_name_len(mut self, max_name_len: usize) -> Self {
        self.max_name_len = max_name_len.min(MAX_NAME_LEN);
        self
    }

    #[must_use]
    pub fn with_initial_slots_per_shard(mut self, slots: usize) -> Self {
        self.initial_slots_per_shard = slots.max(1).next_power_of_two();
        self
    }

    #[must_use]
    pub fn with_codec(mut self, codec: Arc<dyn EntryCodec>) -> Self {
        self.codec = codec;
        self
    }

    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`. Unparsable values are logged and
    /// ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = PoolConfig::default();

        if let Some(value) = lookup(ENV_CASE_PRESERVING) {
            match parse_flag(&value) {
                Some(flag) => config.case_preserving = flag,
                None => tracing::warn!(key = ENV_CASE_PRESERVING, %value, "ignoring invalid flag"),
            }
        }

        if let Some(value) = lookup(ENV_MAX_NAME_LEN) {
            match value.trim().parse::<usize>() {
                Ok(len) if len > 0 => config = config.with_max_name_len(len),
                _ => tracing::warn!(key = ENV_MAX_NAME_LEN, %value, "ignoring invalid length"),
            }
        }

        if let Some(value) = lookup(ENV_SCRAMBLE_KEY) {
            let digits = value.trim().trim_start_matches("0x");
            match u64::from_str_radix(digits, 16) {
                Ok(key) => config.codec = Arc::new(ScrambleCodec::new(key)),
                Err(_) => tracing::warn!(key = ENV_SCRAMBLE_KEY, "ignoring invalid scramble key"),
            }
        }

        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
