//! Error types.

use thiserror::Error;

/// Error interning a single name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name of {len} code units exceeds the maximum of {max}")]
    TooLong { len: usize, max: usize },
}

/// Corrupt or unsupported batch input. Nothing is interned when loading
/// fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("hash data is missing the algorithm id")]
    MissingVersion,

    #[error("hash data of {len} bytes is not a whole number of hashes")]
    MisalignedHashData { len: usize },

    #[error("name {index} at byte {offset} runs past the end of the name data")]
    Truncated { index: usize, offset: usize },

    #[error("name {index} is empty")]
    EmptyName { index: usize },

    #[error("name {index} has {len} code units, the maximum is {max}")]
    NameTooLong { index: usize, len: usize, max: usize },

    #[error("narrow name {index} contains non-ASCII bytes")]
    NonAsciiNarrow { index: usize },

    #[error("{names} names but {hashes} hashes")]
    HashCountMismatch { names: usize, hashes: usize },

    #[error("name {index} hash {supplied:#018x} does not match computed {computed:#018x}")]
    HashMismatch {
        index: usize,
        supplied: u64,
        computed: u64,
    },
}
