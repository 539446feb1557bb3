//! Name entry identifiers, headers and payload codecs.

use std::fmt;

use crate::view::{NameBuf, NameView, MAX_NAME_LEN};

/// Bits of an entry id that select the block.
pub(crate) const BLOCK_BITS: u32 = 13;
/// Bits of an entry id that select the stride-sized offset within a block.
pub(crate) const BLOCK_OFFSET_BITS: u32 = 16;
pub(crate) const MAX_BLOCKS: usize = 1 << BLOCK_BITS;
pub(crate) const BLOCK_OFFSETS: u32 = 1 << BLOCK_OFFSET_BITS;

/// Entry ids use the low bits of a slot, the probe hash the rest.
pub(crate) const ENTRY_ID_BITS: u32 = BLOCK_BITS + BLOCK_OFFSET_BITS;
pub(crate) const ENTRY_ID_MASK: u32 = (1 << ENTRY_ID_BITS) - 1;

/// Stable identifier of an interned string.
///
/// Layout: `block << 16 | offset`, where `offset` counts arena strides
/// within the block. The value is only meaningful to the pool that issued it
/// and is not stable across processes.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct NameEntryId(u32);

impl NameEntryId {
    /// Entry of the reserved `None` name, always the first one created.
    pub const NONE: NameEntryId = NameEntryId(0);

    #[inline]
    pub(crate) const fn from_handle(block: u32, offset: u32) -> Self {
        debug_assert!(block < (1 << BLOCK_BITS));
        debug_assert!(offset < BLOCK_OFFSETS);
        NameEntryId((block << BLOCK_OFFSET_BITS) | offset)
    }

    #[inline]
    pub const fn block(self) -> u32 {
        self.0 >> BLOCK_OFFSET_BITS
    }

    #[inline]
    pub const fn offset(self) -> u32 {
        self.0 & (BLOCK_OFFSETS - 1)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Raw value; only valid for the issuing pool within this process.
    #[inline]
    pub const fn to_unstable_int(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn from_unstable_int(raw: u32) -> Self {
        NameEntryId(raw)
    }
}

impl fmt::Debug for NameEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NameEntryId(block={}, offset={})",
            self.block(),
            self.offset()
        )
    }
}

/// Packed entry header.
///
/// Layout (16 bits):
/// - Bit 0: wide flag
/// - Bits 1-5: lower-case probe hash (zero in case-preserving pools)
/// - Bits 6-15: length in code units
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct EntryHeader(u16);

impl EntryHeader {
    pub(crate) const PROBE_HASH_BITS: u32 = 5;
    pub(crate) const PROBE_HASH_MASK: u16 = (1 << Self::PROBE_HASH_BITS) - 1;
    const LEN_SHIFT: u32 = 1 + Self::PROBE_HASH_BITS;

    pub(crate) fn new(len: usize, is_wide: bool, probe_hash: u16) -> Self {
        debug_assert!(len <= MAX_NAME_LEN);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "name length is bounded by MAX_NAME_LEN (10 bits)"
        )]
        let len = (len & MAX_NAME_LEN) as u16;
        EntryHeader(
            (len << Self::LEN_SHIFT)
                | ((probe_hash & Self::PROBE_HASH_MASK) << 1)
                | u16::from(is_wide),
        )
    }

    #[inline]
    pub const fn len(self) -> usize {
        (self.0 >> Self::LEN_SHIFT) as usize
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn is_wide(self) -> bool {
        self.0 & 1 == 1
    }

    #[inline]
    pub(crate) const fn probe_hash(self) -> u16 {
        (self.0 >> 1) & Self::PROBE_HASH_MASK
    }

    /// Payload size in bytes.
    #[inline]
    pub const fn byte_len(self) -> usize {
        if self.is_wide() {
            self.len() * 2
        } else {
            self.len()
        }
    }

    #[inline]
    pub(crate) const fn to_bits(self) -> u16 {
        self.0
    }

    #[inline]
    pub(crate) const fn from_bits(bits: u16) -> Self {
        EntryHeader(bits)
    }
}

impl fmt::Debug for EntryHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHeader")
            .field("len", &self.len())
            .field("wide", &self.is_wide())
            .field("probe", &self.probe_hash())
            .finish()
    }
}

/// Reversible in-place transform applied to entry payloads when they are
/// written to and read from the arena.
///
/// Implementations must satisfy `decode(encode(x)) == x` and must not change
/// the payload length.
pub trait EntryCodec: Send + Sync + fmt::Debug {
    fn encode(&self, payload: &mut [u8]);
    fn decode(&self, payload: &mut [u8]);
}

/// Stores payloads verbatim.
#[derive(Copy, Clone, Debug, Default)]
pub struct PlainCodec;

impl EntryCodec for PlainCodec {
    #[inline]
    fn encode(&self, _payload: &mut [u8]) {}

    #[inline]
    fn decode(&self, _payload: &mut [u8]) {}
}

/// XORs payload bytes with a position-dependent key stream so stored names
/// do not appear verbatim in memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ScrambleCodec {
    key: u64,
}

impl ScrambleCodec {
    pub const fn new(key: u64) -> Self {
        ScrambleCodec { key }
    }

    #[inline]
    fn mask(&self, index: usize) -> u8 {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "only the low bits of the index and key stream are used"
        )]
        let (rotation, low) = ((index % 64) as u32, index as u8);
        let stream = self.key.rotate_left(rotation).to_le_bytes();
        stream[index % 8] ^ low.wrapping_mul(0x9D)
    }
}

impl EntryCodec for ScrambleCodec {
    fn encode(&self, payload: &mut [u8]) {
        for (index, byte) in payload.iter_mut().enumerate() {
            *byte ^= self.mask(index);
        }
    }

    fn decode(&self, payload: &mut [u8]) {
        self.encode(payload);
    }
}

/// Decoded copy of an arena entry.
#[derive(Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub(crate) id: NameEntryId,
    pub(crate) comparison_id: NameEntryId,
    pub(crate) header: EntryHeader,
    pub(crate) name: NameBuf,
}

impl NameEntry {
    #[inline]
    pub fn id(&self) -> NameEntryId {
        self.id
    }

    /// Case-insensitive sibling of this entry; the entry itself unless it is
    /// a display entry of a case-preserving pool.
    #[inline]
    pub fn comparison_id(&self) -> NameEntryId {
        self.comparison_id
    }

    #[inline]
    pub fn header(&self) -> EntryHeader {
        self.header
    }

    #[inline]
    pub fn is_wide(&self) -> bool {
        self.header.is_wide()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.header.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    #[inline]
    pub fn view(&self) -> NameView<'_> {
        self.name.as_view()
    }

    #[inline]
    pub fn name(&self) -> &NameBuf {
        &self.name
    }
}

impl fmt::Display for NameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.name, f)
    }
}

impl fmt::Debug for NameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NameEntry")
            .field("id", &self.id)
            .field("comparison_id", &self.comparison_id)
            .field("name", &self.name)
            .finish()
    }
}
