//! Append-only entry arena.
//!
//! Entries live in fixed-size blocks that are allocated on demand and never
//! moved or freed before the arena drops. An entry id addresses a block and
//! a stride-sized offset inside it.
//!
//! Entry layout, in bytes:
//!
//! ```text
//! [comparison id: u32 LE]   case-preserving pools only
//! [header: u16 LE]
//! [payload]                 narrow bytes or UTF-16LE units, codec-encoded
//! ```
//!
//! Bytes are stored in atomic cells. They are written once, before the id is
//! published through a shard slot under that shard's lock, so readers resolve
//! ids without taking any arena lock.

use parking_lot::{Mutex, MutexGuard};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use crate::entry::{EntryCodec, EntryHeader, NameEntry, NameEntryId, BLOCK_OFFSETS, MAX_BLOCKS};
use crate::view::{equals_same_dims, Case, NameBuf, NameView};

const HEADER_BYTES: usize = 2;
const COMPARISON_ID_BYTES: usize = 4;

type PayloadBuf = SmallVec<[u8; 256]>;

/// Bump position of the arena. Held through [`EntryArena::lock_cursor`].
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    block: u32,
    byte_offset: usize,
}

struct Block {
    bytes: Box<[AtomicU8]>,
}

impl Block {
    fn new(size: usize) -> Self {
        Block {
            bytes: (0..size).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    #[inline]
    fn load(&self, at: usize) -> u8 {
        self.bytes[at].load(Ordering::Relaxed)
    }

    fn read_into(&self, at: usize, out: &mut [u8]) {
        for (dst, cell) in out.iter_mut().zip(&self.bytes[at..]) {
            *dst = cell.load(Ordering::Relaxed);
        }
    }

    fn write_from(&self, at: usize, bytes: &[u8]) {
        for (cell, &byte) in self.bytes[at..].iter().zip(bytes) {
            cell.store(byte, Ordering::Relaxed);
        }
    }
}

pub(crate) struct EntryArena {
    blocks: Box<[OnceLock<Block>]>,
    cursor: Mutex<Cursor>,
    stride: usize,
    comparison_ids: bool,
    codec: Arc<dyn EntryCodec>,
}

impl EntryArena {
    /// Creates an arena with its first block allocated. Entries carry a
    /// comparison id when `comparison_ids` is set.
    pub(crate) fn new(comparison_ids: bool, codec: Arc<dyn EntryCodec>) -> Self {
        let arena = EntryArena {
            blocks: (0..MAX_BLOCKS).map(|_| OnceLock::new()).collect(),
            cursor: Mutex::new(Cursor::default()),
            stride: if comparison_ids { 4 } else { 2 },
            comparison_ids,
            codec,
        };
        arena.ensure_block(0);
        arena
    }

    #[cfg(test)]
    pub(crate) fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub(crate) fn block_size_bytes(&self) -> usize {
        self.stride * BLOCK_OFFSETS as usize
    }

    #[inline]
    fn data_offset(&self) -> usize {
        if self.comparison_ids {
            COMPARISON_ID_BYTES + HEADER_BYTES
        } else {
            HEADER_BYTES
        }
    }

    #[inline]
    fn header_offset(&self) -> usize {
        self.data_offset() - HEADER_BYTES
    }

    /// Stride-aligned size of an entry with a `payload_bytes` payload.
    #[inline]
    pub(crate) fn entry_size(&self, payload_bytes: usize) -> usize {
        (self.data_offset() + payload_bytes).next_multiple_of(self.stride)
    }

    pub(crate) fn lock_cursor(&self) -> MutexGuard<'_, Cursor> {
        self.cursor.lock()
    }

    fn ensure_block(&self, index: usize) -> &Block {
        self.blocks[index].get_or_init(|| Block::new(self.block_size_bytes()))
    }

    fn block(&self, id: NameEntryId) -> &Block {
        match self.blocks[id.block() as usize].get() {
            Some(block) => block,
            None => panic!("{id:?} points into an unallocated block"),
        }
    }

    #[inline]
    fn entry_start(&self, id: NameEntryId) -> usize {
        id.offset() as usize * self.stride
    }

    /// Reserves `bytes` (rounded up to the stride) at the cursor, moving on
    /// to a new block when the current one cannot fit them.
    pub(crate) fn allocate(&self, cursor: &mut Cursor, bytes: usize) -> NameEntryId {
        let bytes = bytes.next_multiple_of(self.stride);
        let block_size = self.block_size_bytes();
        assert!(bytes <= block_size, "entry of {bytes} bytes exceeds block");

        if block_size - cursor.byte_offset < bytes {
            self.advance_block(cursor);
        }

        let byte_offset = cursor.byte_offset;
        cursor.byte_offset += bytes;
        debug_assert_eq!(byte_offset % self.stride, 0);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "offset is bounded by BLOCK_OFFSETS"
        )]
        let offset = (byte_offset / self.stride) as u32;
        NameEntryId::from_handle(cursor.block, offset)
    }

    #[cold]
    fn advance_block(&self, cursor: &mut Cursor) {
        let current = self.ensure_block(cursor.block as usize);
        // Zero-length header marks the end of the used part of the block.
        let terminator_at = cursor.byte_offset + self.header_offset();
        if terminator_at + HEADER_BYTES <= self.block_size_bytes() {
            current.write_from(terminator_at, &EntryHeader::default().to_bits().to_le_bytes());
        }

        let next = cursor.block as usize + 1;
        if next >= MAX_BLOCKS {
            tracing::error!(blocks = MAX_BLOCKS, "name entry arena exhausted");
            panic!("name entry arena exhausted all {MAX_BLOCKS} blocks");
        }
        self.ensure_block(next);
        #[expect(clippy::cast_possible_truncation, reason = "next < MAX_BLOCKS")]
        let next_block = next as u32;
        cursor.block = next_block;
        cursor.byte_offset = 0;
        tracing::debug!(block = next, "allocated name block");
    }

    /// Writes a new entry and returns its id. Entries without an explicit
    /// `comparison_id` compare as themselves.
    pub(crate) fn create(
        &self,
        cursor: &mut Cursor,
        view: NameView<'_>,
        comparison_id: Option<NameEntryId>,
        header: EntryHeader,
    ) -> NameEntryId {
        debug_assert_eq!(header.len(), view.len());
        debug_assert_eq!(header.is_wide(), view.is_wide());

        let id = self.allocate(cursor, self.data_offset() + view.byte_len());
        let block = self.block(id);
        let start = self.entry_start(id);

        if self.comparison_ids {
            let comparison_id = comparison_id.unwrap_or(id);
            block.write_from(start, &comparison_id.to_unstable_int().to_le_bytes());
        }
        block.write_from(start + self.header_offset(), &header.to_bits().to_le_bytes());
        self.write_payload(block, start + self.data_offset(), view);
        id
    }

    fn write_payload(&self, block: &Block, at: usize, view: NameView<'_>) {
        let mut payload = PayloadBuf::new();
        view.extend_payload(&mut payload);
        self.codec.encode(&mut payload);
        block.write_from(at, &payload);
    }

    pub(crate) fn header(&self, id: NameEntryId) -> EntryHeader {
        let block = self.block(id);
        let at = self.entry_start(id) + self.header_offset();
        EntryHeader::from_bits(u16::from_le_bytes([block.load(at), block.load(at + 1)]))
    }

    /// Case-insensitive sibling of `id`; `id` itself in pools without
    /// comparison ids.
    pub(crate) fn comparison_id(&self, id: NameEntryId) -> NameEntryId {
        if !self.comparison_ids {
            return id;
        }
        let mut raw = [0u8; COMPARISON_ID_BYTES];
        self.block(id).read_into(self.entry_start(id), &mut raw);
        NameEntryId::from_unstable_int(u32::from_le_bytes(raw))
    }

    fn read_payload(&self, id: NameEntryId, header: EntryHeader) -> PayloadBuf {
        let mut payload: PayloadBuf = SmallVec::from_elem(0, header.byte_len());
        self.block(id)
            .read_into(self.entry_start(id) + self.data_offset(), &mut payload);
        self.codec.decode(&mut payload);
        payload
    }

    fn decode_name(header: EntryHeader, payload: &[u8]) -> NameBuf {
        if header.is_wide() {
            NameBuf::Wide(
                payload
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect(),
            )
        } else {
            NameBuf::Narrow(SmallVec::from_slice(payload))
        }
    }

    /// Decoded copy of the entry behind `id`.
    pub(crate) fn resolve(&self, id: NameEntryId) -> NameEntry {
        let header = self.header(id);
        let payload = self.read_payload(id, header);
        NameEntry {
            id,
            comparison_id: self.comparison_id(id),
            header,
            name: Self::decode_name(header, &payload),
        }
    }

    /// Payload equality with a view of the same width and length.
    pub(crate) fn equals(&self, id: NameEntryId, view: NameView<'_>, case: Case) -> bool {
        let header = self.header(id);
        if header.len() != view.len() || header.is_wide() != view.is_wide() {
            return false;
        }
        let payload = self.read_payload(id, header);
        match view {
            NameView::Narrow(_) => equals_same_dims(NameView::Narrow(&payload), view, case),
            NameView::Wide(_) => {
                let stored = Self::decode_name(header, &payload);
                equals_same_dims(stored.as_view(), view, case)
            }
        }
    }

    /// Overwrites the payload of `id` with a view of identical width and
    /// length. Concurrent readers may observe a mix of old and new bytes.
    pub(crate) fn replace(&self, id: NameEntryId, view: NameView<'_>) {
        let header = self.header(id);
        assert!(
            header.len() == view.len() && header.is_wide() == view.is_wide(),
            "replacement of {id:?} must keep length and width"
        );
        self.write_payload(self.block(id), self.entry_start(id) + self.data_offset(), view);
    }

    /// Makes sure blocks `0..num` are allocated.
    pub(crate) fn reserve_blocks(&self, num: usize) {
        let cursor = self.lock_cursor();
        let num = num.min(MAX_BLOCKS);
        for index in (cursor.block as usize + 1)..num {
            self.ensure_block(index);
        }
    }

    /// Blocks in use, counting the current one.
    pub(crate) fn num_blocks(&self) -> usize {
        self.lock_cursor().block as usize + 1
    }

    /// Every entry in creation order.
    pub(crate) fn debug_dump(&self) -> Vec<NameEntry> {
        let cursor = self.lock_cursor();
        let mut out = Vec::new();
        for block_index in 0..=cursor.block {
            let end = if block_index == cursor.block {
                cursor.byte_offset
            } else {
                self.block_size_bytes()
            };
            self.dump_block(block_index, end, &mut out);
        }
        out
    }

    fn dump_block(&self, block_index: u32, end: usize, out: &mut Vec<NameEntry>) {
        let mut at = 0;
        while at + self.data_offset() <= end {
            #[expect(clippy::cast_possible_truncation, reason = "at < block size")]
            let id = NameEntryId::from_handle(block_index, (at / self.stride) as u32);
            let header = self.header(id);
            if header.is_empty() {
                break;
            }
            out.push(self.resolve(id));
            at += self.entry_size(header.byte_len());
        }
    }
}

impl std::fmt::Debug for EntryArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryArena")
            .field("stride", &self.stride)
            .field("comparison_ids", &self.comparison_ids)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
