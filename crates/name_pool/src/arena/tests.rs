use super::*;
use crate::entry::{PlainCodec, ScrambleCodec};
use pretty_assertions::assert_eq;

fn arena(comparison_ids: bool) -> EntryArena {
    EntryArena::new(comparison_ids, Arc::new(PlainCodec))
}

fn header_for(view: NameView<'_>) -> EntryHeader {
    EntryHeader::new(view.len(), view.is_wide(), 0)
}

fn create(arena: &EntryArena, view: NameView<'_>) -> NameEntryId {
    let mut cursor = arena.lock_cursor();
    arena.create(&mut cursor, view, None, header_for(view))
}

#[test]
fn test_create_and_resolve_narrow() {
    let arena = arena(false);
    let view = NameView::Narrow(b"Narrow");
    let id = create(&arena, view);
    assert_eq!(id, NameEntryId::NONE);

    let entry = arena.resolve(id);
    assert_eq!(entry.view(), view);
    assert_eq!(entry.comparison_id(), id);
    assert_eq!(entry.header(), header_for(view));
}

#[test]
fn test_create_and_resolve_wide() {
    let arena = arena(false);
    let units: Vec<u16> = "Wide\u{3042}".encode_utf16().collect();
    let first = create(&arena, NameView::Narrow(b"abc"));
    let id = create(&arena, NameView::Wide(&units));
    // 2 header bytes + 3 payload bytes round up to 6, three strides.
    assert_eq!(id.offset(), first.offset() + 3);
    assert_eq!(arena.resolve(id).view(), NameView::Wide(&units));
}

#[test]
fn test_comparison_ids_are_stored() {
    let arena = arena(true);
    assert_eq!(arena.stride(), 4);
    let comparison = create(&arena, NameView::Narrow(b"foo"));
    let mut cursor = arena.lock_cursor();
    let view = NameView::Narrow(b"FOO");
    let display = arena.create(&mut cursor, view, Some(comparison), header_for(view));
    drop(cursor);

    assert_eq!(arena.comparison_id(comparison), comparison);
    assert_eq!(arena.comparison_id(display), comparison);
    assert_eq!(arena.resolve(display).to_string(), "FOO");
}

#[test]
fn test_equals_honours_case() {
    let arena = arena(false);
    let id = create(&arena, NameView::Narrow(b"MixedCase"));
    assert!(arena.equals(id, NameView::Narrow(b"mixedcase"), Case::Ignore));
    assert!(!arena.equals(id, NameView::Narrow(b"mixedcase"), Case::Sensitive));
    assert!(arena.equals(id, NameView::Narrow(b"MixedCase"), Case::Sensitive));
    assert!(!arena.equals(id, NameView::Narrow(b"Mixed"), Case::Ignore));

    let units: Vec<u16> = "MixedCase".encode_utf16().collect();
    assert!(!arena.equals(id, NameView::Wide(&units), Case::Ignore));
}

#[test]
fn test_allocate_rolls_over_to_new_block() {
    let arena = arena(false);
    let mut cursor = arena.lock_cursor();
    let block_size = arena.block_size_bytes();
    let first = arena.allocate(&mut cursor, block_size - 4);
    assert_eq!(first.block(), 0);
    let second = arena.allocate(&mut cursor, 8);
    assert_eq!(second.block(), 1);
    assert_eq!(second.offset(), 0);
    drop(cursor);
    assert_eq!(arena.num_blocks(), 2);
}

#[test]
fn test_debug_dump_spans_blocks() {
    let arena = arena(false);
    let long = vec![b'x'; 1000];
    let mut created = Vec::new();
    for _ in 0..200 {
        created.push(create(&arena, NameView::Narrow(&long)));
    }
    created.push(create(&arena, NameView::Narrow(b"tail")));
    assert!(arena.num_blocks() >= 2);

    let dumped: Vec<NameEntryId> = arena.debug_dump().iter().map(NameEntry::id).collect();
    assert_eq!(dumped, created);
}

#[test]
fn test_reserve_blocks_keeps_current_block() {
    let arena = arena(false);
    arena.reserve_blocks(4);
    assert_eq!(arena.num_blocks(), 1);
    let mut cursor = arena.lock_cursor();
    arena.allocate(&mut cursor, arena.block_size_bytes());
    let next = arena.allocate(&mut cursor, 2);
    assert_eq!(next.block(), 1);
}

#[test]
fn test_scramble_codec_hides_payload() {
    let arena = EntryArena::new(false, Arc::new(ScrambleCodec::new(0x5EED)));
    let view = NameView::Narrow(b"SecretName");
    let id = create(&arena, view);

    let block = arena.block(id);
    let mut raw = [0u8; 10];
    block.read_into(arena.entry_start(id) + arena.data_offset(), &mut raw);
    assert_ne!(&raw, b"SecretName");

    assert_eq!(arena.resolve(id).view(), view);
    assert!(arena.equals(id, NameView::Narrow(b"secretname"), Case::Ignore));
}

#[test]
fn test_replace_rewrites_casing() {
    let arena = arena(false);
    let id = create(&arena, NameView::Narrow(b"unicorn"));
    arena.replace(id, NameView::Narrow(b"UNICORN"));
    assert_eq!(arena.resolve(id).to_string(), "UNICORN");
}

#[test]
#[should_panic(expected = "must keep length and width")]
fn test_replace_rejects_length_change() {
    let arena = arena(false);
    let id = create(&arena, NameView::Narrow(b"short"));
    arena.replace(id, NameView::Narrow(b"longer"));
}
