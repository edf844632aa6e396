//! Tests for pages and the page file
//!
//! These tests verify:
//! - put/get round trips over arbitrary keys and values
//! - Exact free-space accounting up to a full page
//! - Pages land at `page_id * PAGE_SIZE` regardless of write order

use bolddb_storage::page::SLOT_SIZE;
use bolddb_storage::{Page, PageHeader, TableFile, PAGE_SIZE};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn put_then_get_returns_value(
        key in prop::collection::vec(any::<u8>(), 1..64),
        value in prop::collection::vec(any::<u8>(), 0..2000),
    ) {
        let mut page = Page::new(0);
        prop_assert!(Page::required_space(key.len(), value.len()) <= page.free_space());
        prop_assert!(page.put(&key, &value));
        prop_assert_eq!(page.get(&key).unwrap(), Some(&value[..]));
    }

    #[test]
    fn fill_until_full_never_overcommits(
        sizes in prop::collection::vec((1usize..16, 0usize..400), 1..200),
    ) {
        let mut page = Page::new(0);
        let mut used = 0;
        let mut stored = Vec::new();

        for (i, (key_len, value_len)) in sizes.into_iter().enumerate() {
            let mut key = format!("{i:04}").into_bytes();
            key.resize(key_len.max(4), b'#');
            let value = vec![(i % 251) as u8; value_len];
            let required = Page::required_space(key.len(), value.len());
            let free = page.free_space();

            if page.put(&key, &value) {
                prop_assert!(required <= free);
                used += required;
                stored.push((key, value));
            } else {
                prop_assert!(required > free);
                prop_assert_eq!(page.free_space(), free);
                break;
            }
        }

        prop_assert!(used <= PAGE_SIZE - PageHeader::SIZE);
        prop_assert_eq!(page.free_space(), PAGE_SIZE - PageHeader::SIZE - used);
        prop_assert_eq!(page.count() as usize, stored.len());
        for (key, value) in &stored {
            prop_assert_eq!(page.get(key).unwrap(), Some(&value[..]));
        }
    }
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn test_record_of_exactly_free_space_fits() {
    let mut page = Page::new(0);
    let key = b"CUST0";
    let value = vec![b'v'; page.free_space() - SLOT_SIZE - key.len()];

    assert!(!page.put(key, &[value.as_slice(), &b"!"[..]].concat()));
    assert!(page.put(key, &value));
    assert_eq!(page.free_space(), 0);
    assert_eq!(page.get(key).unwrap(), Some(&value[..]));
}

#[test]
fn test_fresh_page_free_space() {
    assert_eq!(Page::new(0).free_space(), PAGE_SIZE - 16);
}

// =============================================================================
// File I/O
// =============================================================================

fn page_with_marker(page_id: u64) -> Page {
    let mut page = Page::new(page_id);
    let key = format!("page-{page_id}");
    assert!(page.put(key.as_bytes(), &vec![page_id as u8; 64]));
    page
}

#[test]
fn test_out_of_order_writes_land_at_their_offsets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offsets.table");
    let file = TableFile::open_write(&path).unwrap();

    let pages: Vec<Page> = [5, 0, 1].into_iter().map(page_with_marker).collect();
    for page in &pages {
        page.write_to(file.as_file()).unwrap();
    }
    assert_eq!(file.page_count().unwrap(), 6);

    let raw = std::fs::read(&path).unwrap();
    for page in &pages {
        let start = page.page_id() as usize * PAGE_SIZE;
        assert_eq!(&raw[start..start + PAGE_SIZE], page.as_bytes());

        let read = Page::read(file.as_file(), page.page_id()).unwrap();
        let key = format!("page-{}", page.page_id());
        assert_eq!(
            read.get(key.as_bytes()).unwrap(),
            Some(&vec![page.page_id() as u8; 64][..])
        );
    }
}

#[test]
fn test_read_from_replaces_contents() {
    let dir = TempDir::new().unwrap();
    let file = TableFile::open_write(&dir.path().join("reload.table")).unwrap();

    let mut page = page_with_marker(2);
    page.write_to(file.as_file()).unwrap();

    assert!(page.put(b"unsaved", b"gone after reload"));
    page.read_from(file.as_file()).unwrap();

    assert_eq!(page.count(), 1);
    assert_eq!(page.get(b"unsaved").unwrap(), None);
    assert!(page.get(b"page-2").unwrap().is_some());
}

#[cfg(unix)]
#[test]
fn test_writes_do_not_move_cursor() {
    use std::io::{Seek, SeekFrom};

    let dir = TempDir::new().unwrap();
    let file = TableFile::open_write(&dir.path().join("cursor.table")).unwrap();
    let mut handle = file.as_file();
    handle.seek(SeekFrom::Start(10)).unwrap();

    page_with_marker(3).write_to(file.as_file()).unwrap();
    assert_eq!(handle.stream_position().unwrap(), 10);
}
