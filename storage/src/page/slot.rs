// storage/src/page/slot.rs

use bytes::{Buf, BufMut};

use super::data::DataRegion;
use super::header::PageHeader;

/// Size of one slot entry: offset (4) + key length (2) + value length (2).
pub const SLOT_SIZE: usize = 8;

/// Slots start right after the header.
pub const SLOT_REGION_START: usize = PageHeader::SIZE;

/// Directory entry locating one record in the data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Absolute offset of the record within the page.
    pub offset: u32,
    pub key_len: u16,
    pub value_len: u16,
}

impl Slot {
    pub fn record_len(&self) -> usize {
        self.key_len as usize + self.value_len as usize
    }

    pub fn record_end(&self) -> usize {
        self.offset as usize + self.record_len()
    }

    fn encode(&self, buf: &mut [u8]) {
        let mut dst = &mut buf[..SLOT_SIZE];
        dst.put_u32(self.offset);
        dst.put_u16(self.key_len);
        dst.put_u16(self.value_len);
    }

    fn decode(buf: &[u8]) -> Self {
        let mut src = &buf[..SLOT_SIZE];
        Self {
            offset: src.get_u32(),
            key_len: src.get_u16(),
            value_len: src.get_u16(),
        }
    }
}

/// Byte position of slot `index` within the page.
pub const fn slot_position(index: usize) -> usize {
    SLOT_REGION_START + index * SLOT_SIZE
}

/// Writes one slot entry. `page` is the full page buffer.
///
/// This does not touch the header count; a slot stays invisible until the
/// caller bumps the count.
pub(crate) fn write_slot(page: &mut [u8], index: usize, slot: Slot) {
    let pos = slot_position(index);
    slot.encode(&mut page[pos..pos + SLOT_SIZE]);
}

/// Read-only view of the acknowledged slots of a page.
#[derive(Clone, Copy)]
pub struct SlotArray<'a> {
    page: &'a [u8],
    count: u16,
}

impl<'a> SlotArray<'a> {
    pub(crate) fn new(page: &'a [u8], count: u16) -> Self {
        Self { page, count }
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// First byte past the slot directory.
    pub fn end(&self) -> usize {
        slot_position(self.len())
    }

    pub fn get(&self, index: usize) -> Option<Slot> {
        if index >= self.len() {
            return None;
        }
        let pos = slot_position(index);
        self.page.get(pos..pos + SLOT_SIZE).map(Slot::decode)
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> + 'a {
        let view = *self;
        (0..view.len()).filter_map(move |i| view.get(i))
    }

    /// Linear scan in insertion order; the first matching slot wins.
    pub fn find_slot_for_key(&self, key: &[u8]) -> Option<usize> {
        let data = DataRegion::new(self.page);
        (0..self.len()).find(|&i| {
            self.get(i).is_some_and(|slot| {
                log::trace!("slot {i}: offset={} key_len={}", slot.offset, slot.key_len);
                data.key_equals(slot.offset as usize, key, slot.key_len as usize)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_with(slots: &[(Slot, &[u8])]) -> Vec<u8> {
        let mut page = vec![0u8; 256];
        for (i, (slot, record)) in slots.iter().enumerate() {
            let start = slot.offset as usize;
            page[start..start + record.len()].copy_from_slice(record);
            write_slot(&mut page, i, *slot);
        }
        page
    }

    #[test]
    fn test_slot_size() {
        assert_eq!(SLOT_SIZE, 8);
        assert_eq!(slot_position(0), 16);
        assert_eq!(slot_position(3), 40);
    }

    #[test]
    fn test_slot_encoding_is_big_endian() {
        let mut page = vec![0u8; 64];
        write_slot(
            &mut page,
            0,
            Slot {
                offset: 0x0FD2,
                key_len: 5,
                value_len: 0x19,
            },
        );
        assert_eq!(&page[16..24], &[0, 0, 0x0F, 0xD2, 0, 5, 0, 0x19]);
    }

    #[test]
    fn test_get_respects_count() {
        let slot = Slot {
            offset: 200,
            key_len: 2,
            value_len: 3,
        };
        let page = page_with(&[(slot, &b"k1abc"[..])]);

        assert_eq!(SlotArray::new(&page, 1).get(0), Some(slot));
        assert_eq!(SlotArray::new(&page, 1).get(1), None);
        // Written but unacknowledged
        assert_eq!(SlotArray::new(&page, 0).get(0), None);
        assert!(SlotArray::new(&page, 0).is_empty());
    }

    #[test]
    fn test_find_slot_first_match_wins() {
        let first = Slot {
            offset: 240,
            key_len: 2,
            value_len: 1,
        };
        let other = Slot {
            offset: 230,
            key_len: 2,
            value_len: 1,
        };
        let duplicate = Slot {
            offset: 220,
            key_len: 2,
            value_len: 1,
        };
        let page = page_with(&[
            (first, &b"aaX"[..]),
            (other, &b"bbY"[..]),
            (duplicate, &b"aaZ"[..]),
        ]);
        let slots = SlotArray::new(&page, 3);

        assert_eq!(slots.find_slot_for_key(b"aa"), Some(0));
        assert_eq!(slots.find_slot_for_key(b"bb"), Some(1));
        assert_eq!(slots.find_slot_for_key(b"cc"), None);
        // Prefix of a stored key is not a match
        assert_eq!(slots.find_slot_for_key(b"a"), None);
        assert_eq!(slots.iter().count(), 3);
        assert_eq!(slots.end(), slot_position(3));
    }
}
