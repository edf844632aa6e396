// storage/src/page/mod.rs

//! Fixed-size slotted pages.
//!
//! ```text
//!                           PAGE (4096 bytes)
//! +----------------+----------------+----------------+----------------+
//! |   PageHeader   |   SlotArray    |   FreeSpace    |   DataRegion   |
//! |   (16 bytes)   |  (8 per slot)  |                |  (grows down)  |
//! +----------------+----------------+----------------+----------------+
//! 0                16          slot_end         data_start           4096
//! ```
//!
//! A page is one owned buffer. The header, slot and data views borrow
//! disjoint ranges of it; `slot_end <= data_start` holds at all times and the
//! bytes in between are free.

mod data;
mod header;
mod slot;

pub use data::DataRegion;
pub use header::{PageHeader, PageType};
pub use slot::{Slot, SlotArray, SLOT_SIZE};

use std::fmt;
use std::fs::File;

use crate::file::{page_offset, read_exact_at, write_all_at};
use crate::{Result, StorageError};

use data::DataRegionMut;

pub const PAGE_SIZE: usize = 4096;

/// Page size as u64 for offset calculations.
pub const PAGE_SIZE_U64: u64 = PAGE_SIZE as u64;

/// A page identifier; also its position in the table file.
pub type PageId = u64;

#[derive(Clone)]
pub struct Page {
    data: Box<[u8; PAGE_SIZE]>,
    // Lowest byte used by a record; PAGE_SIZE while the page is empty.
    data_start: usize,
}

impl Page {
    pub const HEADER_SIZE: usize = PageHeader::SIZE;

    /// Most bytes a single record (key, value and its slot) can ever take.
    pub const MAX_RECORD_SPACE: usize = PAGE_SIZE - Self::HEADER_SIZE;

    /// Creates an empty leaf page.
    pub fn new(page_id: PageId) -> Self {
        Self::with_header(PageHeader::for_leaf(page_id))
    }

    pub fn with_header(header: PageHeader) -> Self {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        header.encode(&mut data[..]);

        let mut page = Self {
            data,
            data_start: PAGE_SIZE,
        };
        // A new page starts empty whatever count the header carried
        header::write_count(&mut page.data[..], 0);
        page
    }

    /// Builds a page from raw bytes, validating the header and every
    /// acknowledged slot.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: Box<[u8; PAGE_SIZE]> = bytes
            .to_vec()
            .into_boxed_slice()
            .try_into()
            .map_err(|_| StorageError::CorruptPage {
                page_id: None,
                reason: format!("expected {PAGE_SIZE} bytes, got {}", bytes.len()),
            })?;
        Self::from_buffer(data)
    }

    fn from_buffer(data: Box<[u8; PAGE_SIZE]>) -> Result<Self> {
        let header = PageHeader::decode(&data[..])?;
        let slots = SlotArray::new(&data[..], header.count);
        let slot_end = slots.end();

        let corrupt = |reason: String| StorageError::CorruptPage {
            page_id: Some(header.page_id),
            reason,
        };

        if slot_end > PAGE_SIZE {
            return Err(corrupt(format!(
                "{} slots do not fit in a page",
                header.count
            )));
        }

        let mut data_start = PAGE_SIZE;
        for (index, slot) in slots.iter().enumerate() {
            if (slot.offset as usize) < slot_end || slot.record_end() > PAGE_SIZE {
                return Err(corrupt(format!(
                    "slot {index} points outside the data region ({}..{})",
                    slot.offset,
                    slot.record_end()
                )));
            }
            data_start = data_start.min(slot.offset as usize);
        }

        Ok(Self { data, data_start })
    }

    /// Reads page `page_id` from its offset in `file`.
    pub fn read(file: &File, page_id: PageId) -> Result<Self> {
        let mut data = Box::new([0u8; PAGE_SIZE]);
        read_exact_at(file, &mut data[..], page_offset(page_id)?)?;

        let page = Self::from_buffer(data)?;
        if page.page_id() != page_id {
            return Err(StorageError::CorruptPage {
                page_id: Some(page_id),
                reason: format!("header claims page {}", page.page_id()),
            });
        }
        Ok(page)
    }

    /// Replaces this page's contents with what is on disk at its offset.
    pub fn read_from(&mut self, file: &File) -> Result<()> {
        *self = Self::read(file, self.page_id())?;
        Ok(())
    }

    /// Writes the whole page at `page_id * PAGE_SIZE`. Does not move the
    /// file cursor.
    pub fn write_to(&self, file: &File) -> Result<()> {
        write_all_at(file, &self.data[..], self.offset()?)?;
        Ok(())
    }

    pub fn header(&self) -> Result<PageHeader> {
        PageHeader::decode(&self.data[..])
    }

    pub fn page_id(&self) -> PageId {
        header::read_page_id(&self.data[..])
    }

    pub fn page_type(&self) -> Result<PageType> {
        Ok(self.header()?.page_type)
    }

    /// Byte offset of this page in the table file.
    pub fn offset(&self) -> Result<u64> {
        page_offset(self.page_id())
    }

    /// Number of live records.
    pub fn count(&self) -> u16 {
        header::read_count(&self.data[..])
    }

    pub fn slots(&self) -> SlotArray<'_> {
        SlotArray::new(&self.data[..], self.count())
    }

    pub fn slot(&self, index: usize) -> Option<Slot> {
        self.slots().get(index)
    }

    pub fn slot_end(&self) -> usize {
        self.slots().end()
    }

    pub fn data_start(&self) -> usize {
        self.data_start
    }

    pub fn free_space(&self) -> usize {
        self.data_start - self.slot_end()
    }

    pub fn used_space(&self) -> usize {
        PAGE_SIZE - self.free_space()
    }

    /// Bytes a record needs: key, value and one slot.
    pub const fn required_space(key_len: usize, value_len: usize) -> usize {
        key_len + value_len + SLOT_SIZE
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..]
    }

    /// Inserts a record. Returns `false` without touching the page when it
    /// does not fit (or the key is empty).
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> bool {
        matches!(self.try_put(key, value), Ok(true))
    }

    /// Like [`Page::put`], but distinguishes a record that can never fit in
    /// any page (`RecordTooLarge`) from one that only misses this page
    /// (`Ok(false)`).
    pub fn try_put(&mut self, key: &[u8], value: &[u8]) -> Result<bool> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }

        let required = Self::required_space(key.len(), value.len());
        if required > Self::MAX_RECORD_SPACE {
            return Err(StorageError::RecordTooLarge {
                size: required,
                max: Self::MAX_RECORD_SPACE,
            });
        }
        if required > self.free_space() {
            log::trace!(
                "page {} full: need {required} bytes, {} free",
                self.page_id(),
                self.free_space()
            );
            return Ok(false);
        }

        let index = self.count();
        let slot_end = self.slot_end();

        // 1. record, inside the region past the slot directory
        let offset = {
            let (_, region) = self.data.split_at_mut(slot_end);
            let mut data = DataRegionMut::new(region, slot_end, &mut self.data_start);
            let offset = data.allocate_record(key.len() + value.len());
            data.write_record(offset, key, value);
            offset
        };

        // 2. slot
        slot::write_slot(
            &mut self.data[..],
            index as usize,
            Slot {
                offset: offset as u32,
                key_len: key.len() as u16,
                value_len: value.len() as u16,
            },
        );

        // 3. count last: until here the record is invisible
        header::write_count(&mut self.data[..], index + 1);

        Ok(true)
    }

    /// Looks a key up. The first record inserted under `key` wins.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }

        let slots = self.slots();
        let Some(slot) = slots.find_slot_for_key(key).and_then(|i| slots.get(i)) else {
            return Ok(None);
        };

        Ok(DataRegion::new(&self.data[..]).read_value(
            slot.offset as usize,
            slot.key_len as usize,
            slot.value_len as usize,
        ))
    }

    #[cfg(test)]
    pub(crate) fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data[..]
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("page_id", &self.page_id())
            .field("type", &self.page_type().ok())
            .field("count", &self.count())
            .field("free_space", &self.free_space())
            .field("free_range", &(self.slot_end()..self.data_start))
            .finish()
    }
}
