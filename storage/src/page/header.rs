// storage/src/page/header.rs

use bytes::{Buf, BufMut};

use crate::{Result, StorageError};

use super::PageId;

const PAGE_ID_OFFSET: usize = 0; // 8 bytes
const COUNT_OFFSET: usize = 10; // 2 bytes

/// Page kind, stored in the header as a single flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageType {
    Branch,
    Leaf,
    Meta,
    Freelist,
}

impl PageType {
    pub const fn flag(self) -> u16 {
        match self {
            PageType::Branch => 0x01,
            PageType::Leaf => 0x02,
            PageType::Meta => 0x04,
            PageType::Freelist => 0x10,
        }
    }

    /// Decodes a flags field. Exactly one known bit must be set; anything
    /// else (no bits, several bits, unknown bits) is rejected.
    pub fn from_flags(flags: u16) -> Result<Self> {
        match flags {
            0x01 => Ok(PageType::Branch),
            0x02 => Ok(PageType::Leaf),
            0x04 => Ok(PageType::Meta),
            0x10 => Ok(PageType::Freelist),
            other => Err(StorageError::InvalidPageFlags(other)),
        }
    }
}

/// The fixed 16-byte header at offset 0 of every page.
///
/// ```text
/// +------------+---------+---------+----------+
/// | page id    | flags   | count   | overflow |
/// | (8 bytes)  | (2)     | (2)     | (4)      |
/// +------------+---------+---------+----------+
/// ```
///
/// Fields are big-endian on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageHeader {
    pub page_id: PageId,
    pub page_type: PageType,
    pub count: u16,
    pub overflow: u32,
}

impl PageHeader {
    pub const SIZE: usize = 16;

    fn create(page_id: PageId, page_type: PageType) -> Self {
        Self {
            page_id,
            page_type,
            count: 0,
            overflow: 0,
        }
    }

    pub fn for_branch(page_id: PageId) -> Self {
        Self::create(page_id, PageType::Branch)
    }

    pub fn for_leaf(page_id: PageId) -> Self {
        Self::create(page_id, PageType::Leaf)
    }

    pub fn for_meta(page_id: PageId) -> Self {
        Self::create(page_id, PageType::Meta)
    }

    pub fn for_freelist(page_id: PageId) -> Self {
        Self::create(page_id, PageType::Freelist)
    }

    pub fn is_branch(&self) -> bool {
        self.page_type == PageType::Branch
    }

    pub fn is_leaf(&self) -> bool {
        self.page_type == PageType::Leaf
    }

    pub fn is_meta(&self) -> bool {
        self.page_type == PageType::Meta
    }

    pub fn is_freelist(&self) -> bool {
        self.page_type == PageType::Freelist
    }

    /// Writes the header into the first `SIZE` bytes of `buf`.
    pub fn encode(&self, buf: &mut [u8]) {
        let mut dst = &mut buf[..Self::SIZE];
        dst.put_u64(self.page_id);
        dst.put_u16(self.page_type.flag());
        dst.put_u16(self.count);
        dst.put_u32(self.overflow);
    }

    /// Reads and validates a header from the start of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < Self::SIZE {
            return Err(StorageError::CorruptPage {
                page_id: None,
                reason: format!("header needs {} bytes, got {}", Self::SIZE, buf.len()),
            });
        }

        let mut src = &buf[..Self::SIZE];
        let page_id = src.get_u64();
        let page_type = PageType::from_flags(src.get_u16())?;
        let count = src.get_u16();
        let overflow = src.get_u32();

        Ok(Self {
            page_id,
            page_type,
            count,
            overflow,
        })
    }
}

// The count is the only field that changes after creation, so it gets
// in-place accessors that skip a full decode.

pub(crate) fn read_count(buf: &[u8]) -> u16 {
    (&buf[COUNT_OFFSET..COUNT_OFFSET + 2]).get_u16()
}

pub(crate) fn write_count(buf: &mut [u8], count: u16) {
    (&mut buf[COUNT_OFFSET..COUNT_OFFSET + 2]).put_u16(count);
}

pub(crate) fn read_page_id(buf: &[u8]) -> PageId {
    (&buf[PAGE_ID_OFFSET..PAGE_ID_OFFSET + 8]).get_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = PageHeader {
            page_id: 0x0102_0304_0506_0708,
            page_type: PageType::Leaf,
            count: 2,
            overflow: 7,
        };
        let mut buf = [0u8; PageHeader::SIZE];
        header.encode(&mut buf);

        assert_eq!(&buf[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(&buf[8..10], &[0x00, 0x02]);
        assert_eq!(&buf[10..12], &[0x00, 0x02]);
        assert_eq!(&buf[12..16], &[0, 0, 0, 7]);

        assert_eq!(PageHeader::decode(&buf).unwrap(), header);
        assert_eq!(read_count(&buf), 2);
        assert_eq!(read_page_id(&buf), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_factories() {
        assert!(PageHeader::for_branch(1).is_branch());
        assert!(PageHeader::for_leaf(1).is_leaf());
        assert!(PageHeader::for_meta(1).is_meta());
        assert!(PageHeader::for_freelist(1).is_freelist());

        let header = PageHeader::for_leaf(9);
        assert_eq!(header.page_id, 9);
        assert_eq!(header.count, 0);
        assert_eq!(header.overflow, 0);
    }

    #[test]
    fn test_flags_round_trip() {
        for page_type in [
            PageType::Branch,
            PageType::Leaf,
            PageType::Meta,
            PageType::Freelist,
        ] {
            assert_eq!(PageType::from_flags(page_type.flag()).unwrap(), page_type);
        }
    }

    #[test]
    fn test_rejects_invalid_flags() {
        for flags in [0x0000, 0x0003, 0x0008, 0x0012, 0x0020, 0xFFFF] {
            assert!(matches!(
                PageType::from_flags(flags),
                Err(StorageError::InvalidPageFlags(f)) if f == flags
            ));
        }
    }

    #[test]
    fn test_decode_rejects_foreign_bytes() {
        let buf = [0xABu8; PageHeader::SIZE];
        assert!(matches!(
            PageHeader::decode(&buf),
            Err(StorageError::InvalidPageFlags(0xABAB))
        ));
    }

    #[test]
    fn test_write_count_in_place() {
        let mut buf = [0u8; PageHeader::SIZE];
        PageHeader::for_leaf(3).encode(&mut buf);
        write_count(&mut buf, 41);

        let header = PageHeader::decode(&buf).unwrap();
        assert_eq!(header.count, 41);
        assert_eq!(header.page_id, 3);
        assert!(header.is_leaf());
    }
}
