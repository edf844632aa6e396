// storage/src/page/data.rs

//! Record storage at the tail of a page.
//!
//! Records are `key ++ value` with no embedded lengths (those live in the
//! slot). They are packed back to front: each new record ends where the
//! previous one starts. All offsets used here are absolute positions in the
//! page buffer.

/// Read-only view used by lookups.
#[derive(Clone, Copy)]
pub struct DataRegion<'a> {
    page: &'a [u8],
}

impl<'a> DataRegion<'a> {
    pub(crate) fn new(page: &'a [u8]) -> Self {
        Self { page }
    }

    /// Compares the `key_len` bytes stored at `offset` against `key`.
    /// Out-of-range offsets never match.
    pub fn key_equals(&self, offset: usize, key: &[u8], key_len: usize) -> bool {
        key.len() == key_len
            && self
                .page
                .get(offset..offset + key_len)
                .is_some_and(|stored| stored == key)
    }

    /// The `value_len` bytes following the key at `offset`.
    pub fn read_value(&self, offset: usize, key_len: usize, value_len: usize) -> Option<&'a [u8]> {
        let start = offset + key_len;
        self.page.get(start..start + value_len)
    }
}

/// Mutable view over the free space and the data area, `[base, PAGE_SIZE)`.
///
/// `base` is the end of the slot directory, so nothing written through this
/// view can reach the header or an existing slot.
pub(crate) struct DataRegionMut<'a> {
    region: &'a mut [u8],
    base: usize,
    data_start: &'a mut usize,
}

impl<'a> DataRegionMut<'a> {
    pub(crate) fn new(region: &'a mut [u8], base: usize, data_start: &'a mut usize) -> Self {
        debug_assert!(base <= *data_start);
        Self {
            region,
            base,
            data_start,
        }
    }

    /// Moves the data start down by `size` and returns the new start.
    /// The caller must already have checked that `size` fits.
    pub(crate) fn allocate_record(&mut self, size: usize) -> usize {
        *self.data_start -= size;
        debug_assert!(*self.data_start >= self.base);
        *self.data_start
    }

    pub(crate) fn write_record(&mut self, offset: usize, key: &[u8], value: &[u8]) {
        let start = offset - self.base;
        let split = start + key.len();
        self.region[start..split].copy_from_slice(key);
        self.region[split..split + value.len()].copy_from_slice(value);
    }
}
