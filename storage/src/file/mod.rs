// storage/src/file/mod.rs

//! Table file access.
//!
//! A table file is a flat run of pages: page `n` lives at `n * PAGE_SIZE`.
//! There is no file header; the page count is the file length divided by the
//! page size. Handles are short-lived: the table opens one per read or flush.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::page::{Page, PageId, PAGE_SIZE_U64};
use crate::{Result, StorageError};

/// Byte offset of a page in its table file.
///
/// Fails with `PageIdOutOfRange` when the page would end past `u64::MAX`.
pub fn page_offset(page_id: PageId) -> Result<u64> {
    page_id
        .checked_mul(PAGE_SIZE_U64)
        .filter(|offset| offset.checked_add(PAGE_SIZE_U64).is_some())
        .ok_or(StorageError::PageIdOutOfRange(page_id))
}

#[cfg(unix)]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(unix)]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.write_all_at(buf, offset)
}

#[cfg(not(unix))]
pub(crate) fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> io::Result<()> {
    use std::io::{Read, Seek, SeekFrom};
    let mut handle = file;
    handle.seek(SeekFrom::Start(offset))?;
    handle.read_exact(buf)
}

#[cfg(not(unix))]
pub(crate) fn write_all_at(file: &File, buf: &[u8], offset: u64) -> io::Result<()> {
    use std::io::{Seek, SeekFrom, Write};
    let mut handle = file;
    handle.seek(SeekFrom::Start(offset))?;
    handle.write_all(buf)
}

pub struct TableFile {
    file: File,
    path: PathBuf,
}

impl TableFile {
    /// Opens an existing table file for reading.
    pub fn open_read(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .open(path)
            .map_err(StorageError::Io)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Opens a table file for writing, creating it if needed.
    pub fn open_write(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(StorageError::Io)?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn as_file(&self) -> &File {
        &self.file
    }

    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata().map_err(StorageError::Io)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of whole pages in the file. A trailing partial page means the
    /// file was truncated or is not a table file, and is rejected.
    pub fn page_count(&self) -> Result<u64> {
        let len = self.len()?;
        if len % PAGE_SIZE_U64 != 0 {
            return Err(StorageError::MisalignedFile {
                path: self.path.clone(),
                len,
            });
        }
        Ok(len / PAGE_SIZE_U64)
    }

    /// Returns the page's offset, or `PageNotFound` if the file is too short
    /// to hold it.
    pub fn ensure_page_exists(&self, page_id: PageId) -> Result<u64> {
        let total_pages = self.page_count()?;
        if page_id >= total_pages {
            return Err(StorageError::PageNotFound {
                page_id,
                total_pages,
            });
        }
        page_offset(page_id)
    }

    /// Grows the file to hold at least `pages` pages. Never shrinks it.
    ///
    /// The file is extended by writing its final byte, then the new length is
    /// checked.
    pub fn ensure_size(&self, pages: u64) -> Result<()> {
        let required = pages
            .checked_mul(PAGE_SIZE_U64)
            .ok_or(StorageError::PageIdOutOfRange(pages))?;
        let current = self.len()?;
        if current >= required {
            return Ok(());
        }

        log::debug!(
            "growing {:?} from {current} to {required} bytes",
            self.path
        );
        write_all_at(&self.file, &[0u8], required - 1).map_err(StorageError::Io)?;

        let actual = self.len()?;
        if actual < required {
            return Err(StorageError::AllocationFailed { required, actual });
        }
        Ok(())
    }

    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.ensure_page_exists(page_id)?;
        Page::read(&self.file, page_id)
    }

    pub fn write_page(&self, page: &Page) -> Result<()> {
        page.write_to(&self.file)
    }

    pub fn sync(&self) -> Result<()> {
        self.file.sync_data().map_err(StorageError::Io)
    }
}
