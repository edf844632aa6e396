//! Table: a chain of pages in one file.
//!
//! ## Layout
//! Pages are numbered from 0 and appended as the table grows. Only the last
//! page (the tail) takes inserts. Lookups scan pages in id order.
//!
//! ## Caching
//! Pages modified since the last flush are held in memory in the dirty map.
//! Any page not in the map is durable and is read from the file on every
//! access; there is no read cache.
//!
//! ## Concurrency
//! Single writer: mutators take `&mut self`. Wrap the table in a
//! [`SharedTable`](crate::SharedTable) to share it between threads.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::config::TableConfig;
use crate::file::TableFile;
use crate::page::{Page, PageId};
use crate::row::{Record, Row};
use crate::{Result, StorageError};

/// Counts pages touched by lookups. Supplied by the caller, so several
/// lookups can be accumulated into one counter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccessCounter {
    pages: u64,
}

impl AccessCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self) {
        self.pages += 1;
    }

    pub fn pages(&self) -> u64 {
        self.pages
    }

    pub fn reset(&mut self) {
        self.pages = 0;
    }
}

/// Outcome of a point lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct GetResult<R> {
    pub row: Option<R>,
    /// Pages touched, including the one holding the match.
    pub pages_accessed: u64,
}

pub struct Table<R: Record = Row> {
    name: String,
    path: PathBuf,
    config: TableConfig,

    /// Pages that exist, on disk or only in memory. Always at least 1.
    total_pages: u64,

    /// Pages modified since their last flush, by id
    dirty: BTreeMap<PageId, Page>,

    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Table<R> {
    /// Opens table `name` in `dir`, creating it if its file is absent.
    pub fn open(name: &str, dir: impl Into<PathBuf>) -> Result<Self> {
        Self::with_config(name, TableConfig::builder().data_dir(dir).build())
    }

    /// Opens or creates a table.
    ///
    /// An existing, non-empty file gives the page count (its length must be
    /// a whole number of pages). Otherwise the table starts with one empty
    /// page held dirty in memory; nothing is written until the first flush.
    pub fn with_config(name: &str, config: TableConfig) -> Result<Self> {
        if config.create_dir {
            fs::create_dir_all(&config.data_dir)?;
        }
        let path = config.table_path(name);

        let existing_pages = if path.exists() {
            TableFile::open_read(&path)?.page_count()?
        } else {
            0
        };

        let mut dirty = BTreeMap::new();
        let total_pages = if existing_pages > 0 {
            log::debug!("opened table {name} with {existing_pages} pages at {path:?}");
            existing_pages
        } else {
            log::debug!("created table {name} at {path:?}");
            dirty.insert(0, Page::new(0));
            1
        };

        Ok(Self {
            name: name.to_string(),
            path,
            config,
            total_pages,
            dirty,
            _record: PhantomData,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn total_pages(&self) -> u64 {
        self.total_pages
    }

    /// Ids of unflushed pages, ascending.
    pub fn dirty_pages(&self) -> Vec<PageId> {
        self.dirty.keys().copied().collect()
    }

    fn tail_id(&self) -> PageId {
        self.total_pages - 1
    }

    /// Inserts a record into the tail page, appending a page when the tail
    /// is full.
    ///
    /// Returns `Ok(false)` only when the record cannot fit even an empty
    /// page. On rollover the old tail is flushed before the new page takes
    /// the record.
    pub fn insert(&mut self, row: &R) -> Result<bool> {
        let key = row.primary_key();
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }
        let value = row.encode()?;

        let required = Page::required_space(key.len(), value.len());
        if required > Page::MAX_RECORD_SPACE {
            log::warn!(
                "table {}: record needs {required} bytes, a page holds at most {}",
                self.name,
                Page::MAX_RECORD_SPACE
            );
            return Ok(false);
        }

        let tail_id = self.tail_id();
        let inserted = match self.dirty.get_mut(&tail_id) {
            Some(tail) => tail.put(key, &value),
            None => {
                let mut tail = self.read_page(tail_id)?;
                let inserted = tail.put(key, &value);
                if inserted {
                    self.dirty.insert(tail_id, tail);
                }
                inserted
            }
        };
        if inserted {
            return Ok(true);
        }

        self.flush_page(tail_id)?;

        let page_id = self.total_pages;
        let mut page = Page::new(page_id);
        let inserted = page.put(key, &value);
        self.dirty.insert(page_id, page);
        self.total_pages += 1;

        log::debug!(
            "table {}: page {tail_id} full, appended page {page_id}",
            self.name
        );
        Ok(inserted)
    }

    /// Point lookup. Scans pages from id 0 and stops at the first match.
    pub fn get(&self, key: &[u8]) -> Result<GetResult<R>> {
        let mut counter = AccessCounter::new();
        let row = self.get_counted(key, &mut counter)?;
        Ok(GetResult {
            row,
            pages_accessed: counter.pages(),
        })
    }

    /// [`Table::get`] that records every page it touches in `counter`.
    pub fn get_counted(&self, key: &[u8], counter: &mut AccessCounter) -> Result<Option<R>> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey);
        }

        for page_id in 0..self.total_pages {
            counter.record();
            let page = self.page(page_id)?;
            if let Some(value) = page.get(key)? {
                log::trace!("table {}: key found in page {page_id}", self.name);
                return R::decode(value).map(Some);
            }
        }
        Ok(None)
    }

    /// Live records across all pages.
    ///
    /// Best effort: a page that fails to load is logged and skipped.
    pub fn size(&self) -> u64 {
        (0..self.total_pages)
            .filter_map(|page_id| match self.page(page_id) {
                Ok(page) => Some(u64::from(page.count())),
                Err(e) => {
                    log::warn!("table {}: skipping page {page_id} in size: {e}", self.name);
                    None
                }
            })
            .sum()
    }

    /// Flushes every dirty page to its offset, then clears the dirty set.
    pub fn save(&mut self) -> Result<()> {
        if self.dirty.is_empty() {
            return Ok(());
        }

        let file = TableFile::open_write(&self.path)?;
        file.ensure_size(self.total_pages)?;
        for page in self.dirty.values() {
            file.write_page(page)?;
        }
        if self.config.sync_on_flush {
            file.sync()?;
        }

        log::debug!(
            "table {}: saved {} dirty pages",
            self.name,
            self.dirty.len()
        );
        self.dirty.clear();
        Ok(())
    }

    /// The dirty copy of a page if there is one, otherwise a fresh read from
    /// the file.
    pub fn page(&self, page_id: PageId) -> Result<Cow<'_, Page>> {
        match self.dirty.get(&page_id) {
            Some(page) => Ok(Cow::Borrowed(page)),
            None => self.read_page(page_id).map(Cow::Owned),
        }
    }

    fn read_page(&self, page_id: PageId) -> Result<Page> {
        TableFile::open_read(&self.path)?.read_page(page_id)
    }

    /// Writes one dirty page and drops it from the dirty set. Other dirty
    /// pages stay put. A clean page needs nothing.
    fn flush_page(&mut self, page_id: PageId) -> Result<()> {
        let Some(page) = self.dirty.get(&page_id) else {
            return Ok(());
        };

        let file = TableFile::open_write(&self.path)?;
        file.ensure_size(self.total_pages)?;
        file.write_page(page)?;
        if self.config.sync_on_flush {
            file.sync()?;
        }

        log::debug!("table {}: flushed page {page_id}", self.name);
        self.dirty.remove(&page_id);
        Ok(())
    }
}
