//! Storage engine for BoldDB
//!
//! This crate provides a single-table, page-organized key-value store:
//! fixed-size slotted pages, a page file addressed by page id, and a table
//! that appends pages as it grows and answers point lookups by scanning them.

pub mod config;
pub mod file;
pub mod page;
pub mod row;
pub mod shared;
pub mod table;

pub use config::TableConfig;
pub use file::TableFile;
pub use page::{Page, PageHeader, PageId, PageType, Slot, PAGE_SIZE};
pub use row::{Record, Row};
pub use shared::SharedTable;
pub use table::{AccessCounter, GetResult, Table};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Page {page_id} not found (file holds {total_pages} pages)")]
    PageNotFound { page_id: PageId, total_pages: u64 },

    #[error("Page id {0} is beyond the largest addressable page")]
    PageIdOutOfRange(PageId),

    #[error("Invalid page flags: {0:#06x}")]
    InvalidPageFlags(u16),

    #[error("Corrupt page (id {page_id:?}): {reason}")]
    CorruptPage {
        page_id: Option<PageId>,
        reason: String,
    },

    #[error("Key must not be empty")]
    InvalidKey,

    #[error("Record needs {size} bytes but a page holds at most {max}")]
    RecordTooLarge { size: usize, max: usize },

    #[error("Table file {path:?} is {len} bytes, not a whole number of pages")]
    MisalignedFile { path: PathBuf, len: u64 },

    #[error("Failed to allocate file space: required {required} bytes, actual {actual}")]
    AllocationFailed { required: u64, actual: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StorageError>;
