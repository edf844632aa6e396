//! Thread-safe table handle.
//!
//! `Table` keeps unsynchronized state (the dirty map and the page counter),
//! so sharing one across threads goes through this wrapper. Every call holds
//! the lock for the whole operation, which covers the append-a-page
//! transition in `insert`.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::TableConfig;
use crate::row::{Record, Row};
use crate::table::{GetResult, Table};
use crate::Result;

pub struct SharedTable<R: Record = Row> {
    inner: Arc<Mutex<Table<R>>>,
}

impl<R: Record> Clone for SharedTable<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Record> SharedTable<R> {
    pub fn new(table: Table<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(table)),
        }
    }

    pub fn with_config(name: &str, config: TableConfig) -> Result<Self> {
        Table::with_config(name, config).map(Self::new)
    }

    pub fn insert(&self, row: &R) -> Result<bool> {
        self.inner.lock().insert(row)
    }

    pub fn get(&self, key: &[u8]) -> Result<GetResult<R>> {
        self.inner.lock().get(key)
    }

    pub fn size(&self) -> u64 {
        self.inner.lock().size()
    }

    pub fn save(&self) -> Result<()> {
        self.inner.lock().save()
    }

    pub fn total_pages(&self) -> u64 {
        self.inner.lock().total_pages()
    }

    /// Runs `f` with exclusive access to the table.
    pub fn with_table<T>(&self, f: impl FnOnce(&mut Table<R>) -> T) -> T {
        f(&mut self.inner.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_concurrent_inserts() {
        let dir = TempDir::new().unwrap();
        let config = TableConfig::builder().data_dir(dir.path()).build();
        let table: SharedTable = SharedTable::with_config("shared", config).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let table = table.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        let row = Row::new(format!("t{t}-{i}")).with_attribute("i", i);
                        assert!(table.insert(&row).unwrap());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(table.size(), 200);
        assert!(table.total_pages() > 1);
        for t in 0..4 {
            for i in 0..50 {
                let key = format!("t{t}-{i}");
                assert!(table.get(key.as_bytes()).unwrap().row.is_some(), "{key}");
            }
        }

        table.save().unwrap();
        assert!(table.with_table(|t| t.dirty_pages().is_empty()));
    }
}
