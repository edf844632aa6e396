//! Configuration for tables
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

/// Extension of table files; a table named `customers` lives in
/// `{data_dir}/customers.table`.
pub const TABLE_FILE_EXTENSION: &str = "table";

#[derive(Debug, Clone)]
pub struct TableConfig {
    /// Directory holding the table files
    pub data_dir: PathBuf,

    /// fsync the table file after every flush (rollover and `save`)
    pub sync_on_flush: bool,

    /// Create `data_dir` when it does not exist
    pub create_dir: bool,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./bolddb_data"),
            sync_on_flush: false,
            create_dir: true,
        }
    }
}

impl TableConfig {
    pub fn builder() -> TableConfigBuilder {
        TableConfigBuilder::default()
    }

    /// Path of the file backing table `name`.
    pub fn table_path(&self, name: &str) -> PathBuf {
        table_path(&self.data_dir, name)
    }
}

pub fn table_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.{TABLE_FILE_EXTENSION}"))
}

/// Builder for TableConfig
#[derive(Default)]
pub struct TableConfigBuilder {
    config: TableConfig,
}

impl TableConfigBuilder {
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn sync_on_flush(mut self, sync: bool) -> Self {
        self.config.sync_on_flush = sync;
        self
    }

    pub fn create_dir(mut self, create: bool) -> Self {
        self.config.create_dir = create;
        self
    }

    pub fn build(self) -> TableConfig {
        self.config
    }
}
