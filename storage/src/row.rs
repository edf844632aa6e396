//! Rows and the record codec the table stores them with.
//!
//! The table only needs a primary key and an opaque byte encoding of the
//! whole value; it never looks inside the value bytes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Something a [`Table`](crate::Table) can store.
pub trait Record: Sized {
    /// Key the record is looked up by. Must not be empty.
    fn primary_key(&self) -> &[u8];

    /// Bytes stored as the record's value.
    fn encode(&self) -> Result<Vec<u8>>;

    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// A primary key plus named attributes, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "primaryKey", with = "key_repr")]
    primary_key: Vec<u8>,
    attributes: BTreeMap<String, Value>,
}

impl Row {
    pub fn new(primary_key: impl Into<Vec<u8>>) -> Self {
        Self {
            primary_key: primary_key.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    pub fn key(&self) -> &[u8] {
        &self.primary_key
    }
}

/// Keys are written as JSON strings when they are UTF-8 and as byte arrays
/// otherwise.
mod key_repr {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        match std::str::from_utf8(key) {
            Ok(text) => serializer.serialize_str(text),
            Err(_) => serializer.serialize_bytes(key),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum KeyRepr {
        Text(String),
        Bytes(Vec<u8>),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Ok(match KeyRepr::deserialize(deserializer)? {
            KeyRepr::Text(text) => text.into_bytes(),
            KeyRepr::Bytes(bytes) => bytes,
        })
    }
}

impl Record for Row {
    fn primary_key(&self) -> &[u8] {
        &self.primary_key
    }

    fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
