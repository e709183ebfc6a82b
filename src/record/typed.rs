//! Typed records
//!
//! Serde values stored as bincode payloads, for callers that would rather
//! not frame their own bytes.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{RecStoreError, Result};

use super::{RecordId, RecordManager};

impl RecordManager {
    /// Serialize `value` and store it as a new record
    pub fn create_value<T: Serialize>(&self, value: &T) -> Result<RecordId> {
        self.create(&encode(value)?)
    }

    /// Read a record and deserialize it as `T`
    pub fn find_value<T: DeserializeOwned>(&self, id: RecordId) -> Result<Option<T>> {
        self.find(id)?.map(|bytes| decode(&bytes)).transpose()
    }

    /// Replace a record with the serialized form of `value`
    pub fn update_value<T: Serialize>(&self, id: RecordId, value: &T) -> Result<()> {
        self.update(id, &encode(value)?)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| RecStoreError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| RecStoreError::Serialization(e.to_string()))
}
