//! # SecureVote Store
//!
//! Durable key-value capability shared by the face registry and the vote
//! ledger. Callers get one [`KvBackend`] per logical table from a [`Storage`]
//! handle and never touch the underlying database directly.
//!
//! ## Durability
//!
//! Every `put`, `delete` and `batch_put` on the redb backend runs in its own
//! write transaction and returns only after the commit, so an `Ok` means the
//! write survives a crash. The in-memory backend offers no durability and is
//! meant for tests and throwaway deployments.
//!
//! ## Example
//!
//! ```
//! use store::{BackendConfig, decode, encode};
//!
//! let storage = BackendConfig::in_memory().open().unwrap();
//! let table = storage.table("face_registry").unwrap();
//!
//! table.put("alice", &encode(&vec![0.5_f32, 0.25]).unwrap()).unwrap();
//! let raw = table.get("alice").unwrap().unwrap();
//! let values: Vec<f32> = decode(&raw).unwrap();
//! assert_eq!(values, vec![0.5, 0.25]);
//! ```

mod backend;

#[cfg(feature = "backend-redb")]
pub use backend::RedbBackend;
pub use backend::{BackendConfig, InMemoryBackend, KvBackend, Storage};

use bincode::config::standard;
use bincode::error::{DecodeError, EncodeError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by storage backends and the record codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("backend error: {0}")]
    Backend(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn backend<E: std::fmt::Display>(err: E) -> Self {
        Self::Backend(err.to_string())
    }
}

impl From<EncodeError> for StoreError {
    fn from(e: EncodeError) -> Self {
        StoreError::Encode(e.to_string())
    }
}

impl From<DecodeError> for StoreError {
    fn from(e: DecodeError) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Encode a record with the standard bincode configuration.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
    Ok(bincode::serde::encode_to_vec(value, standard())?)
}

/// Decode a record previously written with [`encode`].
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
    let (value, _) = bincode::serde::decode_from_slice(bytes, standard())?;
    Ok(value)
}
