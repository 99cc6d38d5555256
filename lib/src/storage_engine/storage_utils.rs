// lib/src/storage_engine/storage_utils.rs

use bincode::config::{self, Configuration};
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionError};

use models::errors::{HospitalError, HospitalResult};

/// Every tree stores values with the same bincode configuration.
pub fn bincode_config() -> Configuration {
    config::standard()
}

pub fn encode<T: Serialize>(value: &T) -> HospitalResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(value, bincode_config())?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> HospitalResult<T> {
    let (value, _read) = bincode::serde::decode_from_slice(bytes, bincode_config())?;
    Ok(value)
}

/// Aborts the enclosing sled transaction with `err`.
pub fn abort<T>(err: impl Into<HospitalError>) -> ConflictableTransactionResult<T, HospitalError> {
    Err(ConflictableTransactionError::Abort(err.into()))
}

/// Like [`decode`], for use inside a transaction closure.
pub fn decode_tx<T: DeserializeOwned>(bytes: &[u8]) -> ConflictableTransactionResult<T, HospitalError> {
    decode(bytes).map_err(ConflictableTransactionError::Abort)
}

pub fn encode_tx<T: Serialize>(value: &T) -> ConflictableTransactionResult<Vec<u8>, HospitalError> {
    encode(value).map_err(ConflictableTransactionError::Abort)
}

/// An aborted transaction surfaces its own error; a sled failure becomes a storage error.
pub fn map_tx_error(err: TransactionError<HospitalError>) -> HospitalError {
    match err {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => HospitalError::StorageError(e.to_string()),
    }
}

/// Decodes a stored UUID key or value.
pub fn uuid_from_bytes(bytes: &[u8]) -> HospitalResult<uuid::Uuid> {
    uuid::Uuid::from_slice(bytes).map_err(HospitalError::from)
}
