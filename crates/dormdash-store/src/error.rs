//! # Store Errors
//!
//! Failures of the storage layer itself. A missing record is not one of
//! them: lookups return `Ok(None)`.

use std::path::PathBuf;

use dormdash_core::ValidationError;
use thiserror::Error;

/// Errors raised by the entity store and its backends.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Reading or writing a backing file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A persisted collection could not be decoded.
    #[error("corrupt {key} data: {source}")]
    Corrupt {
        /// The storage key that failed to decode.
        key: String,
        /// The decoding error.
        #[source]
        source: serde_json::Error,
    },

    /// Encoding a collection for persistence failed.
    #[error("failed to encode {key}: {source}")]
    Encode {
        /// The storage key being written.
        key: String,
        /// The encoding error.
        #[source]
        source: serde_json::Error,
    },

    /// Two records in one collection share an id.
    #[error("duplicate id {id} in {collection}")]
    DuplicateId {
        /// The collection name.
        collection: &'static str,
        /// The repeated id.
        id: String,
    },

    /// A collection name is claimed by two different record types.
    #[error("collection {0} is registered with a different record type")]
    CollectionType(&'static str),

    /// A storage key contains characters the file backend cannot map.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    /// A draft failed validation on create.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_id_display() {
        let err = StoreError::DuplicateId {
            collection: "users",
            id: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "duplicate id abc in users");
    }

    #[test]
    fn validation_converts() {
        let err: StoreError = ValidationError::Empty { field: "title" }.into();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(err.to_string().contains("title is required"));
    }
}
