//! # dormdash-store: Entity Store
//!
//! Durable, process-wide storage of homogeneous record collections,
//! addressed by collection name, plus a handful of scalar keys. Every
//! other component reads and writes through this crate.
//!
//! ## Model
//!
//! - A collection is an insertion-ordered table with a hash index by id:
//!   lookups and updates are O(1), and reading the whole collection still
//!   returns every record in a stable order.
//! - Records are immutable-by-replacement. They are created through a
//!   [`Draft`] (the store assigns id and creation time) and changed through
//!   a [`Patch`] that merges named fields into the stored record. Nothing
//!   is ever deleted.
//! - "Not found" is `Ok(None)`, never an error.
//! - Every write persists the whole affected collection. Writes that span
//!   collections go through [`EntityStore::transaction`], which commits all
//!   staged changes to the backend in one call and only then makes them
//!   visible, so a failure part-way leaves nothing half-applied.
//!
//! ## Backends
//!
//! - [`MemoryBackend`]: process-local, for tests and ephemeral sessions.
//! - [`FileBackend`]: one JSON file per key in a directory, written
//!   through temporary files and renamed into place. Commits spanning
//!   several keys go through a journal first, replayed on open if the
//!   copy into key files was cut short.

pub mod backend;
pub mod error;
pub mod record;
pub mod store;
mod table;

pub use backend::{Backend, FileBackend, MemoryBackend};
pub use error::StoreError;
pub use record::{Draft, Patch, Record};
pub use store::{EntityStore, Txn};
