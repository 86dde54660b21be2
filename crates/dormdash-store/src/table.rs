//! In-memory representation of one collection.

use std::any::Any;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::record::Record;

/// An insertion-ordered collection with an index by id.
///
/// Records are never removed, so positions in `rows` are stable and the
/// index can point straight at them.
pub(crate) struct Table<T: Record> {
    rows: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Record> Table<T> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Build a table, rejecting duplicate ids.
    pub(crate) fn from_rows(rows: Vec<T>) -> Result<Self, StoreError> {
        let mut index = HashMap::with_capacity(rows.len());
        for (pos, row) in rows.iter().enumerate() {
            if index.insert(row.id().clone(), pos).is_some() {
                return Err(StoreError::DuplicateId {
                    collection: T::COLLECTION,
                    id: row.id().to_string(),
                });
            }
        }
        Ok(Self { rows, index })
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let rows: Vec<T> = serde_json::from_slice(bytes).map_err(|source| StoreError::Corrupt {
            key: T::COLLECTION.to_string(),
            source,
        })?;
        Self::from_rows(rows)
    }

    pub(crate) fn rows(&self) -> &[T] {
        &self.rows
    }

    pub(crate) fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    pub(crate) fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        match self.index.get(id) {
            Some(&pos) => self.rows.get_mut(pos),
            None => None,
        }
    }

    pub(crate) fn push(&mut self, record: T) -> Result<(), StoreError> {
        if self.index.contains_key(record.id()) {
            return Err(StoreError::DuplicateId {
                collection: T::COLLECTION,
                id: record.id().to_string(),
            });
        }
        self.index.insert(record.id().clone(), self.rows.len());
        self.rows.push(record);
        Ok(())
    }
}

impl<T: Record> Clone for Table<T> {
    fn clone(&self) -> Self {
        Self {
            rows: self.rows.clone(),
            index: self.index.clone(),
        }
    }
}

/// Type-erased table, so one cache can hold every collection.
pub(crate) trait ErasedTable: Send + Sync {
    fn encode(&self) -> Result<Vec<u8>, StoreError>;
    fn clone_boxed(&self) -> Box<dyn ErasedTable>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Record> ErasedTable for Table<T> {
    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec_pretty(&self.rows).map_err(|source| StoreError::Encode {
            key: T::COLLECTION.to_string(),
            source,
        })
    }

    fn clone_boxed(&self) -> Box<dyn ErasedTable> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

pub(crate) fn downcast<T: Record>(table: &dyn ErasedTable) -> Result<&Table<T>, StoreError> {
    table
        .as_any()
        .downcast_ref::<Table<T>>()
        .ok_or(StoreError::CollectionType(T::COLLECTION))
}

pub(crate) fn downcast_mut<T: Record>(
    table: &mut dyn ErasedTable,
) -> Result<&mut Table<T>, StoreError> {
    table
        .as_any_mut()
        .downcast_mut::<Table<T>>()
        .ok_or(StoreError::CollectionType(T::COLLECTION))
}
