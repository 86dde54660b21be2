//! # Entity Store
//!
//! [`EntityStore`] is the explicit store object injected into every
//! component. It caches decoded collections in memory, loads each one
//! lazily on first access (an absent collection reads as empty), and
//! writes whole collections back through its [`Backend`].
//!
//! All mutations run inside a [`Txn`]: changes are staged on copies of the
//! touched collections and scalar map, persisted together in a single
//! backend call, and swapped into the cache only after the backend
//! accepted them. The convenience methods (`create`, `update`,
//! `write_all`, scalar setters) are one-operation transactions.
//!
//! Operations run to completion under the store lock. There is no
//! optimistic-concurrency check: the last commit wins.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use dormdash_core::{Identifier, Timestamp};
use parking_lot::RwLock;

use crate::backend::{Backend, FileBackend, MemoryBackend};
use crate::error::StoreError;
use crate::record::{Draft, Patch, Record};
use crate::table::{downcast, downcast_mut, ErasedTable, Table};

/// Storage key of the scalar map.
const SCALARS_KEY: &str = "scalars";

type Scalars = BTreeMap<String, String>;

#[derive(Default)]
struct Cache {
    tables: HashMap<&'static str, Box<dyn ErasedTable>>,
    scalars: Option<Scalars>,
}

impl Cache {
    fn ensure_table<T: Record>(&mut self, backend: &dyn Backend) -> Result<(), StoreError> {
        if self.tables.contains_key(T::COLLECTION) {
            return Ok(());
        }
        let table = match backend.load(T::COLLECTION)? {
            Some(bytes) => Table::<T>::decode(&bytes)?,
            None => Table::<T>::new(),
        };
        tracing::debug!(
            collection = T::COLLECTION,
            records = table.rows().len(),
            "loaded collection"
        );
        self.tables.insert(T::COLLECTION, Box::new(table));
        Ok(())
    }

    fn table<T: Record>(&self) -> Option<Result<&Table<T>, StoreError>> {
        self.tables.get(T::COLLECTION).map(|t| downcast::<T>(t.as_ref()))
    }

    fn ensure_scalars(&mut self, backend: &dyn Backend) -> Result<&mut Scalars, StoreError> {
        if self.scalars.is_none() {
            let scalars = match backend.load(SCALARS_KEY)? {
                Some(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                    StoreError::Corrupt {
                        key: SCALARS_KEY.to_string(),
                        source,
                    }
                })?,
                None => Scalars::new(),
            };
            self.scalars = Some(scalars);
        }
        Ok(self.scalars.get_or_insert_with(Scalars::new))
    }
}

/// Process-wide keyed storage of record collections and scalar keys.
pub struct EntityStore {
    backend: Arc<dyn Backend>,
    cache: RwLock<Cache>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl EntityStore {
    /// A store over an arbitrary backend. All collections start unloaded.
    pub fn with_backend(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// An empty, process-local store.
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()))
    }

    /// A store persisted as JSON files under `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Ok(Self::with_backend(Arc::new(FileBackend::open(dir)?)))
    }

    /// Run `f` against the loaded table for `T`.
    fn read<T: Record, R>(&self, f: impl FnOnce(&Table<T>) -> R) -> Result<R, StoreError> {
        {
            let cache = self.cache.read();
            if let Some(table) = cache.table::<T>() {
                return Ok(f(table?));
            }
        }
        let mut cache = self.cache.write();
        cache.ensure_table::<T>(self.backend.as_ref())?;
        match cache.table::<T>() {
            Some(table) => Ok(f(table?)),
            None => Err(StoreError::CollectionType(T::COLLECTION)),
        }
    }

    /// Every record of the collection, in insertion order.
    pub fn read_all<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        self.read::<T, _>(|t| t.rows().to_vec())
    }

    /// The record with `id`, if any.
    pub fn get<T: Record>(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        self.read::<T, _>(|t| t.get(id).cloned())
    }

    /// The first record matching `pred`, in insertion order.
    pub fn find<T: Record>(&self, pred: impl Fn(&T) -> bool) -> Result<Option<T>, StoreError> {
        self.read::<T, _>(|t| t.rows().iter().find(|r| pred(r)).cloned())
    }

    /// Every record matching `pred`, in insertion order.
    pub fn filter<T: Record>(&self, pred: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        self.read::<T, _>(|t| t.rows().iter().filter(|r| pred(r)).cloned().collect())
    }

    /// Replace the entire collection.
    pub fn write_all<T: Record>(&self, records: Vec<T>) -> Result<(), StoreError> {
        self.transaction(|txn| txn.write_all(records))
    }

    /// Create a record from a draft, assigning a fresh id and creation time.
    pub fn create<D: Draft>(&self, draft: D) -> Result<D::Record, StoreError> {
        self.transaction(|txn| txn.create(draft))
    }

    /// Merge `patch` into the record with `id`. `Ok(None)` if there is none.
    pub fn update<T, P>(&self, id: &T::Id, patch: P) -> Result<Option<T>, P::Error>
    where
        T: Record,
        P: Patch<T>,
    {
        self.transaction(|txn| txn.update(id, patch))
    }

    /// The value of a scalar key.
    pub fn scalar(&self, key: &str) -> Result<Option<String>, StoreError> {
        {
            let cache = self.cache.read();
            if let Some(scalars) = &cache.scalars {
                return Ok(scalars.get(key).cloned());
            }
        }
        let mut cache = self.cache.write();
        Ok(cache.ensure_scalars(self.backend.as_ref())?.get(key).cloned())
    }

    /// Set a scalar key, overwriting any previous value.
    pub fn set_scalar(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.transaction(|txn| txn.set_scalar(key, value))
    }

    /// Remove a scalar key. Returns the removed value.
    pub fn clear_scalar(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.transaction(|txn| txn.clear_scalar(key))
    }

    /// Run a unit of work.
    ///
    /// Everything `f` stages is committed in one backend write when it
    /// returns `Ok`; if it returns `Err`, or the commit itself fails,
    /// nothing it staged becomes visible.
    pub fn transaction<R, E>(&self, f: impl FnOnce(&mut Txn<'_>) -> Result<R, E>) -> Result<R, E>
    where
        E: From<StoreError>,
    {
        let mut cache = self.cache.write();
        let mut txn = Txn {
            backend: self.backend.as_ref(),
            cache: &mut *cache,
            staged: HashMap::new(),
            scalars: None,
        };
        let out = f(&mut txn)?;
        txn.commit()?;
        Ok(out)
    }
}

/// A unit of work over the store.
///
/// Reads see the transaction's own staged writes. Obtained through
/// [`EntityStore::transaction`].
pub struct Txn<'a> {
    backend: &'a dyn Backend,
    cache: &'a mut Cache,
    staged: HashMap<&'static str, Box<dyn ErasedTable>>,
    scalars: Option<Scalars>,
}

impl<'a> Txn<'a> {
    fn table<T: Record>(&mut self) -> Result<&Table<T>, StoreError> {
        if self.staged.contains_key(T::COLLECTION) {
            let staged = self
                .staged
                .get(T::COLLECTION)
                .ok_or(StoreError::CollectionType(T::COLLECTION))?;
            return downcast::<T>(staged.as_ref());
        }
        self.cache.ensure_table::<T>(self.backend)?;
        self.cache
            .table::<T>()
            .unwrap_or(Err(StoreError::CollectionType(T::COLLECTION)))
    }

    fn table_mut<T: Record>(&mut self) -> Result<&mut Table<T>, StoreError> {
        if !self.staged.contains_key(T::COLLECTION) {
            self.cache.ensure_table::<T>(self.backend)?;
            let copy = self
                .cache
                .tables
                .get(T::COLLECTION)
                .map(|t| t.clone_boxed())
                .ok_or(StoreError::CollectionType(T::COLLECTION))?;
            self.staged.insert(T::COLLECTION, copy);
        }
        let staged = self
            .staged
            .get_mut(T::COLLECTION)
            .ok_or(StoreError::CollectionType(T::COLLECTION))?;
        downcast_mut::<T>(staged.as_mut())
    }

    fn scalars_mut(&mut self) -> Result<&mut Scalars, StoreError> {
        if self.scalars.is_none() {
            let current = self.cache.ensure_scalars(self.backend)?.clone();
            self.scalars = Some(current);
        }
        Ok(self.scalars.get_or_insert_with(Scalars::new))
    }

    /// Every record of the collection, including staged writes.
    pub fn read_all<T: Record>(&mut self) -> Result<Vec<T>, StoreError> {
        Ok(self.table::<T>()?.rows().to_vec())
    }

    /// The record with `id`, if any.
    pub fn get<T: Record>(&mut self, id: &T::Id) -> Result<Option<T>, StoreError> {
        Ok(self.table::<T>()?.get(id).cloned())
    }

    /// The first record matching `pred`.
    pub fn find<T: Record>(&mut self, pred: impl Fn(&T) -> bool) -> Result<Option<T>, StoreError> {
        Ok(self.table::<T>()?.rows().iter().find(|r| pred(r)).cloned())
    }

    /// Every record matching `pred`.
    pub fn filter<T: Record>(&mut self, pred: impl Fn(&T) -> bool) -> Result<Vec<T>, StoreError> {
        Ok(self
            .table::<T>()?
            .rows()
            .iter()
            .filter(|r| pred(r))
            .cloned()
            .collect())
    }

    /// Stage a whole-collection replacement.
    pub fn write_all<T: Record>(&mut self, records: Vec<T>) -> Result<(), StoreError> {
        let table = Table::from_rows(records)?;
        self.staged.insert(T::COLLECTION, Box::new(table));
        Ok(())
    }

    /// Stage the creation of a record.
    pub fn create<D: Draft>(&mut self, draft: D) -> Result<D::Record, StoreError> {
        draft.validate()?;
        let record = draft.into_record(Identifier::generate(), Timestamp::now());
        self.table_mut::<D::Record>()?.push(record.clone())?;
        let collection = <D::Record as Record>::COLLECTION;
        tracing::debug!(collection, id = %record.id(), "created record");
        Ok(record)
    }

    /// Stage a partial update. `Ok(None)` if no record has `id`.
    ///
    /// The patch is applied to a copy; if it refuses, the stored record
    /// is unchanged.
    pub fn update<T, P>(&mut self, id: &T::Id, patch: P) -> Result<Option<T>, P::Error>
    where
        T: Record,
        P: Patch<T>,
    {
        let Some(mut record) = self.get::<T>(id)? else {
            return Ok(None);
        };
        patch.apply(&mut record)?;
        let slot = self
            .table_mut::<T>()?
            .get_mut(id)
            .ok_or(StoreError::CollectionType(T::COLLECTION))?;
        *slot = record.clone();
        tracing::debug!(collection = T::COLLECTION, id = %id, "updated record");
        Ok(Some(record))
    }

    /// The value of a scalar key, including staged writes.
    pub fn scalar(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(staged) = &self.scalars {
            return Ok(staged.get(key).cloned());
        }
        Ok(self.cache.ensure_scalars(self.backend)?.get(key).cloned())
    }

    /// Stage setting a scalar key.
    pub fn set_scalar(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.scalars_mut()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Stage removing a scalar key. Returns the value it had.
    pub fn clear_scalar(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.scalars_mut()?.remove(key))
    }

    fn commit(self) -> Result<(), StoreError> {
        if self.staged.is_empty() && self.scalars.is_none() {
            return Ok(());
        }
        let mut entries = Vec::with_capacity(self.staged.len() + 1);
        for (collection, table) in &self.staged {
            entries.push((collection.to_string(), table.encode()?));
        }
        if let Some(scalars) = &self.scalars {
            let bytes = serde_json::to_vec_pretty(scalars).map_err(|source| StoreError::Encode {
                key: SCALARS_KEY.to_string(),
                source,
            })?;
            entries.push((SCALARS_KEY.to_string(), bytes));
        }
        self.backend.persist(&entries)?;
        tracing::debug!(
            keys = ?entries.iter().map(|(k, _)| k.as_str()).collect::<Vec<_>>(),
            "committed"
        );
        self.cache.tables.extend(self.staged);
        if let Some(scalars) = self.scalars {
            self.cache.scalars = Some(scalars);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dormdash_core::{MessageId, ValidationError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: MessageId,
        text: String,
        pinned: bool,
        created_at: Timestamp,
    }

    impl Record for Note {
        type Id = MessageId;
        const COLLECTION: &'static str = "notes";

        fn id(&self) -> &MessageId {
            &self.id
        }

        fn created_at(&self) -> Timestamp {
            self.created_at
        }
    }

    struct NewNote(String);

    fn draft(text: &str) -> NewNote {
        NewNote(text.to_string())
    }

    impl Draft for NewNote {
        type Record = Note;

        fn validate(&self) -> Result<(), ValidationError> {
            if self.0.trim().is_empty() {
                return Err(ValidationError::Empty { field: "text" });
            }
            Ok(())
        }

        fn into_record(self, id: MessageId, created_at: Timestamp) -> Note {
            Note {
                id,
                text: self.0,
                pinned: false,
                created_at,
            }
        }
    }

    #[derive(Default)]
    struct NotePatch {
        text: Option<&'static str>,
        pinned: Option<bool>,
    }

    impl Patch<Note> for NotePatch {
        type Error = StoreError;

        fn apply(self, record: &mut Note) -> Result<(), StoreError> {
            if let Some(text) = self.text {
                if text.is_empty() {
                    return Err(ValidationError::Empty { field: "text" }.into());
                }
                record.text = text.to_string();
            }
            if let Some(pinned) = self.pinned {
                record.pinned = pinned;
            }
            Ok(())
        }
    }

    #[test]
    fn uninitialized_collection_reads_empty() {
        let store = EntityStore::in_memory();
        assert!(store.read_all::<Note>().unwrap().is_empty());
    }

    #[test]
    fn create_assigns_identity_and_appends() {
        let store = EntityStore::in_memory();
        let before = Timestamp::now();
        let a = store.create(draft("first")).unwrap();
        let b = store.create(draft("second")).unwrap();
        assert_ne!(a.id, b.id);
        assert!(a.created_at >= before);
        let all = store.read_all::<Note>().unwrap();
        assert_eq!(all, vec![a.clone(), b]);
        assert_eq!(store.get::<Note>(&a.id).unwrap(), Some(a));
    }

    #[test]
    fn create_rejects_invalid_draft_without_writing() {
        let store = EntityStore::in_memory();
        let err = store.create(draft("  ")).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        assert!(store.read_all::<Note>().unwrap().is_empty());
    }

    #[test]
    fn update_merges_only_named_fields() {
        let store = EntityStore::in_memory();
        let note = store.create(draft("draft")).unwrap();
        let updated = store
            .update(
                &note.id,
                NotePatch {
                    pinned: Some(true),
                    ..NotePatch::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(updated.pinned);
        assert_eq!(updated.text, "draft");
        assert_eq!(updated.created_at, note.created_at);
        assert_eq!(store.get::<Note>(&note.id).unwrap(), Some(updated));
    }

    #[test]
    fn update_of_unknown_id_is_none() {
        let store = EntityStore::in_memory();
        let result = store
            .update::<Note, _>(&MessageId::new(), NotePatch::default())
            .unwrap();
        assert_eq!(result, None);
    }

    #[test]
    fn refused_patch_leaves_record_untouched() {
        let store = EntityStore::in_memory();
        let note = store.create(draft("keep")).unwrap();
        let result = store.update(
            &note.id,
            NotePatch {
                text: Some(""),
                pinned: Some(true),
            },
        );
        assert!(result.is_err());
        assert_eq!(store.get::<Note>(&note.id).unwrap(), Some(note));
    }

    #[test]
    fn write_all_replaces_collection() {
        let store = EntityStore::in_memory();
        let a = store.create(draft("a")).unwrap();
        store.create(draft("b")).unwrap();
        store.write_all(vec![a.clone()]).unwrap();
        assert_eq!(store.read_all::<Note>().unwrap(), vec![a]);
    }

    #[test]
    fn write_all_rejects_duplicate_ids() {
        let store = EntityStore::in_memory();
        let a = store.create(draft("a")).unwrap();
        let err = store.write_all(vec![a.clone(), a]).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId { .. }));
        assert_eq!(store.read_all::<Note>().unwrap().len(), 1);
    }

    #[test]
    fn find_and_filter_follow_insertion_order() {
        let store = EntityStore::in_memory();
        store.create(draft("apple")).unwrap();
        store.create(draft("banana")).unwrap();
        store.create(draft("avocado")).unwrap();
        let first_a = store.find::<Note>(|n| n.text.starts_with('a')).unwrap();
        assert_eq!(first_a.unwrap().text, "apple");
        let all_a: Vec<String> = store
            .filter::<Note>(|n| n.text.starts_with('a'))
            .unwrap()
            .into_iter()
            .map(|n| n.text)
            .collect();
        assert_eq!(all_a, vec!["apple", "avocado"]);
    }

    #[test]
    fn scalars_set_get_clear() {
        let store = EntityStore::in_memory();
        assert_eq!(store.scalar("session").unwrap(), None);
        store.set_scalar("session", "u1").unwrap();
        store.set_scalar("session", "u2").unwrap();
        assert_eq!(store.scalar("session").unwrap(), Some("u2".to_string()));
        assert_eq!(
            store.clear_scalar("session").unwrap(),
            Some("u2".to_string())
        );
        assert_eq!(store.scalar("session").unwrap(), None);
        assert_eq!(store.clear_scalar("session").unwrap(), None);
    }

    #[test]
    fn failed_transaction_discards_every_staged_change() {
        let store = EntityStore::in_memory();
        let result: Result<(), StoreError> = store.transaction(|txn| {
            txn.create(draft("ghost"))?;
            txn.set_scalar("flag", "on")?;
            Err(ValidationError::Empty { field: "anything" }.into())
        });
        assert!(result.is_err());
        assert!(store.read_all::<Note>().unwrap().is_empty());
        assert_eq!(store.scalar("flag").unwrap(), None);
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let store = EntityStore::in_memory();
        store
            .transaction(|txn| -> Result<(), StoreError> {
                let note = txn.create(draft("inside"))?;
                assert_eq!(txn.get::<Note>(&note.id)?, Some(note));
                txn.set_scalar("k", "v")?;
                assert_eq!(txn.scalar("k")?, Some("v".to_string()));
                Ok(())
            })
            .unwrap();
        assert_eq!(store.read_all::<Note>().unwrap().len(), 1);
        assert_eq!(store.scalar("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let note = {
            let store = EntityStore::open(dir.path()).unwrap();
            let note = store.create(draft("persisted")).unwrap();
            store.set_scalar("session", "u1").unwrap();
            note
        };
        let reopened = EntityStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get::<Note>(&note.id).unwrap(), Some(note));
        assert_eq!(reopened.scalar("session").unwrap(), Some("u1".to_string()));
    }

    #[test]
    fn file_commit_is_whole_when_one_key_cannot_be_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::open(dir.path()).unwrap();
        std::fs::create_dir(dir.path().join(format!("{SCALARS_KEY}.json"))).unwrap();
        let note = store
            .transaction(|txn| {
                let note = txn.create(draft("journaled"))?;
                txn.set_scalar("session", "u1")?;
                Ok::<_, StoreError>(note)
            })
            .unwrap();
        assert_eq!(store.get::<Note>(&note.id).unwrap(), Some(note.clone()));
        assert_eq!(store.scalar("session").unwrap(), Some("u1".to_string()));

        let reopened = EntityStore::open(dir.path()).unwrap();
        assert_eq!(reopened.get::<Note>(&note.id).unwrap(), Some(note));
        assert_eq!(reopened.scalar("session").unwrap(), Some("u1".to_string()));
    }

    #[test]
    fn corrupt_collection_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), b"{ not json").unwrap();
        let store = EntityStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.read_all::<Note>(),
            Err(StoreError::Corrupt { .. })
        ));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        proptest! {
            /// Every created record is read back exactly once, with a
            /// unique id.
            #[test]
            fn creation_round_trip(texts in proptest::collection::vec("[a-z]{1,12}", 1..20)) {
                let store = EntityStore::in_memory();
                let mut created = Vec::new();
                for text in &texts {
                    created.push(store.create(draft(text)).unwrap());
                }
                let all = store.read_all::<Note>().unwrap();
                prop_assert_eq!(&all, &created);
                let ids: HashSet<_> = all.iter().map(|n| n.id.clone()).collect();
                prop_assert_eq!(ids.len(), all.len());
            }
        }
    }
}
