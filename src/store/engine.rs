use crate::errors::AccessError;
use crate::store::collection::Collection;
use crate::store::session::{Session, StagedWrite};
use crate::types::CollectionName;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The embedded document store: named collections plus session and
/// transaction primitives.
pub struct DocumentStore {
    collections: RwLock<HashMap<CollectionName, Arc<Collection>>>,
    // Reads and standalone writes hold this shared, commits exclusively, so
    // a commit's staged writes land as one step; see Collection.
    commit_gate: Arc<RwLock<()>>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            commit_gate: Arc::new(RwLock::new(())),
        }
    }

    /// Returns the named collection, creating it when absent.
    pub fn create_collection(&self, name: &str) -> Arc<Collection> {
        let mut collections = self.collections.write();
        collections
            .entry(name.to_owned())
            .or_insert_with(|| {
                Arc::new(Collection::new(name.to_owned(), self.commit_gate.clone()))
            })
            .clone()
    }

    #[must_use]
    pub fn get_collection(&self, name: &str) -> Option<Arc<Collection>> {
        self.collections.read().get(name).cloned()
    }

    /// # Errors
    /// `UnknownCollection` when no collection with that name exists.
    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, AccessError> {
        self.get_collection(name)
            .ok_or_else(|| AccessError::UnknownCollection(name.to_owned()))
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.write().remove(name).is_some()
    }

    #[must_use]
    pub fn list_collection_names(&self) -> Vec<String> {
        self.collections.read().keys().cloned().collect()
    }

    /// Opens a new session against this store.
    #[must_use]
    pub fn start_session(self: &Arc<Self>) -> Arc<Session> {
        Session::new(self.clone())
    }

    /// Applies a committed transaction's staged writes as one step. Readers
    /// hold the gate shared, so none of them observes a half-applied commit.
    pub(crate) fn apply_committed(&self, staged: Vec<StagedWrite>) -> Result<(), AccessError> {
        let _commit = self.commit_gate.write();
        for write in staged {
            match write {
                StagedWrite::Insert { collection, document } => {
                    self.collection(&collection)?.commit_insert(document);
                }
                StagedWrite::Replace { collection, id_field, id, document } => {
                    self.collection(&collection)?.commit_replace(&id_field, &id, document);
                }
                StagedWrite::Delete { collection, id_field, id } => {
                    self.collection(&collection)?.commit_delete(&id_field, &id);
                }
            }
        }
        Ok(())
    }
}
