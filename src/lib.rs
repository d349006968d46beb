pub mod errors;
pub mod logger;
pub mod query;
pub mod repository;
pub mod store;
pub mod transaction;
pub mod types;

use crate::errors::AccessError;
use crate::query::TypeDescriptor;
use crate::repository::Repository;
use crate::store::DocumentStore;
use crate::transaction::TransactionCoordinator;
use crate::types::ResourceMapping;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The data-access layer: one document store, one repository per registered
/// resource type, and per-request transaction coordinators.
///
/// Resource mappings are registered once at startup; repositories are
/// resolved from here instead of being looked up through ambient state.
pub struct DataLayer {
    store: Arc<DocumentStore>,
    repositories: RwLock<HashMap<String, Arc<Repository>>>,
}

impl Default for DataLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: Arc::new(DocumentStore::new()),
            repositories: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Registers a resource type and returns its repository. Registering
    /// the same resource again replaces the previous repository.
    pub fn register(&self, mapping: ResourceMapping, descriptor: TypeDescriptor) -> Arc<Repository> {
        let resource = mapping.resource.clone();
        let repository = Arc::new(Repository::new(&self.store, mapping, descriptor));
        self.repositories.write().insert(resource, repository.clone());
        repository
    }

    /// # Errors
    /// `UnknownCollection` when no repository is registered for `resource`.
    pub fn repository(&self, resource: &str) -> Result<Arc<Repository>, AccessError> {
        self.repositories
            .read()
            .get(resource)
            .cloned()
            .ok_or_else(|| AccessError::UnknownCollection(resource.to_owned()))
    }

    /// Opens the transaction coordinator for one logical unit of work.
    #[must_use]
    pub fn begin_unit_of_work(&self) -> TransactionCoordinator {
        TransactionCoordinator::new(self.store.clone())
    }
}

/// Initializes the data-access layer's logging.
///
/// Should be called before any other operation by hosts that do not bring
/// their own `log` configuration.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    logger::init()?;
    Ok(())
}
