use crate::errors::AccessError;
use crate::query::scope::{Scope, TypeDescriptor};
use crate::query::types::QueryDescription;
use crate::query::{ordering, predicate, window};
use bson::Document;

/// A query in the store's executable form: wire filter document, ordered
/// sort document, and skip/take bounds over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    pub collection: String,
    pub filter: Document,
    pub sort: Document,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl TranslatedQuery {
    /// The base query: every document in the collection, natural order.
    #[must_use]
    pub fn all(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: Document::new(),
            sort: Document::new(),
            skip: 0,
            limit: None,
        }
    }
}

/// Converts a store-agnostic query description into an executable store
/// query for one resource type.
#[derive(Debug, Clone)]
pub struct QueryTranslator {
    descriptor: TypeDescriptor,
}

impl QueryTranslator {
    #[must_use]
    pub fn new(descriptor: TypeDescriptor) -> Self {
        Self { descriptor }
    }

    #[must_use]
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    /// Composes filter, sort and pagination onto a base collection query, in
    /// that fixed order. Sorting before paging is what keeps page contents
    /// deterministic.
    ///
    /// One scope is created per call and dropped when the translated query
    /// has been built; it never escapes this function. No default sort is
    /// injected here — when the description has no sort keys, the layer
    /// above imposes a stable order by identifier.
    ///
    /// # Errors
    /// `RelationshipsUnsupported` for any relationship traversal in filter
    /// or sort, before any store round-trip; `LiteralCoercion` for operands
    /// that do not parse as the field's native type.
    pub fn apply_query(
        &self,
        mut query: TranslatedQuery,
        description: &QueryDescription,
    ) -> Result<TranslatedQuery, AccessError> {
        let scope = Scope::enter(&self.descriptor);
        if let Some(filter) = &description.filter {
            query.filter = predicate::build_filter(&scope, filter)?;
        }
        if !description.sort.is_empty() {
            query.sort = ordering::build_sort(&scope, &description.sort)?;
        }
        if let Some(page) = &description.page {
            window::apply_window(&mut query, page);
        }
        log::debug!(
            "translated query over '{}' as {}: filter_keys={} sort_keys={} skip={} limit={:?}",
            query.collection,
            scope.parameter_name(),
            query.filter.len(),
            query.sort.len(),
            query.skip,
            query.limit
        );
        Ok(query)
    }
}
