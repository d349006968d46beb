use crate::errors::AccessError;
use crate::query::{FilterNode, QueryDescription, QueryTranslator, TranslatedQuery, TypeDescriptor};
use crate::store::{Cancellation, Collection, DocumentStore, Session};
use crate::types::{IdType, ResourceMapping, TargetedFields};
use bson::{Bson, Document};
use std::sync::Arc;

/// Create/read/update/delete operations for one resource type, routed
/// through query translation into its mapped collection.
///
/// All operations are asynchronous, accept the session of the surrounding
/// unit of work (or none for standalone calls), and a cancellation token
/// that propagates to the store round-trip.
pub struct Repository {
    collection: Arc<Collection>,
    mapping: ResourceMapping,
    translator: QueryTranslator,
}

impl Repository {
    /// Binds a resource mapping and element type descriptor to the mapped
    /// collection, creating the collection when it does not exist yet.
    pub fn new(store: &DocumentStore, mapping: ResourceMapping, descriptor: TypeDescriptor) -> Self {
        let collection = store.create_collection(&mapping.collection);
        Self { collection, translator: QueryTranslator::new(descriptor), mapping }
    }

    #[must_use]
    pub fn mapping(&self) -> &ResourceMapping {
        &self.mapping
    }

    fn base_query(&self) -> TranslatedQuery {
        TranslatedQuery::all(&self.mapping.collection)
    }

    /// Counts the documents matching `filter` (all documents when `None`).
    ///
    /// # Errors
    /// Translation errors (`RelationshipsUnsupported`, `LiteralCoercion`)
    /// and `Cancelled`.
    pub async fn count(
        &self,
        filter: Option<&FilterNode>,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<u64, AccessError> {
        let description =
            QueryDescription { filter: filter.cloned(), ..QueryDescription::default() };
        let query = self.translator.apply_query(self.base_query(), &description)?;
        self.collection.count(&query, session, cancel).await
    }

    /// Translates the description and materializes the full result set,
    /// filter, sort and page window applied.
    ///
    /// When the description carries no sort keys, results are ordered by
    /// identifier so repeated calls page deterministically.
    ///
    /// # Errors
    /// Translation errors and `Cancelled`.
    pub async fn get(
        &self,
        description: &QueryDescription,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<Vec<Document>, AccessError> {
        let query = self.translate_with_fallback_sort(description)?;
        self.collection.find(&query, session, cancel).await
    }

    /// [`get`](Self::get) narrowed to at most one result. `None` is not an
    /// error by itself; the caller decides whether a missing target is
    /// fatal.
    ///
    /// # Errors
    /// Translation errors and `Cancelled`.
    pub async fn get_for_update(
        &self,
        description: &QueryDescription,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<Option<Document>, AccessError> {
        let mut query = self.translate_with_fallback_sort(description)?;
        query.limit = Some(1);
        let mut docs = self.collection.find(&query, session, cancel).await?;
        Ok(if docs.is_empty() { None } else { Some(docs.remove(0)) })
    }

    /// Inserts a new document built by copying only the targeted fields from
    /// `incoming` onto `for_storage`.
    ///
    /// Creation is a merge of explicit fields onto a fresh instance, never a
    /// raw insert of the caller-supplied object: server-computed and
    /// non-writable fields keep the values `for_storage` arrived with.
    ///
    /// # Errors
    /// `WriteNotAcknowledged` when the store does not acknowledge the
    /// insert; `Cancelled` before the write reaches the store.
    pub async fn create(
        &self,
        incoming: &Document,
        mut for_storage: Document,
        targeted: &TargetedFields,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<Document, AccessError> {
        merge_targeted(incoming, &mut for_storage, targeted);
        self.ensure_id(&mut for_storage)?;
        let ack = self.collection.insert_one(for_storage.clone(), session, cancel).await?;
        if !ack.acknowledged {
            return Err(AccessError::WriteNotAcknowledged(format!(
                "insert into '{}'",
                self.mapping.collection
            )));
        }
        Ok(for_storage)
    }

    /// Merge-then-replace: copies only the targeted fields from `incoming`
    /// onto the already-loaded `stored` document, then replaces the stored
    /// document wholesale with the merged version. Fields outside the
    /// targeted set keep their previously stored values.
    ///
    /// # Errors
    /// `WriteNotAcknowledged` when the store does not acknowledge the
    /// replace; `ResourceNotFound` when the target vanished between load
    /// and write; `Cancelled` before the write reaches the store.
    pub async fn update(
        &self,
        incoming: &Document,
        mut stored: Document,
        targeted: &TargetedFields,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<Document, AccessError> {
        merge_targeted(incoming, &mut stored, targeted);
        let id = stored
            .get(&self.mapping.id_field)
            .cloned()
            .ok_or_else(|| {
                AccessError::Query(format!(
                    "stored document carries no '{}' identifier",
                    self.mapping.id_field
                ))
            })?;
        let ack = self
            .collection
            .replace_one(&self.mapping.id_field, &id, stored.clone(), session, cancel)
            .await?;
        if !ack.acknowledged {
            return Err(AccessError::WriteNotAcknowledged(format!(
                "replace in '{}'",
                self.mapping.collection
            )));
        }
        if ack.affected == 0 {
            return Err(self.not_found(&id));
        }
        Ok(stored)
    }

    /// Deletes by identifier, distinguishing an unacknowledged write
    /// (infrastructure failure, retryable upstream) from an acknowledged
    /// write that matched nothing (the resource did not exist).
    ///
    /// # Errors
    /// `WriteNotAcknowledged`, `ResourceNotFound`, `Cancelled`.
    pub async fn delete(
        &self,
        id: &Bson,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<(), AccessError> {
        let ack = self
            .collection
            .delete_one(&self.mapping.id_field, id, session, cancel)
            .await?;
        if !ack.acknowledged {
            return Err(AccessError::WriteNotAcknowledged(format!(
                "delete from '{}'",
                self.mapping.collection
            )));
        }
        if ack.affected == 0 {
            return Err(self.not_found(id));
        }
        Ok(())
    }

    /// # Errors
    /// Always `RelationshipsUnsupported`; the store has no join model.
    pub async fn set_relationship(&self, relationship: &str) -> Result<(), AccessError> {
        Err(self.relationships_unsupported(relationship))
    }

    /// # Errors
    /// Always `RelationshipsUnsupported`; the store has no join model.
    pub async fn add_to_relationship(&self, relationship: &str) -> Result<(), AccessError> {
        Err(self.relationships_unsupported(relationship))
    }

    /// # Errors
    /// Always `RelationshipsUnsupported`; the store has no join model.
    pub async fn remove_from_relationship(&self, relationship: &str) -> Result<(), AccessError> {
        Err(self.relationships_unsupported(relationship))
    }

    fn translate_with_fallback_sort(
        &self,
        description: &QueryDescription,
    ) -> Result<TranslatedQuery, AccessError> {
        let mut query = self.translator.apply_query(self.base_query(), description)?;
        if query.sort.is_empty() {
            query.sort.insert(self.mapping.id_field.clone(), 1_i32);
        }
        Ok(query)
    }

    fn ensure_id(&self, document: &mut Document) -> Result<(), AccessError> {
        if document.get(&self.mapping.id_field).is_some() {
            return Ok(());
        }
        let id = match self.mapping.id_type {
            IdType::ObjectId => Bson::ObjectId(bson::oid::ObjectId::new()),
            IdType::String => Bson::String(uuid::Uuid::new_v4().to_string()),
            IdType::Int => {
                return Err(AccessError::Query(format!(
                    "resource '{}' uses integer identifiers; the caller must supply one",
                    self.mapping.resource
                )));
            }
        };
        document.insert(self.mapping.id_field.clone(), id);
        Ok(())
    }

    fn not_found(&self, id: &Bson) -> AccessError {
        AccessError::ResourceNotFound {
            collection: self.mapping.collection.clone(),
            id: format!("{id}"),
        }
    }

    fn relationships_unsupported(&self, relationship: &str) -> AccessError {
        AccessError::RelationshipsUnsupported(format!(
            "resource '{}' cannot mutate relationship '{relationship}'",
            self.mapping.resource
        ))
    }
}

/// Copies only the targeted fields present on `incoming` onto `target`.
fn merge_targeted(incoming: &Document, target: &mut Document, targeted: &TargetedFields) {
    for field in targeted.iter() {
        if let Some(value) = incoming.get(field) {
            target.insert(field.to_owned(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn merge_copies_only_targeted_fields() {
        let incoming = doc! { "title": "X", "secret": "leak" };
        let mut target = doc! { "title": "", "secret": "" };
        let targeted: TargetedFields = ["title"].into_iter().collect();
        merge_targeted(&incoming, &mut target, &targeted);
        assert_eq!(target, doc! { "title": "X", "secret": "" });
    }

    #[test]
    fn merge_skips_targeted_fields_absent_from_incoming() {
        let incoming = doc! { "title": "X" };
        let mut target = doc! { "title": "old", "pages": 10 };
        let targeted: TargetedFields = ["title", "pages"].into_iter().collect();
        merge_targeted(&incoming, &mut target, &targeted);
        assert_eq!(target, doc! { "title": "X", "pages": 10 });
    }
}
