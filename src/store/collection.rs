use crate::errors::AccessError;
use crate::query::TranslatedQuery;
use crate::store::cancel::{Cancellation, round_trip};
use crate::store::eval;
use crate::store::session::{Session, StagedWrite};
use bson::{Bson, Document};
use parking_lot::RwLock;
use std::sync::Arc;

/// Whether the store reports the outcome of writes. Unacknowledged writes
/// are performed on a best-effort basis and report nothing back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteConcern {
    #[default]
    Acknowledged,
    Unacknowledged,
}

/// Store-level outcome of a single write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAck {
    pub acknowledged: bool,
    /// Documents matched (replace/delete) or inserted. Meaningless when the
    /// write was not acknowledged.
    pub affected: u64,
}

/// One named document collection.
///
/// Reads and writes accept an optional session; writes issued inside an
/// active transaction are staged on the session and only become visible to
/// other sessions at commit.
pub struct Collection {
    name: String,
    write_concern: RwLock<WriteConcern>,
    docs: RwLock<Vec<Document>>,
    // Store-wide commit gate, held shared here and exclusively by a
    // committing transaction; keeps half-applied commits invisible.
    commit_gate: Arc<RwLock<()>>,
}

impl Collection {
    pub(crate) fn new(name: String, commit_gate: Arc<RwLock<()>>) -> Self {
        Self {
            name,
            write_concern: RwLock::new(WriteConcern::default()),
            docs: RwLock::new(Vec::new()),
            commit_gate,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_write_concern(&self, concern: WriteConcern) {
        *self.write_concern.write() = concern;
    }

    fn acknowledged(&self) -> bool {
        *self.write_concern.read() == WriteConcern::Acknowledged
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let _gate = self.commit_gate.read();
        self.docs.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Committed documents, with the session's staged writes overlaid when
    /// it is inside a transaction. Holds the commit gate shared while the
    /// snapshot is taken.
    fn visible_docs(&self, session: Option<&Session>) -> Vec<Document> {
        let _gate = self.commit_gate.read();
        let mut docs = self.docs.read().clone();
        if let Some(s) = session
            && s.has_staged_writes()
        {
            s.overlay(&self.name, &mut docs);
        }
        docs
    }

    /// Executes a translated query: filter, then sort, then skip/take.
    ///
    /// # Errors
    /// `Cancelled` when the token has fired before the round-trip completes.
    pub async fn find(
        &self,
        query: &TranslatedQuery,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<Vec<Document>, AccessError> {
        round_trip(cancel).await?;
        let mut docs = self.visible_docs(session);
        docs.retain(|d| eval::matches_filter(d, &query.filter));
        if !query.sort.is_empty() {
            docs.sort_by(|a, b| eval::compare_docs(a, b, &query.sort));
        }
        let matched = docs.len();
        let skip = usize::try_from(query.skip).unwrap_or(usize::MAX);
        let take = query.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        let docs: Vec<Document> = docs.into_iter().skip(skip).take(take).collect();
        log::debug!(
            "find collection={} matched={matched} returned={} skip={} limit={:?}",
            self.name,
            docs.len(),
            query.skip,
            query.limit
        );
        Ok(docs)
    }

    /// # Errors
    /// `Cancelled` when the token has fired.
    pub async fn count(
        &self,
        query: &TranslatedQuery,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<u64, AccessError> {
        round_trip(cancel).await?;
        let n = self
            .visible_docs(session)
            .iter()
            .filter(|d| eval::matches_filter(d, &query.filter))
            .count();
        Ok(n as u64)
    }

    /// # Errors
    /// `Cancelled` when the token has fired before the write reached the
    /// store; an acknowledged insert is final.
    pub async fn insert_one(
        &self,
        document: Document,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<WriteAck, AccessError> {
        round_trip(cancel).await?;
        let acknowledged = self.acknowledged();
        if let Some(s) = session
            && s.in_transaction()
        {
            s.stage(StagedWrite::Insert { collection: self.name.clone(), document });
        } else {
            let _gate = self.commit_gate.read();
            self.docs.write().push(document);
        }
        log::debug!("insert collection={} acknowledged={acknowledged}", self.name);
        Ok(WriteAck { acknowledged, affected: 1 })
    }

    /// Replaces the single document whose `id_field` equals `id` wholesale.
    ///
    /// # Errors
    /// `Cancelled` when the token has fired before the write reached the
    /// store.
    pub async fn replace_one(
        &self,
        id_field: &str,
        id: &Bson,
        document: Document,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<WriteAck, AccessError> {
        round_trip(cancel).await?;
        let acknowledged = self.acknowledged();
        let matched;
        if let Some(s) = session
            && s.in_transaction()
        {
            matched = self.visible_docs(Some(s)).iter().any(|d| id_matches(d, id_field, id));
            if matched {
                s.stage(StagedWrite::Replace {
                    collection: self.name.clone(),
                    id_field: id_field.to_owned(),
                    id: id.clone(),
                    document,
                });
            }
        } else {
            let _gate = self.commit_gate.read();
            let mut docs = self.docs.write();
            if let Some(pos) = docs.iter().position(|d| id_matches(d, id_field, id)) {
                docs[pos] = document;
                matched = true;
            } else {
                matched = false;
            }
        }
        log::debug!(
            "replace collection={} matched={matched} acknowledged={acknowledged}",
            self.name
        );
        Ok(WriteAck { acknowledged, affected: u64::from(matched) })
    }

    /// Deletes the single document whose `id_field` equals `id`.
    ///
    /// # Errors
    /// `Cancelled` when the token has fired before the write reached the
    /// store.
    pub async fn delete_one(
        &self,
        id_field: &str,
        id: &Bson,
        session: Option<&Session>,
        cancel: &Cancellation,
    ) -> Result<WriteAck, AccessError> {
        round_trip(cancel).await?;
        let acknowledged = self.acknowledged();
        let matched;
        if let Some(s) = session
            && s.in_transaction()
        {
            matched = self.visible_docs(Some(s)).iter().any(|d| id_matches(d, id_field, id));
            if matched {
                s.stage(StagedWrite::Delete {
                    collection: self.name.clone(),
                    id_field: id_field.to_owned(),
                    id: id.clone(),
                });
            }
        } else {
            let _gate = self.commit_gate.read();
            let mut docs = self.docs.write();
            if let Some(pos) = docs.iter().position(|d| id_matches(d, id_field, id)) {
                docs.remove(pos);
                matched = true;
            } else {
                matched = false;
            }
        }
        log::debug!(
            "delete collection={} matched={matched} acknowledged={acknowledged}",
            self.name
        );
        Ok(WriteAck { acknowledged, affected: u64::from(matched) })
    }

    // Commit-time appliers; callers hold the store commit lock.
    pub(crate) fn commit_insert(&self, document: Document) {
        self.docs.write().push(document);
    }

    pub(crate) fn commit_replace(&self, id_field: &str, id: &Bson, document: Document) {
        let mut docs = self.docs.write();
        if let Some(pos) = docs.iter().position(|d| id_matches(d, id_field, id)) {
            docs[pos] = document;
        }
    }

    pub(crate) fn commit_delete(&self, id_field: &str, id: &Bson) {
        let mut docs = self.docs.write();
        if let Some(pos) = docs.iter().position(|d| id_matches(d, id_field, id)) {
            docs.remove(pos);
        }
    }
}

pub(crate) fn id_matches(doc: &Document, id_field: &str, id: &Bson) -> bool {
    doc.get(id_field).is_some_and(|v| eval::bson_eq(v, id))
}
