use crate::errors::AccessError;
use crate::store::cancel::{Cancellation, round_trip};
use crate::store::collection::id_matches;
use crate::store::engine::DocumentStore;
use bson::{Bson, Document};
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// A write buffered on a session while its transaction is open.
#[derive(Debug, Clone)]
pub(crate) enum StagedWrite {
    Insert { collection: String, document: Document },
    Replace { collection: String, id_field: String, id: Bson, document: Document },
    Delete { collection: String, id_field: String, id: Bson },
}

impl StagedWrite {
    fn collection(&self) -> &str {
        match self {
            Self::Insert { collection, .. }
            | Self::Replace { collection, .. }
            | Self::Delete { collection, .. } => collection,
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    in_transaction: bool,
    ended: bool,
    staged: Vec<StagedWrite>,
}

/// A store session: the context that groups writes into one atomic
/// transaction.
///
/// Writes issued while a transaction is open are staged here and visible
/// only to reads through this session until commit. Commit applies all
/// staged writes in one step under the store's commit lock; abort discards
/// them. An ended session accepts no further transactions.
pub struct Session {
    id: Uuid,
    store: Arc<DocumentStore>,
    state: Mutex<SessionState>,
}

impl Session {
    pub(crate) fn new(store: Arc<DocumentStore>) -> Arc<Self> {
        Arc::new(Self { id: Uuid::new_v4(), store, state: Mutex::new(SessionState::default()) })
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn in_transaction(&self) -> bool {
        self.state.lock().in_transaction
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        self.state.lock().ended
    }

    /// Starts a transaction on this session.
    ///
    /// # Errors
    /// `TransactionConflict` when the session has ended or a transaction is
    /// already in progress — callers are expected to check
    /// [`in_transaction`](Self::in_transaction) first and join instead.
    pub fn start_transaction(&self) -> Result<(), AccessError> {
        let mut state = self.state.lock();
        if state.ended {
            return Err(AccessError::TransactionConflict("session has already ended".into()));
        }
        if state.in_transaction {
            return Err(AccessError::TransactionConflict(
                "transaction already in progress on this session".into(),
            ));
        }
        state.in_transaction = true;
        log::debug!("session {} started a transaction", self.id);
        Ok(())
    }

    /// Applies all staged writes atomically and closes the transaction.
    ///
    /// # Errors
    /// `TransactionConflict` when no transaction is active; `Cancelled` when
    /// the token fires before the commit round-trip — staged writes remain
    /// intact in that case.
    pub async fn commit_transaction(&self, cancel: &Cancellation) -> Result<(), AccessError> {
        round_trip(cancel).await?;
        let staged = {
            let mut state = self.state.lock();
            if !state.in_transaction {
                return Err(AccessError::TransactionConflict(
                    "no active transaction to commit".into(),
                ));
            }
            state.in_transaction = false;
            std::mem::take(&mut state.staged)
        };
        let count = staged.len();
        self.store.apply_committed(staged)?;
        log::debug!("session {} committed {count} staged writes", self.id);
        Ok(())
    }

    /// Discards staged writes and closes the transaction. A no-op when no
    /// transaction is active.
    pub fn abort_transaction(&self) {
        let mut state = self.state.lock();
        if state.in_transaction {
            log::debug!(
                "session {} aborted a transaction with {} staged writes",
                self.id,
                state.staged.len()
            );
        }
        state.staged.clear();
        state.in_transaction = false;
    }

    /// Releases the session; any open transaction is aborted first.
    pub fn end_session(&self) {
        let mut state = self.state.lock();
        state.staged.clear();
        state.in_transaction = false;
        state.ended = true;
        log::debug!("session {} ended", self.id);
    }

    pub(crate) fn has_staged_writes(&self) -> bool {
        !self.state.lock().staged.is_empty()
    }

    pub(crate) fn stage(&self, write: StagedWrite) {
        self.state.lock().staged.push(write);
    }

    /// Replays this session's staged writes for one collection on top of a
    /// committed snapshot, in staging order.
    pub(crate) fn overlay(&self, collection: &str, docs: &mut Vec<Document>) {
        let state = self.state.lock();
        for write in state.staged.iter().filter(|w| w.collection() == collection) {
            match write {
                StagedWrite::Insert { document, .. } => docs.push(document.clone()),
                StagedWrite::Replace { id_field, id, document, .. } => {
                    if let Some(pos) = docs.iter().position(|d| id_matches(d, id_field, id)) {
                        docs[pos] = document.clone();
                    }
                }
                StagedWrite::Delete { id_field, id, .. } => {
                    docs.retain(|d| !id_matches(d, id_field, id));
                }
            }
        }
    }
}
