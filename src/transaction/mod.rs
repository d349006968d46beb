use crate::errors::AccessError;
use crate::store::{Cancellation, DocumentStore, Session};
use parking_lot::Mutex;
use std::sync::Arc;

/// Groups the repository calls of one logical unit of work into a single
/// all-or-nothing store transaction.
///
/// One coordinator lives per unit of work (typically one framework-level
/// request). The first `begin_or_join` starts the session and transaction
/// and returns the owning handle; nested calls join the running transaction
/// and receive a handle that is incapable of committing or releasing it.
pub struct TransactionCoordinator {
    store: Arc<DocumentStore>,
    session: Mutex<Option<Arc<Session>>>,
}

impl TransactionCoordinator {
    #[must_use]
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store, session: Mutex::new(None) }
    }

    /// Creates or joins the unit of work's transaction.
    ///
    /// Checks the session's transaction state before starting, so a running
    /// transaction is joined rather than tripping the store's
    /// already-in-transaction rejection.
    ///
    /// # Errors
    /// `TransactionConflict` when the session state is inconsistent;
    /// `Cancelled` when the token has fired.
    pub async fn begin_or_join(
        &self,
        cancel: &Cancellation,
    ) -> Result<TransactionHandle, AccessError> {
        cancel.guard()?;
        let mut slot = self.session.lock();
        // An ended session cannot host another transaction; treat it as absent.
        if slot.as_ref().is_some_and(|s| s.is_ended()) {
            *slot = None;
        }
        match slot.as_ref() {
            None => {
                let session = self.store.start_session();
                session.start_transaction()?;
                *slot = Some(session.clone());
                log::debug!("session {} owns the unit-of-work transaction", session.id());
                Ok(TransactionHandle::Owned(OwnedTransaction { session }))
            }
            Some(session) if !session.in_transaction() => {
                session.start_transaction()?;
                log::debug!("session {} restarted an owned transaction", session.id());
                Ok(TransactionHandle::Owned(OwnedTransaction { session: session.clone() }))
            }
            Some(session) => {
                log::debug!("joining the running transaction on session {}", session.id());
                Ok(TransactionHandle::Joined(JoinedTransaction { session: session.clone() }))
            }
        }
    }
}

/// Handle onto the unit of work's transaction.
///
/// Ownership is a compile-time property: only the `Owned` variant carries a
/// commit or release surface, so a joiner cannot terminate the shared
/// session by construction.
pub enum TransactionHandle {
    Owned(OwnedTransaction),
    Joined(JoinedTransaction),
}

impl TransactionHandle {
    #[must_use]
    pub fn session(&self) -> &Session {
        match self {
            Self::Owned(t) => t.session(),
            Self::Joined(t) => t.session(),
        }
    }

    #[must_use]
    pub const fn owns_transaction(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Releases the handle. Owning handles abort any uncommitted work and
    /// end the session; joined handles do nothing.
    pub fn dispose(self) {
        match self {
            Self::Owned(t) => t.dispose(),
            Self::Joined(t) => t.dispose(),
        }
    }
}

/// The single owning handle of a unit of work's transaction.
pub struct OwnedTransaction {
    session: Arc<Session>,
}

impl OwnedTransaction {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Commits every write staged on the session and releases it.
    ///
    /// # Errors
    /// `TransactionConflict` when the transaction is no longer active;
    /// `Cancelled` when the token fires before the commit round-trip. On
    /// any failure nothing has been applied: the staged work is aborted and
    /// the session released, so the unit of work ends all-or-nothing.
    pub async fn commit(self, cancel: &Cancellation) -> Result<(), AccessError> {
        let outcome = self.session.commit_transaction(cancel).await;
        if outcome.is_err() {
            self.session.abort_transaction();
        }
        self.session.end_session();
        outcome
    }

    /// Aborts uncommitted work and ends the session.
    pub fn dispose(self) {
        self.session.abort_transaction();
        self.session.end_session();
    }
}

/// A non-owning handle onto a transaction someone else started. Exposes the
/// shared session and nothing else: no commit, no release.
pub struct JoinedTransaction {
    session: Arc<Session>,
}

impl JoinedTransaction {
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A no-op; only the owner may terminate the shared transaction.
    pub fn dispose(self) {}
}
