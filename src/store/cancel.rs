use crate::errors::AccessError;
use tokio::sync::watch;

/// Cooperative cancellation signal threaded through every store round-trip.
///
/// A token is checked at the operation boundary; once a write has been
/// acknowledged, cancellation no longer affects it.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// The firing side of a cancellation pair.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

#[must_use]
pub fn cancel_pair() -> (Canceller, Cancellation) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, Cancellation { rx })
}

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

impl Cancellation {
    /// A token that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { rx }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    pub(crate) fn guard(&self) -> Result<(), AccessError> {
        if self.is_cancelled() { Err(AccessError::Cancelled) } else { Ok(()) }
    }
}

/// One store round-trip boundary: checks the token, yields to the runtime,
/// and checks again before the operation touches collection state.
pub(crate) async fn round_trip(cancel: &Cancellation) -> Result<(), AccessError> {
    cancel.guard()?;
    tokio::task::yield_now().await;
    cancel.guard()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fired_token_stops_the_round_trip() {
        let (canceller, token) = cancel_pair();
        assert!(round_trip(&token).await.is_ok());
        canceller.cancel();
        assert!(matches!(round_trip(&token).await, Err(AccessError::Cancelled)));
    }

    #[tokio::test]
    async fn never_token_stays_quiet() {
        let token = Cancellation::never();
        assert!(!token.is_cancelled());
        assert!(round_trip(&token).await.is_ok());
    }
}
