mod cancel;
mod collection;
mod engine;
mod eval;
mod session;

pub use cancel::{Cancellation, Canceller, cancel_pair};
pub use collection::{Collection, WriteAck, WriteConcern};
pub use engine::DocumentStore;
pub use eval::{compare_docs, matches_filter};
pub use session::Session;
