// Application layer - the store object handed to presentation code.
// Owns the in-memory ledger, writes every change through to storage and
// tells subscribers what changed.

pub mod error;
pub mod events;
pub mod service;

pub use error::*;
pub use events::*;
pub use service::*;
