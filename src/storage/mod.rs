mod repository;
mod slots;

pub use repository::*;
pub use slots::*;

/// SQL migration for the slot table
pub const MIGRATION_001_SLOTS: &str = include_str!("migrations/001_slots.sql");
