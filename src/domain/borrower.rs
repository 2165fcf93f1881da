use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BorrowerId = Uuid;

/// Someone who owes money. Identity is the id; the name is only for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Borrower {
    pub id: BorrowerId,
    pub name: String,
}

impl Borrower {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
        }
    }

    /// The key used to decide whether two names refer to the same borrower:
    /// surrounding whitespace is ignored and case folded.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.normalized_name() == normalize_name(name)
    }
}

impl PartialEq for Borrower {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Borrower {}

impl Hash for Borrower {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Borrower {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
