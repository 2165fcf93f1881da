use std::fmt;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// The two persisted collections. Each is stored and restored independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Debts,
    Borrowers,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Debts => "debts",
            Slot::Borrowers => "borrowers",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of decoding one slot on startup.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotLoad<T> {
    /// Nothing was ever stored in the slot
    Missing,
    Loaded(Vec<T>),
    /// The payload could not be decoded; the message says why
    Corrupt(String),
}

impl<T> SlotLoad<T> {
    /// The decoded records, or an empty collection when missing or corrupt.
    pub fn into_items(self) -> Vec<T> {
        match self {
            SlotLoad::Loaded(items) => items,
            SlotLoad::Missing | SlotLoad::Corrupt(_) => Vec::new(),
        }
    }

    /// A summary without the records themselves.
    pub fn status(&self) -> SlotStatus {
        match self {
            SlotLoad::Missing => SlotStatus::Missing,
            SlotLoad::Loaded(items) => SlotStatus::Loaded(items.len()),
            SlotLoad::Corrupt(reason) => SlotStatus::Corrupt(reason.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Missing,
    Loaded(usize),
    Corrupt(String),
}

impl SlotStatus {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, SlotStatus::Corrupt(_))
    }
}

/// Serialize a whole collection into a slot payload.
pub fn encode_slot<T: Serialize>(slot: Slot, items: &[T]) -> Result<String> {
    serde_json::to_string(items).with_context(|| format!("Failed to encode slot '{}'", slot))
}

/// Decode a slot payload. Never fails: a bad payload is reported as corrupt.
pub fn decode_slot<T: DeserializeOwned>(slot: Slot, payload: Option<&str>) -> SlotLoad<T> {
    let Some(payload) = payload else {
        return SlotLoad::Missing;
    };

    match serde_json::from_str::<Vec<T>>(payload) {
        Ok(items) => SlotLoad::Loaded(items),
        Err(e) => {
            tracing::warn!(slot = %slot, error = %e, "slot is corrupt, starting it empty");
            SlotLoad::Corrupt(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{Borrower, Debt};

    #[test]
    fn test_slot_names() {
        assert_eq!(Slot::Debts.as_str(), "debts");
        assert_eq!(Slot::Borrowers.to_string(), "borrowers");
    }

    #[test]
    fn test_missing_slot() {
        let load: SlotLoad<Debt> = decode_slot(Slot::Debts, None);
        assert_eq!(load, SlotLoad::Missing);
        assert!(load.into_items().is_empty());
    }

    #[test]
    fn test_corrupt_slot_is_empty_but_flagged() {
        let load: SlotLoad<Borrower> = decode_slot(Slot::Borrowers, Some("{not json"));
        assert!(load.status().is_corrupt());
        assert!(matches!(load.status(), SlotStatus::Corrupt(_)));
        assert!(load.into_items().is_empty());

        // Valid JSON of the wrong shape is corrupt too
        let load: SlotLoad<Debt> = decode_slot(Slot::Debts, Some(r#"[{"id": 1}]"#));
        assert!(load.status().is_corrupt());
    }

    #[test]
    fn test_roundtrip_preserves_every_field() {
        let alice = Borrower::new("Alice");
        let date = Utc.with_ymd_and_hms(2025, 4, 13, 9, 30, 15).unwrap();

        for debts in [
            vec![],
            vec![Debt::new("Lunch", alice.id, 12.34)],
            vec![
                Debt::new("Dinner", alice.id, 100.0 / 3.0)
                    .with_tag("food")
                    .with_date(date),
                Debt::new("Cab", alice.id, 0.1)
                    .with_description("")
                    .with_paid(true),
            ],
        ] {
            let payload = encode_slot(Slot::Debts, &debts).unwrap();
            let restored: Vec<Debt> = decode_slot(Slot::Debts, Some(&payload)).into_items();
            assert_eq!(restored, debts);
        }

        let borrowers = vec![alice, Borrower::new("Bob")];
        let payload = encode_slot(Slot::Borrowers, &borrowers).unwrap();
        let restored: Vec<Borrower> = decode_slot(Slot::Borrowers, Some(&payload)).into_items();
        assert_eq!(restored.len(), 2);
        for (a, b) in restored.iter().zip(&borrowers) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
        }
    }
}
