use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, BorrowerId, MonthKey};

pub type DebtId = Uuid;

/// A single amount owed by one borrower.
///
/// The borrower is referenced by id only; display names are resolved through
/// the ledger so historical debts never carry a stale copy of a name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Debt {
    pub id: DebtId,
    /// Short label, e.g. "Concert tickets"
    pub name: String,
    #[serde(rename = "borrower")]
    pub borrower_id: BorrowerId,
    /// Non-negative amount in currency units
    pub amount: Amount,
    pub tag: Option<String>,
    pub description: Option<String>,
    /// When the obligation was incurred
    pub date: DateTime<Utc>,
    pub is_paid: bool,
}

impl Debt {
    pub fn new(name: impl Into<String>, borrower_id: BorrowerId, amount: Amount) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            borrower_id,
            amount,
            tag: None,
            description: None,
            date: Utc::now(),
            is_paid: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_paid(mut self, is_paid: bool) -> Self {
        self.is_paid = is_paid;
        self
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::from(self.date)
    }

    /// The amount still outstanding: zero once paid.
    pub fn outstanding(&self) -> Amount {
        if self.is_paid { 0.0 } else { self.amount }
    }
}

/// Everything about a debt except who owes it. Used to stamp out one debt
/// per borrower when splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DebtDraft {
    pub name: String,
    pub amount: Amount,
    pub tag: Option<String>,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub is_paid: bool,
}

impl DebtDraft {
    pub fn new(name: impl Into<String>, amount: Amount) -> Self {
        Self {
            name: name.into(),
            amount,
            tag: None,
            description: None,
            date: Utc::now(),
            is_paid: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = date;
        self
    }

    pub fn with_paid(mut self, is_paid: bool) -> Self {
        self.is_paid = is_paid;
        self
    }

    /// Build a debt for one borrower with the given share of the amount.
    pub fn to_debt(&self, borrower_id: BorrowerId, amount: Amount) -> Debt {
        Debt {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            borrower_id,
            amount,
            tag: self.tag.clone(),
            description: self.description.clone(),
            date: self.date,
            is_paid: self.is_paid,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_new_debt_defaults() {
        let borrower = Uuid::new_v4();
        let debt = Debt::new("Lunch", borrower, 12.5);

        assert_eq!(debt.borrower_id, borrower);
        assert_eq!(debt.amount, 12.5);
        assert!(!debt.is_paid);
        assert_eq!(debt.tag, None);
        assert_eq!(debt.description, None);
    }

    #[test]
    fn test_empty_tag_is_not_unset() {
        let debt = Debt::new("Lunch", Uuid::new_v4(), 1.0).with_tag("");
        assert_eq!(debt.tag, Some(String::new()));
    }

    #[test]
    fn test_outstanding() {
        let debt = Debt::new("Lunch", Uuid::new_v4(), 20.0);
        assert_eq!(debt.outstanding(), 20.0);
        assert_eq!(debt.with_paid(true).outstanding(), 0.0);
    }

    #[test]
    fn test_serialized_field_names() {
        let date = Utc.with_ymd_and_hms(2025, 4, 13, 10, 0, 0).unwrap();
        let debt = Debt::new("Taxi", Uuid::new_v4(), 30.0).with_date(date);
        let json = serde_json::to_value(&debt).unwrap();

        let object = json.as_object().unwrap();
        for key in [
            "id",
            "name",
            "borrower",
            "amount",
            "tag",
            "description",
            "date",
            "isPaid",
        ] {
            assert!(object.contains_key(key), "missing field {}", key);
        }
        assert!(object["tag"].is_null());
        assert_eq!(object["isPaid"], serde_json::Value::Bool(false));
    }

    #[test]
    fn test_draft_to_debt_copies_details() {
        let draft = DebtDraft::new("Dinner", 90.0)
            .with_tag("food")
            .with_description("Friday night")
            .with_paid(true);
        let borrower = Uuid::new_v4();

        let debt = draft.to_debt(borrower, 30.0);

        assert_eq!(debt.name, "Dinner");
        assert_eq!(debt.borrower_id, borrower);
        assert_eq!(debt.amount, 30.0);
        assert_eq!(debt.tag.as_deref(), Some("food"));
        assert_eq!(debt.description.as_deref(), Some("Friday night"));
        assert_eq!(debt.date, draft.date);
        assert!(debt.is_paid);
    }
}
