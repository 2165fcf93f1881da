// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use scrooge::application::LedgerService;
use scrooge::domain::{Borrower, Debt};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::open(&db_path(&temp_dir)).await?;
    Ok((service, temp_dir))
}

/// Path of the database file inside a test directory
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("test.db")
        .to_str()
        .unwrap()
        .to_string()
}

/// Helper to parse a date string into DateTime<Utc>
pub fn parse_date(date_str: &str) -> DateTime<Utc> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Test fixture: a few borrowers with debts spread over several months
pub struct StandardLedger {
    pub alice: Borrower,
    pub bob: Borrower,
}

impl StandardLedger {
    /// Alice owes for January (twice, one paid) and March; Bob for February.
    pub async fn create(service: &mut LedgerService) -> Result<Self> {
        let alice = service.add_borrower("Alice").await?;
        let bob = service.add_borrower("Bob").await?;

        service
            .add_debt(
                Debt::new("Groceries", alice.id, 40.0)
                    .with_tag("food")
                    .with_date(parse_date("2025-01-05")),
            )
            .await?;
        service
            .add_debt(
                Debt::new("Movie", alice.id, 15.0)
                    .with_date(parse_date("2025-01-20"))
                    .with_paid(true),
            )
            .await?;
        service
            .add_debt(
                Debt::new("Concert", alice.id, 80.0)
                    .with_description("Front row")
                    .with_date(parse_date("2025-03-02")),
            )
            .await?;
        service
            .add_debt(Debt::new("Taxi", bob.id, 22.5).with_date(parse_date("2025-02-14")))
            .await?;

        Ok(Self { alice, bob })
    }
}
