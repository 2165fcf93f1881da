use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{format_amount, Borrower, Debt};

/// Full ledger snapshot for export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub borrowers: Vec<Borrower>,
    pub debts: Vec<Debt>,
}

/// Exporter for writing ledger data to other formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export debts to CSV, one row per debt, with borrower names resolved.
    /// Debts whose borrower was removed get an empty borrower column.
    pub fn export_debts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let ledger = self.service.ledger();
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "name",
            "borrower",
            "amount",
            "tag",
            "description",
            "paid",
        ])?;

        let mut count = 0;
        for debt in ledger.debts() {
            csv_writer.write_record([
                debt.id.to_string(),
                debt.date.format("%Y-%m-%d").to_string(),
                debt.name.clone(),
                ledger
                    .borrower_name(debt.borrower_id)
                    .unwrap_or_default()
                    .to_string(),
                format_amount(debt.amount),
                debt.tag.clone().unwrap_or_default(),
                debt.description.clone().unwrap_or_default(),
                debt.is_paid.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole ledger as a JSON snapshot
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            borrowers: self.service.borrowers(),
            debts: self.service.debts(),
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
