use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Read;

use crate::application::LedgerService;
use crate::domain::{is_valid_amount, Borrower, BorrowerId, Debt};
use crate::io::export::LedgerSnapshot;

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported_borrowers: usize,
    pub imported_debts: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    pub fn imported(&self) -> usize {
        self.imported_borrowers + self.imported_debts
    }
}

/// A record that could not be imported
#[derive(Debug, Clone)]
pub struct ImportError {
    /// e.g. "debt #3"
    pub record: String,
    pub field: Option<String>,
    pub error: String,
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub dry_run: bool,
}

/// Importer for loading snapshots into the ledger
pub struct Importer<'a> {
    service: &'a mut LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a mut LedgerService) -> Self {
        Self { service }
    }

    /// Merge a JSON snapshot into the ledger.
    ///
    /// Records whose id is already present are skipped. A borrower whose name
    /// matches an existing one is not duplicated; its debts are attached to
    /// the existing borrower instead. Debts with an invalid amount or an
    /// unknown borrower are reported and left out.
    pub async fn import_json<R: Read>(
        &mut self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let snapshot: LedgerSnapshot =
            serde_json::from_reader(reader).context("Invalid ledger snapshot")?;

        let mut result = ImportResult::default();
        let (borrowers, debts) = {
            let ledger = self.service.ledger();
            let mut remap: HashMap<BorrowerId, BorrowerId> = HashMap::new();
            let mut new_borrowers: Vec<Borrower> = Vec::new();

            for (index, borrower) in snapshot.borrowers.into_iter().enumerate() {
                let seen = ledger.borrower(borrower.id).is_some()
                    || new_borrowers.iter().any(|b| b.id == borrower.id);
                if seen {
                    result.skipped += 1;
                    continue;
                }

                if borrower.name.trim().is_empty() {
                    result.errors.push(ImportError {
                        record: format!("borrower #{}", index + 1),
                        field: Some("name".to_string()),
                        error: "Borrower name is empty".to_string(),
                    });
                    continue;
                }

                let same_name = ledger
                    .borrower_by_name(&borrower.name)
                    .map(|b| b.id)
                    .or_else(|| {
                        new_borrowers
                            .iter()
                            .find(|b| b.has_name(&borrower.name))
                            .map(|b| b.id)
                    });
                if let Some(existing) = same_name {
                    remap.insert(borrower.id, existing);
                    result.skipped += 1;
                    continue;
                }

                new_borrowers.push(borrower);
            }

            let mut new_debts: Vec<Debt> = Vec::new();
            for (index, mut debt) in snapshot.debts.into_iter().enumerate() {
                let record = format!("debt #{}", index + 1);

                let seen = ledger.debt(debt.id).is_some()
                    || new_debts.iter().any(|d| d.id == debt.id);
                if seen {
                    result.skipped += 1;
                    continue;
                }

                if let Some(target) = remap.get(&debt.borrower_id) {
                    debt.borrower_id = *target;
                }

                if !is_valid_amount(debt.amount) {
                    result.errors.push(ImportError {
                        record,
                        field: Some("amount".to_string()),
                        error: format!("Invalid amount: {}", debt.amount),
                    });
                    continue;
                }

                let known = ledger.borrower(debt.borrower_id).is_some()
                    || new_borrowers.iter().any(|b| b.id == debt.borrower_id);
                if !known {
                    result.errors.push(ImportError {
                        record,
                        field: Some("borrower".to_string()),
                        error: format!("Unknown borrower: {}", debt.borrower_id),
                    });
                    continue;
                }

                new_debts.push(debt);
            }

            (new_borrowers, new_debts)
        };

        result.imported_borrowers = borrowers.len();
        result.imported_debts = debts.len();

        if options.dry_run {
            return Ok(result);
        }

        self.service.merge_records(borrowers, debts).await?;
        Ok(result)
    }
}
