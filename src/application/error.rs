use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Borrower not found: {0}")]
    BorrowerNotFound(String),

    #[error("Debt not found: {0}")]
    DebtNotFound(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}
