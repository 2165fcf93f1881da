use std::collections::HashMap;

use tokio::sync::broadcast;

use crate::domain::{
    Amount, Borrower, BorrowerId, Debt, DebtDraft, DebtId, Ledger, MonthKey, MonthSection,
};
use crate::storage::{decode_slot, encode_slot, Repository, Slot, SlotStatus};

use super::{AppError, LedgerEvent};

const EVENT_CAPACITY: usize = 64;

/// Application service providing every ledger operation to presentation code.
///
/// Reads are served from memory. Each mutation that changes a collection
/// rewrites that collection's slot before returning; if the write fails the
/// in-memory change is rolled back and the error is returned.
pub struct LedgerService {
    repo: Repository,
    ledger: Ledger,
    events: broadcast::Sender<LedgerEvent>,
    load_report: LoadReport,
}

/// What was found in storage when the service was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub debts: SlotStatus,
    pub borrowers: SlotStatus,
}

impl LoadReport {
    pub fn has_corruption(&self) -> bool {
        self.debts.is_corrupt() || self.borrowers.is_corrupt()
    }
}

/// A borrower with their outstanding balance.
#[derive(Debug, Clone)]
pub struct BorrowerSummary {
    pub borrower: Borrower,
    pub total_owed: Amount,
    pub debt_count: usize,
}

impl LedgerService {
    /// Open (creating if needed) the database at `database_path` and restore
    /// the ledger from it.
    pub async fn open(database_path: &str) -> Result<Self, AppError> {
        let repo = Repository::open(database_path).await?;
        Self::load(repo).await
    }

    /// Restore the ledger from an already connected repository.
    ///
    /// Each slot is decoded on its own. A missing or corrupt slot starts
    /// empty; corruption is logged and recorded in [`LoadReport`].
    pub async fn load(repo: Repository) -> Result<Self, AppError> {
        let debts_payload = repo.load_slot(Slot::Debts).await?;
        let borrowers_payload = repo.load_slot(Slot::Borrowers).await?;

        let debts = decode_slot::<Debt>(Slot::Debts, debts_payload.as_deref());
        let borrowers = decode_slot::<Borrower>(Slot::Borrowers, borrowers_payload.as_deref());

        let load_report = LoadReport {
            debts: debts.status(),
            borrowers: borrowers.status(),
        };

        let ledger = Ledger::from_parts(borrowers.into_items(), debts.into_items());
        tracing::info!(
            borrowers = ledger.borrowers().len(),
            debts = ledger.debts().len(),
            "ledger loaded"
        );

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            repo,
            ledger,
            events,
            load_report,
        })
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.load_report
    }

    /// Receive a [`LedgerEvent`] for every mutation made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Read-only access to the in-memory ledger.
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    fn emit(&self, event: LedgerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    async fn save(&self, slot: Slot) -> anyhow::Result<()> {
        let payload = match slot {
            Slot::Debts => encode_slot(slot, self.ledger.debts())?,
            Slot::Borrowers => encode_slot(slot, self.ledger.borrowers())?,
        };
        self.repo.save_slot(slot, &payload).await
    }

    async fn save_all(&self) -> anyhow::Result<()> {
        let payloads = vec![
            (Slot::Borrowers, encode_slot(Slot::Borrowers, self.ledger.borrowers())?),
            (Slot::Debts, encode_slot(Slot::Debts, self.ledger.debts())?),
        ];
        self.repo.save_slots(&payloads).await
    }

    /// Write both slots in one transaction, restoring both collections in
    /// memory if the write fails.
    async fn persist_all(
        &mut self,
        previous_borrowers: Vec<Borrower>,
        previous_debts: Vec<Debt>,
    ) -> Result<(), AppError> {
        if let Err(e) = self.save_all().await {
            let reason = format!("{:#}", e);
            tracing::error!(error = %reason, "failed to save ledger, rolling back");
            self.ledger.replace_borrowers(previous_borrowers);
            self.ledger.replace_debts(previous_debts);
            return Err(AppError::Storage(e));
        }
        Ok(())
    }

    async fn persist_debts(&mut self, previous: Vec<Debt>) -> Result<(), AppError> {
        if let Err(e) = self.save(Slot::Debts).await {
            let reason = format!("{:#}", e);
            tracing::error!(error = %reason, "failed to save debts, rolling back");
            self.ledger.replace_debts(previous);
            return Err(AppError::Storage(e));
        }
        Ok(())
    }

    async fn persist_borrowers(&mut self, previous: Vec<Borrower>) -> Result<(), AppError> {
        if let Err(e) = self.save(Slot::Borrowers).await {
            let reason = format!("{:#}", e);
            tracing::error!(error = %reason, "failed to save borrowers, rolling back");
            self.ledger.replace_borrowers(previous);
            return Err(AppError::Storage(e));
        }
        Ok(())
    }

    // ========================
    // Borrower operations
    // ========================

    /// Get or create the borrower with this name (case and surrounding
    /// whitespace ignored).
    pub async fn add_borrower(&mut self, name: &str) -> Result<Borrower, AppError> {
        let previous = self.ledger.borrowers().to_vec();
        let (borrower, created) = self.ledger.add_borrower(name)?;

        if created {
            self.persist_borrowers(previous).await?;
            tracing::info!(borrower = %borrower.id, name = %borrower.name, "borrower added");
            self.emit(LedgerEvent::BorrowerAdded(borrower.id));
        }
        Ok(borrower)
    }

    /// Remove a borrower. Their debts stay in the ledger as orphans.
    pub async fn remove_borrower(&mut self, id: BorrowerId) -> Result<bool, AppError> {
        let previous = self.ledger.borrowers().to_vec();
        if !self.ledger.remove_borrower(id) {
            return Ok(false);
        }

        self.persist_borrowers(previous).await?;
        tracing::info!(borrower = %id, "borrower removed");
        self.emit(LedgerEvent::BorrowerRemoved(id));
        Ok(true)
    }

    pub async fn rename_borrower(&mut self, id: BorrowerId, name: &str) -> Result<bool, AppError> {
        let previous = self.ledger.borrowers().to_vec();
        if !self.ledger.rename_borrower(id, name)? {
            return Ok(false);
        }

        self.persist_borrowers(previous).await?;
        tracing::info!(borrower = %id, name = %name.trim(), "borrower renamed");
        self.emit(LedgerEvent::BorrowerRenamed(id));
        Ok(true)
    }

    /// Get a borrower by name.
    pub fn find_borrower(&self, name: &str) -> Result<Borrower, AppError> {
        self.ledger
            .borrower_by_name(name)
            .cloned()
            .ok_or_else(|| AppError::BorrowerNotFound(name.to_string()))
    }

    pub fn borrower(&self, id: BorrowerId) -> Option<Borrower> {
        self.ledger.borrower(id).cloned()
    }

    pub fn borrowers(&self) -> Vec<Borrower> {
        self.ledger.borrowers().to_vec()
    }

    /// Every borrower with their outstanding total, in insertion order.
    pub fn borrower_summaries(&self) -> Vec<BorrowerSummary> {
        self.ledger
            .borrowers()
            .iter()
            .map(|borrower| BorrowerSummary {
                borrower: borrower.clone(),
                total_owed: self.ledger.total_owed(borrower.id),
                debt_count: self.ledger.debts_for_borrower(borrower.id).len(),
            })
            .collect()
    }

    // ========================
    // Debt operations
    // ========================

    /// Record a new debt against an existing borrower.
    pub async fn add_debt(&mut self, debt: Debt) -> Result<Debt, AppError> {
        let previous = self.ledger.debts().to_vec();
        self.ledger.add_debt(debt.clone())?;

        self.persist_debts(previous).await?;
        tracing::info!(debt = %debt.id, borrower = %debt.borrower_id, amount = debt.amount, "debt added");
        self.emit(LedgerEvent::DebtAdded(debt.id));
        Ok(debt)
    }

    /// Replace the debt with the same id. Returns false if there is none.
    pub async fn update_debt(&mut self, debt: Debt) -> Result<bool, AppError> {
        let previous = self.ledger.debts().to_vec();
        let id = debt.id;
        if !self.ledger.update_debt(debt)? {
            return Ok(false);
        }

        self.persist_debts(previous).await?;
        tracing::info!(debt = %id, "debt updated");
        self.emit(LedgerEvent::DebtUpdated(id));
        Ok(true)
    }

    /// Delete every debt with this id. Returns how many were deleted.
    pub async fn remove_debt(&mut self, id: DebtId) -> Result<usize, AppError> {
        let previous = self.ledger.debts().to_vec();
        let removed = self.ledger.remove_debt(id);
        if removed == 0 {
            return Ok(0);
        }

        self.persist_debts(previous).await?;
        tracing::info!(debt = %id, removed, "debt removed");
        self.emit(LedgerEvent::DebtRemoved(id));
        Ok(removed)
    }

    /// Flip a debt's paid flag. Returns the new flag, `None` if not found.
    pub async fn toggle_paid(&mut self, id: DebtId) -> Result<Option<bool>, AppError> {
        let previous = self.ledger.debts().to_vec();
        let Some(is_paid) = self.ledger.toggle_paid(id) else {
            return Ok(None);
        };

        self.persist_debts(previous).await?;
        tracing::info!(debt = %id, is_paid, "debt paid flag toggled");
        self.emit(LedgerEvent::DebtPaidChanged { id, is_paid });
        Ok(Some(is_paid))
    }

    /// Force a debt's paid flag. Returns the previous flag, `None` if not
    /// found. Nothing is written when the flag already had that value.
    pub async fn set_paid(&mut self, id: DebtId, is_paid: bool) -> Result<Option<bool>, AppError> {
        let previous = self.ledger.debts().to_vec();
        let Some(was_paid) = self.ledger.set_paid(id, is_paid) else {
            return Ok(None);
        };
        if was_paid == is_paid {
            return Ok(Some(was_paid));
        }

        self.persist_debts(previous).await?;
        tracing::info!(debt = %id, is_paid, "debt paid flag set");
        self.emit(LedgerEvent::DebtPaidChanged { id, is_paid });
        Ok(Some(was_paid))
    }

    /// Create one debt per borrower from the draft. See
    /// [`crate::domain::split_debt`] for how amounts are shared.
    pub async fn split_debt(
        &mut self,
        draft: &DebtDraft,
        borrowers: &[BorrowerId],
        split_evenly: bool,
    ) -> Result<Vec<Debt>, AppError> {
        let previous = self.ledger.debts().to_vec();
        let debts = self.ledger.split_debt(draft, borrowers, split_evenly)?;
        if debts.is_empty() {
            return Ok(debts);
        }

        self.persist_debts(previous).await?;
        tracing::info!(
            name = %draft.name,
            total = draft.amount,
            shares = debts.len(),
            split_evenly,
            "debt split"
        );
        self.emit(LedgerEvent::DebtsSplit {
            new_borrowers: Vec::new(),
            debts: debts.iter().map(|d| d.id).collect(),
        });
        Ok(debts)
    }

    /// Like [`Self::split_debt`], but borrowers are given by name and created
    /// when they don't exist yet. Names resolving to the same borrower are
    /// charged once.
    ///
    /// New borrowers and debts are written together: on any error neither
    /// collection changes.
    pub async fn split_debt_by_names(
        &mut self,
        draft: &DebtDraft,
        names: &[String],
        split_evenly: bool,
    ) -> Result<Vec<Debt>, AppError> {
        let previous_borrowers = self.ledger.borrowers().to_vec();
        let previous_debts = self.ledger.debts().to_vec();
        let (created, debts) = self
            .ledger
            .split_debt_by_names(draft, names, split_evenly)?;
        if debts.is_empty() {
            return Ok(debts);
        }

        if created.is_empty() {
            self.persist_debts(previous_debts).await?;
        } else {
            self.persist_all(previous_borrowers, previous_debts).await?;
        }
        tracing::info!(
            name = %draft.name,
            total = draft.amount,
            shares = debts.len(),
            new_borrowers = created.len(),
            split_evenly,
            "debt split"
        );
        self.emit(LedgerEvent::DebtsSplit {
            new_borrowers: created.iter().map(|b| b.id).collect(),
            debts: debts.iter().map(|d| d.id).collect(),
        });
        Ok(debts)
    }

    /// Append records restored from elsewhere, writing both slots in one
    /// transaction. Callers are responsible for validating the records.
    pub async fn merge_records(
        &mut self,
        borrowers: Vec<Borrower>,
        debts: Vec<Debt>,
    ) -> Result<(), AppError> {
        if borrowers.is_empty() && debts.is_empty() {
            return Ok(());
        }

        let previous_borrowers = self.ledger.borrowers().to_vec();
        let previous_debts = self.ledger.debts().to_vec();

        let mut all_borrowers = previous_borrowers.clone();
        all_borrowers.extend(borrowers.iter().cloned());
        let mut all_debts = previous_debts.clone();
        all_debts.extend(debts.iter().cloned());
        self.ledger.replace_borrowers(all_borrowers);
        self.ledger.replace_debts(all_debts);

        self.persist_all(previous_borrowers, previous_debts).await?;
        tracing::info!(
            borrowers = borrowers.len(),
            debts = debts.len(),
            "records merged"
        );
        self.emit(LedgerEvent::RecordsMerged {
            borrowers: borrowers.iter().map(|b| b.id).collect(),
            debts: debts.iter().map(|d| d.id).collect(),
        });
        Ok(())
    }

    pub fn debt(&self, id: DebtId) -> Option<Debt> {
        self.ledger.debt(id).cloned()
    }

    /// Get a debt by id, failing if it doesn't exist.
    pub fn get_debt(&self, id: DebtId) -> Result<Debt, AppError> {
        self.debt(id)
            .ok_or_else(|| AppError::DebtNotFound(id.to_string()))
    }

    pub fn debts(&self) -> Vec<Debt> {
        self.ledger.debts().to_vec()
    }

    // ========================
    // Views
    // ========================

    pub fn debts_for_month(&self, month: impl Into<MonthKey>) -> Vec<Debt> {
        self.ledger
            .debts_for_month(month)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn debts_for_borrower(&self, id: BorrowerId) -> Vec<Debt> {
        self.ledger
            .debts_for_borrower(id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn total_owed(&self, id: BorrowerId) -> Amount {
        self.ledger.total_owed(id)
    }

    pub fn debts_grouped_by_month(&self, id: BorrowerId) -> HashMap<MonthKey, Vec<Debt>> {
        self.ledger
            .debts_grouped_by_month(id)
            .into_iter()
            .map(|(month, debts)| (month, debts.into_iter().cloned().collect()))
            .collect()
    }

    pub fn sorted_month_sections(&self, id: BorrowerId) -> Vec<MonthSection> {
        self.ledger.sorted_month_sections(id)
    }

    pub fn all_month_sections(&self) -> Vec<MonthSection> {
        self.ledger.all_month_sections()
    }

    pub fn orphaned_debts(&self) -> Vec<Debt> {
        self.ledger.orphaned_debts().into_iter().cloned().collect()
    }

    /// Display name for a debt's borrower, or a placeholder for orphans.
    pub fn borrower_label(&self, id: BorrowerId) -> String {
        self.ledger
            .borrower_name(id)
            .map(str::to_string)
            .unwrap_or_else(|| "(removed borrower)".to_string())
    }
}
