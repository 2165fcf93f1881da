use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use super::{
    is_valid_amount, normalize_name, Amount, Borrower, BorrowerId, Debt, DebtDraft, DebtId,
    MonthKey,
};

/// The in-memory store of every borrower and debt for one user.
///
/// All operations are synchronous and run to completion. Lookups by id that
/// find nothing are no-ops; mutating methods report whether anything changed
/// so callers can tell a no-op from a hit.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    borrowers: Vec<Borrower>,
    debts: Vec<Debt>,
}

/// One calendar month's worth of debts, in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthSection {
    pub month: MonthKey,
    pub debts: Vec<Debt>,
}

impl MonthSection {
    /// Sum of every debt in the month, paid or not.
    pub fn total(&self) -> Amount {
        sum_amounts(self.debts.iter())
    }

    /// Sum of the debts in the month that are still unpaid.
    pub fn unpaid(&self) -> Amount {
        sum_amounts(self.debts.iter().filter(|d| !d.is_paid))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("Invalid amount {0}: must be a non-negative number")]
    InvalidAmount(Amount),

    #[error("Unknown borrower: {0}")]
    UnknownBorrower(BorrowerId),

    #[error("Borrower name cannot be empty")]
    EmptyName,

    #[error("Another borrower is already named '{0}'")]
    BorrowerNameTaken(String),
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from previously persisted collections.
    pub fn from_parts(borrowers: Vec<Borrower>, debts: Vec<Debt>) -> Self {
        Self { borrowers, debts }
    }

    pub fn borrowers(&self) -> &[Borrower] {
        &self.borrowers
    }

    pub fn debts(&self) -> &[Debt] {
        &self.debts
    }

    pub fn replace_borrowers(&mut self, borrowers: Vec<Borrower>) {
        self.borrowers = borrowers;
    }

    pub fn replace_debts(&mut self, debts: Vec<Debt>) {
        self.debts = debts;
    }

    // ========================
    // Lookups
    // ========================

    pub fn borrower(&self, id: BorrowerId) -> Option<&Borrower> {
        self.borrowers.iter().find(|b| b.id == id)
    }

    /// Find a borrower by name, ignoring case and surrounding whitespace.
    pub fn borrower_by_name(&self, name: &str) -> Option<&Borrower> {
        let wanted = normalize_name(name);
        self.borrowers
            .iter()
            .find(|b| b.normalized_name() == wanted)
    }

    /// Display name for a borrower id; `None` for orphaned references.
    pub fn borrower_name(&self, id: BorrowerId) -> Option<&str> {
        self.borrower(id).map(|b| b.name.as_str())
    }

    pub fn debt(&self, id: DebtId) -> Option<&Debt> {
        self.debts.iter().find(|d| d.id == id)
    }

    /// Debts whose borrower has since been removed.
    pub fn orphaned_debts(&self) -> Vec<&Debt> {
        self.debts
            .iter()
            .filter(|d| self.borrower(d.borrower_id).is_none())
            .collect()
    }

    // ========================
    // Borrower mutations
    // ========================

    /// Return the borrower with this name, creating it if none exists yet.
    /// The boolean is true when a new borrower was created.
    pub fn add_borrower(&mut self, name: &str) -> Result<(Borrower, bool), LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::EmptyName);
        }

        if let Some(existing) = self.borrower_by_name(name) {
            return Ok((existing.clone(), false));
        }

        let borrower = Borrower::new(name);
        self.borrowers.push(borrower.clone());
        Ok((borrower, true))
    }

    /// Remove a borrower. Debts referencing it are left in place.
    pub fn remove_borrower(&mut self, id: BorrowerId) -> bool {
        let before = self.borrowers.len();
        self.borrowers.retain(|b| b.id != id);
        self.borrowers.len() != before
    }

    /// Rename a borrower. Returns false if no borrower has this id.
    pub fn rename_borrower(&mut self, id: BorrowerId, name: &str) -> Result<bool, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyName);
        }

        if let Some(other) = self.borrower_by_name(name) {
            if other.id != id {
                return Err(LedgerError::BorrowerNameTaken(other.name.clone()));
            }
        }

        match self.borrowers.iter_mut().find(|b| b.id == id) {
            Some(borrower) => {
                borrower.name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ========================
    // Debt mutations
    // ========================

    fn validate_debt(&self, debt: &Debt) -> Result<(), LedgerError> {
        if !is_valid_amount(debt.amount) {
            return Err(LedgerError::InvalidAmount(debt.amount));
        }
        if self.borrower(debt.borrower_id).is_none() {
            return Err(LedgerError::UnknownBorrower(debt.borrower_id));
        }
        Ok(())
    }

    /// Append a debt. Ids are not de-duplicated.
    pub fn add_debt(&mut self, debt: Debt) -> Result<(), LedgerError> {
        self.validate_debt(&debt)?;
        self.debts.push(debt);
        Ok(())
    }

    /// Replace the stored debt that has the same id. Returns false when no
    /// such debt exists.
    pub fn update_debt(&mut self, debt: Debt) -> Result<bool, LedgerError> {
        self.validate_debt(&debt)?;
        match self.debts.iter_mut().find(|d| d.id == debt.id) {
            Some(slot) => {
                *slot = debt;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove every debt with this id, returning how many were removed.
    pub fn remove_debt(&mut self, id: DebtId) -> usize {
        let before = self.debts.len();
        self.debts.retain(|d| d.id != id);
        before - self.debts.len()
    }

    /// Flip the paid flag. Returns the new flag, or `None` if not found.
    pub fn toggle_paid(&mut self, id: DebtId) -> Option<bool> {
        let debt = self.debts.iter_mut().find(|d| d.id == id)?;
        debt.is_paid = !debt.is_paid;
        Some(debt.is_paid)
    }

    /// Force the paid flag. Returns the previous flag, or `None` if not found.
    pub fn set_paid(&mut self, id: DebtId, is_paid: bool) -> Option<bool> {
        let debt = self.debts.iter_mut().find(|d| d.id == id)?;
        let previous = debt.is_paid;
        debt.is_paid = is_paid;
        Some(previous)
    }

    /// Create one debt per borrower from a draft and append them all.
    ///
    /// Either every borrower is known and every debt is added, or nothing is.
    /// A borrower listed more than once is charged once.
    pub fn split_debt(
        &mut self,
        draft: &DebtDraft,
        borrowers: &[BorrowerId],
        split_evenly: bool,
    ) -> Result<Vec<Debt>, LedgerError> {
        if !is_valid_amount(draft.amount) {
            return Err(LedgerError::InvalidAmount(draft.amount));
        }
        if let Some(missing) = borrowers.iter().find(|id| self.borrower(**id).is_none()) {
            return Err(LedgerError::UnknownBorrower(*missing));
        }

        let mut unique: Vec<BorrowerId> = Vec::with_capacity(borrowers.len());
        for id in borrowers {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }

        let debts = split_debt(draft, &unique, split_evenly);
        self.debts.extend(debts.iter().cloned());
        Ok(debts)
    }

    /// Split a draft between borrowers given by name, creating the ones that
    /// don't exist yet. Returns the borrowers created and the debts added.
    ///
    /// The draft and every name are checked before anything is touched, so
    /// an error leaves the ledger unchanged.
    pub fn split_debt_by_names(
        &mut self,
        draft: &DebtDraft,
        names: &[String],
        split_evenly: bool,
    ) -> Result<(Vec<Borrower>, Vec<Debt>), LedgerError> {
        if !is_valid_amount(draft.amount) {
            return Err(LedgerError::InvalidAmount(draft.amount));
        }
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(LedgerError::EmptyName);
        }

        let mut created = Vec::new();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let (borrower, is_new) = self.add_borrower(name)?;
            ids.push(borrower.id);
            if is_new {
                created.push(borrower);
            }
        }

        let debts = self.split_debt(draft, &ids, split_evenly)?;
        Ok((created, debts))
    }

    // ========================
    // Views
    // ========================

    /// Debts dated in the same calendar month and year as `month`.
    pub fn debts_for_month(&self, month: impl Into<MonthKey>) -> Vec<&Debt> {
        let month = month.into();
        self.debts.iter().filter(|d| d.month() == month).collect()
    }

    pub fn debts_for_borrower(&self, id: BorrowerId) -> Vec<&Debt> {
        self.debts.iter().filter(|d| d.borrower_id == id).collect()
    }

    /// Sum of the borrower's unpaid debts.
    pub fn total_owed(&self, id: BorrowerId) -> Amount {
        sum_amounts(
            self.debts
                .iter()
                .filter(|d| d.borrower_id == id && !d.is_paid),
        )
    }

    pub fn debts_grouped_by_month(&self, id: BorrowerId) -> HashMap<MonthKey, Vec<&Debt>> {
        let mut groups: HashMap<MonthKey, Vec<&Debt>> = HashMap::new();
        for debt in self.debts.iter().filter(|d| d.borrower_id == id) {
            groups.entry(debt.month()).or_default().push(debt);
        }
        groups
    }

    /// The borrower's debts bucketed by month, oldest month first.
    pub fn sorted_month_sections(&self, id: BorrowerId) -> Vec<MonthSection> {
        month_sections(self.debts.iter().filter(|d| d.borrower_id == id))
    }

    /// Every debt bucketed by month, oldest month first.
    pub fn all_month_sections(&self) -> Vec<MonthSection> {
        month_sections(self.debts.iter())
    }
}

/// Build one debt per entry in `borrowers`. Repeated ids are not collapsed
/// here; [`Ledger::split_debt`] does that before calling in.
///
/// With `split_evenly` each borrower is charged `amount / count`, the same
/// share for everyone with no remainder redistribution. Without it every
/// borrower is charged the full amount.
pub fn split_debt(draft: &DebtDraft, borrowers: &[BorrowerId], split_evenly: bool) -> Vec<Debt> {
    if borrowers.is_empty() {
        return Vec::new();
    }

    let share = if split_evenly {
        draft.amount / borrowers.len() as Amount
    } else {
        draft.amount
    };

    borrowers
        .iter()
        .map(|borrower_id| draft.to_debt(*borrower_id, share))
        .collect()
}

fn sum_amounts<'a>(debts: impl Iterator<Item = &'a Debt>) -> Amount {
    debts.fold(0.0, |total, debt| total + debt.amount)
}

fn month_sections<'a>(debts: impl Iterator<Item = &'a Debt>) -> Vec<MonthSection> {
    let mut buckets: BTreeMap<MonthKey, Vec<Debt>> = BTreeMap::new();
    for debt in debts {
        buckets.entry(debt.month()).or_default().push(debt.clone());
    }
    buckets
        .into_iter()
        .map(|(month, debts)| MonthSection { month, debts })
        .collect()
}
