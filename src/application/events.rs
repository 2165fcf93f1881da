use crate::domain::{BorrowerId, DebtId};
use crate::storage::Slot;

/// A change to the ledger, emitted once per successful mutation.
///
/// Operations touching many records report them in a single event, so one
/// call never produces more than one message on the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    BorrowerAdded(BorrowerId),
    BorrowerRemoved(BorrowerId),
    BorrowerRenamed(BorrowerId),
    DebtAdded(DebtId),
    DebtUpdated(DebtId),
    DebtRemoved(DebtId),
    DebtPaidChanged { id: DebtId, is_paid: bool },
    /// A split created these debts, plus any borrowers named for the first time
    DebtsSplit {
        new_borrowers: Vec<BorrowerId>,
        debts: Vec<DebtId>,
    },
    /// Records appended in bulk, e.g. by an import
    RecordsMerged {
        borrowers: Vec<BorrowerId>,
        debts: Vec<DebtId>,
    },
}

impl LedgerEvent {
    /// The persisted slots this change touched.
    pub fn slots(&self) -> Vec<Slot> {
        match self {
            LedgerEvent::BorrowerAdded(_)
            | LedgerEvent::BorrowerRemoved(_)
            | LedgerEvent::BorrowerRenamed(_) => vec![Slot::Borrowers],
            LedgerEvent::DebtAdded(_)
            | LedgerEvent::DebtUpdated(_)
            | LedgerEvent::DebtRemoved(_)
            | LedgerEvent::DebtPaidChanged { .. } => vec![Slot::Debts],
            LedgerEvent::DebtsSplit { new_borrowers, .. } if new_borrowers.is_empty() => {
                vec![Slot::Debts]
            }
            LedgerEvent::RecordsMerged { borrowers, .. } if borrowers.is_empty() => {
                vec![Slot::Debts]
            }
            LedgerEvent::RecordsMerged { debts, .. } if debts.is_empty() => {
                vec![Slot::Borrowers]
            }
            LedgerEvent::DebtsSplit { .. } | LedgerEvent::RecordsMerged { .. } => {
                vec![Slot::Borrowers, Slot::Debts]
            }
        }
    }
}
