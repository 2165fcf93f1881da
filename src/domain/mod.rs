mod borrower;
mod debt;
mod ledger;
mod money;
mod month;

pub use borrower::*;
pub use debt::*;
pub use ledger::*;
pub use money::*;
pub use month::*;
