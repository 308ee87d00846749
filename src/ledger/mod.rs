//! General ledger: chart of accounts, templates, and posted transactions.

pub mod account;
#[allow(clippy::module_inception)]
pub mod ledger;
pub mod structure;
pub mod transaction;

pub use account::{AccountType, GeneralLedgerAccount};
pub use ledger::{GeneralLedger, TrialBalanceLine};
pub use structure::{GeneralLedgerStructure, StructureRow};
pub use transaction::{Transaction, TransactionTemplate};
