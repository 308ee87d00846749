use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Debit/credit pattern reused by activities each time they fire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionTemplate {
    name: String,
    #[serde(default)]
    description: String,
    dt_account: String,
    cr_account: String,
}

impl TransactionTemplate {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        dt_account: impl Into<String>,
        cr_account: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            dt_account: dt_account.into(),
            cr_account: cr_account.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Path of the account debited by this template.
    pub fn dt_account(&self) -> &str {
        &self.dt_account
    }

    /// Path of the account credited by this template.
    pub fn cr_account(&self) -> &str {
        &self.cr_account
    }
}

/// A posted ledger entry. Transactions are only created by
/// [`GeneralLedger`](super::GeneralLedger) after validation and never change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    id: Uuid,
    name: String,
    #[serde(default)]
    description: String,
    date: NaiveDate,
    amount: f64,
    dt_account: String,
    cr_account: String,
    source: String,
}

/// Validated inputs for a new transaction.
#[derive(Debug, Clone)]
pub(crate) struct TransactionDraft<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub date: NaiveDate,
    pub amount: f64,
    pub dt_account: String,
    pub cr_account: String,
    pub source: &'a str,
}

impl Transaction {
    pub(crate) fn from_draft(draft: TransactionDraft<'_>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name.to_string(),
            description: draft.description.to_string(),
            date: draft.date,
            amount: draft.amount,
            dt_account: draft.dt_account,
            cr_account: draft.cr_account,
            source: draft.source.to_string(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn dt_account(&self) -> &str {
        &self.dt_account
    }

    pub fn cr_account(&self) -> &str {
        &self.cr_account
    }

    /// Path of the activity (or caller label) that created this transaction.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns `true` if either side of the posting touches `path`.
    pub fn touches(&self, path: &str) -> bool {
        self.dt_account == path || self.cr_account == path
    }
}
