use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed classification of general ledger accounts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AccountType {
    Asset,
    Equity,
    Expense,
    Liability,
    Revenue,
}

impl AccountType {
    /// Returns `true` when debits increase the balance of this account type.
    pub fn is_debit_normal(self) -> bool {
        match self {
            AccountType::Asset | AccountType::Expense => true,
            AccountType::Equity | AccountType::Liability | AccountType::Revenue => false,
        }
    }

    /// Signed contribution of a debit posting of `amount`.
    pub fn debit_effect(self, amount: f64) -> f64 {
        if self.is_debit_normal() {
            amount
        } else {
            -amount
        }
    }

    /// Signed contribution of a credit posting of `amount`.
    pub fn credit_effect(self, amount: f64) -> f64 {
        -self.debit_effect(amount)
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccountType::Asset => "Asset",
            AccountType::Equity => "Equity",
            AccountType::Expense => "Expense",
            AccountType::Liability => "Liability",
            AccountType::Revenue => "Revenue",
        };
        f.write_str(label)
    }
}

/// Node in the chart of accounts. Children are owned by their parent and only
/// change through [`GeneralLedgerStructure`](super::GeneralLedgerStructure).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneralLedgerAccount {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    number: String,
    account_type: AccountType,
    #[serde(default)]
    accounts: Vec<GeneralLedgerAccount>,
}

impl GeneralLedgerAccount {
    pub(crate) fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        number: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            number: number.into(),
            account_type,
            accounts: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Account number; empty for intermediate nodes created implicitly.
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    pub fn accounts(&self) -> &[GeneralLedgerAccount] {
        &self.accounts
    }

    pub fn is_leaf(&self) -> bool {
        self.accounts.is_empty()
    }

    pub(crate) fn accounts_mut(&mut self) -> &mut Vec<GeneralLedgerAccount> {
        &mut self.accounts
    }
}
