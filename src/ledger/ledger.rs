use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    account::AccountType,
    structure::GeneralLedgerStructure,
    transaction::{Transaction, TransactionDraft, TransactionTemplate},
};
use crate::errors::{ModelError, Result};

/// Append-only record of an entity's transactions, validated against the
/// chart of accounts it owns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "LedgerData")]
pub struct GeneralLedger {
    name: String,
    #[serde(default)]
    description: String,
    structure: GeneralLedgerStructure,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

#[derive(Deserialize)]
struct LedgerData {
    name: String,
    #[serde(default)]
    description: String,
    structure: GeneralLedgerStructure,
    #[serde(default)]
    transactions: Vec<Transaction>,
}

impl TryFrom<LedgerData> for GeneralLedger {
    type Error = ModelError;

    /// Stored transactions must pass the same checks as new postings and
    /// name their accounts by canonical path.
    fn try_from(data: LedgerData) -> Result<Self> {
        for txn in &data.transactions {
            let (dt_account, cr_account) = check_posting(
                &data.structure,
                txn.amount(),
                txn.dt_account(),
                txn.cr_account(),
            )?;
            if dt_account != txn.dt_account() || cr_account != txn.cr_account() {
                return Err(ModelError::InvalidTransaction(format!(
                    "transaction {} does not use canonical account paths",
                    txn.id()
                )));
            }
        }
        Ok(Self {
            name: data.name,
            description: data.description,
            structure: data.structure,
            transactions: data.transactions,
        })
    }
}

/// Debit/credit totals and signed balance for one account.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialBalanceLine {
    pub path: String,
    pub number: String,
    pub account_type: AccountType,
    pub debits: f64,
    pub credits: f64,
    pub balance: f64,
}

impl GeneralLedger {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        structure: GeneralLedgerStructure,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            structure,
            transactions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn structure(&self) -> &GeneralLedgerStructure {
        &self.structure
    }

    /// Mutable access for adding accounts. Existing accounts cannot be removed,
    /// so posted transactions keep resolving.
    pub fn structure_mut(&mut self) -> &mut GeneralLedgerStructure {
        &mut self.structure
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Validates and appends a transaction, returning the posted entry.
    ///
    /// The transaction is named after its source. Nothing is appended unless
    /// the amount is finite and non-negative and both accounts resolve.
    pub fn create_transaction(
        &mut self,
        date: NaiveDate,
        amount: f64,
        dt_account: &str,
        cr_account: &str,
        source: &str,
    ) -> Result<&Transaction> {
        self.record(source, "", date, amount, dt_account, cr_account, source)
    }

    /// Posts `amount` using the accounts, name and description of `template`.
    pub fn post_template(
        &mut self,
        template: &TransactionTemplate,
        date: NaiveDate,
        amount: f64,
        source: &str,
    ) -> Result<&Transaction> {
        self.record(
            template.name(),
            template.description(),
            date,
            amount,
            template.dt_account(),
            template.cr_account(),
            source,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        &mut self,
        name: &str,
        description: &str,
        date: NaiveDate,
        amount: f64,
        dt_account: &str,
        cr_account: &str,
        source: &str,
    ) -> Result<&Transaction> {
        let (dt_account, cr_account) =
            check_posting(&self.structure, amount, dt_account, cr_account)?;

        let transaction = Transaction::from_draft(TransactionDraft {
            name,
            description,
            date,
            amount,
            dt_account,
            cr_account,
            source,
        });
        tracing::debug!(
            ledger = %self.name,
            %date,
            amount,
            dt = transaction.dt_account(),
            cr = transaction.cr_account(),
            source,
            "transaction posted"
        );
        self.transactions.push(transaction);
        let posted = self.transactions.len() - 1;
        Ok(&self.transactions[posted])
    }

    /// Signed balance of `account` and its descendants up to `as_of`
    /// (inclusive, or every transaction when `None`).
    ///
    /// The sign follows the queried account's type: debits increase
    /// Asset/Expense balances and credits increase Liability/Equity/Revenue.
    pub fn get_balance(&self, account: &str, as_of: Option<NaiveDate>) -> Result<f64> {
        let account_type = self.structure.get_account(account)?.account_type();
        let subtree: HashSet<String> = self
            .structure
            .descendant_paths(account)?
            .into_iter()
            .collect();
        let (debits, credits) = self.totals_for(&subtree, as_of);
        Ok(account_type.debit_effect(debits) + account_type.credit_effect(credits))
    }

    /// Transactions where either side lies in the subtree rooted at `path`.
    pub fn transactions_for(&self, path: &str) -> Result<Vec<&Transaction>> {
        let subtree = self.structure.descendant_paths(path)?;
        Ok(self
            .transactions
            .iter()
            .filter(|txn| subtree.iter().any(|key| txn.touches(key)))
            .collect())
    }

    /// Totals per account in structure order: every leaf, plus any parent
    /// that carries postings of its own. Each line covers only transactions
    /// naming that exact account, so debits and credits always agree.
    pub fn trial_balance(&self, as_of: Option<NaiveDate>) -> Vec<TrialBalanceLine> {
        self.structure
            .report_rows()
            .into_iter()
            .filter(|row| row.is_leaf || self.has_direct_postings(&row.path))
            .map(|row| {
                let subtree = HashSet::from([row.path.clone()]);
                let (debits, credits) = self.totals_for(&subtree, as_of);
                TrialBalanceLine {
                    balance: row.account_type.debit_effect(debits)
                        + row.account_type.credit_effect(credits),
                    path: row.path,
                    number: row.number,
                    account_type: row.account_type,
                    debits,
                    credits,
                }
            })
            .collect()
    }

    fn has_direct_postings(&self, path: &str) -> bool {
        self.transactions.iter().any(|txn| txn.touches(path))
    }

    fn totals_for(&self, subtree: &HashSet<String>, as_of: Option<NaiveDate>) -> (f64, f64) {
        let mut debits = 0.0;
        let mut credits = 0.0;
        for txn in &self.transactions {
            if as_of.map_or(false, |limit| txn.date() > limit) {
                continue;
            }
            if subtree.contains(txn.dt_account()) {
                debits += txn.amount();
            }
            if subtree.contains(txn.cr_account()) {
                credits += txn.amount();
            }
        }
        (debits, credits)
    }
}

/// Validates an amount and both account paths, returning the canonical paths.
fn check_posting(
    structure: &GeneralLedgerStructure,
    amount: f64,
    dt_account: &str,
    cr_account: &str,
) -> Result<(String, String)> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ModelError::InvalidTransaction(format!(
            "amount {} must be finite and non-negative",
            amount
        )));
    }
    let resolve = |side: &str, path: &str| {
        structure.resolve_path(path).map_err(|_| {
            ModelError::InvalidTransaction(format!(
                "{} account `{}` is not in structure `{}`",
                side,
                path,
                structure.name()
            ))
        })
    };
    Ok((resolve("debit", dt_account)?, resolve("credit", cr_account)?))
}
