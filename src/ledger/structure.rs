//! Chart of accounts tree with path and number indexes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::account::{AccountType, GeneralLedgerAccount};
use crate::errors::{ModelError, Result};

const PATH_SEPARATOR: char = '/';
const INDENT_UNIT: &str = "  ";

/// Owns the chart of accounts for one entity.
///
/// Accounts are addressed by slash-delimited paths such as `Assets/Cash`. Both
/// the path and number indexes are derived state: they are rebuilt after every
/// structural mutation and after deserialisation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "StructureData")]
pub struct GeneralLedgerStructure {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    accounts: Vec<GeneralLedgerAccount>,
    #[serde(skip)]
    path_index: HashMap<String, Vec<usize>>,
    #[serde(skip)]
    number_index: HashMap<String, String>,
}

#[derive(Deserialize)]
struct StructureData {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    accounts: Vec<GeneralLedgerAccount>,
}

impl TryFrom<StructureData> for GeneralLedgerStructure {
    type Error = ModelError;

    fn try_from(data: StructureData) -> Result<Self> {
        let mut structure = Self {
            name: data.name,
            description: data.description,
            accounts: data.accounts,
            path_index: HashMap::new(),
            number_index: HashMap::new(),
        };
        structure.rebuild_index()?;
        Ok(structure)
    }
}

/// One line of the pre-order structure walk used by reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureRow {
    pub depth: usize,
    pub indent: String,
    pub path: String,
    pub name: String,
    pub description: String,
    pub number: String,
    pub account_type: AccountType,
    pub is_leaf: bool,
}

impl GeneralLedgerStructure {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            accounts: Vec::new(),
            path_index: HashMap::new(),
            number_index: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Top-level accounts in insertion order.
    pub fn accounts(&self) -> &[GeneralLedgerAccount] {
        &self.accounts
    }

    pub fn account_count(&self) -> usize {
        self.path_index.len()
    }

    pub fn add_account(
        &mut self,
        path: &str,
        number: &str,
        account_type: AccountType,
    ) -> Result<&GeneralLedgerAccount> {
        self.add_account_with_description(path, number, account_type, "")
    }

    /// Inserts an account at `path`, creating missing intermediate nodes.
    ///
    /// Intermediate nodes get an empty number and description and inherit the
    /// new account's type. Every check runs before the tree is touched, so a
    /// failed call leaves the structure unchanged.
    pub fn add_account_with_description(
        &mut self,
        path: &str,
        number: &str,
        account_type: AccountType,
        description: &str,
    ) -> Result<&GeneralLedgerAccount> {
        let segments = split_path(path)?;
        let number = number.trim();
        if number.is_empty() {
            return Err(ModelError::InvalidConfiguration(format!(
                "account `{}` requires a number",
                path
            )));
        }
        if let Some(existing) = self.number_index.get(number) {
            return Err(ModelError::DuplicateAccountNumber(format!(
                "{} is already assigned to `{}`",
                number, existing
            )));
        }
        let full_path = segments.join("/");
        if self.path_index.contains_key(&full_path) {
            return Err(ModelError::DuplicateAccountPath(full_path));
        }

        let (leaf, parents) = segments
            .split_last()
            .ok_or_else(|| ModelError::InvalidConfiguration("empty account path".into()))?;
        let mut siblings = &mut self.accounts;
        for segment in parents {
            let idx = match siblings.iter().position(|account| account.name() == *segment) {
                Some(idx) => idx,
                None => {
                    siblings.push(GeneralLedgerAccount::new(*segment, "", "", account_type));
                    siblings.len() - 1
                }
            };
            siblings = siblings[idx].accounts_mut();
        }
        siblings.push(GeneralLedgerAccount::new(
            *leaf,
            description,
            number,
            account_type,
        ));

        self.rebuild_index()?;
        tracing::debug!(path = %full_path, number, %account_type, "account added");
        self.get_account(&full_path)
    }

    /// Resolves a slash-delimited path to its account.
    pub fn get_account(&self, path: &str) -> Result<&GeneralLedgerAccount> {
        let key = normalize_path(path);
        let chain = self
            .path_index
            .get(&key)
            .ok_or_else(|| ModelError::AccountNotFound(path.to_string()))?;
        self.follow(chain)
            .ok_or_else(|| ModelError::AccountNotFound(path.to_string()))
    }

    /// Resolves an account number to the path it is registered under.
    pub fn path_for_number(&self, number: &str) -> Result<&str> {
        self.number_index
            .get(number.trim())
            .map(String::as_str)
            .ok_or_else(|| ModelError::AccountNotFound(format!("number {}", number)))
    }

    pub fn account_by_number(&self, number: &str) -> Result<&GeneralLedgerAccount> {
        let path = self.path_for_number(number)?;
        self.get_account(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.path_index.contains_key(&normalize_path(path))
    }

    /// Canonical form of `path` if it names an account in this structure.
    pub fn resolve_path(&self, path: &str) -> Result<String> {
        let key = normalize_path(path);
        if self.path_index.contains_key(&key) {
            Ok(key)
        } else {
            Err(ModelError::AccountNotFound(path.to_string()))
        }
    }

    /// The account at `path` followed by all of its descendants, pre-order.
    pub fn descendant_paths(&self, path: &str) -> Result<Vec<String>> {
        let key = self.resolve_path(path)?;
        let account = self.get_account(&key)?;
        let mut paths = Vec::new();
        collect_paths(account, &key, &mut paths);
        Ok(paths)
    }

    /// Pre-order walk: parent before children, children in insertion order.
    pub fn report_rows(&self) -> Vec<StructureRow> {
        let mut rows = Vec::new();
        for account in &self.accounts {
            collect_rows(account, account.name(), 0, &mut rows);
        }
        rows
    }

    fn follow(&self, chain: &[usize]) -> Option<&GeneralLedgerAccount> {
        let (first, rest) = chain.split_first()?;
        let mut node = self.accounts.get(*first)?;
        for idx in rest {
            node = node.accounts().get(*idx)?;
        }
        Some(node)
    }

    fn rebuild_index(&mut self) -> Result<()> {
        let mut path_index = HashMap::new();
        let mut number_index = HashMap::new();
        for (idx, account) in self.accounts.iter().enumerate() {
            index_account(
                account,
                account.name().to_string(),
                vec![idx],
                &mut path_index,
                &mut number_index,
            )?;
        }
        self.path_index = path_index;
        self.number_index = number_index;
        Ok(())
    }
}

fn index_account(
    account: &GeneralLedgerAccount,
    path: String,
    chain: Vec<usize>,
    path_index: &mut HashMap<String, Vec<usize>>,
    number_index: &mut HashMap<String, String>,
) -> Result<()> {
    if !account.number().is_empty() {
        if let Some(existing) = number_index.insert(account.number().to_string(), path.clone()) {
            return Err(ModelError::DuplicateAccountNumber(format!(
                "{} is assigned to both `{}` and `{}`",
                account.number(),
                existing,
                path
            )));
        }
    }
    for (idx, child) in account.accounts().iter().enumerate() {
        let mut child_chain = chain.clone();
        child_chain.push(idx);
        index_account(
            child,
            format!("{}/{}", path, child.name()),
            child_chain,
            path_index,
            number_index,
        )?;
    }
    if path_index.insert(path.clone(), chain).is_some() {
        return Err(ModelError::DuplicateAccountPath(path));
    }
    Ok(())
}

fn collect_paths(account: &GeneralLedgerAccount, path: &str, out: &mut Vec<String>) {
    out.push(path.to_string());
    for child in account.accounts() {
        collect_paths(child, &format!("{}/{}", path, child.name()), out);
    }
}

fn collect_rows(
    account: &GeneralLedgerAccount,
    path: &str,
    depth: usize,
    out: &mut Vec<StructureRow>,
) {
    out.push(StructureRow {
        depth,
        indent: INDENT_UNIT.repeat(depth),
        path: path.to_string(),
        name: account.name().to_string(),
        description: account.description().to_string(),
        number: account.number().to_string(),
        account_type: account.account_type(),
        is_leaf: account.is_leaf(),
    });
    for child in account.accounts() {
        collect_rows(
            child,
            &format!("{}/{}", path, child.name()),
            depth + 1,
            out,
        );
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let trimmed = path.trim().trim_matches(PATH_SEPARATOR);
    let segments: Vec<&str> = trimmed.split(PATH_SEPARATOR).map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(ModelError::InvalidConfiguration(format!(
            "account path `{}` contains an empty segment",
            path
        )));
    }
    Ok(segments)
}

fn normalize_path(path: &str) -> String {
    path.trim()
        .trim_matches(PATH_SEPARATOR)
        .split(PATH_SEPARATOR)
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("/")
}
