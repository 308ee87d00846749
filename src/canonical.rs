//! Canonical JSON encoding used for content equality, hashing and persistence.
//!
//! Keys are sorted recursively and output is indented with four spaces, so the
//! same object always encodes to the same bytes.

use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{ser::PrettyFormatter, Serializer, Value};
use sha2::{Digest, Sha256};

use crate::errors::Result;
use crate::ledger::{
    AccountType, GeneralLedger, GeneralLedgerAccount, GeneralLedgerStructure, Transaction,
    TransactionTemplate,
};
use crate::simulation::{
    Activity, ActivitySchedule, AmountSource, BasicActivity, BasicLoanActivity, Clock, Component,
    EndCondition, Entity, TimeBasedModel, TimeInterval,
};

const INDENT: &[u8] = b"    ";

/// Deterministic JSON encoding. Implemented explicitly per domain type.
pub trait CanonicalJson: Serialize + DeserializeOwned {
    fn to_canonical_json(&self) -> Result<String> {
        let value = canonicalize(serde_json::to_value(self)?);
        let mut buffer = Vec::new();
        let formatter = PrettyFormatter::with_indent(INDENT);
        let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
        value.serialize(&mut serializer)?;
        // serde_json only ever writes valid UTF-8.
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    fn from_canonical_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// SHA-256 of the compact canonical form, as lowercase hex.
    fn content_hash(&self) -> Result<String> {
        let value = canonicalize(serde_json::to_value(self)?);
        let compact = serde_json::to_string(&value)?;
        let mut hasher = Sha256::new();
        hasher.update(compact.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }

    /// Content equality: both sides encode to the same canonical bytes.
    fn same_content(&self, other: &Self) -> Result<bool> {
        Ok(self.to_canonical_json()? == other.to_canonical_json()?)
    }
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(key, value)| (key, canonicalize(value)))
                .collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

impl CanonicalJson for AccountType {}
impl CanonicalJson for GeneralLedgerAccount {}
impl CanonicalJson for GeneralLedgerStructure {}
impl CanonicalJson for TransactionTemplate {}
impl CanonicalJson for Transaction {}
impl CanonicalJson for GeneralLedger {}
impl CanonicalJson for TimeInterval {}
impl CanonicalJson for Clock {}
impl CanonicalJson for ActivitySchedule {}
impl CanonicalJson for AmountSource {}
impl CanonicalJson for BasicActivity {}
impl CanonicalJson for BasicLoanActivity {}
impl CanonicalJson for Activity {}
impl CanonicalJson for Component {}
impl CanonicalJson for Entity {}
impl CanonicalJson for EndCondition {}
impl CanonicalJson for TimeBasedModel {}
