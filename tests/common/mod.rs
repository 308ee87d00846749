#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc, sync::Mutex};

use bizsim_core::{
    ledger::{AccountType, GeneralLedgerStructure, TransactionTemplate},
    simulation::{
        ActivitySchedule, AmountSource, BasicActivity, BasicLoanActivity, Clock, Component,
        EndCondition, Entity, LoanAccounts, TimeBasedModel, TimeInterval,
    },
};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// A unique directory that outlives the calling test.
pub fn temp_dir() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let path = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    path
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn chart() -> GeneralLedgerStructure {
    let mut structure = GeneralLedgerStructure::new("Chart", "Acme chart of accounts");
    let accounts = [
        ("Assets/Bank", "1000", AccountType::Asset),
        ("Liabilities/Loan", "2000", AccountType::Liability),
        ("Equity/Capital", "3000", AccountType::Equity),
        ("Revenue/Sales", "4000", AccountType::Revenue),
        ("Expenses/Wages", "6000", AccountType::Expense),
        ("Expenses/Interest", "6100", AccountType::Expense),
    ];
    for (path, number, account_type) in accounts {
        structure
            .add_account(path, number, account_type)
            .expect("add account");
    }
    structure
}

pub const LOAN_PRINCIPAL: f64 = 12_000.0;

/// Acme: monthly retail sales in a component, payroll at entity level and a
/// twelve month loan, all starting 2024-01-31 and run for fourteen periods.
pub fn acme_model() -> TimeBasedModel {
    let year = ActivitySchedule::new(date(2024, 1, 31), date(2024, 12, 31), 1).expect("schedule");
    let mut entity = Entity::new("Acme", "Trading company", chart());

    entity
        .add_component(Component::new("Sales", "Sales department"))
        .expect("component")
        .add_activity(BasicActivity::new(
            "Retail",
            "Counter sales",
            year,
            Arc::new(TransactionTemplate::new(
                "Sale",
                "Cash sale",
                "Assets/Bank",
                "Revenue/Sales",
            )),
            AmountSource::fixed(1_000.0),
        ))
        .expect("retail");
    entity
        .add_activity(BasicActivity::new(
            "Payroll",
            "",
            year,
            Arc::new(TransactionTemplate::new(
                "Wages",
                "",
                "Expenses/Wages",
                "Assets/Bank",
            )),
            AmountSource::fixed(400.0),
        ))
        .expect("payroll");
    entity
        .add_activity(
            BasicLoanActivity::new(
                "Startup loan",
                "",
                LoanAccounts {
                    bank: "Assets/Bank".into(),
                    loan: "Liabilities/Loan".into(),
                    interest: "Expenses/Interest".into(),
                },
                LOAN_PRINCIPAL,
                0.06,
                12,
                date(2024, 1, 31),
            )
            .expect("loan"),
        )
        .expect("add loan");

    let clock = Clock::new("Monthly", date(2024, 1, 31), TimeInterval::monthly()).expect("clock");
    let mut model = TimeBasedModel::new(
        "Acme Plan",
        "Launch plan",
        clock,
        EndCondition::PeriodCount { periods: 14 },
    )
    .expect("model");
    model.add_entity(entity).expect("entity");
    model
}
