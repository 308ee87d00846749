mod common;

use std::sync::Arc;

use bizsim_core::{
    canonical::CanonicalJson,
    errors::ModelError,
    ledger::{AccountType, GeneralLedger, GeneralLedgerStructure, TransactionTemplate},
    simulation::{
        ActivitySchedule, AmountSource, BasicActivity, Clock, EndCondition, Entity,
        TimeBasedModel, TimeInterval,
    },
};
use common::{acme_model, date, LOAN_PRINCIPAL};

const EPS: f64 = 1e-6;

fn cash_sales_structure() -> GeneralLedgerStructure {
    let mut structure = GeneralLedgerStructure::new("Chart", "");
    structure
        .add_account("Assets/Cash", "100", AccountType::Asset)
        .unwrap();
    structure
        .add_account("Revenue/Sales", "400", AccountType::Revenue)
        .unwrap();
    structure
}

#[test]
fn single_sale_moves_both_balances() {
    let mut gl = GeneralLedger::new("GL", "", cash_sales_structure());
    let template = TransactionTemplate::new("Sale", "", "Assets/Cash", "Revenue/Sales");
    gl.post_template(&template, date(2024, 1, 31), 150.0, "Shop/Sales")
        .unwrap();

    assert_eq!(gl.get_balance("Assets/Cash", None).unwrap(), 150.0);
    assert_eq!(gl.get_balance("Revenue/Sales", None).unwrap(), 150.0);
    assert_eq!(gl.get_balance("Assets", None).unwrap(), 150.0);
    assert_eq!(
        gl.get_balance("Assets/Cash", Some(date(2024, 1, 30))).unwrap(),
        0.0
    );
}

#[test]
fn negative_amount_is_rejected_without_posting() {
    let mut gl = GeneralLedger::new("GL", "", cash_sales_structure());
    let err = gl
        .create_transaction(date(2024, 1, 31), -5.0, "Assets/Cash", "Revenue/Sales", "x")
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidTransaction(_)));
    assert_eq!(gl.transaction_count(), 0);
}

#[test]
fn duplicate_number_leaves_structure_unchanged() {
    let mut structure = cash_sales_structure();
    let before = structure.to_canonical_json().unwrap();
    let err = structure
        .add_account("Assets/Bank", "100", AccountType::Asset)
        .unwrap_err();
    assert!(matches!(err, ModelError::DuplicateAccountNumber(_)));
    assert_eq!(structure.to_canonical_json().unwrap(), before);
    assert!(!structure.contains("Assets/Bank"));
}

#[test]
fn one_transaction_per_period_on_each_boundary() {
    let periods = 7;
    let start = date(2024, 1, 31);
    let mut entity = Entity::new("Shop", "", cash_sales_structure());
    entity
        .add_activity(BasicActivity::new(
            "Sales",
            "",
            ActivitySchedule::new(start, date(2030, 12, 31), 1).unwrap(),
            Arc::new(TransactionTemplate::new("Sale", "", "Assets/Cash", "Revenue/Sales")),
            AmountSource::fixed(10.0),
        ))
        .unwrap();
    let clock = Clock::new("Clock", start, TimeInterval::monthly()).unwrap();
    let expected: Vec<_> = (0..periods).map(|ix| clock.date_at(ix)).collect();
    let mut model =
        TimeBasedModel::new("M", "", clock, EndCondition::PeriodCount { periods }).unwrap();
    model.add_entity(entity).unwrap();

    let summary = model.run().unwrap();
    assert_eq!(summary.transactions_posted, periods as usize);

    let gl = model.entity("Shop").unwrap().gl();
    let dates: Vec<_> = gl.transactions().iter().map(|t| t.date()).collect();
    assert_eq!(dates, expected);
    assert_eq!(dates[1], date(2024, 2, 29));
    assert_eq!(dates[2], date(2024, 3, 31));
}

#[test]
fn acme_plan_posts_expected_totals() {
    let mut model = acme_model();
    let summary = model.run().unwrap();
    assert_eq!(summary.periods_run, 14);
    assert_eq!(summary.last_period, Some(date(2025, 2, 28)));
    assert_eq!(summary.transactions_posted, 12 + 12 + 25);

    let acme = model.entity("Acme").unwrap();
    assert_eq!(acme.get_balance("Revenue/Sales", None).unwrap(), 12_000.0);
    assert_eq!(acme.get_balance("Expenses/Wages", None).unwrap(), 4_800.0);

    let loan = acme.get_balance("Liabilities/Loan", None).unwrap();
    let interest = acme.get_balance("Expenses/Interest", None).unwrap();
    let bank = acme.get_balance("Assets/Bank", None).unwrap();
    assert!(loan.abs() < EPS, "loan should be repaid, got {loan}");
    assert!(interest > 0.0 && interest < LOAN_PRINCIPAL * 0.06);
    assert!((bank - (12_000.0 - 4_800.0 - interest)).abs() < EPS);
}

#[test]
fn trial_balance_debits_equal_credits() {
    let mut model = acme_model();
    model.run().unwrap();
    let lines = model.entity("Acme").unwrap().gl().trial_balance(None);
    assert_eq!(lines.len(), 6);
    let debits: f64 = lines.iter().map(|line| line.debits).sum();
    let credits: f64 = lines.iter().map(|line| line.credits).sum();
    assert!((debits - credits).abs() < EPS);
}

#[test]
fn trial_balance_stays_balanced_for_parent_postings() {
    let mut gl = GeneralLedger::new("GL", "", cash_sales_structure());
    gl.create_transaction(date(2024, 1, 31), 150.0, "Assets", "Revenue/Sales", "x")
        .unwrap();
    gl.create_transaction(date(2024, 2, 29), 20.0, "Assets/Cash", "Assets", "x")
        .unwrap();

    let lines = gl.trial_balance(None);
    let paths: Vec<&str> = lines.iter().map(|line| line.path.as_str()).collect();
    assert_eq!(paths, vec!["Assets", "Assets/Cash", "Revenue/Sales"]);
    assert_eq!(lines[0].balance, 130.0);
    let debits: f64 = lines.iter().map(|line| line.debits).sum();
    let credits: f64 = lines.iter().map(|line| line.credits).sum();
    assert_eq!((debits, credits), (170.0, 170.0));
    assert_eq!(gl.get_balance("Assets", None).unwrap(), 150.0);
}

#[test]
fn trial_balance_after_splitting_a_posted_account() {
    let mut model = acme_model();
    model.run().unwrap();
    let acme = model.entity_mut("Acme").unwrap();
    acme.structure_mut()
        .add_account("Assets/Bank/Petty", "1010", AccountType::Asset)
        .unwrap();

    let lines = acme.gl().trial_balance(None);
    let bank = lines.iter().find(|line| line.path == "Assets/Bank").unwrap();
    assert!(bank.debits > 0.0);
    assert!(lines.iter().any(|line| line.path == "Assets/Bank/Petty"));
    let debits: f64 = lines.iter().map(|line| line.debits).sum();
    let credits: f64 = lines.iter().map(|line| line.credits).sum();
    assert!((debits - credits).abs() < EPS);
}

#[test]
fn transaction_sources_follow_the_organisation_tree() {
    let mut model = acme_model();
    model.run().unwrap();
    let gl = model.entity("Acme").unwrap().gl();
    let first_period: Vec<&str> = gl
        .transactions()
        .iter()
        .take(3)
        .map(|t| t.source())
        .collect();
    assert_eq!(
        first_period,
        vec!["Acme/Sales/Retail", "Acme/Payroll", "Acme/Startup loan"]
    );
    assert_eq!(gl.transactions_for("Liabilities").unwrap().len(), 25);
}

#[test]
fn canonical_round_trip_of_a_run_model_is_byte_identical() {
    let mut model = acme_model();
    model.run().unwrap();
    let first = model.to_canonical_json().unwrap();
    let decoded = TimeBasedModel::from_canonical_json(&first).unwrap();
    assert_eq!(decoded.to_canonical_json().unwrap(), first);
    assert_eq!(decoded.content_hash().unwrap(), model.content_hash().unwrap());
}

#[test]
fn loaded_structure_rejects_duplicate_numbers() {
    let json = serde_json::json!({
        "name": "Chart",
        "description": "",
        "accounts": [
            {"name": "Cash", "description": "", "number": "1", "account_type": "Asset", "accounts": []},
            {"name": "Bank", "description": "", "number": "1", "account_type": "Asset", "accounts": []}
        ]
    });
    assert!(serde_json::from_value::<GeneralLedgerStructure>(json).is_err());
}

#[test]
fn loans_require_a_monthly_clock() {
    let model = acme_model();
    let weekly = Clock::new("Weekly", date(2024, 1, 31), TimeInterval::weeks(1)).unwrap();
    let mut weekly_model = TimeBasedModel::new(
        "Weekly",
        "",
        weekly,
        EndCondition::PeriodCount { periods: 4 },
    )
    .unwrap();
    let acme = model.entity("Acme").unwrap().clone();
    weekly_model.add_entity(acme).unwrap();
    assert!(matches!(
        weekly_model.run(),
        Err(ModelError::InvalidConfiguration(_))
    ));
    assert_eq!(
        weekly_model.entity("Acme").unwrap().gl().transaction_count(),
        0
    );
}
