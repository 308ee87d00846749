//! Scheduled units of business behaviour that post transactions as the clock
//! advances.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::clock::Clock;
use crate::errors::{ModelError, Result};
use crate::ledger::{GeneralLedger, TransactionTemplate};

/// Where an activity sits relative to the current period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ActivityState {
    Scheduled,
    Active,
    Completed,
}

/// Inclusive date window plus the number of active periods between firings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ScheduleData")]
pub struct ActivitySchedule {
    start: NaiveDate,
    end: NaiveDate,
    interval: u32,
}

#[derive(Deserialize)]
struct ScheduleData {
    start: NaiveDate,
    end: NaiveDate,
    #[serde(default = "default_interval")]
    interval: u32,
}

fn default_interval() -> u32 {
    1
}

impl TryFrom<ScheduleData> for ActivitySchedule {
    type Error = ModelError;

    fn try_from(data: ScheduleData) -> Result<Self> {
        ActivitySchedule::new(data.start, data.end, data.interval)
    }
}

impl ActivitySchedule {
    /// Fails with `InvalidConfiguration` when `end < start` or `interval == 0`.
    pub fn new(start: NaiveDate, end: NaiveDate, interval: u32) -> Result<Self> {
        if end < start {
            return Err(ModelError::InvalidConfiguration(format!(
                "activity end {} is before start {}",
                end, start
            )));
        }
        if interval == 0 {
            return Err(ModelError::InvalidConfiguration(
                "activity interval must be at least one period".into(),
            ));
        }
        Ok(Self {
            start,
            end,
            interval,
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn interval(&self) -> u32 {
        self.interval
    }

    pub fn state_at(&self, date: NaiveDate) -> ActivityState {
        if date < self.start {
            ActivityState::Scheduled
        } else if date > self.end {
            ActivityState::Completed
        } else {
            ActivityState::Active
        }
    }
}

/// Clock period indexes bounding an activity, resolved before a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    pub first_ix: u32,
    pub last_ix: Option<u32>,
}

impl PeriodWindow {
    fn resolve(clock: &Clock, start: NaiveDate, end: NaiveDate) -> Self {
        let first_ix = clock.first_period_on_or_after(start);
        let last_ix = clock
            .last_period_on_or_before(end)
            .filter(|last| *last >= first_ix);
        Self { first_ix, last_ix }
    }

    fn contains(&self, period_ix: u32) -> bool {
        match self.last_ix {
            Some(last) => period_ix >= self.first_ix && period_ix <= last,
            None => false,
        }
    }

    fn offset(&self, period_ix: u32) -> Option<u32> {
        if self.contains(period_ix) {
            Some(period_ix - self.first_ix)
        } else {
            None
        }
    }
}

/// Amount posted on each firing, by zero-based firing index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmountSource {
    Fixed { amount: f64 },
    /// `initial * (1 + growth_rate)^k` for the k-th firing.
    Escalating { initial: f64, growth_rate: f64 },
}

impl AmountSource {
    pub fn fixed(amount: f64) -> Self {
        AmountSource::Fixed { amount }
    }

    pub fn amount_for(&self, firing_ix: u32) -> f64 {
        match self {
            AmountSource::Fixed { amount } => *amount,
            AmountSource::Escalating {
                initial,
                growth_rate,
            } => {
                let exponent = i32::try_from(firing_ix).unwrap_or(i32::MAX);
                initial * (1.0 + growth_rate).powi(exponent)
            }
        }
    }
}

/// Posts one templated transaction every `interval` active periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicActivity {
    name: String,
    #[serde(default)]
    description: String,
    schedule: ActivitySchedule,
    template: Arc<TransactionTemplate>,
    amount: AmountSource,
    #[serde(skip)]
    window: Option<PeriodWindow>,
}

impl BasicActivity {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schedule: ActivitySchedule,
        template: Arc<TransactionTemplate>,
        amount: AmountSource,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schedule,
            template,
            amount,
            window: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn schedule(&self) -> &ActivitySchedule {
        &self.schedule
    }

    pub fn template(&self) -> &TransactionTemplate {
        &self.template
    }

    pub fn amount(&self) -> &AmountSource {
        &self.amount
    }

    pub fn prepare_to_run(&mut self, clock: &Clock) {
        self.window = Some(self.window_for(clock));
    }

    pub fn state_at(&self, clock: &Clock) -> ActivityState {
        self.schedule.state_at(clock.get_date())
    }

    /// Posts at most one transaction for the clock's current period.
    pub fn run(&self, clock: &Clock, gl: &mut GeneralLedger, parent_path: &str) -> Result<usize> {
        if self.state_at(clock) != ActivityState::Active {
            return Ok(0);
        }
        let window = self.window_for(clock);
        let Some(offset) = window.offset(clock.period_ix()) else {
            return Ok(0);
        };
        if offset % self.schedule.interval() != 0 {
            return Ok(0);
        }
        let amount = self.amount.amount_for(offset / self.schedule.interval());
        let source = activity_path(parent_path, &self.name);
        gl.post_template(&self.template, clock.get_date(), amount, &source)?;
        Ok(1)
    }

    fn window_for(&self, clock: &Clock) -> PeriodWindow {
        self.window.unwrap_or_else(|| {
            PeriodWindow::resolve(clock, self.schedule.start(), self.schedule.end())
        })
    }
}

/// Amortising loan: receipt on the start period, then `term` monthly
/// interest and repayment postings that bring the loan balance to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicLoanActivity {
    name: String,
    #[serde(default)]
    description: String,
    bank_account: String,
    loan_account: String,
    interest_account: String,
    principal: f64,
    annual_rate: f64,
    term: u32,
    start: NaiveDate,
    #[serde(skip)]
    window: Option<PeriodWindow>,
}

/// Account paths a loan posts against.
#[derive(Debug, Clone)]
pub struct LoanAccounts {
    pub bank: String,
    pub loan: String,
    pub interest: String,
}

impl BasicLoanActivity {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        accounts: LoanAccounts,
        principal: f64,
        annual_rate: f64,
        term: u32,
        start: NaiveDate,
    ) -> Result<Self> {
        let loan = Self {
            name: name.into(),
            description: description.into(),
            bank_account: accounts.bank,
            loan_account: accounts.loan,
            interest_account: accounts.interest,
            principal,
            annual_rate,
            term,
            start,
            window: None,
        };
        loan.validate()?;
        Ok(loan)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate(&self) -> f64 {
        self.annual_rate
    }

    pub fn term(&self) -> u32 {
        self.term
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Level repayment for the configured principal, rate and term.
    pub fn monthly_payment(&self) -> f64 {
        let rate = self.monthly_rate();
        let periods = f64::from(self.term);
        if rate == 0.0 {
            return self.principal / periods;
        }
        let term = i32::try_from(self.term).unwrap_or(i32::MAX);
        self.principal * rate / (1.0 - (1.0 + rate).powi(-term))
    }

    /// Outstanding principal after `repayments` instalments.
    pub fn outstanding_after(&self, repayments: u32) -> f64 {
        let mut balance = self.principal;
        for k in 1..=repayments.min(self.term) {
            let (_, payment) = self.instalment(k, balance);
            balance = (balance + balance * self.monthly_rate() - payment).max(0.0);
        }
        balance
    }

    pub fn prepare_to_run(&mut self, clock: &Clock) -> Result<()> {
        self.validate()?;
        if !clock.period().is_monthly() {
            return Err(ModelError::InvalidConfiguration(format!(
                "loan `{}` requires a monthly clock, got `{}`",
                self.name,
                clock.period().label()
            )));
        }
        self.window = Some(self.window_for(clock));
        Ok(())
    }

    pub fn state_at(&self, clock: &Clock) -> ActivityState {
        let date = clock.get_date();
        if date < self.start {
            return ActivityState::Scheduled;
        }
        let window = self.window_for(clock);
        match window.last_ix {
            Some(last) if clock.period_ix() <= last => ActivityState::Active,
            _ => ActivityState::Completed,
        }
    }

    pub fn run(&self, clock: &Clock, gl: &mut GeneralLedger, parent_path: &str) -> Result<usize> {
        if self.state_at(clock) != ActivityState::Active {
            return Ok(0);
        }
        let window = self.window_for(clock);
        let Some(offset) = window.offset(clock.period_ix()) else {
            return Ok(0);
        };
        let source = activity_path(parent_path, &self.name);
        let date = clock.get_date();

        if offset == 0 {
            gl.record(
                &self.name,
                "Loan received",
                date,
                self.principal,
                &self.bank_account,
                &self.loan_account,
                &source,
            )?;
            return Ok(1);
        }

        let balance = self.outstanding_after(offset - 1);
        let (interest, payment) = self.instalment(offset, balance);
        let mut posted = 0;
        if interest > 0.0 {
            gl.record(
                &self.name,
                "Loan interest",
                date,
                interest,
                &self.interest_account,
                &self.loan_account,
                &source,
            )?;
            posted += 1;
        }
        gl.record(
            &self.name,
            "Loan repayment",
            date,
            payment,
            &self.loan_account,
            &self.bank_account,
            &source,
        )?;
        Ok(posted + 1)
    }

    fn monthly_rate(&self) -> f64 {
        self.annual_rate / 12.0
    }

    /// Interest and repayment for the `k`-th instalment (1-based) given the
    /// balance outstanding before it. The final instalment settles the rest.
    fn instalment(&self, k: u32, balance: f64) -> (f64, f64) {
        let interest = balance * self.monthly_rate();
        let payment = if k >= self.term {
            balance + interest
        } else {
            self.monthly_payment().min(balance + interest)
        };
        (interest, payment)
    }

    fn validate(&self) -> Result<()> {
        if !self.principal.is_finite() || self.principal <= 0.0 {
            return Err(ModelError::InvalidConfiguration(format!(
                "loan `{}` principal must be positive",
                self.name
            )));
        }
        if !self.annual_rate.is_finite() || self.annual_rate < 0.0 {
            return Err(ModelError::InvalidConfiguration(format!(
                "loan `{}` interest rate must be non-negative",
                self.name
            )));
        }
        if self.term == 0 {
            return Err(ModelError::InvalidConfiguration(format!(
                "loan `{}` term must be at least one month",
                self.name
            )));
        }
        Ok(())
    }

    fn window_for(&self, clock: &Clock) -> PeriodWindow {
        self.window.unwrap_or_else(|| {
            let first_ix = clock.first_period_on_or_after(self.start);
            PeriodWindow {
                first_ix,
                last_ix: first_ix.checked_add(self.term),
            }
        })
    }
}

// Equality ignores the cached run window.
impl PartialEq for BasicActivity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.schedule == other.schedule
            && self.template == other.template
            && self.amount == other.amount
    }
}

impl PartialEq for BasicLoanActivity {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.bank_account == other.bank_account
            && self.loan_account == other.loan_account
            && self.interest_account == other.interest_account
            && self.principal == other.principal
            && self.annual_rate == other.annual_rate
            && self.term == other.term
            && self.start == other.start
    }
}

/// Closed set of activity kinds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Activity {
    Basic(BasicActivity),
    Loan(BasicLoanActivity),
}

impl Activity {
    pub fn name(&self) -> &str {
        match self {
            Activity::Basic(activity) => activity.name(),
            Activity::Loan(activity) => activity.name(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Activity::Basic(activity) => activity.description(),
            Activity::Loan(activity) => activity.description(),
        }
    }

    pub fn prepare_to_run(&mut self, clock: &Clock) -> Result<()> {
        match self {
            Activity::Basic(activity) => {
                activity.prepare_to_run(clock);
                Ok(())
            }
            Activity::Loan(activity) => activity.prepare_to_run(clock),
        }
    }

    pub fn state_at(&self, clock: &Clock) -> ActivityState {
        match self {
            Activity::Basic(activity) => activity.state_at(clock),
            Activity::Loan(activity) => activity.state_at(clock),
        }
    }

    /// Runs the activity for the clock's current period and returns the number
    /// of transactions posted.
    pub fn run(&self, clock: &Clock, gl: &mut GeneralLedger, parent_path: &str) -> Result<usize> {
        match self {
            Activity::Basic(activity) => activity.run(clock, gl, parent_path),
            Activity::Loan(activity) => activity.run(clock, gl, parent_path),
        }
    }
}

impl From<BasicActivity> for Activity {
    fn from(activity: BasicActivity) -> Self {
        Activity::Basic(activity)
    }
}

impl From<BasicLoanActivity> for Activity {
    fn from(activity: BasicLoanActivity) -> Self {
        Activity::Loan(activity)
    }
}

fn activity_path(parent_path: &str, name: &str) -> String {
    if parent_path.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent_path, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{AccountType, GeneralLedgerStructure};
    use crate::simulation::time_interval::TimeInterval;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger() -> GeneralLedger {
        let mut structure = GeneralLedgerStructure::new("Chart", "");
        structure
            .add_account("Assets/Bank", "100", AccountType::Asset)
            .unwrap();
        structure
            .add_account("Revenue/Sales", "400", AccountType::Revenue)
            .unwrap();
        structure
            .add_account("Liabilities/Loan", "200", AccountType::Liability)
            .unwrap();
        structure
            .add_account("Expenses/Interest", "700", AccountType::Expense)
            .unwrap();
        GeneralLedger::new("GL", "", structure)
    }

    fn sales_activity(start: NaiveDate, end: NaiveDate, interval: u32) -> BasicActivity {
        let template = Arc::new(TransactionTemplate::new(
            "Sale",
            "",
            "Assets/Bank",
            "Revenue/Sales",
        ));
        BasicActivity::new(
            "Sales",
            "",
            ActivitySchedule::new(start, end, interval).unwrap(),
            template,
            AmountSource::fixed(10.0),
        )
    }

    #[test]
    fn schedule_rejects_inverted_window() {
        let err = ActivitySchedule::new(date(2024, 3, 1), date(2024, 2, 1), 1).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfiguration(_)));
        assert!(ActivitySchedule::new(date(2024, 1, 1), date(2024, 2, 1), 0).is_err());
    }

    #[test]
    fn state_machine_follows_period_date() {
        let mut clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        let activity = sales_activity(date(2024, 2, 1), date(2024, 3, 1), 1);
        assert_eq!(activity.state_at(&clock), ActivityState::Scheduled);
        clock.tick();
        assert_eq!(activity.state_at(&clock), ActivityState::Active);
        clock.tick();
        assert_eq!(activity.state_at(&clock), ActivityState::Active);
        clock.tick();
        assert_eq!(activity.state_at(&clock), ActivityState::Completed);
    }

    #[test]
    fn fires_every_interval_within_window() {
        let mut clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        let mut activity = sales_activity(date(2024, 1, 1), date(2024, 6, 1), 2);
        activity.prepare_to_run(&clock);
        let mut gl = ledger();
        for _ in 0..8 {
            activity.run(&clock, &mut gl, "Co").unwrap();
            clock.tick();
        }
        let dates: Vec<NaiveDate> = gl.transactions().iter().map(|t| t.date()).collect();
        assert_eq!(dates, vec![date(2024, 1, 1), date(2024, 3, 1), date(2024, 5, 1)]);
        assert_eq!(gl.transactions()[0].source(), "Co/Sales");
    }

    #[test]
    fn activity_does_not_deduplicate_repeat_runs() {
        let clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        let activity = sales_activity(date(2024, 1, 1), date(2024, 1, 1), 1);
        let mut gl = ledger();
        activity.run(&clock, &mut gl, "").unwrap();
        activity.run(&clock, &mut gl, "").unwrap();
        assert_eq!(gl.transaction_count(), 2);
        assert_eq!(gl.transactions()[0].source(), "Sales");
    }

    #[test]
    fn escalating_amounts_compound_per_firing() {
        let source = AmountSource::Escalating {
            initial: 100.0,
            growth_rate: 0.1,
        };
        assert_eq!(source.amount_for(0), 100.0);
        assert!((source.amount_for(2) - 121.0).abs() < 1e-9);
    }

    fn loan() -> BasicLoanActivity {
        BasicLoanActivity::new(
            "Loan",
            "",
            LoanAccounts {
                bank: "Assets/Bank".into(),
                loan: "Liabilities/Loan".into(),
                interest: "Expenses/Interest".into(),
            },
            1200.0,
            0.12,
            12,
            date(2024, 1, 1),
        )
        .unwrap()
    }

    #[test]
    fn loan_amortises_to_zero() {
        let mut clock = Clock::new("c", date(2024, 1, 1), TimeInterval::monthly()).unwrap();
        let mut activity = loan();
        activity.prepare_to_run(&clock).unwrap();
        let mut gl = ledger();
        for _ in 0..15 {
            activity.run(&clock, &mut gl, "Co").unwrap();
            clock.tick();
        }
        // receipt + 12 x (interest + repayment)
        assert_eq!(gl.transaction_count(), 25);
        let loan_balance = gl.get_balance("Liabilities/Loan", None).unwrap();
        assert!(loan_balance.abs() < 1e-6, "loan balance {loan_balance}");
        let interest = gl.get_balance("Expenses/Interest", None).unwrap();
        let bank = gl.get_balance("Assets/Bank", None).unwrap();
        assert!((bank + interest).abs() < 1e-6);
        assert!(interest > 0.0);
        assert_eq!(activity.state_at(&clock), ActivityState::Completed);
    }

    #[test]
    fn zero_rate_loan_repays_in_equal_parts() {
        let mut activity = BasicLoanActivity::new(
            "Loan",
            "",
            LoanAccounts {
                bank: "Assets/Bank".into(),
                loan: "Liabilities/Loan".into(),
                interest: "Expenses/Interest".into(),
            },
            600.0,
            0.0,
            6,
            date(2024, 1, 1),
        )
        .unwrap();
        assert_eq!(activity.monthly_payment(), 100.0);
        assert_eq!(activity.outstanding_after(2), 400.0);
        let clock = Clock::new("c", date(2024, 1, 1), TimeInterval::weeks(1)).unwrap();
        assert!(matches!(
            activity.prepare_to_run(&clock),
            Err(ModelError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn invalid_loan_terms_are_rejected() {
        let accounts = LoanAccounts {
            bank: "Assets/Bank".into(),
            loan: "Liabilities/Loan".into(),
            interest: "Expenses/Interest".into(),
        };
        assert!(BasicLoanActivity::new("L", "", accounts.clone(), -1.0, 0.1, 12, date(2024, 1, 1))
            .is_err());
        assert!(BasicLoanActivity::new("L", "", accounts, 100.0, 0.1, 0, date(2024, 1, 1)).is_err());
    }

    #[test]
    fn activity_variants_serialise_with_kind_tag() {
        let activity = Activity::from(sales_activity(date(2024, 1, 1), date(2024, 2, 1), 1));
        let value = serde_json::to_value(&activity).unwrap();
        assert_eq!(value["kind"], "basic");
        let decoded: Activity = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, activity);
    }
}
