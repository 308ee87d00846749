//! Text and LaTeX reports over a general ledger.

pub mod table;

use chrono::NaiveDate;

use crate::ledger::{GeneralLedger, GeneralLedgerStructure};
use table::{Table, TableColumn};

const NAME_WIDTH: usize = 48;
const DESCRIPTION_WIDTH: usize = 40;

/// Output flavour for every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Latex,
}

impl ReportFormat {
    fn render(self, table: &Table) -> String {
        match self {
            ReportFormat::Text => table.render(),
            ReportFormat::Latex => table.render_latex(),
        }
    }
}

/// Places used when no configuration is at hand.
pub const DEFAULT_DECIMAL_PLACES: u8 = 2;

/// Fixed-point rendering with `decimal_places` digits.
pub fn format_amount(amount: f64, decimal_places: u8) -> String {
    let places = usize::from(decimal_places);
    let formatted = format!("{:.*}", places, amount);
    // Tiny negative residues would otherwise print as "-0.00".
    match formatted.strip_prefix('-') {
        Some(magnitude) if magnitude.chars().all(|ch| ch == '0' || ch == '.') => {
            magnitude.to_string()
        }
        _ => formatted,
    }
}

/// Chart of accounts in pre-order, names indented by depth.
pub fn structure_report(structure: &GeneralLedgerStructure, format: ReportFormat) -> String {
    let mut table = Table::new(vec![
        TableColumn::left("Name").with_max_width(NAME_WIDTH),
        TableColumn::left("Description").with_max_width(DESCRIPTION_WIDTH),
        TableColumn::left("Number"),
        TableColumn::left("Type"),
    ]);
    for row in structure.report_rows() {
        table.push_row(vec![
            format!("{}{}", row.indent, row.name),
            row.description,
            row.number,
            row.account_type.to_string(),
        ]);
    }
    format.render(&table)
}

/// Signed balance of every trial balance line, optionally as of a date.
pub fn balance_report(
    gl: &GeneralLedger,
    as_of: Option<NaiveDate>,
    format: ReportFormat,
    decimal_places: u8,
) -> String {
    let mut table = Table::new(vec![
        TableColumn::left("Account").with_max_width(NAME_WIDTH),
        TableColumn::left("Number"),
        TableColumn::left("Type"),
        TableColumn::right("Balance"),
    ]);
    for line in gl.trial_balance(as_of) {
        table.push_row(vec![
            line.path,
            line.number,
            line.account_type.to_string(),
            format_amount(line.balance, decimal_places),
        ]);
    }
    format.render(&table)
}

/// Every posted transaction in posting order.
pub fn transaction_report(gl: &GeneralLedger, format: ReportFormat, decimal_places: u8) -> String {
    let mut table = Table::new(vec![
        TableColumn::left("Date"),
        TableColumn::left("Name").with_max_width(DESCRIPTION_WIDTH),
        TableColumn::left("Debit").with_max_width(NAME_WIDTH),
        TableColumn::left("Credit").with_max_width(NAME_WIDTH),
        TableColumn::right("Amount"),
        TableColumn::left("Source").with_max_width(NAME_WIDTH),
    ]);
    for txn in gl.transactions() {
        table.push_row(vec![
            txn.date().format("%Y-%m-%d").to_string(),
            txn.name().to_string(),
            txn.dt_account().to_string(),
            txn.cr_account().to_string(),
            format_amount(txn.amount(), decimal_places),
            txn.source().to_string(),
        ]);
    }
    format.render(&table)
}
