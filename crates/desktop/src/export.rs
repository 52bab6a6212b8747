//! CSV export of a user's expense history.

use std::io::Write;

use serde::Serialize;

use expenseshare_core::Currency;

use crate::types::ExpenseEntry;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Category")]
    category: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Currency")]
    currency: &'static str,
    #[serde(rename = "Payer")]
    payer: &'a str,
    #[serde(rename = "Group")]
    group: &'a str,
    #[serde(rename = "Type")]
    split_type: &'static str,
}

/// Write `entries` as CSV with a header row; returns the number of data rows.
///
/// Amounts are the full expense amount as a plain decimal in `currency`.
pub fn write_expenses_csv<W: Write>(
    writer: W,
    currency: Currency,
    entries: &[ExpenseEntry],
) -> Result<usize, csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    if entries.is_empty() {
        csv.write_record(["Date", "Description", "Category", "Amount", "Currency", "Payer", "Group", "Type"])?;
    }

    for entry in entries {
        let expense = &entry.expense;
        csv.serialize(CsvRow {
            date: expense.created_at().format(DATE_FORMAT).to_string(),
            description: expense.description(),
            category: expense.category(),
            amount: expense.amount().to_decimal_string(currency),
            currency: currency.code(),
            payer: &entry.payer_name,
            group: &entry.group_name,
            split_type: expense.split_type().as_str(),
        })?;
    }

    csv.flush()?;
    Ok(entries.len())
}
