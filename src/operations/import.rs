use std::fs::File;
use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use super::expense::{add_expense_db, check_positive};
use super::parse_amount;
use crate::calendar::parse_date_or_timestamp;
use crate::db;
use crate::error::{AppError, AppResult};
use crate::models::expense::NewExpense;

/// Imports `date,amount,category[,note]` rows for `user_id`. Every row is
/// parsed before anything is written and all rows go in one transaction, so
/// a bad line leaves the store untouched.
pub fn import_expenses_csv(conn: &Connection, user_id: i64, path: &Path) -> AppResult<usize> {
    let expenses = read_csv(user_id, path)?;
    let count = expenses.len();

    let tx = db::write_transaction(conn)?;
    for (index, expense) in expenses.into_iter().enumerate() {
        add_expense_db(&tx, expense).map_err(|e| at_line(index + 1, e))?;
    }
    tx.commit()?;

    info!(user_id, count, path = %path.display(), "expenses imported");
    Ok(count)
}

fn at_line(line: usize, err: AppError) -> AppError {
    AppError::validation(format!("Line {}: {}", line, err))
}

fn read_csv(user_id: i64, path: &Path) -> AppResult<Vec<NewExpense>> {
    let file = File::open(path).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut expenses = Vec::new();
    for (line_index, result) in reader.records().enumerate() {
        let line = line_index + 1;
        let record = result
            .map_err(|e| AppError::validation(format!("CSV parse error on line {}: {}", line, e)))?;

        if record.len() != 3 && record.len() != 4 {
            return Err(AppError::validation(format!(
                "Invalid number of columns on line {}: expected 3 or 4, got {}",
                line,
                record.len()
            )));
        }

        let date = record.get(0).unwrap_or("");
        let amount = record.get(1).unwrap_or("");
        let category = record.get(2).unwrap_or("");
        let note = record.get(3).filter(|n| !n.is_empty());

        let occurred_at = parse_date_or_timestamp(date).map_err(|e| at_line(line, AppError::Validation(e)))?;
        let amount = parse_amount(amount, "amount").map_err(|e| at_line(line, e))?;
        check_positive(amount, "Amount").map_err(|e| at_line(line, e))?;

        let mut expense = NewExpense::new(user_id, amount, category.to_string(), occurred_at);
        expense.note = note.map(str::to_string);
        expenses.push(expense);
    }

    Ok(expenses)
}
