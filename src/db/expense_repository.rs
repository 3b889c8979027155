use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use super::{decimal_column, optional_timestamp_column, same_category, tags_column, timestamp_column};
use crate::calendar::format_timestamp;
use crate::error::{AppError, AppResult};
use crate::models::expense::{Expense, NewExpense};

const EXPENSE_COLUMNS: &str = "id, user_id, amount, category, date, note, person, wallet_id, \
     is_recurring, tags, recurring_source_id, recurring_due";

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: decimal_column(row, 2)?,
        category: row.get(3)?,
        occurred_at: timestamp_column(row, 4)?,
        note: row.get(5)?,
        person: row.get(6)?,
        wallet_id: row.get(7)?,
        is_recurring: row.get(8)?,
        tags: tags_column(row, 9)?,
        recurring_source_id: row.get(10)?,
        recurring_due: optional_timestamp_column(row, 11)?,
    })
}

fn insert(conn: &Connection, verb: &str, expense: &NewExpense) -> AppResult<usize> {
    let tags = serde_json::to_string(&expense.tags)?;
    let sql = format!(
        "{} INTO expenses (user_id, amount, category, date, note, person, wallet_id, is_recurring, \
         tags, recurring_source_id, recurring_due) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        verb
    );
    let rows = conn.execute(
        &sql,
        params![
            expense.user_id,
            expense.amount.to_string(),
            &expense.category,
            format_timestamp(expense.occurred_at),
            &expense.note,
            &expense.person,
            expense.wallet_id,
            expense.is_recurring,
            tags,
            expense.recurring_source_id,
            expense.recurring_due.map(format_timestamp),
        ],
    )?;
    Ok(rows)
}

pub fn add_expense(conn: &Connection, expense: &NewExpense) -> AppResult<i64> {
    insert(conn, "INSERT", expense)?;
    Ok(conn.last_insert_rowid())
}

/// Inserts a materialized copy. Returns `false` when a copy for the same
/// schedule and due instant already exists.
pub fn add_materialized_expense(conn: &Connection, expense: &NewExpense) -> AppResult<bool> {
    Ok(insert(conn, "INSERT OR IGNORE", expense)? == 1)
}

pub fn get_expense(conn: &Connection, id: i64) -> AppResult<Option<Expense>> {
    let sql = format!("SELECT {} FROM expenses WHERE id = ?1", EXPENSE_COLUMNS);
    let expense = conn.query_row(&sql, [id], row_to_expense).optional()?;
    Ok(expense)
}

pub fn get_user_expense(conn: &Connection, user_id: i64, id: i64) -> AppResult<Expense> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE id = ?1 AND user_id = ?2",
        EXPENSE_COLUMNS
    );
    conn.query_row(&sql, params![id, user_id], row_to_expense)
        .optional()?
        .ok_or_else(|| AppError::not_found("Expense", id))
}

pub fn list_expenses(
    conn: &Connection,
    user_id: i64,
    skip: usize,
    limit: usize,
) -> AppResult<Vec<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE user_id = ?1 ORDER BY date DESC, id DESC LIMIT ?2 OFFSET ?3",
        EXPENSE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user_id, limit as i64, skip as i64], row_to_expense)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Expenses of `user_id` with `start <= date < end`, oldest first.
pub fn get_expenses_in_range(
    conn: &Connection,
    user_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> AppResult<Vec<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE user_id = ?1 AND date >= ?2 AND date < ?3 ORDER BY date ASC",
        EXPENSE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![user_id, format_timestamp(start), format_timestamp(end)],
        row_to_expense,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_all_user_expenses(conn: &Connection, user_id: i64) -> AppResult<Vec<Expense>> {
    let sql = format!(
        "SELECT {} FROM expenses WHERE user_id = ?1 ORDER BY date ASC",
        EXPENSE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([user_id], row_to_expense)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Sum of the user's expenses in `category` (case-insensitive) with
/// `start <= date < end`. Amounts are added as decimals, not floats.
pub fn sum_category_in_range(
    conn: &Connection,
    user_id: i64,
    category: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> AppResult<Decimal> {
    let mut stmt = conn.prepare(
        "SELECT category, amount FROM expenses \
         WHERE user_id = ?1 AND date >= ?2 AND date < ?3",
    )?;
    let rows = stmt.query_map(
        params![user_id, format_timestamp(start), format_timestamp(end)],
        |row| Ok((row.get::<_, String>(0)?, decimal_column(row, 1)?)),
    )?;

    let mut total = Decimal::ZERO;
    for row in rows {
        let (row_category, amount) = row?;
        if same_category(&row_category, category) {
            total += amount;
        }
    }
    Ok(total)
}

pub fn update_expense(conn: &Connection, expense: &Expense) -> AppResult<()> {
    let tags = serde_json::to_string(&expense.tags)?;
    let rows = conn.execute(
        "UPDATE expenses SET amount = ?1, category = ?2, date = ?3, note = ?4, person = ?5, \
         wallet_id = ?6, is_recurring = ?7, tags = ?8 WHERE id = ?9 AND user_id = ?10",
        params![
            expense.amount.to_string(),
            &expense.category,
            format_timestamp(expense.occurred_at),
            &expense.note,
            &expense.person,
            expense.wallet_id,
            expense.is_recurring,
            tags,
            expense.id,
            expense.user_id,
        ],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("Expense", expense.id));
    }
    Ok(())
}

pub fn set_recurring_flag(conn: &Connection, id: i64, is_recurring: bool) -> AppResult<()> {
    conn.execute(
        "UPDATE expenses SET is_recurring = ?1 WHERE id = ?2",
        params![is_recurring, id],
    )?;
    Ok(())
}

pub fn remove_expense(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    let rows = conn.execute(
        "DELETE FROM expenses WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("Expense", id));
    }
    Ok(())
}

#[cfg(test)]
pub fn count_expenses(conn: &Connection) -> AppResult<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?)
}
