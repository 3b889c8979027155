use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use super::{decimal_column, same_category};
use crate::error::{AppError, AppResult};
use crate::models::budget::Budget;

fn row_to_budget(row: &Row) -> rusqlite::Result<Budget> {
    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        monthly_limit: decimal_column(row, 3)?,
    })
}

/// Creates the user's budget for `category` or replaces its limit.
pub fn set_budget(conn: &Connection, user_id: i64, category: &str, limit: &Decimal) -> AppResult<i64> {
    let id = conn.query_row(
        "INSERT INTO budgets (user_id, category, monthly_limit) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id, category) DO UPDATE SET monthly_limit = excluded.monthly_limit
         RETURNING id",
        params![user_id, category, limit.to_string()],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn get_budget(conn: &Connection, id: i64) -> AppResult<Option<Budget>> {
    let budget = conn
        .query_row(
            "SELECT id, user_id, category, monthly_limit FROM budgets WHERE id = ?1",
            [id],
            row_to_budget,
        )
        .optional()?;
    Ok(budget)
}

/// Case-insensitive lookup, folding non-ASCII letters too.
pub fn get_budget_by_category(conn: &Connection, user_id: i64, category: &str) -> AppResult<Option<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, monthly_limit FROM budgets WHERE user_id = ?1 ORDER BY id ASC",
    )?;
    for budget in stmt.query_map([user_id], row_to_budget)? {
        let budget = budget?;
        if same_category(&budget.category, category) {
            return Ok(Some(budget));
        }
    }
    Ok(None)
}

pub fn get_user_budgets(conn: &Connection, user_id: i64) -> AppResult<Vec<Budget>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, category, monthly_limit FROM budgets WHERE user_id = ?1 \
         ORDER BY category ASC",
    )?;
    let budgets = stmt.query_map([user_id], row_to_budget)?;
    Ok(budgets.collect::<Result<Vec<_>, _>>()?)
}

/// Budget ids of every user, for the alert evaluator. Each budget is loaded
/// again individually so a bad row only affects itself.
pub fn get_all_budget_ids(conn: &Connection) -> AppResult<Vec<i64>> {
    let mut stmt = conn.prepare("SELECT id FROM budgets ORDER BY id ASC")?;
    let ids = stmt.query_map([], |row| row.get(0))?;
    Ok(ids.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_budget(conn: &Connection, budget: &Budget) -> AppResult<()> {
    let rows = conn.execute(
        "UPDATE budgets SET category = ?1, monthly_limit = ?2 WHERE id = ?3 AND user_id = ?4",
        params![&budget.category, budget.monthly_limit.to_string(), budget.id, budget.user_id],
    )?;
    if rows == 0 {
        return Err(AppError::not_found("Budget", budget.id));
    }
    Ok(())
}

pub fn delete_budget(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    let rows = conn.execute(
        "DELETE FROM budgets WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;

    if rows == 0 {
        return Err(AppError::not_found("Budget", id));
    }
    Ok(())
}
