use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

use super::{decimal_column, optional_date_column};
use crate::calendar::DATE_FORMAT;
use crate::error::{AppError, AppResult};
use crate::models::goal::Goal;

fn row_to_goal(row: &Row) -> rusqlite::Result<Goal> {
    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        target_amount: decimal_column(row, 3)?,
        current_amount: decimal_column(row, 4)?,
        deadline: optional_date_column(row, 5)?,
    })
}

pub fn add_goal(
    conn: &Connection,
    user_id: i64,
    name: &str,
    target: &Decimal,
    deadline: Option<NaiveDate>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO goals (user_id, name, target_amount, current_amount, deadline) \
         VALUES (?1, ?2, ?3, '0', ?4)",
        params![
            user_id,
            name,
            target.to_string(),
            deadline.map(|d| d.format(DATE_FORMAT).to_string()),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_goal(conn: &Connection, user_id: i64, id: i64) -> AppResult<Goal> {
    conn.query_row(
        "SELECT id, user_id, name, target_amount, current_amount, deadline FROM goals \
         WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
        row_to_goal,
    )
    .optional()?
    .ok_or_else(|| AppError::not_found("Goal", id))
}

pub fn get_user_goals(conn: &Connection, user_id: i64) -> AppResult<Vec<Goal>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, target_amount, current_amount, deadline FROM goals \
         WHERE user_id = ?1 ORDER BY id ASC",
    )?;
    let goals = stmt.query_map([user_id], row_to_goal)?;
    Ok(goals.collect::<Result<Vec<_>, _>>()?)
}

pub fn set_current_amount(conn: &Connection, id: i64, amount: &Decimal) -> AppResult<()> {
    conn.execute(
        "UPDATE goals SET current_amount = ?1 WHERE id = ?2",
        params![amount.to_string(), id],
    )?;
    Ok(())
}
