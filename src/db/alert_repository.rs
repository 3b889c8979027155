use chrono::NaiveDateTime;
use rusqlite::{Connection, params};

use super::timestamp_column;
use crate::calendar::format_timestamp;
use crate::error::AppResult;
use crate::models::alert::BudgetAlert;

pub fn add_alert(
    conn: &Connection,
    user_id: i64,
    budget_id: i64,
    message: &str,
    triggered_on: NaiveDateTime,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO alerts (user_id, budget_id, triggered_on, message) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, budget_id, format_timestamp(triggered_on), message],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Whether `budget_id` already has an alert with `start <= triggered_on < end`.
pub fn alert_exists_between(
    conn: &Connection,
    budget_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> AppResult<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM alerts WHERE budget_id = ?1 AND triggered_on >= ?2 AND triggered_on < ?3)",
        params![budget_id, format_timestamp(start), format_timestamp(end)],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub fn get_user_alerts(conn: &Connection, user_id: i64) -> AppResult<Vec<BudgetAlert>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, budget_id, triggered_on, message FROM alerts WHERE user_id = ?1 \
         ORDER BY triggered_on DESC, id DESC",
    )?;

    let iter = stmt.query_map([user_id], |row| {
        Ok(BudgetAlert {
            id: row.get(0)?,
            user_id: row.get(1)?,
            budget_id: row.get(2)?,
            triggered_on: timestamp_column(row, 3)?,
            message: row.get(4)?,
        })
    })?;

    Ok(iter.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
pub fn count_alerts_for_budget(conn: &Connection, budget_id: i64) -> AppResult<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM alerts WHERE budget_id = ?1",
        [budget_id],
        |row| row.get(0),
    )?)
}
