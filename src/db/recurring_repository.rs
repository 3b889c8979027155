use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::calendar::format_timestamp;
use crate::error::AppResult;
use crate::models::recurring::{Frequency, ScheduleRecord};

fn row_to_record(row: &Row) -> rusqlite::Result<ScheduleRecord> {
    Ok(ScheduleRecord {
        id: row.get(0)?,
        expense_id: row.get(1)?,
        frequency: row.get(2)?,
        next_due: row.get(3)?,
        anchor_day: row.get(4)?,
    })
}

pub fn add_schedule(
    conn: &Connection,
    expense_id: i64,
    frequency: Frequency,
    next_due: NaiveDateTime,
    anchor_day: Option<u32>,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO recurring_expenses (expense_id, frequency, next_due, anchor_day) \
         VALUES (?1, ?2, ?3, ?4)",
        params![expense_id, frequency.as_str(), format_timestamp(next_due), anchor_day],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Raw rows due at or before `now`, oldest first. Rows are validated by the
/// caller so one malformed schedule cannot hide the others.
pub fn get_due_schedules(conn: &Connection, now: NaiveDateTime) -> AppResult<Vec<ScheduleRecord>> {
    let mut stmt = conn.prepare(
        "SELECT id, expense_id, frequency, next_due, anchor_day FROM recurring_expenses \
         WHERE next_due <= ?1 ORDER BY next_due ASC, id ASC",
    )?;
    let rows = stmt.query_map([format_timestamp(now)], row_to_record)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn get_schedule_for_expense(conn: &Connection, expense_id: i64) -> AppResult<Option<ScheduleRecord>> {
    let record = conn
        .query_row(
            "SELECT id, expense_id, frequency, next_due, anchor_day FROM recurring_expenses \
             WHERE expense_id = ?1",
            [expense_id],
            row_to_record,
        )
        .optional()?;
    Ok(record)
}

pub fn get_user_schedules(conn: &Connection, user_id: i64) -> AppResult<Vec<ScheduleRecord>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.expense_id, r.frequency, r.next_due, r.anchor_day \
         FROM recurring_expenses r JOIN expenses e ON e.id = r.expense_id \
         WHERE e.user_id = ?1 ORDER BY r.next_due ASC",
    )?;
    let rows = stmt.query_map([user_id], row_to_record)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Moves `next_due` from `expected` to `next`. Returns `false` if the row no
/// longer holds `expected`, i.e. another run already advanced it.
pub fn advance_schedule(
    conn: &Connection,
    id: i64,
    expected: NaiveDateTime,
    next: NaiveDateTime,
) -> AppResult<bool> {
    let rows = conn.execute(
        "UPDATE recurring_expenses SET next_due = ?1 WHERE id = ?2 AND next_due = ?3",
        params![format_timestamp(next), id, format_timestamp(expected)],
    )?;
    Ok(rows == 1)
}

pub fn delete_schedule_for_expense(conn: &Connection, expense_id: i64) -> AppResult<usize> {
    Ok(conn.execute(
        "DELETE FROM recurring_expenses WHERE expense_id = ?1",
        [expense_id],
    )?)
}
