use chrono::NaiveDateTime;
use rusqlite::{Connection, params};

use crate::calendar::format_timestamp;
use crate::error::AppResult;

/// Claims the lock row for `job`. An existing claim older than `stale_before`
/// is taken over; a fresher one makes this return `false`.
pub fn try_acquire(
    conn: &Connection,
    job: &str,
    holder: &str,
    now: NaiveDateTime,
    stale_before: NaiveDateTime,
) -> AppResult<bool> {
    let rows = conn.execute(
        "INSERT INTO job_locks (job, holder, acquired_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(job) DO UPDATE SET holder = excluded.holder, acquired_at = excluded.acquired_at
         WHERE job_locks.acquired_at < ?4",
        params![job, holder, format_timestamp(now), format_timestamp(stale_before)],
    )?;
    Ok(rows == 1)
}

pub fn release(conn: &Connection, job: &str, holder: &str) -> AppResult<bool> {
    let rows = conn.execute(
        "DELETE FROM job_locks WHERE job = ?1 AND holder = ?2",
        params![job, holder],
    )?;
    Ok(rows == 1)
}

#[cfg(test)]
pub fn current_holder(conn: &Connection, job: &str) -> AppResult<Option<String>> {
    use rusqlite::OptionalExtension;

    let holder = conn
        .query_row("SELECT holder FROM job_locks WHERE job = ?1", [job], |row| row.get(0))
        .optional()?;
    Ok(holder)
}
