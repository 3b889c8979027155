use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::db::lock_repository;
use crate::error::{AppError, AppResult};

/// Advisory lock on one job, released when dropped.
pub struct JobLock<'c> {
    conn: &'c Connection,
    job: &'static str,
    holder: String,
}

impl<'c> JobLock<'c> {
    /// Fails with [`AppError::JobLocked`] while another run holds a lock
    /// younger than `ttl`.
    pub fn acquire(
        conn: &'c Connection,
        job: &'static str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> AppResult<Self> {
        let holder = Uuid::new_v4().to_string();
        let now = now.naive_utc();
        if !lock_repository::try_acquire(conn, job, &holder, now, now - ttl)? {
            return Err(AppError::JobLocked(job));
        }
        debug!(job, holder = %holder, "acquired job lock");
        Ok(Self { conn, job, holder })
    }

    #[cfg(test)]
    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl Drop for JobLock<'_> {
    fn drop(&mut self) {
        match lock_repository::release(self.conn, self.job, &self.holder) {
            Ok(true) => debug!(job = self.job, "released job lock"),
            Ok(false) => warn!(job = self.job, "job lock was taken over before release"),
            Err(err) => warn!(job = self.job, error = %err, "failed to release job lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_overlapping_acquire_is_refused() {
        let conn = establish_test_connection().unwrap();
        let _first = JobLock::acquire(&conn, "materialize_recurring", now(), Duration::minutes(60)).unwrap();

        let second = JobLock::acquire(&conn, "materialize_recurring", now(), Duration::minutes(60));
        assert!(matches!(second, Err(AppError::JobLocked("materialize_recurring"))));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let conn = establish_test_connection().unwrap();
        {
            let lock = JobLock::acquire(&conn, "evaluate_budgets", now(), Duration::minutes(60)).unwrap();
            assert_eq!(
                lock_repository::current_holder(&conn, "evaluate_budgets").unwrap().as_deref(),
                Some(lock.holder())
            );
        }
        assert!(lock_repository::current_holder(&conn, "evaluate_budgets").unwrap().is_none());
        assert!(JobLock::acquire(&conn, "evaluate_budgets", now(), Duration::minutes(60)).is_ok());
    }
}
