//! Turns due recurring schedules into concrete expenses.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::{self, expense_repository, recurring_repository};
use crate::error::{AppError, AppResult};
use crate::models::expense::NewExpense;
use crate::models::recurring::{RecurringSchedule, ScheduleRecord};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MaterializeReport {
    pub due: usize,
    pub fired: usize,
    /// Malformed schedules, or schedules another run advanced first.
    pub skipped: usize,
    pub failed: usize,
}

impl fmt::Display for MaterializeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} due, {} fired, {} skipped, {} failed",
            self.due, self.fired, self.skipped, self.failed
        )
    }
}

enum Firing {
    Fired { next_due: NaiveDateTime, inserted: bool },
    AlreadyAdvanced,
}

/// Fires every schedule due at or before `now` once, each in its own
/// transaction. A failing schedule is logged and does not stop the others.
pub fn process_due_schedules(conn: &Connection, now: DateTime<Utc>) -> AppResult<MaterializeReport> {
    let now = now.naive_utc();
    let records = recurring_repository::get_due_schedules(conn, now)?;
    let mut report = MaterializeReport {
        due: records.len(),
        ..Default::default()
    };

    for record in records {
        let schedule_id = record.id;
        match fire_schedule(conn, record, now) {
            Ok(Firing::Fired { next_due, inserted }) => {
                report.fired += 1;
                if !inserted {
                    debug!(schedule_id, "expense for this due date already existed");
                }
                debug!(schedule_id, next_due = %next_due, "recurring expense materialized");
            }
            Ok(Firing::AlreadyAdvanced) => {
                report.skipped += 1;
                debug!(schedule_id, "schedule advanced by another run");
            }
            Err(err @ AppError::MalformedSchedule { .. }) => {
                report.skipped += 1;
                warn!(schedule_id, error = %err, "skipping recurring expense");
            }
            Err(err) => {
                report.failed += 1;
                warn!(schedule_id, error = %err, "failed to materialize recurring expense");
            }
        }
    }

    if report.due > 0 {
        info!(%report, "recurring expenses processed");
    }
    Ok(report)
}

fn fire_schedule(conn: &Connection, record: ScheduleRecord, now: NaiveDateTime) -> AppResult<Firing> {
    let id = record.id;
    let schedule = RecurringSchedule::try_from(record)
        .map_err(|reason| AppError::MalformedSchedule { id, reason })?;
    let next_due = schedule.following_due().ok_or_else(|| AppError::MalformedSchedule {
        id,
        reason: format!(
            "cannot advance {} schedule past {}",
            schedule.frequency, schedule.next_due
        ),
    })?;

    let tx = db::write_transaction(conn)?;
    let template = expense_repository::get_expense(&tx, schedule.expense_id)?.ok_or_else(|| {
        AppError::MalformedSchedule {
            id,
            reason: format!("originating expense {} no longer exists", schedule.expense_id),
        }
    })?;

    let copy = NewExpense::materialized_from(&template, schedule.id, schedule.next_due, now);
    let inserted = expense_repository::add_materialized_expense(&tx, &copy)?;
    if !recurring_repository::advance_schedule(&tx, schedule.id, schedule.next_due, next_due)? {
        return Ok(Firing::AlreadyAdvanced);
    }
    tx.commit()?;

    Ok(Firing::Fired { next_due, inserted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::db::user_repository;
    use crate::models::recurring::Frequency;
    use chrono::{NaiveDate, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn setup() -> (Connection, i64) {
        let conn = establish_test_connection().unwrap();
        let user_id = user_repository::add_user(&conn, "Ana", "ana@example.com", at(2024, 1, 1)).unwrap();
        (conn, user_id)
    }

    fn seed_template(conn: &Connection, user_id: i64, occurred_at: NaiveDateTime) -> i64 {
        let mut template = NewExpense::new(
            user_id,
            Decimal::from_str("15.99").unwrap(),
            "Streaming".to_string(),
            occurred_at,
        );
        template.note = Some("Music subscription".to_string());
        template.person = Some("Ana".to_string());
        template.tags = vec!["subscription".to_string()];
        template.is_recurring = true;
        expense_repository::add_expense(conn, &template).unwrap()
    }

    fn next_due_of(conn: &Connection, expense_id: i64) -> String {
        recurring_repository::get_schedule_for_expense(conn, expense_id)
            .unwrap()
            .unwrap()
            .next_due
    }

    #[test]
    fn test_nothing_due_changes_nothing() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Daily, at(2024, 1, 10), None).unwrap();

        let report = process_due_schedules(&conn, utc(2024, 1, 5)).unwrap();

        assert_eq!(report, MaterializeReport::default());
        assert_eq!(expense_repository::count_expenses(&conn).unwrap(), 1);
        assert_eq!(next_due_of(&conn, expense_id), "2024-01-10 00:00:00");
    }

    #[test]
    fn test_daily_schedule_fires_and_advances_one_day() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Daily, at(2024, 1, 2), None).unwrap();

        let report = process_due_schedules(&conn, utc(2024, 1, 2)).unwrap();

        assert_eq!(report.fired, 1);
        assert_eq!(next_due_of(&conn, expense_id), "2024-01-03 00:00:00");
    }

    #[test]
    fn test_weekly_schedule_advances_seven_days() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Weekly, at(2024, 1, 8), None).unwrap();

        process_due_schedules(&conn, utc(2024, 1, 9)).unwrap();

        assert_eq!(next_due_of(&conn, expense_id), "2024-01-15 00:00:00");
    }

    #[test]
    fn test_materialized_copy_snapshots_template() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Daily, at(2024, 1, 2), None).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 3).unwrap();

        process_due_schedules(&conn, now).unwrap();

        let expenses = expense_repository::get_all_user_expenses(&conn, user_id).unwrap();
        assert_eq!(expenses.len(), 2);
        let copy = expenses.iter().find(|e| e.id != expense_id).unwrap();
        assert_eq!(copy.amount, Decimal::from_str("15.99").unwrap());
        assert_eq!(copy.category, "Streaming");
        assert_eq!(copy.note.as_deref(), Some("Music subscription"));
        assert_eq!(copy.person.as_deref(), Some("Ana"));
        assert_eq!(copy.tags, vec!["subscription"]);
        assert_eq!(copy.occurred_at, now.naive_utc());
        assert!(!copy.is_recurring);
        assert_eq!(copy.recurring_due, Some(at(2024, 1, 2)));
    }

    #[test]
    fn test_monthly_end_of_month_clamps_then_recovers() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2023, 12, 31));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Monthly, at(2024, 1, 31), Some(31)).unwrap();

        process_due_schedules(&conn, utc(2024, 1, 31)).unwrap();
        assert_eq!(next_due_of(&conn, expense_id), "2024-02-29 00:00:00");

        process_due_schedules(&conn, utc(2024, 2, 29)).unwrap();
        assert_eq!(next_due_of(&conn, expense_id), "2024-03-31 00:00:00");
    }

    #[test]
    fn test_overdue_schedule_fires_once_per_run() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Daily, at(2024, 1, 2), None).unwrap();

        let report = process_due_schedules(&conn, utc(2024, 1, 10)).unwrap();

        assert_eq!(report.fired, 1);
        assert_eq!(expense_repository::count_expenses(&conn).unwrap(), 2);
        assert_eq!(next_due_of(&conn, expense_id), "2024-01-03 00:00:00");
    }

    #[test]
    fn test_bad_schedule_does_not_stop_batch() {
        let (conn, user_id) = setup();
        let good = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, good, Frequency::Daily, at(2024, 1, 2), None).unwrap();
        conn.execute(
            "INSERT INTO recurring_expenses (expense_id, frequency, next_due) VALUES (?1, 'fortnightly', '2024-01-01 00:00:00')",
            [good + 100],
        )
        .unwrap();
        recurring_repository::add_schedule(&conn, good + 200, Frequency::Daily, at(2024, 1, 1), None).unwrap();

        let report = process_due_schedules(&conn, utc(2024, 1, 2)).unwrap();

        assert_eq!(report.due, 3);
        assert_eq!(report.fired, 1);
        assert_eq!(report.skipped, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(next_due_of(&conn, good), "2024-01-03 00:00:00");
        assert_eq!(next_due_of(&conn, good + 200), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_unreadable_template_fails_alone() {
        let (conn, user_id) = setup();
        let broken = seed_template(&conn, user_id, at(2024, 1, 1));
        conn.execute("UPDATE expenses SET amount = 'garbage' WHERE id = ?1", [broken])
            .unwrap();
        recurring_repository::add_schedule(&conn, broken, Frequency::Daily, at(2024, 1, 1), None).unwrap();
        let good = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, good, Frequency::Monthly, at(2024, 1, 1), Some(1)).unwrap();

        let report = process_due_schedules(&conn, utc(2024, 1, 2)).unwrap();

        assert_eq!(report.due, 2);
        assert_eq!(report.fired, 1);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failed, 1);
        assert_eq!(next_due_of(&conn, good), "2024-02-01 00:00:00");
        assert_eq!(next_due_of(&conn, broken), "2024-01-01 00:00:00");
    }

    #[test]
    fn test_second_run_same_instant_does_not_double_fire() {
        let (conn, user_id) = setup();
        let expense_id = seed_template(&conn, user_id, at(2024, 1, 1));
        recurring_repository::add_schedule(&conn, expense_id, Frequency::Weekly, at(2024, 1, 2), None).unwrap();

        process_due_schedules(&conn, utc(2024, 1, 2)).unwrap();
        let second = process_due_schedules(&conn, utc(2024, 1, 2)).unwrap();

        assert_eq!(second.due, 0);
        assert_eq!(expense_repository::count_expenses(&conn).unwrap(), 2);
    }
}
