use chrono::{Datelike, NaiveDateTime};
use rusqlite::Connection;

use crate::db::{self, expense_repository, recurring_repository};
use crate::error::{AppError, AppResult};
use crate::models::recurring::{Frequency, RecurringSchedule};

/// Puts an existing expense on a schedule. Without `first_due` the first
/// firing is one period after the expense's own date.
pub fn add_schedule_db(
    conn: &Connection,
    user_id: i64,
    expense_id: i64,
    frequency: Frequency,
    first_due: Option<NaiveDateTime>,
) -> AppResult<RecurringSchedule> {
    let tx = db::write_transaction(conn)?;
    let expense = expense_repository::get_user_expense(&tx, user_id, expense_id)?;
    if recurring_repository::get_schedule_for_expense(&tx, expense_id)?.is_some() {
        return Err(AppError::validation(format!(
            "Expense {} already has a recurring schedule",
            expense_id
        )));
    }

    let anchor_day = match frequency {
        Frequency::Monthly => Some(first_due.unwrap_or(expense.occurred_at).day()),
        Frequency::Daily | Frequency::Weekly => None,
    };
    let next_due = match first_due {
        Some(due) => due,
        None => frequency
            .advance(expense.occurred_at, anchor_day)
            .ok_or_else(|| AppError::validation("Could not compute the first due date"))?,
    };

    let id = recurring_repository::add_schedule(&tx, expense_id, frequency, next_due, anchor_day)?;
    expense_repository::set_recurring_flag(&tx, expense_id, true)?;
    tx.commit()?;

    Ok(RecurringSchedule {
        id,
        expense_id,
        frequency,
        next_due,
        anchor_day,
    })
}

pub fn list_schedules_db(conn: &Connection, user_id: i64) -> AppResult<Vec<RecurringSchedule>> {
    recurring_repository::get_user_schedules(conn, user_id)?
        .into_iter()
        .map(|record| {
            let id = record.id;
            RecurringSchedule::try_from(record)
                .map_err(|reason| AppError::MalformedSchedule { id, reason })
        })
        .collect()
}
