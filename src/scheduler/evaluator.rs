//! Raises at most one alert per budget per calendar month once spend exceeds
//! the budget's monthly limit.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::calendar;
use crate::db::{self, alert_repository, budget_repository, expense_repository};
use crate::error::AppResult;
use crate::models::budget::Budget;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AlertReport {
    pub evaluated: usize,
    pub breached: usize,
    pub alerts_raised: usize,
    pub failed: usize,
}

impl fmt::Display for AlertReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} evaluated, {} over limit, {} alerts raised, {} failed",
            self.evaluated, self.breached, self.alerts_raised, self.failed
        )
    }
}

enum Evaluation {
    WithinLimit,
    AlreadyAlerted,
    Alerted { spent: Decimal },
    /// Deleted between listing and evaluation.
    Gone,
}

pub fn alert_message(budget: &Budget, spent: Decimal) -> String {
    format!(
        "Budget for {} exceeded! Limit: {}, Spent: {}",
        budget.category, budget.monthly_limit, spent
    )
}

/// Evaluates every budget against the spend of the month containing `now`.
pub fn check_budget_alerts(conn: &Connection, now: DateTime<Utc>) -> AppResult<AlertReport> {
    let (start, end) = calendar::month_window(now);
    let now = now.naive_utc();
    let mut report = AlertReport::default();

    for budget_id in budget_repository::get_all_budget_ids(conn)? {
        match evaluate_budget(conn, budget_id, start, end, now) {
            Ok(Evaluation::WithinLimit) => report.evaluated += 1,
            Ok(Evaluation::AlreadyAlerted) => {
                report.evaluated += 1;
                report.breached += 1;
                debug!(budget_id, "budget already alerted this month");
            }
            Ok(Evaluation::Alerted { spent }) => {
                report.evaluated += 1;
                report.breached += 1;
                report.alerts_raised += 1;
                debug!(budget_id, spent = %spent, "budget alert raised");
            }
            Ok(Evaluation::Gone) => debug!(budget_id, "budget removed during evaluation"),
            Err(err) => {
                report.failed += 1;
                warn!(budget_id, error = %err, "failed to evaluate budget");
            }
        }
    }

    info!(%report, month = %start.format("%Y-%m"), "budgets evaluated");
    Ok(report)
}

fn evaluate_budget(
    conn: &Connection,
    budget_id: i64,
    start: NaiveDateTime,
    end: NaiveDateTime,
    now: NaiveDateTime,
) -> AppResult<Evaluation> {
    let tx = db::write_transaction(conn)?;
    let Some(budget) = budget_repository::get_budget(&tx, budget_id)? else {
        return Ok(Evaluation::Gone);
    };

    let spent =
        expense_repository::sum_category_in_range(&tx, budget.user_id, &budget.category, start, end)?;
    if spent <= budget.monthly_limit {
        return Ok(Evaluation::WithinLimit);
    }
    if alert_repository::alert_exists_between(&tx, budget.id, start, end)? {
        return Ok(Evaluation::AlreadyAlerted);
    }

    let message = alert_message(&budget, spent);
    alert_repository::add_alert(&tx, budget.user_id, budget.id, &message, now)?;
    tx.commit()?;
    Ok(Evaluation::Alerted { spent })
}
