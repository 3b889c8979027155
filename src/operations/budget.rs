use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::expense::clean_category;
use super::parse_amount;
use crate::calendar;
use crate::db::{budget_repository, expense_repository};
use crate::error::{AppError, AppResult};
use crate::models::budget::{Budget, BudgetUpdate};

/// A budget next to what has been spent against it this month.
#[derive(Debug, Clone)]
pub struct BudgetStatus {
    pub budget: Budget,
    pub spent: Decimal,
}

impl BudgetStatus {
    pub fn remaining(&self) -> Decimal {
        self.budget.monthly_limit - self.spent
    }

    pub fn is_exceeded(&self) -> bool {
        self.spent > self.budget.monthly_limit
    }
}

fn check_limit(limit: Decimal) -> AppResult<()> {
    if limit < Decimal::ZERO {
        return Err(AppError::validation("Budget cannot be negative"));
    }
    Ok(())
}

pub fn set_budget_db(conn: &Connection, user_id: i64, category: &str, amount_str: &str) -> AppResult<i64> {
    let limit = parse_amount(amount_str, "budget amount")?;
    let category = clean_category(category)?;
    check_limit(limit)?;
    budget_repository::set_budget(conn, user_id, &category, &limit)
}

pub fn update_budget_db(
    conn: &Connection,
    user_id: i64,
    id: i64,
    mut update: BudgetUpdate,
) -> AppResult<Budget> {
    if update.is_empty() {
        return Err(AppError::validation("Nothing to update"));
    }
    if let Some(limit) = update.monthly_limit {
        check_limit(limit)?;
    }

    let mut budget = budget_repository::get_budget(conn, id)?
        .filter(|b| b.user_id == user_id)
        .ok_or_else(|| AppError::not_found("Budget", id))?;

    if let Some(category) = update.category.take() {
        let category = clean_category(&category)?;
        if let Some(existing) = budget_repository::get_budget_by_category(conn, user_id, &category)? {
            if existing.id != id {
                return Err(AppError::validation(format!(
                    "A budget for {} already exists",
                    existing.category
                )));
            }
        }
        update.category = Some(category);
    }

    update.apply(&mut budget);
    budget_repository::update_budget(conn, &budget)?;
    Ok(budget)
}

pub fn list_budgets_db(conn: &Connection, user_id: i64) -> AppResult<Vec<Budget>> {
    budget_repository::get_user_budgets(conn, user_id)
}

pub fn delete_budget_db(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    budget_repository::delete_budget(conn, user_id, id)
}

/// Spend against each of the user's budgets in the month containing `now`.
pub fn budget_status_db(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> AppResult<Vec<BudgetStatus>> {
    let (start, end) = calendar::month_window(now);
    budget_repository::get_user_budgets(conn, user_id)?
        .into_iter()
        .map(|budget| {
            let spent =
                expense_repository::sum_category_in_range(conn, user_id, &budget.category, start, end)?;
            Ok(BudgetStatus { budget, spent })
        })
        .collect()
}
