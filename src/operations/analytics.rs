use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::calendar;
use crate::db::expense_repository;
use crate::error::AppResult;
use crate::models::expense::Expense;

/// Label for expenses without a person, i.e. the user's own spending.
pub const SELF_PERSON: &str = "You";
pub const NO_CATEGORY: &str = "N/A";

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySummary {
    pub total: Decimal,
    pub top_category: String,
    pub top_person: String,
    /// Spend in the seven days up to and including now.
    pub weekly_total: Decimal,
}

fn sum(expenses: &[Expense]) -> Decimal {
    expenses.iter().map(|e| e.amount).sum()
}

/// Groups amounts by `key` and returns the totals, largest first. Ties are
/// ordered by key so the output is stable.
fn totals_by<F>(expenses: &[Expense], key: F) -> Vec<(String, Decimal)>
where
    F: Fn(&Expense) -> String,
{
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for expense in expenses {
        *totals.entry(key(expense)).or_insert(Decimal::ZERO) += expense.amount;
    }
    let mut totals: Vec<(String, Decimal)> = totals.into_iter().collect();
    totals.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });
    totals
}

fn person_key(expense: &Expense) -> String {
    expense
        .person
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(SELF_PERSON)
        .to_string()
}

pub fn monthly_summary(conn: &Connection, user_id: i64, now: DateTime<Utc>) -> AppResult<MonthlySummary> {
    let (start, end) = calendar::month_window(now);
    let month = expense_repository::get_expenses_in_range(conn, user_id, start, end)?;

    let top_category = totals_by(&month, |e| e.category.clone())
        .into_iter()
        .next()
        .map(|(category, _)| category)
        .unwrap_or_else(|| NO_CATEGORY.to_string());
    let top_person = totals_by(
        &month.iter().filter(|e| e.person.is_some()).cloned().collect::<Vec<_>>(),
        person_key,
    )
    .into_iter()
    .next()
    .map(|(person, _)| person)
    .unwrap_or_else(|| SELF_PERSON.to_string());

    let now = now.naive_utc();
    let week_start = now - Duration::days(7);
    let week_end = now + Duration::seconds(1);
    let week = expense_repository::get_expenses_in_range(conn, user_id, week_start, week_end)?;

    Ok(MonthlySummary {
        total: sum(&month),
        top_category,
        top_person,
        weekly_total: sum(&week),
    })
}

pub fn totals_by_category(conn: &Connection, user_id: i64) -> AppResult<Vec<(String, Decimal)>> {
    let expenses = expense_repository::get_all_user_expenses(conn, user_id)?;
    Ok(totals_by(&expenses, |e| e.category.clone()))
}

/// Daily totals in date order.
pub fn totals_by_day(conn: &Connection, user_id: i64) -> AppResult<Vec<(NaiveDate, Decimal)>> {
    let expenses = expense_repository::get_all_user_expenses(conn, user_id)?;
    let mut days: Vec<(NaiveDate, Decimal)> = Vec::new();
    for expense in &expenses {
        let day = expense.occurred_at.date();
        match days.last_mut() {
            Some((last, total)) if *last == day => *total += expense.amount,
            _ => days.push((day, expense.amount)),
        }
    }
    Ok(days)
}

pub fn totals_by_person(conn: &Connection, user_id: i64) -> AppResult<Vec<(String, Decimal)>> {
    let expenses = expense_repository::get_all_user_expenses(conn, user_id)?;
    Ok(totals_by(&expenses, person_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::db::user_repository;
    use crate::models::expense::NewExpense;
    use chrono::{NaiveDateTime, TimeZone};
    use std::str::FromStr;

    fn at(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn setup() -> (Connection, i64) {
        let conn = establish_test_connection().unwrap();
        let user_id = user_repository::add_user(&conn, "Ana", "ana@example.com", at(1, 1)).unwrap();
        (conn, user_id)
    }

    fn spend(conn: &Connection, user_id: i64, amount: &str, category: &str, person: Option<&str>, when: NaiveDateTime) {
        let mut expense = NewExpense::new(user_id, Decimal::from_str(amount).unwrap(), category.to_string(), when);
        expense.person = person.map(str::to_string);
        expense_repository::add_expense(conn, &expense).unwrap();
    }

    #[test]
    fn test_monthly_summary() {
        let (conn, user_id) = setup();
        spend(&conn, user_id, "40", "Food", Some("Bo"), at(3, 2));
        spend(&conn, user_id, "25", "Food", None, at(3, 18));
        spend(&conn, user_id, "50", "Travel", Some("Cy"), at(3, 19));
        spend(&conn, user_id, "999", "Rent", Some("Cy"), at(2, 28));

        let now = Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();
        let summary = monthly_summary(&conn, user_id, now).unwrap();

        assert_eq!(summary.total, Decimal::from(115));
        assert_eq!(summary.top_category, "Food");
        assert_eq!(summary.top_person, "Cy");
        assert_eq!(summary.weekly_total, Decimal::from(75));
    }

    #[test]
    fn test_monthly_summary_empty_month() {
        let (conn, user_id) = setup();
        let now = Utc.with_ymd_and_hms(2024, 3, 20, 9, 0, 0).unwrap();

        let summary = monthly_summary(&conn, user_id, now).unwrap();

        assert_eq!(summary.total, Decimal::ZERO);
        assert_eq!(summary.top_category, NO_CATEGORY);
        assert_eq!(summary.top_person, SELF_PERSON);
        assert_eq!(summary.weekly_total, Decimal::ZERO);
    }

    #[test]
    fn test_totals_by_category_sorted_desc() {
        let (conn, user_id) = setup();
        spend(&conn, user_id, "10.10", "Food", None, at(3, 1));
        spend(&conn, user_id, "0.20", "Food", None, at(3, 2));
        spend(&conn, user_id, "30", "Rent", None, at(3, 3));

        let totals = totals_by_category(&conn, user_id).unwrap();

        assert_eq!(
            totals,
            vec![
                ("Rent".to_string(), Decimal::from(30)),
                ("Food".to_string(), Decimal::from_str("10.30").unwrap()),
            ]
        );
    }

    #[test]
    fn test_totals_by_day() {
        let (conn, user_id) = setup();
        spend(&conn, user_id, "1", "Food", None, at(3, 1));
        spend(&conn, user_id, "2", "Food", None, at(3, 1));
        spend(&conn, user_id, "4", "Food", None, at(3, 5));

        let days = totals_by_day(&conn, user_id).unwrap();

        assert_eq!(days.len(), 2);
        assert_eq!(days[0], (NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), Decimal::from(3)));
        assert_eq!(days[1].1, Decimal::from(4));
    }

    #[test]
    fn test_totals_by_person_groups_self() {
        let (conn, user_id) = setup();
        spend(&conn, user_id, "5", "Food", None, at(3, 1));
        spend(&conn, user_id, "7", "Food", Some("Bo"), at(3, 1));
        spend(&conn, user_id, "3", "Food", None, at(3, 2));

        let totals = totals_by_person(&conn, user_id).unwrap();

        assert_eq!(totals[0], (SELF_PERSON.to_string(), Decimal::from(8)));
        assert_eq!(totals[1], ("Bo".to_string(), Decimal::from(7)));
    }
}
