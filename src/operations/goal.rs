use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;

use super::expense::check_positive;
use crate::db::{self, goal_repository};
use crate::error::{AppError, AppResult};
use crate::models::goal::Goal;

pub fn add_goal_db(
    conn: &Connection,
    user_id: i64,
    name: &str,
    target: Decimal,
    deadline: Option<NaiveDate>,
) -> AppResult<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Goal name cannot be empty"));
    }
    check_positive(target, "Target amount")?;
    goal_repository::add_goal(conn, user_id, name, &target, deadline)
}

pub fn list_goals_db(conn: &Connection, user_id: i64) -> AppResult<Vec<Goal>> {
    goal_repository::get_user_goals(conn, user_id)
}

/// Adds `amount` to the goal's saved amount and returns the updated goal.
pub fn contribute_db(conn: &Connection, user_id: i64, goal_id: i64, amount: Decimal) -> AppResult<Goal> {
    check_positive(amount, "Contribution")?;

    let tx = db::write_transaction(conn)?;
    let mut goal = goal_repository::get_user_goal(&tx, user_id, goal_id)?;
    goal.current_amount += amount;
    goal_repository::set_current_amount(&tx, goal.id, &goal.current_amount)?;
    tx.commit()?;
    Ok(goal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::db::user_repository;

    fn setup() -> (Connection, i64) {
        let conn = establish_test_connection().unwrap();
        let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let user_id = user_repository::add_user(&conn, "Ana", "ana@example.com", created).unwrap();
        (conn, user_id)
    }

    #[test]
    fn test_contributions_accumulate() {
        let (conn, user_id) = setup();
        let deadline = NaiveDate::from_ymd_opt(2024, 12, 31);
        let id = add_goal_db(&conn, user_id, "Bike", Decimal::from(400), deadline).unwrap();

        contribute_db(&conn, user_id, id, Decimal::from(100)).unwrap();
        let goal = contribute_db(&conn, user_id, id, Decimal::from(50)).unwrap();

        assert_eq!(goal.current_amount, Decimal::from(150));
        let stored = &list_goals_db(&conn, user_id).unwrap()[0];
        assert_eq!(stored.current_amount, Decimal::from(150));
        assert_eq!(stored.deadline, deadline);
        assert_eq!(stored.progress(), Decimal::new(375, 1));
    }

    #[test]
    fn test_goal_validation() {
        let (conn, user_id) = setup();
        let result = add_goal_db(&conn, user_id, " ", Decimal::from(10), None);
        assert_eq!(result.unwrap_err().to_string(), "Goal name cannot be empty");

        let result = add_goal_db(&conn, user_id, "Trip", Decimal::ZERO, None);
        assert_eq!(result.unwrap_err().to_string(), "Target amount must be greater than zero");
    }

    #[test]
    fn test_contribute_to_missing_goal() {
        let (conn, user_id) = setup();
        let result = contribute_db(&conn, user_id, 9, Decimal::ONE);
        assert_eq!(result.unwrap_err().to_string(), "Goal with ID 9 not found");
    }
}
