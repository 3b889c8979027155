//! Users of the tracker and the people they share expenses with.

use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::db::{person_repository, user_repository};
use crate::error::{AppError, AppResult};
use crate::models::person::Person;
use crate::models::user::User;

pub fn add_user_db(conn: &Connection, name: &str, email: &str, now: NaiveDateTime) -> AppResult<i64> {
    let name = name.trim();
    let email = email.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    if !email.contains('@') {
        return Err(AppError::validation(format!("Invalid email '{}'", email)));
    }
    if user_repository::get_all_users(conn)?
        .iter()
        .any(|u| u.email.eq_ignore_ascii_case(email))
    {
        return Err(AppError::validation(format!("Email {} is already registered", email)));
    }
    user_repository::add_user(conn, name, email, now)
}

pub fn list_users_db(conn: &Connection) -> AppResult<Vec<User>> {
    user_repository::get_all_users(conn)
}

/// Fails with `NotFound` unless `user_id` exists.
pub fn require_user(conn: &Connection, user_id: i64) -> AppResult<User> {
    user_repository::get_user(conn, user_id)?.ok_or_else(|| AppError::not_found("User", user_id))
}

pub fn add_person_db(conn: &Connection, user_id: i64, name: &str) -> AppResult<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }
    person_repository::add_person(conn, user_id, name)
}

pub fn list_people_db(conn: &Connection, user_id: i64) -> AppResult<Vec<Person>> {
    person_repository::get_user_people(conn, user_id)
}
