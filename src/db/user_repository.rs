use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, params};

use super::timestamp_column;
use crate::calendar::format_timestamp;
use crate::error::AppResult;
use crate::models::user::User;

pub fn add_user(
    conn: &Connection,
    name: &str,
    email: &str,
    created_at: NaiveDateTime,
) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO users (name, email, created_at) VALUES (?1, ?2, ?3)",
        params![name, email, format_timestamp(created_at)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, name, email, created_at FROM users WHERE id = ?1",
            [id],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    email: row.get(2)?,
                    created_at: timestamp_column(row, 3)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn get_all_users(conn: &Connection) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare("SELECT id, name, email, created_at FROM users ORDER BY id ASC")?;
    let users = stmt.query_map([], |row| {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            created_at: timestamp_column(row, 3)?,
        })
    })?;
    Ok(users.collect::<Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use chrono::NaiveDate;

    fn created() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_add_and_get_user() {
        let conn = establish_test_connection().unwrap();
        let id = add_user(&conn, "Ana", "ana@example.com", created()).unwrap();

        let user = get_user(&conn, id).unwrap().unwrap();
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.created_at, created());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let conn = establish_test_connection().unwrap();
        add_user(&conn, "Ana", "ana@example.com", created()).unwrap();

        let result = add_user(&conn, "Other", "ana@example.com", created());
        assert!(result.unwrap_err().to_string().contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_get_all_users() {
        let conn = establish_test_connection().unwrap();
        add_user(&conn, "Ana", "ana@example.com", created()).unwrap();
        add_user(&conn, "Bo", "bo@example.com", created()).unwrap();

        let users = get_all_users(&conn).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].name, "Bo");
    }
}
