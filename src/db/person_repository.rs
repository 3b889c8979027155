use rusqlite::{Connection, params};

use crate::error::AppResult;
use crate::models::person::Person;

pub fn add_person(conn: &Connection, user_id: i64, name: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO people (user_id, name) VALUES (?1, ?2)",
        params![user_id, name],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_people(conn: &Connection, user_id: i64) -> AppResult<Vec<Person>> {
    let mut stmt = conn.prepare("SELECT id, user_id, name FROM people WHERE user_id = ?1 ORDER BY name ASC")?;
    let people = stmt.query_map([user_id], |row| {
        Ok(Person {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
        })
    })?;
    Ok(people.collect::<Result<Vec<_>, _>>()?)
}
