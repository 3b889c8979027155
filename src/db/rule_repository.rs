use rusqlite::Connection;

use crate::error::AppResult;
use crate::models::rule::CategoryRule;

pub fn add_rule(conn: &Connection, pattern: &str, category: &str) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO category_rules (pattern, category) VALUES (?1, ?2)",
        [pattern, category],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rules in insertion order; earlier rules take precedence.
pub fn get_all_rules(conn: &Connection) -> AppResult<Vec<CategoryRule>> {
    let mut stmt = conn.prepare("SELECT id, pattern, category FROM category_rules ORDER BY id ASC")?;

    let rules_iter = stmt.query_map([], |row| {
        Ok(CategoryRule {
            id: row.get(0)?,
            pattern: row.get(1)?,
            category: row.get(2)?,
        })
    })?;

    Ok(rules_iter.collect::<Result<Vec<_>, _>>()?)
}
