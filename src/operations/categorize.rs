use regex::{Regex, RegexBuilder};
use rusqlite::Connection;
use tracing::warn;

use crate::db::rule_repository;
use crate::error::{AppError, AppResult};
use crate::models::rule::CategoryRule;

pub const FALLBACK_CATEGORY: &str = "Other";

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Stored category rules compiled once, matched in insertion order.
pub struct Categorizer {
    rules: Vec<(Regex, String)>,
}

impl Categorizer {
    pub fn load(conn: &Connection) -> AppResult<Self> {
        let rules = rule_repository::get_all_rules(conn)?
            .into_iter()
            .filter_map(|rule| match compile(&rule.pattern) {
                Ok(regex) => Some((regex, rule.category)),
                Err(err) => {
                    warn!(rule_id = rule.id, error = %err, "ignoring invalid category rule");
                    None
                }
            })
            .collect();
        Ok(Self { rules })
    }

    pub fn categorize(&self, text: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(text))
            .map(|(_, category)| category.as_str())
    }

    /// Category for `note`, or [`FALLBACK_CATEGORY`] when nothing matches.
    pub fn categorize_or_default(&self, note: Option<&str>) -> String {
        note.and_then(|text| self.categorize(text))
            .unwrap_or(FALLBACK_CATEGORY)
            .to_string()
    }
}

pub fn add_rule_db(conn: &Connection, pattern: &str, category: &str) -> AppResult<i64> {
    let pattern = pattern.trim();
    let category = category.trim();
    if pattern.is_empty() {
        return Err(AppError::validation("Pattern cannot be empty"));
    }
    if category.is_empty() {
        return Err(AppError::validation("Category cannot be empty"));
    }
    compile(pattern)?;
    rule_repository::add_rule(conn, pattern, category)
}

pub fn list_rules_db(conn: &Connection) -> AppResult<Vec<CategoryRule>> {
    rule_repository::get_all_rules(conn)
}

pub fn categorize_note_db(conn: &Connection, note: &str) -> AppResult<String> {
    Ok(Categorizer::load(conn)?.categorize_or_default(Some(note)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;

    #[test]
    fn test_first_matching_rule_wins() {
        let conn = establish_test_connection().unwrap();
        add_rule_db(&conn, "coffee|starbucks", "Food").unwrap();
        add_rule_db(&conn, "star", "Astronomy").unwrap();

        assert_eq!(categorize_note_db(&conn, "Starbucks latte").unwrap(), "Food");
    }

    #[test]
    fn test_no_match_falls_back() {
        let conn = establish_test_connection().unwrap();
        add_rule_db(&conn, "uber", "Transport").unwrap();

        assert_eq!(categorize_note_db(&conn, "Book store").unwrap(), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let conn = establish_test_connection().unwrap();
        let result = add_rule_db(&conn, "(unclosed", "Food");

        assert!(matches!(result, Err(AppError::Pattern(_))));
        assert!(list_rules_db(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_empty_category_rejected() {
        let conn = establish_test_connection().unwrap();
        let result = add_rule_db(&conn, "rent", "  ");
        assert_eq!(result.unwrap_err().to_string(), "Category cannot be empty");
    }

    #[test]
    fn test_invalid_stored_rule_is_skipped() {
        let conn = establish_test_connection().unwrap();
        rule_repository::add_rule(&conn, "[", "Broken").unwrap();
        rule_repository::add_rule(&conn, "gym", "Health").unwrap();

        let categorizer = Categorizer::load(&conn).unwrap();
        assert_eq!(categorizer.categorize("GYM membership"), Some("Health"));
        assert_eq!(categorizer.categorize_or_default(None), FALLBACK_CATEGORY);
    }
}
