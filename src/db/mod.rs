pub mod alert_repository;
pub mod budget_repository;
pub mod connection;
pub mod expense_repository;
pub mod goal_repository;
pub mod lock_repository;
pub mod person_repository;
pub mod recurring_repository;
pub mod rule_repository;
pub mod user_repository;
pub mod wallet_repository;

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use rust_decimal::Decimal;

use crate::calendar;

/// Starts a transaction that takes the write lock up front, so a read followed
/// by a write inside it cannot interleave with another writer.
pub(crate) fn write_transaction(conn: &Connection) -> rusqlite::Result<Transaction<'_>> {
    Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
}

/// Category comparison shared by budget lookups and budget sums. SQLite's
/// `LOWER()` only folds ASCII, so folding happens here instead.
pub(crate) fn same_category(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn timestamp_column(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let raw: String = row.get(idx)?;
    calendar::parse_timestamp(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn optional_timestamp_column(
    row: &Row,
    idx: usize,
) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| calendar::parse_timestamp(&s).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn optional_date_column(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, calendar::DATE_FORMAT).map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn tags_column(row: &Row, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}
