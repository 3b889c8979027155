use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

use super::decimal_column;
use crate::error::AppResult;
use crate::models::wallet::Wallet;

pub fn add_wallet(conn: &Connection, owner_id: i64, name: &str, balance: &Decimal) -> AppResult<i64> {
    conn.execute(
        "INSERT INTO wallets (name, owner_id, balance) VALUES (?1, ?2, ?3)",
        params![name, owner_id, balance.to_string()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_wallet(conn: &Connection, id: i64) -> AppResult<Option<Wallet>> {
    let wallet = conn
        .query_row(
            "SELECT id, name, owner_id, balance FROM wallets WHERE id = ?1",
            [id],
            |row| {
                Ok(Wallet {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner_id: row.get(2)?,
                    balance: decimal_column(row, 3)?,
                })
            },
        )
        .optional()?;
    Ok(wallet)
}

pub fn get_user_wallets(conn: &Connection, owner_id: i64) -> AppResult<Vec<Wallet>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, owner_id, balance FROM wallets WHERE owner_id = ?1 ORDER BY name ASC",
    )?;
    let wallets = stmt.query_map([owner_id], |row| {
        Ok(Wallet {
            id: row.get(0)?,
            name: row.get(1)?,
            owner_id: row.get(2)?,
            balance: decimal_column(row, 3)?,
        })
    })?;
    Ok(wallets.collect::<Result<Vec<_>, _>>()?)
}
