use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::db::wallet_repository;
use crate::error::{AppError, AppResult};
use crate::models::wallet::Wallet;

pub fn add_wallet_db(conn: &Connection, user_id: i64, name: &str, balance: Decimal) -> AppResult<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Wallet name cannot be empty"));
    }
    wallet_repository::add_wallet(conn, user_id, name, &balance)
}

pub fn list_wallets_db(conn: &Connection, user_id: i64) -> AppResult<Vec<Wallet>> {
    wallet_repository::get_user_wallets(conn, user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connection::establish_test_connection;
    use crate::db::user_repository;
    use chrono::NaiveDate;

    #[test]
    fn test_wallets_are_per_user() {
        let conn = establish_test_connection().unwrap();
        let created = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let ana = user_repository::add_user(&conn, "Ana", "ana@example.com", created).unwrap();
        let bo = user_repository::add_user(&conn, "Bo", "bo@example.com", created).unwrap();

        add_wallet_db(&conn, ana, "Cash", Decimal::new(2050, 2)).unwrap();
        add_wallet_db(&conn, bo, "Card", Decimal::ZERO).unwrap();

        let wallets = list_wallets_db(&conn, ana).unwrap();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].name, "Cash");
        assert_eq!(wallets[0].balance, Decimal::new(2050, 2));
    }

    #[test]
    fn test_empty_wallet_name_rejected() {
        let conn = establish_test_connection().unwrap();
        let result = add_wallet_db(&conn, 1, "", Decimal::ZERO);
        assert_eq!(result.unwrap_err().to_string(), "Wallet name cannot be empty");
    }
}
