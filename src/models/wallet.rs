use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Wallet {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub balance: Decimal,
}
