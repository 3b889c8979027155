use chrono::NaiveDate;
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub deadline: Option<NaiveDate>,
}

impl Goal {
    /// Progress towards the target in percent, capped at 100.
    pub fn progress(&self) -> Decimal {
        if self.target_amount <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let pct = (self.current_amount / self.target_amount) * Decimal::ONE_HUNDRED;
        pct.min(Decimal::ONE_HUNDRED).round_dp(2)
    }
}
