use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct BudgetAlert {
    pub id: i64,
    pub user_id: i64,
    pub budget_id: i64,
    pub triggered_on: NaiveDateTime,
    pub message: String,
}
