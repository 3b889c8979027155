use rust_decimal::Decimal;

#[derive(Debug, Clone)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub monthly_limit: Decimal,
}

/// Whitelisted fields a user may change on an existing budget.
#[derive(Debug, Default, Clone)]
pub struct BudgetUpdate {
    pub category: Option<String>,
    pub monthly_limit: Option<Decimal>,
}

impl BudgetUpdate {
    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.monthly_limit.is_none()
    }

    pub fn apply(self, budget: &mut Budget) {
        if let Some(category) = self.category {
            budget.category = category;
        }
        if let Some(limit) = self.monthly_limit {
            budget.monthly_limit = limit;
        }
    }
}
