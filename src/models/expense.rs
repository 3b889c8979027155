use chrono::NaiveDateTime;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    pub category: String,
    pub occurred_at: NaiveDateTime,
    pub note: Option<String>,
    pub person: Option<String>,
    pub wallet_id: Option<i64>,
    pub is_recurring: bool,
    pub tags: Vec<String>,
    /// Schedule this expense was materialized from, if any.
    pub recurring_source_id: Option<i64>,
    /// The due instant that produced this expense.
    pub recurring_due: Option<NaiveDateTime>,
}

/// Fields of an expense before it has been stored.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub user_id: i64,
    pub amount: Decimal,
    pub category: String,
    pub occurred_at: NaiveDateTime,
    pub note: Option<String>,
    pub person: Option<String>,
    pub wallet_id: Option<i64>,
    pub is_recurring: bool,
    pub tags: Vec<String>,
    pub recurring_source_id: Option<i64>,
    pub recurring_due: Option<NaiveDateTime>,
}

impl NewExpense {
    pub fn new(user_id: i64, amount: Decimal, category: String, occurred_at: NaiveDateTime) -> Self {
        Self {
            user_id,
            amount,
            category,
            occurred_at,
            note: None,
            person: None,
            wallet_id: None,
            is_recurring: false,
            tags: Vec::new(),
            recurring_source_id: None,
            recurring_due: None,
        }
    }

    /// One-time copy of `template` produced by a schedule firing.
    pub fn materialized_from(
        template: &Expense,
        schedule_id: i64,
        due: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Self {
        Self {
            user_id: template.user_id,
            amount: template.amount,
            category: template.category.clone(),
            occurred_at: now,
            note: template.note.clone(),
            person: template.person.clone(),
            wallet_id: template.wallet_id,
            is_recurring: false,
            tags: template.tags.clone(),
            recurring_source_id: Some(schedule_id),
            recurring_due: Some(due),
        }
    }
}

/// Partial update of an expense. Only these fields can be changed after
/// creation; `Some(None)` clears an optional field.
#[derive(Debug, Default, Clone)]
pub struct ExpenseUpdate {
    pub amount: Option<Decimal>,
    pub category: Option<String>,
    pub occurred_at: Option<NaiveDateTime>,
    pub note: Option<Option<String>>,
    pub person: Option<Option<String>>,
    pub wallet_id: Option<Option<i64>>,
    pub tags: Option<Vec<String>>,
}

impl ExpenseUpdate {
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.occurred_at.is_none()
            && self.note.is_none()
            && self.person.is_none()
            && self.wallet_id.is_none()
            && self.tags.is_none()
    }

    pub fn apply(self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(occurred_at) = self.occurred_at {
            expense.occurred_at = occurred_at;
        }
        if let Some(note) = self.note {
            expense.note = note;
        }
        if let Some(person) = self.person {
            expense.person = person;
        }
        if let Some(wallet_id) = self.wallet_id {
            expense.wallet_id = wallet_id;
        }
        if let Some(tags) = self.tags {
            expense.tags = tags;
        }
    }
}
