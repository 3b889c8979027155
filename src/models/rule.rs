#[derive(Debug, Clone)]
pub struct CategoryRule {
    pub id: i64,
    pub pattern: String,
    pub category: String,
}
