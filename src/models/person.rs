#[derive(Debug, Clone)]
pub struct Person {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
}
