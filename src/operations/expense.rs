use rusqlite::Connection;
use rust_decimal::Decimal;

use super::categorize::Categorizer;
use crate::db::{self, expense_repository, recurring_repository, wallet_repository};
use crate::error::{AppError, AppResult};
use crate::models::expense::{Expense, ExpenseUpdate, NewExpense};

pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_NOTE_LEN: usize = 255;

pub(crate) fn clean_category(category: &str) -> AppResult<String> {
    let category = category.trim();
    if category.is_empty() {
        return Err(AppError::validation("Category cannot be empty"));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(AppError::validation("Category too long"));
    }
    Ok(category.to_string())
}

pub(crate) fn check_positive(amount: Decimal, what: &str) -> AppResult<()> {
    if amount <= Decimal::ZERO {
        return Err(AppError::validation(format!("{} must be greater than zero", what)));
    }
    Ok(())
}

fn check_note(note: Option<&str>) -> AppResult<()> {
    match note {
        Some(text) if text.chars().count() > MAX_NOTE_LEN => Err(AppError::validation("Note too long")),
        _ => Ok(()),
    }
}

fn check_wallet(conn: &Connection, user_id: i64, wallet_id: Option<i64>) -> AppResult<()> {
    let Some(wallet_id) = wallet_id else {
        return Ok(());
    };
    match wallet_repository::get_wallet(conn, wallet_id)? {
        Some(wallet) if wallet.owner_id == user_id => Ok(()),
        _ => Err(AppError::not_found("Wallet", wallet_id)),
    }
}

/// Trims tags, drops empty ones and removes duplicates keeping first occurrence.
fn clean_tags(tags: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !cleaned.iter().any(|t| t == tag) {
            cleaned.push(tag.to_string());
        }
    }
    cleaned
}

/// Stores a new expense. A blank category is filled in from the note by the
/// category rules.
pub fn add_expense_db(conn: &Connection, mut expense: NewExpense) -> AppResult<i64> {
    check_positive(expense.amount, "Amount")?;
    check_note(expense.note.as_deref())?;
    check_wallet(conn, expense.user_id, expense.wallet_id)?;

    expense.category = if expense.category.trim().is_empty() {
        Categorizer::load(conn)?.categorize_or_default(expense.note.as_deref())
    } else {
        clean_category(&expense.category)?
    };
    expense.tags = clean_tags(expense.tags);

    expense_repository::add_expense(conn, &expense)
}

pub fn list_expenses_db(conn: &Connection, user_id: i64, skip: usize, limit: usize) -> AppResult<Vec<Expense>> {
    expense_repository::list_expenses(conn, user_id, skip, limit)
}

pub fn get_expense_db(conn: &Connection, user_id: i64, id: i64) -> AppResult<Expense> {
    expense_repository::get_user_expense(conn, user_id, id)
}

pub fn update_expense_db(
    conn: &Connection,
    user_id: i64,
    id: i64,
    mut update: ExpenseUpdate,
) -> AppResult<Expense> {
    if update.is_empty() {
        return Err(AppError::validation("Nothing to update"));
    }
    if let Some(amount) = update.amount {
        check_positive(amount, "Amount")?;
    }
    if let Some(category) = update.category.take() {
        update.category = Some(clean_category(&category)?);
    }
    if let Some(note) = &update.note {
        check_note(note.as_deref())?;
    }
    if let Some(wallet_id) = update.wallet_id {
        check_wallet(conn, user_id, wallet_id)?;
    }
    if let Some(tags) = update.tags.take() {
        update.tags = Some(clean_tags(tags));
    }

    let mut expense = expense_repository::get_user_expense(conn, user_id, id)?;
    update.apply(&mut expense);
    expense_repository::update_expense(conn, &expense)?;
    Ok(expense)
}

/// Deletes the expense together with its recurring schedule, if it has one.
pub fn delete_expense_db(conn: &Connection, user_id: i64, id: i64) -> AppResult<()> {
    let tx = db::write_transaction(conn)?;
    expense_repository::get_user_expense(&tx, user_id, id)?;
    recurring_repository::delete_schedule_for_expense(&tx, id)?;
    expense_repository::remove_expense(&tx, user_id, id)?;
    tx.commit()?;
    Ok(())
}
