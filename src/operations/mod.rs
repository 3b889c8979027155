pub mod analytics;
pub mod budget;
pub mod categorize;
pub mod expense;
pub mod goal;
pub mod import;
pub mod people;
pub mod recurring;
pub mod wallet;

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::{AppError, AppResult};

/// Parses a user-supplied decimal. `what` names the value in the error.
pub fn parse_amount(input: &str, what: &str) -> AppResult<Decimal> {
    let input = input.trim();
    Decimal::from_str(input)
        .map_err(|_| AppError::validation(format!("Invalid {} '{}'. Must be a valid number", what, input)))
}
