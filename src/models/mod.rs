pub mod alert;
pub mod budget;
pub mod expense;
pub mod goal;
pub mod person;
pub mod recurring;
pub mod rule;
pub mod user;
pub mod wallet;
