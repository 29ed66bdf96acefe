pub mod health;
pub mod notify;
