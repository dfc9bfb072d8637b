pub mod auth;
pub mod chat;
pub mod courses;
pub mod health;
pub mod payments;
pub mod rewards;
pub mod tests;
