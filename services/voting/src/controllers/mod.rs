pub mod health;
pub mod voting;
