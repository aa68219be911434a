pub mod connection;
pub mod transaction;

pub use transaction::{Mode, Transaction};
