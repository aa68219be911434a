pub mod frame;
pub mod message;

pub use frame::MessageStream;
pub use message::{Reply, Request, TxId};
