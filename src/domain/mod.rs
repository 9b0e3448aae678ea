pub mod access;
pub mod money;
pub mod order_status;
pub mod promo;

pub use access::{Action, Caller, Role};
pub use order_status::OrderStatus;
