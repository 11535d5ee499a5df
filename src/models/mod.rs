pub mod booking;
pub mod chat;
pub mod common;
pub mod content;
pub mod coupon;
pub mod customer_code;
pub mod pagination;
pub mod product;
pub mod report;
pub mod session;

pub use booking::*;
pub use chat::*;
pub use common::*;
pub use content::*;
pub use coupon::*;
pub use customer_code::*;
pub use pagination::*;
pub use product::*;
pub use report::*;
pub use session::*;
