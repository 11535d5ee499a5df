pub mod access_service;
pub mod booking_service;
pub mod catalog_service;
pub mod chat_service;
pub mod content_service;
pub mod coupon_service;
pub mod outbox_service;
pub mod report_service;

pub use access_service::*;
pub use booking_service::*;
pub use catalog_service::*;
pub use chat_service::*;
pub use content_service::*;
pub use coupon_service::*;
pub use outbox_service::*;
pub use report_service::*;
