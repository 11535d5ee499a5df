pub mod access;
pub mod admin;
pub mod booking;
pub mod catalog;
pub mod chat;
pub mod content;
pub mod coupon;
pub mod realtime;

pub use access::access_config;
pub use admin::admin_config;
pub use booking::booking_config;
pub use catalog::catalog_config;
pub use chat::chat_config;
pub use content::content_config;
pub use coupon::coupon_config;
pub use realtime::realtime_config;

use actix_web::web;

/// Every `/api/v1` route.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(access_config)
            .configure(catalog_config)
            .configure(booking_config)
            .configure(coupon_config)
            .configure(chat_config)
            .configure(content_config)
            .configure(realtime_config)
            .configure(admin_config),
    );
}
