pub mod auth;
pub mod cors;

pub use auth::{AuthMiddleware, current_claims, require_admin};
pub use cors::create_cors;
