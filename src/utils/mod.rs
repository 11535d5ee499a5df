pub mod code_generator;
pub mod jwt;
pub mod phone;

pub use code_generator::{generate_access_code, generate_id};
pub use jwt::*;
pub use phone::*;
