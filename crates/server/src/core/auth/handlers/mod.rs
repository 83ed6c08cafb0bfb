//! Auth Handlers and Module

pub mod auth;
pub mod password;

pub use auth::{login, login_page, logout, register, register_page, root};
pub use password::{forgot_password, forgot_password_page};
