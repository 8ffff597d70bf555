//! Database models split into domain-specific modules.

pub mod session;
pub mod user;

pub use session::*;
pub use user::*;
