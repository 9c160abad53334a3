//! Request handlers.

pub mod application;
pub mod auth;
pub mod health;
pub mod session;
pub mod uploads;

pub use application::*;
pub use auth::*;
pub use health::*;
pub use session::*;
pub use uploads::*;
