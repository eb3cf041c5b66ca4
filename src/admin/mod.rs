//! Platform analytics, only available to admin accounts.
pub mod models;
mod api;

pub use api::Page;
pub use models::*;
