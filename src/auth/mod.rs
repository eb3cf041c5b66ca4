pub mod models;
mod api;

pub use models::*;
