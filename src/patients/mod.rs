pub mod models;
mod api;

pub use api::MAX_BULK_FILES;
pub use models::*;
