pub mod models;
pub mod session;
mod api;

pub use models::*;
pub use session::{CaseSession, SessionState, StartCaseOptions};
