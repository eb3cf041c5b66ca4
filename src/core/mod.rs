pub mod config;
pub mod time;
pub use config::AppConfig;
pub use time::ServerTimestamp;
