use std::env;
use std::path::PathBuf;

/// File name of the persisted credentials inside `storage_path`
pub const CREDENTIALS_FILE: &str = "credentials.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_host: String,
    // `/api` when talking to the dev proxy, empty in production
    pub api_prefix: String,
    pub storage_path: String,
}

impl AppConfig {
    pub fn new(api_host: &str, api_prefix: &str, storage_path: &str) -> Self {
        Self {
            api_host: api_host.to_string(),
            api_prefix: api_prefix.to_string(),
            storage_path: storage_path.to_string(),
        }
    }

    /// The base URL every endpoint path is appended to.
    pub fn api_base(&self) -> String {
        let host = self.api_host.trim_end_matches('/');
        let prefix = self.api_prefix.trim_matches('/');
        if prefix.is_empty() {
            host.to_string()
        } else {
            format!("{}/{}", host, prefix)
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        PathBuf::from(&self.storage_path).join(CREDENTIALS_FILE)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let api_host =
            env::var("ECHO_API_HOST").unwrap_or_else(|_| "http://127.0.0.1:8001".to_string());
        let api_prefix = env::var("ECHO_API_PREFIX").unwrap_or_else(|_| "/api".to_string());
        let storage_path = env::var("ECHO_STORAGE_PATH").unwrap_or("./".to_string());

        Self {
            api_host,
            api_prefix,
            storage_path,
        }
    }
}
