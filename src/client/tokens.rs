//! Persistence for the access/refresh token pair.
//!
//! Tokens are stored as plain string values under fixed keys in a
//! key-value `TokenStorage`. The `TokenStore` reads them lazily the
//! first time they are needed and keeps working in memory when the
//! storage backend is unavailable.
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};

pub const ACCESS_TOKEN_KEY: &str = "echo_access_token";
pub const REFRESH_TOKEN_KEY: &str = "echo_refresh_token";

/// A string key-value store that outlives the client.
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;

    /// Write several keys at once. `None` removes the key.
    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<()> {
        for (key, value) in entries {
            match value {
                Some(v) => self.set(key, v)?,
                None => self.remove(key)?,
            }
        }
        Ok(())
    }
}

/// Keeps everything in memory, nothing survives the process.
#[derive(Default)]
pub struct MemoryStorage(Mutex<HashMap<String, String>>);

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.0.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.0.lock().unwrap().remove(key);
        Ok(())
    }
}

/// Stores keys in a single JSON object on disk.
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_map(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(anyhow!(
                "Expected a JSON object in {}, found: {}",
                self.path.display(),
                other
            )),
        }
    }

    fn write_map(&self, map: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        // Replaced atomically via rename
        let tmp = self.path.with_extension("json.tmp");
        let mut file = create_private(&tmp)?;
        file.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Open `path` for writing, readable by the owner only.
fn create_private(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(0o600);
        let file = options.open(path)?;
        // A leftover file keeps its old mode on open
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
        Ok(file)
    }
    #[cfg(not(unix))]
    {
        Ok(options.open(path)?)
    }
}

impl TokenStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        let map = self.read_map()?;
        Ok(map.get(key).and_then(|v| v.as_str()).map(String::from))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.set_all(&[(key, Some(value))])
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.set_all(&[(key, None)])
    }

    fn set_all(&self, entries: &[(&str, Option<&str>)]) -> Result<()> {
        let _guard = self.lock.lock().unwrap();
        // Unreadable contents are overwritten
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!("Discarding unreadable credentials file: {}", e);
            Map::new()
        });
        for (key, value) in entries {
            match value {
                Some(v) => {
                    map.insert(key.to_string(), Value::String(v.to_string()));
                }
                None => {
                    map.remove(*key);
                }
            }
        }
        self.write_map(&map)
    }
}

#[derive(Debug, Default, Clone)]
struct Credentials {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// In-memory view of the credentials backed by a `TokenStorage`.
pub struct TokenStore {
    storage: Box<dyn TokenStorage>,
    // `None` until the first access reads from storage
    credentials: Mutex<Option<Credentials>>,
}

impl TokenStore {
    pub fn new(storage: Box<dyn TokenStorage>) -> Self {
        Self {
            storage,
            credentials: Mutex::new(None),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    fn load(&self) -> Credentials {
        let read = |key: &str| {
            self.storage.get(key).unwrap_or_else(|e| {
                tracing::warn!("Token storage unavailable, continuing in memory: {}", e);
                None
            })
        };
        Credentials {
            access_token: read(ACCESS_TOKEN_KEY),
            refresh_token: read(REFRESH_TOKEN_KEY),
        }
    }

    fn with_credentials<R>(&self, f: impl FnOnce(&mut Credentials) -> R) -> R {
        let mut guard = self.credentials.lock().unwrap();
        let creds = guard.get_or_insert_with(|| self.load());
        f(creds)
    }

    fn persist(&self, creds: &Credentials) {
        let entries = [
            (ACCESS_TOKEN_KEY, creds.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, creds.refresh_token.as_deref()),
        ];
        if let Err(e) = self.storage.set_all(&entries) {
            tracing::warn!("Failed to persist tokens, keeping them in memory: {}", e);
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.with_credentials(|c| c.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.with_credentials(|c| c.refresh_token.clone())
    }

    pub fn has_token(&self) -> bool {
        self.with_credentials(|c| c.access_token.is_some())
    }

    /// Replace both tokens together.
    pub fn set(&self, access_token: &str, refresh_token: Option<&str>) {
        let creds = self.with_credentials(|c| {
            c.access_token = Some(access_token.to_string());
            c.refresh_token = refresh_token.map(String::from);
            c.clone()
        });
        self.persist(&creds);
    }

    /// Replace only the access token, keeping the current refresh token.
    pub fn set_access(&self, access_token: Option<&str>) {
        let creds = self.with_credentials(|c| {
            c.access_token = access_token.map(String::from);
            // A refresh token is never kept around without an access token
            if c.access_token.is_none() {
                c.refresh_token = None;
            }
            c.clone()
        });
        self.persist(&creds);
    }

    pub fn clear(&self) {
        let creds = self.with_credentials(|c| {
            *c = Credentials::default();
            c.clone()
        });
        self.persist(&creds);
    }
}
