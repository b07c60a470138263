use crate::errors::{CoachError, CoachResult};
use async_trait::async_trait;
use futures::lock::Mutex;
use serde_json::{Map, Value};
use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

/// A small persistent key-value store for settings. Missing keys are
/// omitted from `get` results.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, keys: &[&str]) -> CoachResult<HashMap<String, Value>>;
    async fn set(&self, items: HashMap<String, Value>) -> CoachResult<()>;
}

/// Keeps values for the lifetime of the process only.
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        tracing::warn!("Persistent storage is unavailable. Settings will not survive a restart.");
        Self {
            values: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> CoachResult<HashMap<String, Value>> {
        let values = self.values.lock().await;
        Ok(pick(|key| values.get(key), keys))
    }

    async fn set(&self, items: HashMap<String, Value>) -> CoachResult<()> {
        self.values.lock().await.extend(items);
        Ok(())
    }
}

/// Stores values as one JSON object in a file.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// `<config dir>/leetcode-coach/storage.json`, if the platform has a
    /// config dir.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("leetcode-coach").join("storage.json"))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> CoachResult<Map<String, Value>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(storage_error(&self.path, &error)),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str(&contents) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(CoachError::Storage(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
            Err(error) => Err(storage_error(&self.path, &error)),
        }
    }
}

#[async_trait]
impl CredentialStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> CoachResult<HashMap<String, Value>> {
        let values = self.read_all().await?;
        Ok(pick(|key| values.get(key), keys))
    }

    async fn set(&self, items: HashMap<String, Value>) -> CoachResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut values = self.read_all().await?;
        values.extend(items);

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|error| storage_error(parent, &error))?;
        }
        let contents = serde_json::to_string_pretty(&Value::Object(values))?;
        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|error| storage_error(&self.path, &error))
    }
}

/// The file store at its default location, or an in-memory store when the
/// platform has no config dir.
#[must_use]
pub fn open_default_store() -> Arc<dyn CredentialStore> {
    match JsonFileStore::default_path() {
        Some(path) => Arc::new(JsonFileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    }
}

fn pick<'a>(
    lookup: impl Fn(&str) -> Option<&'a Value>,
    keys: &[&str],
) -> HashMap<String, Value> {
    keys.iter()
        .filter_map(|key| lookup(key).map(|value| ((*key).to_string(), value.clone())))
        .collect()
}

fn storage_error(path: &Path, error: &dyn std::fmt::Display) -> CoachError {
    CoachError::Storage(format!("{}: {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_returns_only_requested_keys() {
        let store = MemoryStore::new();
        store
            .set(HashMap::from([
                ("apiKey".to_string(), json!("k")),
                ("theme".to_string(), json!("dark")),
            ]))
            .await
            .expect("set");

        let values = store.get(&["apiKey", "missing"]).await.expect("get");
        assert_eq!(values, HashMap::from([("apiKey".to_string(), json!("k"))]));
    }
}
