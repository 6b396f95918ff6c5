use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use super::{Record, Store, StoreError, StoreName, StoreResult};
use crate::constants::GLOBALS_FILE;
use crate::models::KeyValuePair;

/// Directory-backed store: one YAML file per record, one directory per collection.
///
/// ```text
/// <root>/requests/<id>.yaml
/// <root>/collections/<id>.yaml
/// <root>/environments/<id>.yaml
/// <root>/history/<id>.yaml
/// <root>/globals.json
/// ```
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// No I/O happens until the first call; directories are created on write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FileStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, store: StoreName) -> PathBuf {
        self.root.join(store.as_str())
    }

    fn record_path(&self, store: StoreName, id: &str) -> StoreResult<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.to_string()));
        }
        Ok(self.dir(store).join(format!("{}.yaml", id)))
    }

    fn globals_path(&self) -> PathBuf {
        self.root.join(GLOBALS_FILE)
    }

    async fn ensure_dir(&self, dir: &Path) -> StoreResult<()> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| StoreError::io(dir, e))
    }

    async fn read_record<T: Record>(path: &Path) -> StoreResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => serde_yaml::from_str(&content)
                .map(Some)
                .map_err(|e| StoreError::yaml(path, e)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

impl Store for FileStore {
    async fn get_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        let dir = self.dir(T::STORE);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = Self::read_record(&path).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    async fn get_by_id<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let path = self.record_path(T::STORE, id)?;
        Self::read_record(&path).await
    }

    async fn save<T: Record>(&self, item: &T) -> StoreResult<()> {
        let path = self.record_path(T::STORE, item.id())?;
        let content = serde_yaml::to_string(item).map_err(|e| StoreError::yaml(&path, e))?;
        self.ensure_dir(&self.dir(T::STORE)).await?;
        fs::write(&path, content)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }

    async fn remove<T: Record>(&self, id: &str) -> StoreResult<()> {
        let path = self.record_path(T::STORE, id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn clear<T: Record>(&self) -> StoreResult<()> {
        let dir = self.dir(T::STORE);
        match fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&dir, e)),
        }
    }

    async fn load_globals(&self) -> StoreResult<Vec<KeyValuePair>> {
        let path = self.globals_path();
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }

    async fn save_globals(&self, variables: &[KeyValuePair]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(variables)?;
        self.ensure_dir(&self.root).await?;
        let path = self.globals_path();
        fs::write(&path, content)
            .await
            .map_err(|e| StoreError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiRequest, AuthConfig, Environment, HttpMethod, RequestBody};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_roundtrip_request_through_yaml() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());

        let mut req = ApiRequest::new().with_method(HttpMethod::POST).with_url("{{base}}/users");
        req.body = RequestBody::json(r#"{"name":"test"}"#);
        req.auth = AuthConfig::Bearer { token: "{{token}}".into() };
        store.save(&req).await.unwrap();

        assert!(dir.path().join("requests").join(format!("{}.yaml", req.id)).exists());
        let loaded: Option<ApiRequest> = store.get_by_id(&req.id).await.unwrap();
        assert_eq!(loaded, Some(req));
    }

    #[tokio::test]
    async fn test_missing_directories_read_as_empty() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("not-created"));
        assert!(store.get_all::<Environment>().await.unwrap().is_empty());
        assert!(store.load_globals().await.unwrap().is_empty());
        store.remove::<Environment>("abc").await.unwrap();
        store.clear::<Environment>().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_ids() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let err = store.get_by_id::<ApiRequest>("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_globals_written_as_json_list() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let vars = vec![KeyValuePair::new("host", "example.com")];
        store.save_globals(&vars).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(GLOBALS_FILE)).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed[0]["key"], "host");
        assert_eq!(store.load_globals().await.unwrap(), vars);

        store.save_globals(&[]).await.unwrap();
        assert!(store.load_globals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_removes_every_record() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(&Environment::new(Some("dev"))).await.unwrap();
        store.save(&Environment::new(Some("prod"))).await.unwrap();
        assert_eq!(store.get_all::<Environment>().await.unwrap().len(), 2);
        store.clear::<Environment>().await.unwrap();
        assert!(store.get_all::<Environment>().await.unwrap().is_empty());
    }
}
