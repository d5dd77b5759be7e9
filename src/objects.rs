use crate::types::{AnnouncerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// A listed object: its key under the store root and the store's
/// last-modified time, which doubles as the fallback creation timestamp
/// for legacy records that omit one.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

/// Object-store boundary for the migration source.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Objects whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>>;

    async fn get(&self, key: &str) -> Result<String>;
}

/// Directory-backed object store: keys are slash-separated paths relative
/// to the root, last-modified is the file mtime.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        let mut objects = Vec::new();
        let mut pending = vec![self.root.join(prefix)];

        while let Some(dir) = pending.pop() {
            if !dir.exists() {
                continue;
            }
            let mut entries = tokio::fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                    continue;
                }
                let meta = entry.metadata().await?;
                objects.push(ObjectInfo {
                    key: relative_key(&self.root, &path)?,
                    last_modified: DateTime::<Utc>::from(meta.modified()?),
                });
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(self.object_path(key)).await?)
    }
}

fn relative_key(root: &Path, path: &Path) -> Result<String> {
    let rel = path.strip_prefix(root).map_err(|_| {
        AnnouncerError::Store(format!("object path {} escapes store root", path.display()))
    })?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

/// In-memory object store for tests.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, (DateTime<Utc>, String)>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(
        &self,
        key: impl Into<String>,
        last_modified: DateTime<Utc>,
        body: impl Into<String>,
    ) {
        self.objects
            .write()
            .await
            .insert(key.into(), (last_modified, body.into()));
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>> {
        Ok(self
            .objects
            .read()
            .await
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, (last_modified, _))| ObjectInfo {
                key: key.clone(),
                last_modified: *last_modified,
            })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<String> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|(_, body)| body.clone())
            .ok_or_else(|| AnnouncerError::Store(format!("no such object: {key}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn memory_store_lists_by_prefix_in_key_order() {
        let store = MemoryObjectStore::new();
        let stamp = Utc.timestamp_opt(1_000, 0).unwrap();
        store.insert("data/v1/auths/b.json", stamp, "{}").await;
        store.insert("data/v1/auths/a.json", stamp, "{}").await;
        store.insert("data/v2/other.json", stamp, "{}").await;

        let listed = store.list("data/v1/auths/").await.unwrap();
        let keys: Vec<_> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, ["data/v1/auths/a.json", "data/v1/auths/b.json"]);
    }

    #[tokio::test]
    async fn fs_store_round_trips_a_directory() {
        let root = std::env::temp_dir().join(format!(
            "announcer-objects-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(root.join("auths")).unwrap();
        std::fs::write(root.join("auths/team.json"), r#"{"ok":true}"#).unwrap();

        let store = FsObjectStore::new(&root);
        let listed = store.list("auths/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "auths/team.json");

        let body = store.get(&listed[0].key).await.unwrap();
        assert_eq!(body, r#"{"ok":true}"#);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
