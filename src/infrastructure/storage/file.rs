//! File-backed storage: one pretty-printed JSON document per entity

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::DomainError;
use crate::domain::storage::{Storage, StorageEntity, StorageKey};

#[derive(Debug)]
pub struct FileStorage<E>
where
    E: StorageEntity,
{
    dir: PathBuf,
    /// Serializes writers so create/update checks do not race
    write_lock: Mutex<()>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> FileStorage<E>
where
    E: StorageEntity,
{
    /// Open a storage directory, creating it if needed
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DomainError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            DomainError::storage(format!("Cannot create {}: {}", dir.display(), e))
        })?;

        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            _entity: PhantomData,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, DomainError> {
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return Err(DomainError::invalid_id(format!(
                "Key '{}' cannot be used as a file name",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }

    async fn read(&self, path: &Path) -> Result<Option<E>, DomainError> {
        let json = match tokio::fs::read_to_string(path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(DomainError::storage(format!(
                    "Cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        serde_json::from_str(&json).map(Some).map_err(|e| {
            DomainError::storage(format!("Corrupt document {}: {}", path.display(), e))
        })
    }

    async fn write(&self, path: &Path, entity: &E) -> Result<(), DomainError> {
        let json = serde_json::to_string_pretty(entity)
            .map_err(|e| DomainError::storage(format!("Cannot serialize entity: {}", e)))?;

        // Write then rename so readers never observe a partial document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            DomainError::storage(format!("Cannot write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, path).await.map_err(|e| {
            DomainError::storage(format!("Cannot write {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), "Stored document");
        Ok(())
    }
}

#[async_trait]
impl<E> Storage<E> for FileStorage<E>
where
    E: StorageEntity + 'static,
{
    async fn get(&self, key: &E::Key) -> Result<Option<E>, DomainError> {
        let path = self.path_for(key.as_str())?;
        self.read(&path).await
    }

    async fn list(&self) -> Result<Vec<E>, DomainError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|e| {
            DomainError::storage(format!("Cannot list {}: {}", self.dir.display(), e))
        })?;

        let mut entities = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| DomainError::storage(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }

            match self.read(&path).await {
                Ok(Some(entity)) => entities.push(entity),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }

        Ok(entities)
    }

    async fn create(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let path = self.path_for(&key)?;
        let _guard = self.write_lock.lock().await;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(DomainError::conflict(format!(
                "Entity with key '{}' already exists",
                key
            )));
        }

        self.write(&path, &entity).await?;
        Ok(entity)
    }

    async fn update(&self, entity: E) -> Result<E, DomainError> {
        let key = entity.key().as_str().to_string();
        let path = self.path_for(&key)?;
        let _guard = self.write_lock.lock().await;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(DomainError::not_found(format!(
                "Entity with key '{}' not found",
                key
            )));
        }

        self.write(&path, &entity).await?;
        Ok(entity)
    }

    async fn delete(&self, key: &E::Key) -> Result<bool, DomainError> {
        let path = self.path_for(key.as_str())?;
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::storage(format!(
                "Cannot delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
