//! Local key/value snapshots for cross-restart continuity.
//!
//! Mirrors of the signed-in user's profile, cart and wishlist are written as
//! JSON files after successful mutations and read back when the stores are
//! initialised. Collection snapshots record their owner so a snapshot left by
//! one user is never shown to another.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use shopfront_core::UserId;

/// Errors reading or writing snapshots.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Snapshot I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Snapshot slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKey {
    User,
    Cart,
    Wishlist,
}

impl SnapshotKey {
    const fn file_name(self) -> &'static str {
        match self {
            Self::User => "user.json",
            Self::Cart => "cart.json",
            Self::Wishlist => "wishlist.json",
        }
    }
}

/// A user-scoped collection snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSnapshot<T> {
    pub user: UserId,
    pub items: Vec<T>,
}

/// JSON file snapshot store. A store without a directory is disabled: loads
/// find nothing and saves are dropped.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    dir: Option<PathBuf>,
}

impl SnapshotStore {
    /// Snapshot store writing into `dir` (created on first save).
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }

    /// Snapshot store that persists nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { dir: None }
    }

    /// Build from an optional directory.
    #[must_use]
    pub fn from_dir(dir: Option<&Path>) -> Self {
        dir.map_or_else(Self::disabled, Self::new)
    }

    fn path(&self, key: SnapshotKey) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(key.file_name()))
    }

    /// Read a snapshot, `None` when it was never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or decoded.
    pub async fn load<T: DeserializeOwned>(&self, key: SnapshotKey) -> Result<Option<T>, SnapshotError> {
        let Some(path) = self.path(key) else {
            return Ok(None);
        };
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a snapshot, replacing the previous one atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded or the file written.
    pub async fn save<T: Serialize + ?Sized>(&self, key: SnapshotKey, value: &T) -> Result<(), SnapshotError> {
        let (Some(dir), Some(path)) = (&self.dir, self.path(key)) else {
            return Ok(());
        };
        let bytes = serde_json::to_vec(value)?;
        tokio::fs::create_dir_all(dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Delete a snapshot if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn remove(&self, key: SnapshotKey) -> Result<(), SnapshotError> {
        let Some(path) = self.path(key) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    /// Load the collection snapshot for `user`, ignoring snapshots owned by
    /// someone else. Failures are logged and treated as "no snapshot".
    pub async fn load_collection<T: DeserializeOwned>(&self, key: SnapshotKey, user: &UserId) -> Option<Vec<T>> {
        match self.load::<CollectionSnapshot<T>>(key).await {
            Ok(Some(snapshot)) if &snapshot.user == user => Some(snapshot.items),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!(error = %e, ?key, "ignoring unreadable snapshot");
                None
            }
        }
    }

    /// Save a collection snapshot for `user`. Failures are logged, never returned.
    pub async fn save_collection<T: Serialize + Clone>(&self, key: SnapshotKey, user: &UserId, items: &[T]) {
        let snapshot = CollectionSnapshot {
            user: user.clone(),
            items: items.to_vec(),
        };
        if let Err(e) = self.save(key, &snapshot).await {
            tracing::warn!(error = %e, ?key, "failed to write snapshot");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopfront_core::{CartLine, ProductRef};

    use super::*;

    #[tokio::test]
    async fn test_save_load_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("nested"));

        assert!(store.load::<Vec<String>>(SnapshotKey::User).await.unwrap().is_none());

        store.save(SnapshotKey::User, &vec!["a".to_string()]).await.unwrap();
        let loaded: Option<Vec<String>> = store.load(SnapshotKey::User).await.unwrap();
        assert_eq!(loaded, Some(vec!["a".to_string()]));

        store.remove(SnapshotKey::User).await.unwrap();
        store.remove(SnapshotKey::User).await.unwrap();
        assert!(store.load::<Vec<String>>(SnapshotKey::User).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_collection_snapshot_is_user_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let lines = vec![CartLine::new(ProductRef::bare("A"), 2)];

        store
            .save_collection(SnapshotKey::Cart, &UserId::new("u1"), &lines)
            .await;

        let mine: Option<Vec<CartLine>> = store
            .load_collection(SnapshotKey::Cart, &UserId::new("u1"))
            .await;
        assert_eq!(mine, Some(lines));

        let theirs: Option<Vec<CartLine>> = store
            .load_collection(SnapshotKey::Cart, &UserId::new("u2"))
            .await;
        assert!(theirs.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wishlist.json"), b"{not json").unwrap();
        let store = SnapshotStore::new(dir.path());

        assert!(store.load::<serde_json::Value>(SnapshotKey::Wishlist).await.is_err());
        let items: Option<Vec<serde_json::Value>> = store
            .load_collection(SnapshotKey::Wishlist, &UserId::new("u1"))
            .await;
        assert!(items.is_none());
    }

    #[tokio::test]
    async fn test_disabled_store() {
        let store = SnapshotStore::disabled();
        store.save(SnapshotKey::Cart, &[1, 2, 3]).await.unwrap();
        assert!(store.load::<Vec<i32>>(SnapshotKey::Cart).await.unwrap().is_none());
    }
}
