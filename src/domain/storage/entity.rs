//! Storage entity traits

use std::fmt::Debug;
use std::hash::Hash;

use serde::{Serialize, de::DeserializeOwned};

/// Key of a stored entity; backends that need text use [`StorageKey::as_str`]
pub trait StorageKey: Clone + Debug + Send + Sync + Eq + Hash {
    fn as_str(&self) -> &str;
}

/// An entity that can be persisted by a [`super::Storage`] backend
pub trait StorageEntity: Clone + Debug + Send + Sync + Serialize + DeserializeOwned {
    type Key: StorageKey;

    fn key(&self) -> &Self::Key;
}
