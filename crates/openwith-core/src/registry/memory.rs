//! In-memory registry tree.

use super::path::RegistryPath;
use super::{RegistryData, RegistryKey, RegistryReader};
use crate::error::{OpenWithError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::trace;

#[derive(Debug, Clone)]
struct MemoryKey {
    path: RegistryPath,
    values: BTreeMap<String, RegistryData>,
}

/// A registry held in memory.
///
/// Keys are matched case-insensitively, like the real registry. Writing a
/// value creates every missing ancestor key. Paths marked with
/// [`deny`](Self::deny) fail to list with a permission error.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    keys: BTreeMap<String, MemoryKey>,
    denied: HashSet<String>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a key (and its ancestors) if missing.
    pub fn create_key(&mut self, path: &str) -> Result<()> {
        let mut current = Some(RegistryPath::parse(path)?);
        while let Some(path) = current {
            let parent = path.parent();
            self.keys
                .entry(path.canonical())
                .or_insert_with(|| MemoryKey {
                    path,
                    values: BTreeMap::new(),
                });
            current = parent;
        }
        Ok(())
    }

    /// Set a value under `path`, creating the key if needed.
    ///
    /// Use the empty name for the key's default value.
    pub fn set_value(&mut self, path: &str, name: &str, data: RegistryData) -> Result<()> {
        self.create_key(path)?;
        let canonical = RegistryPath::parse(path)?.canonical();
        if let Some(key) = self.keys.get_mut(&canonical) {
            key.values.insert(name.to_string(), data);
        }
        Ok(())
    }

    /// Set a `REG_SZ` value.
    pub fn set_string(&mut self, path: &str, name: &str, value: impl Into<String>) -> Result<()> {
        self.set_value(path, name, RegistryData::String(value.into()))
    }

    /// Make listing `path` fail with a permission error.
    pub fn deny(&mut self, path: &str) -> Result<()> {
        self.denied.insert(RegistryPath::parse(path)?.canonical());
        Ok(())
    }

    /// Builder form of [`create_key`](Self::create_key).
    pub fn with_key(mut self, path: &str) -> Result<Self> {
        self.create_key(path)?;
        Ok(self)
    }

    /// Builder form of [`set_string`](Self::set_string).
    pub fn with_string(mut self, path: &str, name: &str, value: impl Into<String>) -> Result<Self> {
        self.set_string(path, name, value)?;
        Ok(self)
    }

    pub fn contains_key(&self, path: &str) -> bool {
        RegistryPath::parse(path)
            .map(|p| self.keys.contains_key(&p.canonical()))
            .unwrap_or(false)
    }

    fn list_one(&self, path: &str) -> Result<RegistryKey> {
        let parsed = RegistryPath::parse(path)?;
        let canonical = parsed.canonical();

        if self.denied.contains(&canonical) {
            let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
            return Err(OpenWithError::lookup(path, err));
        }

        let key = self
            .keys
            .get(&canonical)
            .ok_or_else(|| OpenWithError::key_not_found(path))?;

        let keys = self
            .keys
            .values()
            .filter(|child| {
                child
                    .path
                    .parent()
                    .map(|parent| parent.canonical() == canonical)
                    .unwrap_or(false)
            })
            .filter_map(|child| child.path.leaf().map(str::to_string))
            .collect();

        trace!("Listed {} from memory", path);

        Ok(RegistryKey {
            keys,
            values: key.values.clone(),
        })
    }
}

#[async_trait]
impl RegistryReader for MemoryRegistry {
    async fn list_many(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>> {
        paths
            .iter()
            .map(|path| -> Result<(String, RegistryKey)> {
                Ok((path.clone(), self.list_one(path)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_values_and_subkeys() {
        let registry = MemoryRegistry::new()
            .with_string(r"HKCU\Software\Classes\Applications\Foo.exe", "", "foo")
            .unwrap()
            .with_key(r"HKCU\Software\Classes\Applications\Bar.exe")
            .unwrap();

        let key = registry
            .list(r"HKCU\Software\Classes\Applications")
            .await
            .unwrap();
        let mut names = key.keys.clone();
        names.sort();
        assert_eq!(names, vec!["Bar.exe".to_string(), "Foo.exe".to_string()]);
        assert!(key.values.is_empty());

        let foo = registry
            .list(r"HKCU\Software\Classes\Applications\Foo.exe")
            .await
            .unwrap();
        assert_eq!(foo.default_value().and_then(RegistryData::as_str), Some("foo"));
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let registry = MemoryRegistry::new()
            .with_string(r"HKCU\Software\Test", "Name", "value")
            .unwrap();

        let key = registry
            .list(r"HKEY_CURRENT_USER\software\test")
            .await
            .unwrap();
        assert_eq!(key.values.len(), 1);
        assert!(registry.contains_key(r"hkcu\SOFTWARE"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let registry = MemoryRegistry::new();
        let err = registry.list(r"HKCU\Software\Missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_denied_key_fails() {
        let mut registry = MemoryRegistry::new();
        registry.create_key(r"HKLM\Software\Locked").unwrap();
        registry.deny(r"HKLM\Software\Locked").unwrap();

        let err = registry.list(r"HKLM\Software\Locked").await.unwrap_err();
        assert!(err.is_lookup_failure());
        assert!(!err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_many_fails_if_any_path_missing() {
        let registry = MemoryRegistry::new().with_key(r"HKLM\Software").unwrap();
        let paths = vec![r"HKLM\Software".to_string(), r"HKCU\Software".to_string()];
        assert!(registry.list_many(&paths).await.is_err());

        let paths = vec![r"HKLM\Software".to_string(), "HKLM".to_string()];
        let listing = registry.list_many(&paths).await.unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing["HKLM"].keys, vec!["Software".to_string()]);
    }
}
