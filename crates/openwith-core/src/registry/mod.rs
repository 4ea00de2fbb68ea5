//! Registry reader abstraction.
//!
//! The resolver only needs to list keys: the subkey names and the values
//! stored directly under a path. [`RegistryReader`] is that seam, with two
//! implementations:
//! - [`SystemRegistry`] - the live Windows registry
//! - [`MemoryRegistry`] - an in-memory tree for tests and snapshots
//!
//! Paths are written the way `reg.exe` prints them, e.g.
//! `HKCU\Software\Classes\Applications`.

mod memory;
mod path;
mod windows;

pub use memory::MemoryRegistry;
pub use path::{Hive, RegistryPath};
pub use windows::SystemRegistry;

use crate::error::{OpenWithError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

// Raw value type codes as stored by Windows.
const REG_NONE: u32 = 0;
const REG_SZ: u32 = 1;
const REG_EXPAND_SZ: u32 = 2;
const REG_DWORD: u32 = 4;
const REG_MULTI_SZ: u32 = 7;
const REG_QWORD: u32 = 11;

/// Data stored in a registry value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryData {
    None,
    String(String),
    ExpandString(String),
    MultiString(Vec<String>),
    Dword(u32),
    Qword(u64),
    Binary(Vec<u8>),
}

impl RegistryData {
    /// Decode raw value bytes for the given value type.
    ///
    /// String types are UTF-16LE with optional trailing NULs. Unknown types
    /// and numeric values with short buffers fall back to `Binary`.
    pub fn from_raw(value_type: u32, bytes: &[u8]) -> Self {
        match value_type {
            REG_NONE => RegistryData::None,
            REG_SZ => RegistryData::String(decode_utf16(bytes)),
            REG_EXPAND_SZ => RegistryData::ExpandString(decode_utf16(bytes)),
            REG_MULTI_SZ => {
                let joined = decode_utf16_raw(bytes);
                let parts = joined
                    .split('\0')
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
                RegistryData::MultiString(parts)
            }
            REG_DWORD if bytes.len() >= 4 => {
                RegistryData::Dword(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            REG_QWORD if bytes.len() >= 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&bytes[..8]);
                RegistryData::Qword(u64::from_le_bytes(buf))
            }
            _ => RegistryData::Binary(bytes.to_vec()),
        }
    }

    /// Returns the text of `REG_SZ` and `REG_EXPAND_SZ` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RegistryData::String(s) | RegistryData::ExpandString(s) => Some(s),
            _ => None,
        }
    }
}

fn decode_utf16_raw(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_utf16(bytes: &[u8]) -> String {
    let mut text = decode_utf16_raw(bytes);
    let trimmed = text.trim_end_matches('\0').len();
    text.truncate(trimmed);
    text
}

/// Contents of one listed key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryKey {
    /// Names of the direct subkeys.
    pub keys: Vec<String>,
    /// Values stored under the key. The default value has the empty name.
    pub values: BTreeMap<String, RegistryData>,
}

impl RegistryKey {
    /// The key's default (unnamed) value, if set.
    pub fn default_value(&self) -> Option<&RegistryData> {
        self.values.get("")
    }

    /// Exact, case-sensitive subkey name match.
    pub fn has_subkey(&self, name: &str) -> bool {
        self.keys.iter().any(|k| k == name)
    }
}

/// Read access to a registry.
///
/// Implementations fail with [`OpenWithError::LookupFailure`] when a path does
/// not exist or cannot be opened.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// List several keys in one read, keyed by the requested path string.
    ///
    /// The whole read fails if any one path cannot be listed.
    async fn list_many(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>>;

    /// List a single key.
    async fn list(&self, path: &str) -> Result<RegistryKey> {
        let mut listing = self.list_many(&[path.to_string()]).await?;
        listing
            .remove(path)
            .ok_or_else(|| OpenWithError::key_not_found(path))
    }

    /// Like [`list_many`](Self::list_many), but a missing path lists as an
    /// empty key instead of failing the read.
    ///
    /// Tries the batched read first and only lists paths one by one when
    /// the batch reports a missing key. Other errors still fail the read.
    async fn list_many_or_default(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>> {
        match self.list_many(paths).await {
            Err(e) if e.is_not_found() => {}
            other => return other,
        }

        let mut listing = HashMap::with_capacity(paths.len());
        for path in paths {
            let key = match self.list(path).await {
                Ok(key) => key,
                Err(e) if e.is_not_found() => RegistryKey::default(),
                Err(e) => return Err(e),
            };
            listing.insert(path.clone(), key);
        }
        Ok(listing)
    }
}

#[async_trait]
impl<R: RegistryReader + ?Sized> RegistryReader for Arc<R> {
    async fn list_many(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>> {
        (**self).list_many(paths).await
    }
}

#[async_trait]
impl<'a, R: RegistryReader + ?Sized> RegistryReader for &'a R {
    async fn list_many(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>> {
        (**self).list_many(paths).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn test_decode_string_strips_nul() {
        let bytes = utf16("\"C:\\Windows\\notepad.exe\" %1\0");
        assert_eq!(
            RegistryData::from_raw(REG_SZ, &bytes),
            RegistryData::String("\"C:\\Windows\\notepad.exe\" %1".into())
        );
    }

    #[test]
    fn test_decode_expand_string() {
        let bytes = utf16("%SystemRoot%\\notepad.exe %1\0");
        let data = RegistryData::from_raw(REG_EXPAND_SZ, &bytes);
        assert_eq!(data.as_str(), Some("%SystemRoot%\\notepad.exe %1"));
    }

    #[test]
    fn test_decode_multi_string() {
        let bytes = utf16("a\0b\0\0");
        assert_eq!(
            RegistryData::from_raw(REG_MULTI_SZ, &bytes),
            RegistryData::MultiString(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(
            RegistryData::from_raw(REG_DWORD, &7u32.to_le_bytes()),
            RegistryData::Dword(7)
        );
        assert_eq!(
            RegistryData::from_raw(REG_QWORD, &9u64.to_le_bytes()),
            RegistryData::Qword(9)
        );
        // Truncated DWORD falls back to raw bytes
        assert_eq!(
            RegistryData::from_raw(REG_DWORD, &[1, 2]),
            RegistryData::Binary(vec![1, 2])
        );
    }

    #[test]
    fn test_non_string_data_has_no_text() {
        assert_eq!(RegistryData::Dword(1).as_str(), None);
        assert_eq!(RegistryData::None.as_str(), None);
    }

    #[test]
    fn test_default_value_and_subkeys() {
        let mut key = RegistryKey::default();
        key.keys.push("Foo.exe".into());
        key.values
            .insert(String::new(), RegistryData::String("cmd".into()));

        assert_eq!(key.default_value().and_then(RegistryData::as_str), Some("cmd"));
        assert!(key.has_subkey("Foo.exe"));
        assert!(!key.has_subkey("foo.exe"));
    }

    #[test]
    fn test_unknown_type_decodes_as_binary() {
        assert_eq!(
            RegistryData::from_raw(3, &[0xde, 0xad]),
            RegistryData::Binary(vec![0xde, 0xad])
        );
        assert_eq!(
            RegistryData::from_raw(42, &[1]),
            RegistryData::Binary(vec![1])
        );
    }

    #[tokio::test]
    async fn test_list_many_or_default_fills_missing_paths() {
        let registry = MemoryRegistry::new()
            .with_key(r"HKLM\Software\Classes\Applications\notepad.exe")
            .unwrap();
        let paths = vec![
            r"HKCU\Software\Classes\Applications".to_string(),
            r"HKLM\Software\Classes\Applications".to_string(),
        ];

        assert!(registry.list_many(&paths).await.is_err());

        let listing = registry.list_many_or_default(&paths).await.unwrap();
        assert_eq!(listing[&paths[0]], RegistryKey::default());
        assert_eq!(listing[&paths[1]].keys, vec!["notepad.exe".to_string()]);
    }

    #[tokio::test]
    async fn test_list_many_or_default_keeps_other_errors() {
        let mut registry = MemoryRegistry::new();
        registry.create_key(r"HKLM\Software\Locked").unwrap();
        registry.deny(r"HKLM\Software\Locked").unwrap();
        let paths = vec![
            r"HKCU\Software\Missing".to_string(),
            r"HKLM\Software\Locked".to_string(),
        ];

        let err = registry.list_many_or_default(&paths).await.unwrap_err();
        assert!(err.is_lookup_failure());
        assert!(!err.is_not_found());
    }
}
