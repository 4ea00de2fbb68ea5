//! Live registry access.
//!
//! # Platform Behavior
//! - **Windows**: Reads through the Win32 registry API (`RegOpenKeyExW`,
//!   `RegEnumKeyExW`, `RegEnumValueW`) on a blocking task
//! - **Other platforms**: Every listing fails with a lookup error

use super::path::RegistryPath;
use super::{RegistryKey, RegistryReader};
use crate::error::{OpenWithError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::trace;

/// Reader for the registry of the running machine.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRegistry;

impl SystemRegistry {
    pub fn new() -> Self {
        Self
    }
}

fn read_key(path: &str) -> Result<RegistryKey> {
    let parsed = RegistryPath::parse(path)?;
    trace!("Opening registry key {}", parsed);

    #[cfg(windows)]
    {
        win32::read_key(&parsed).map_err(|e| OpenWithError::lookup(path, e))
    }

    #[cfg(not(windows))]
    {
        let _ = parsed;
        let err = std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "registry not available on this platform",
        );
        Err(OpenWithError::lookup(path, err))
    }
}

#[async_trait]
impl RegistryReader for SystemRegistry {
    async fn list_many(&self, paths: &[String]) -> Result<HashMap<String, RegistryKey>> {
        let paths = paths.to_vec();

        // Registry calls block; keep them off the async workers
        tokio::task::spawn_blocking(move || {
            paths
                .into_iter()
                .map(|path| -> Result<(String, RegistryKey)> {
                    let key = read_key(&path)?;
                    Ok((path, key))
                })
                .collect::<Result<HashMap<_, _>>>()
        })
        .await
        .map_err(|e| OpenWithError::Other(format!("Registry read task failed: {}", e)))?
    }
}

/// Buffer length to retry with after `ERROR_MORE_DATA`.
///
/// At least doubles `current`, and covers `required` when the API reported it.
#[cfg_attr(not(windows), allow(dead_code))]
fn next_buffer_len(current: usize, required: usize) -> usize {
    required.max(current.saturating_mul(2)).max(1)
}

#[cfg(windows)]
mod win32 {
    // FFI boundary with the Win32 registry API.
    #![allow(unsafe_code)]

    use super::next_buffer_len;
    use super::super::path::{Hive, RegistryPath};
    use super::super::{RegistryData, RegistryKey};
    use std::collections::BTreeMap;
    use std::io;
    use std::ptr;
    use windows_sys::Win32::Foundation::{ERROR_MORE_DATA, ERROR_NO_MORE_ITEMS, ERROR_SUCCESS};
    use windows_sys::Win32::System::Registry::{
        RegCloseKey, RegEnumKeyExW, RegEnumValueW, RegOpenKeyExW, RegQueryInfoKeyW, HKEY,
        HKEY_CLASSES_ROOT, HKEY_CURRENT_CONFIG, HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, HKEY_USERS,
        KEY_READ,
    };

    /// Open key handle, closed on drop.
    struct OwnedKey(HKEY);

    impl Drop for OwnedKey {
        fn drop(&mut self) {
            // SAFETY: the handle came from a successful RegOpenKeyExW and is
            // closed exactly once here.
            unsafe {
                RegCloseKey(self.0);
            }
        }
    }

    fn hive_handle(hive: Hive) -> HKEY {
        match hive {
            Hive::ClassesRoot => HKEY_CLASSES_ROOT,
            Hive::CurrentUser => HKEY_CURRENT_USER,
            Hive::LocalMachine => HKEY_LOCAL_MACHINE,
            Hive::Users => HKEY_USERS,
            Hive::CurrentConfig => HKEY_CURRENT_CONFIG,
        }
    }

    fn to_wide(s: &str) -> Vec<u16> {
        s.encode_utf16().chain(std::iter::once(0)).collect()
    }

    fn check(status: u32) -> io::Result<()> {
        if status == ERROR_SUCCESS {
            Ok(())
        } else {
            Err(io::Error::from_raw_os_error(status as i32))
        }
    }

    fn open(path: &RegistryPath) -> io::Result<OwnedKey> {
        let subkey = to_wide(&path.subkey);
        let mut handle: HKEY = ptr::null_mut();

        // SAFETY: `subkey` is NUL-terminated and outlives the call; `handle`
        // is a valid out pointer.
        let status = unsafe {
            RegOpenKeyExW(
                hive_handle(path.hive),
                subkey.as_ptr(),
                0,
                KEY_READ,
                &mut handle,
            )
        };
        check(status)?;
        Ok(OwnedKey(handle))
    }

    struct KeyInfo {
        subkeys: u32,
        max_subkey_len: u32,
        values: u32,
        max_value_name_len: u32,
        max_value_len: u32,
    }

    fn query_info(key: &OwnedKey) -> io::Result<KeyInfo> {
        let mut info = KeyInfo {
            subkeys: 0,
            max_subkey_len: 0,
            values: 0,
            max_value_name_len: 0,
            max_value_len: 0,
        };

        // SAFETY: all non-null pointers reference live locals; unused outputs
        // are null, which the API permits.
        let status = unsafe {
            RegQueryInfoKeyW(
                key.0,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null(),
                &mut info.subkeys,
                &mut info.max_subkey_len,
                ptr::null_mut(),
                &mut info.values,
                &mut info.max_value_name_len,
                &mut info.max_value_len,
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check(status)?;
        Ok(info)
    }

    fn enum_subkeys(key: &OwnedKey, info: &KeyInfo) -> io::Result<Vec<String>> {
        let mut names = Vec::with_capacity(info.subkeys as usize);
        let mut buf = vec![0u16; info.max_subkey_len as usize + 1];
        let mut index = 0;

        while index < info.subkeys {
            let mut len = buf.len() as u32;
            // SAFETY: `buf` holds `len` u16 slots; other outputs are null.
            let status = unsafe {
                RegEnumKeyExW(
                    key.0,
                    index,
                    buf.as_mut_ptr(),
                    &mut len,
                    ptr::null(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                    ptr::null_mut(),
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status == ERROR_MORE_DATA {
                // Key changed since RegQueryInfoKeyW; retry this index
                let grown = next_buffer_len(buf.len(), 0);
                buf.resize(grown, 0);
                continue;
            }
            check(status)?;
            names.push(String::from_utf16_lossy(&buf[..len as usize]));
            index += 1;
        }

        Ok(names)
    }

    fn enum_values(key: &OwnedKey, info: &KeyInfo) -> io::Result<BTreeMap<String, RegistryData>> {
        let mut values = BTreeMap::new();
        let mut name_buf = vec![0u16; info.max_value_name_len as usize + 1];
        let mut data_buf = vec![0u8; info.max_value_len as usize];
        let mut index = 0;

        while index < info.values {
            let mut name_len = name_buf.len() as u32;
            let mut data_len = data_buf.len() as u32;
            let mut value_type = 0u32;

            // SAFETY: both buffers are sized by the lengths passed alongside
            // them; `value_type` is a valid out pointer.
            let status = unsafe {
                RegEnumValueW(
                    key.0,
                    index,
                    name_buf.as_mut_ptr(),
                    &mut name_len,
                    ptr::null(),
                    &mut value_type,
                    data_buf.as_mut_ptr(),
                    &mut data_len,
                )
            };
            if status == ERROR_NO_MORE_ITEMS {
                break;
            }
            if status == ERROR_MORE_DATA {
                // Either buffer may be short; `data_len` holds the needed
                // data size when the name fit
                let name_grown = next_buffer_len(name_buf.len(), 0);
                let data_grown = next_buffer_len(data_buf.len(), data_len as usize);
                name_buf.resize(name_grown, 0);
                data_buf.resize(data_grown, 0);
                continue;
            }
            check(status)?;

            let name = String::from_utf16_lossy(&name_buf[..name_len as usize]);
            let data = RegistryData::from_raw(value_type, &data_buf[..data_len as usize]);
            values.insert(name, data);
            index += 1;
        }

        Ok(values)
    }

    pub(super) fn read_key(path: &RegistryPath) -> io::Result<RegistryKey> {
        let key = open(path)?;
        let info = query_info(&key)?;
        Ok(RegistryKey {
            keys: enum_subkeys(&key, &info)?,
            values: enum_values(&key, &info)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_buffer_len_grows() {
        assert_eq!(next_buffer_len(0, 0), 1);
        assert_eq!(next_buffer_len(16, 0), 32);
        assert_eq!(next_buffer_len(16, 100), 100);
        assert_eq!(next_buffer_len(64, 10), 128);
    }

    #[tokio::test]
    async fn test_invalid_path_fails_before_reading() {
        let err = SystemRegistry::new()
            .list(r"NOT_A_HIVE\Software")
            .await
            .unwrap_err();
        assert!(matches!(err, OpenWithError::InvalidPath { .. }));
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_unavailable_off_windows() {
        let err = SystemRegistry::new().list(r"HKCU\Software").await.unwrap_err();
        assert!(err.is_lookup_failure());
        assert!(!err.is_not_found());
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_reads_current_user_software() {
        let key = SystemRegistry::new().list(r"HKCU\Software").await.unwrap();
        assert!(!key.keys.is_empty());
    }

    #[cfg(windows)]
    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let err = SystemRegistry::new()
            .list(r"HKCU\Software\openwith-test-key-that-does-not-exist")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
