//! Centralized configuration for openwith.
//!
//! This module holds the registry layout the resolver walks. Nothing is read
//! from the environment.

use serde::{Deserialize, Serialize};

/// Registry locations consulted during a lookup.
pub struct RegistryLayout;

impl RegistryLayout {
    /// Per-user Explorer file extension associations.
    pub const FILE_EXTS_ROOT: &'static str =
        r"HKCU\Software\Microsoft\Windows\CurrentVersion\Explorer\FileExts";
    /// Subkey of an extension listing its "Open With" candidates.
    pub const OPEN_WITH_LIST: &'static str = "OpenWithList";
    /// Application classes under each hive.
    pub const CURRENT_USER_APPLICATIONS: &'static str = r"HKCU\Software\Classes\Applications";
    pub const LOCAL_MACHINE_APPLICATIONS: &'static str = r"HKLM\Software\Classes\Applications";
    /// Path from an application key to its launch command.
    pub const COMMAND_RELATIVE_PATH: &'static str = r"shell\open\command";
    /// Ordering metadata stored alongside the candidates.
    pub const MRU_LIST_VALUE: &'static str = "MRUList";
}

/// Paths used by [`ExtensionAppResolver`](crate::ExtensionAppResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub file_exts_root: String,
    pub open_with_list: String,
    /// Checked first when choosing where an application is registered.
    pub current_user_applications: String,
    pub local_machine_applications: String,
    pub command_relative_path: String,
    /// Value name skipped when enumerating candidates.
    pub mru_list_value: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            file_exts_root: RegistryLayout::FILE_EXTS_ROOT.to_string(),
            open_with_list: RegistryLayout::OPEN_WITH_LIST.to_string(),
            current_user_applications: RegistryLayout::CURRENT_USER_APPLICATIONS.to_string(),
            local_machine_applications: RegistryLayout::LOCAL_MACHINE_APPLICATIONS.to_string(),
            command_relative_path: RegistryLayout::COMMAND_RELATIVE_PATH.to_string(),
            mru_list_value: RegistryLayout::MRU_LIST_VALUE.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Path of the `OpenWithList` key for an extension.
    pub fn open_with_list_path(&self, extension: &str) -> String {
        format!(
            r"{}\{}\{}",
            self.file_exts_root, extension, self.open_with_list
        )
    }

    /// Path of the shell-open command key for an app under `root`.
    pub fn command_path(&self, root: &str, app_name: &str) -> String {
        format!(r"{}\{}\{}", root, app_name, self.command_relative_path)
    }
}
