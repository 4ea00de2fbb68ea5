//! Parsing of textual registry paths.

use crate::error::{OpenWithError, Result};
use std::fmt;

/// Registry root hive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hive {
    ClassesRoot,
    CurrentUser,
    LocalMachine,
    Users,
    CurrentConfig,
}

impl Hive {
    /// Parse either the short (`HKCU`) or long (`HKEY_CURRENT_USER`) form.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "HKCR" | "HKEY_CLASSES_ROOT" => Some(Hive::ClassesRoot),
            "HKCU" | "HKEY_CURRENT_USER" => Some(Hive::CurrentUser),
            "HKLM" | "HKEY_LOCAL_MACHINE" => Some(Hive::LocalMachine),
            "HKU" | "HKEY_USERS" => Some(Hive::Users),
            "HKCC" | "HKEY_CURRENT_CONFIG" => Some(Hive::CurrentConfig),
            _ => None,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Hive::ClassesRoot => "HKCR",
            Hive::CurrentUser => "HKCU",
            Hive::LocalMachine => "HKLM",
            Hive::Users => "HKU",
            Hive::CurrentConfig => "HKCC",
        }
    }
}

/// A hive plus a backslash-separated subkey path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryPath {
    pub hive: Hive,
    /// Subkey below the hive; empty for the hive itself.
    pub subkey: String,
}

impl RegistryPath {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim_matches('\\');
        let (hive_name, subkey) = match trimmed.split_once('\\') {
            Some((hive, rest)) => (hive, rest),
            None => (trimmed, ""),
        };

        let hive = Hive::parse(hive_name).ok_or_else(|| OpenWithError::InvalidPath {
            path: path.to_string(),
            reason: format!("unknown hive '{}'", hive_name),
        })?;

        if subkey.split('\\').any(str::is_empty) && !subkey.is_empty() {
            return Err(OpenWithError::InvalidPath {
                path: path.to_string(),
                reason: "empty path segment".to_string(),
            });
        }

        Ok(Self {
            hive,
            subkey: subkey.to_string(),
        })
    }

    /// Case-folded form used to compare paths; the registry ignores case.
    pub fn canonical(&self) -> String {
        self.to_string().to_lowercase()
    }

    /// Parent path, or `None` at the hive root.
    pub fn parent(&self) -> Option<RegistryPath> {
        if self.subkey.is_empty() {
            return None;
        }
        let subkey = match self.subkey.rsplit_once('\\') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };
        Some(RegistryPath {
            hive: self.hive,
            subkey,
        })
    }

    /// Last path segment, or `None` at the hive root.
    pub fn leaf(&self) -> Option<&str> {
        if self.subkey.is_empty() {
            return None;
        }
        Some(
            self.subkey
                .rsplit_once('\\')
                .map(|(_, leaf)| leaf)
                .unwrap_or(&self.subkey),
        )
    }
}

impl fmt::Display for RegistryPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subkey.is_empty() {
            f.write_str(self.hive.short_name())
        } else {
            write!(f, r"{}\{}", self.hive.short_name(), self.subkey)
        }
    }
}
