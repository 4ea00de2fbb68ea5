//! Data returned to callers.

use serde::{Deserialize, Serialize};

/// An application registered to open an extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Application identifier, e.g. `notepad.exe`.
    pub name: String,
    /// Registered shell-open command line.
    pub command: String,
}

impl AppDescriptor {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_name_and_command() {
        let app = AppDescriptor::new("notepad.exe", r#""C:\Windows\notepad.exe" %1"#);
        let json = serde_json::to_value(&app).unwrap();
        assert_eq!(json["name"], "notepad.exe");
        assert_eq!(json["command"], r#""C:\Windows\notepad.exe" %1"#);
    }
}
