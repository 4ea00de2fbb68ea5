//! openwith - find the Windows applications registered to open a file extension.
//!
//! A lookup reads the current user's Explorer `OpenWithList` for the
//! extension, then resolves each listed application's `shell\open\command`
//! from the per-user or machine-wide application classes. Applications whose
//! command cannot be resolved are left out of the result.
//!
//! # Example
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> openwith::Result<()> {
//!     let apps = openwith::get_apps_that_can_open_extension(".txt").await?;
//!     for app in apps {
//!         println!("{}: {}", app.name, app.command);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Registry access goes through [`RegistryReader`]; use [`MemoryRegistry`]
//! with [`ExtensionAppResolver`] to run lookups against a prepared tree.

pub mod config;
pub mod error;
pub mod extension;
pub mod models;
pub mod registry;
pub mod resolver;

// Re-export commonly used types
pub use config::{RegistryLayout, ResolverConfig};
pub use error::{OpenWithError, Result};
pub use extension::ExtensionKey;
pub use models::AppDescriptor;
pub use registry::{
    Hive, MemoryRegistry, RegistryData, RegistryKey, RegistryPath, RegistryReader, SystemRegistry,
};
pub use resolver::{collect_candidates, CandidateEntry, ExtensionAppResolver};

/// Get the apps registered to open `extension` on this machine.
///
/// Shorthand for [`ExtensionAppResolver::resolve`] over [`SystemRegistry`].
pub async fn get_apps_that_can_open_extension(extension: &str) -> Result<Vec<AppDescriptor>> {
    ExtensionAppResolver::new(SystemRegistry::new())
        .resolve(extension)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_extension_is_rejected() {
        let err = get_apps_that_can_open_extension("").await.unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[cfg(not(windows))]
    #[tokio::test]
    async fn test_lookup_fails_without_registry() {
        let err = get_apps_that_can_open_extension(".txt").await.unwrap_err();
        assert!(err.is_lookup_failure());
    }
}
