//! Resolution of the applications registered for a file extension.
//!
//! A lookup walks three kinds of registry keys:
//! 1. `...\Explorer\FileExts\<ext>\OpenWithList` lists candidate app ids
//! 2. `Software\Classes\Applications` under HKCU and HKLM says which hive
//!    registers each app (HKCU wins)
//! 3. `<root>\<app>\shell\open\command` holds the launch command
//!
//! Failing to list step 1 fails the whole lookup. A missing root in step 2
//! counts as registering nothing. Other failures in steps 2 and 3 only drop
//! the affected candidate.

use crate::config::ResolverConfig;
use crate::error::{OpenWithError, Result};
use crate::extension::ExtensionKey;
use crate::models::AppDescriptor;
use crate::registry::{RegistryData, RegistryKey, RegistryReader};
use futures::future::join_all;
use serde_json::Value;
use tracing::debug;

/// An application id found under an extension's `OpenWithList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateEntry {
    /// Name of the value holding the id (`a`, `b`, ...).
    pub value_name: String,
    /// Application id, e.g. `notepad.exe`.
    pub app_name: String,
}

/// Collect candidates from an `OpenWithList` listing.
///
/// The value named `mru_list_value` is ordering metadata and is skipped, as
/// are values whose data is not a string.
pub fn collect_candidates(listing: &RegistryKey, mru_list_value: &str) -> Vec<CandidateEntry> {
    listing
        .values
        .iter()
        .filter(|(name, _)| name.as_str() != mru_list_value)
        .filter_map(|(name, data)| {
            data.as_str().map(|app| CandidateEntry {
                value_name: name.clone(),
                app_name: app.to_string(),
            })
        })
        .collect()
}

/// Looks up which applications can open a file extension.
///
/// Each call reads the registry afresh; nothing is cached between calls.
///
/// # Example
///
/// ```rust,ignore
/// use openwith::{ExtensionAppResolver, SystemRegistry};
///
/// let resolver = ExtensionAppResolver::new(SystemRegistry::new());
/// for app in resolver.resolve(".txt").await? {
///     println!("{} -> {}", app.name, app.command);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ExtensionAppResolver<R> {
    reader: R,
    config: ResolverConfig,
}

impl<R: RegistryReader> ExtensionAppResolver<R> {
    /// Create a resolver using the standard registry layout.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ResolverConfig::default())
    }

    pub fn with_config(reader: R, config: ResolverConfig) -> Self {
        Self { reader, config }
    }

    /// Resolve the applications registered for `extension`.
    ///
    /// # Errors
    /// - `InvalidArgument` if `extension` is empty; no registry read happens
    /// - `LookupFailure` if the extension's `OpenWithList` cannot be listed
    ///
    /// The order of the returned apps is unspecified.
    pub async fn resolve(&self, extension: &str) -> Result<Vec<AppDescriptor>> {
        let extension = ExtensionKey::new(extension)?;
        self.resolve_key(&extension).await
    }

    /// Like [`resolve`](Self::resolve), for untyped input.
    ///
    /// Fails with `InvalidArgument` for missing or non-string values.
    pub async fn resolve_json(&self, extension: &Value) -> Result<Vec<AppDescriptor>> {
        let extension = ExtensionKey::from_json(extension)?;
        self.resolve_key(&extension).await
    }

    /// Resolve an already validated extension.
    pub async fn resolve_key(&self, extension: &ExtensionKey) -> Result<Vec<AppDescriptor>> {
        debug!("Searching for apps that can open {}", extension);

        let ext_path = self.config.open_with_list_path(extension.as_str());
        let listing = self
            .reader
            .list(&ext_path)
            .await
            .map_err(OpenWithError::into_lookup_failure)?;
        debug!("Found OpenWithList values for {}: {:?}", extension, listing.values);

        let candidates = collect_candidates(&listing, &self.config.mru_list_value);
        let resolved = join_all(
            candidates
                .iter()
                .map(|candidate| self.resolve_candidate(&candidate.app_name)),
        )
        .await;

        let apps: Vec<AppDescriptor> = resolved.into_iter().flatten().collect();
        debug!(
            "Resolved {} of {} apps for {}: {:?}",
            apps.len(),
            candidates.len(),
            extension,
            apps
        );

        Ok(apps)
    }

    /// Resolve one candidate, absorbing any failure.
    async fn resolve_candidate(&self, app_name: &str) -> Option<AppDescriptor> {
        match self.try_resolve_candidate(app_name).await {
            Ok(Some(app)) => Some(app),
            Ok(None) => {
                debug!("No string command registered for {}", app_name);
                None
            }
            Err(e) => {
                debug!("Skipping {}: {}", app_name, e);
                None
            }
        }
    }

    async fn try_resolve_candidate(&self, app_name: &str) -> Result<Option<AppDescriptor>> {
        let roots = [
            self.config.current_user_applications.clone(),
            self.config.local_machine_applications.clone(),
        ];
        // A missing root lists as empty, so HKLM is used when HKCU has none
        let listing = self.reader.list_many_or_default(&roots).await?;

        let registered_for_user = listing
            .get(&self.config.current_user_applications)
            .map(|key| key.has_subkey(app_name))
            .unwrap_or(false);
        let root = if registered_for_user {
            &self.config.current_user_applications
        } else {
            &self.config.local_machine_applications
        };

        let command_path = self.config.command_path(root, app_name);
        debug!("Command path for {}: {}", app_name, command_path);

        let key = self.reader.list(&command_path).await?;
        let command = key
            .default_value()
            .and_then(RegistryData::as_str)
            .map(|command| AppDescriptor::new(app_name, command));

        if let Some(app) = &command {
            debug!("Resolved command for {}: {}", app.name, app.command);
        }

        Ok(command)
    }
}
