//! The active content version.
//!
//! Exactly one version is active at a time. It survives restarts through
//! a small JSON file and can be overridden by a share link's `v`
//! parameter. Changing it does not touch the cache; callers go through
//! [`Orchestrator::switch_version`](crate::Orchestrator::switch_version)
//! for that.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use valentine_core::share_link;
use valentine_core::Version;

use crate::error::ClientResult;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedVersion {
    active_version: Version,
}

/// Single source of truth for the active version.
///
/// Share via `Arc<VersionStore>`; observers call [`subscribe`](Self::subscribe)
/// to be told about changes.
pub struct VersionStore {
    path: Option<PathBuf>,
    sender: watch::Sender<Version>,
}

impl VersionStore {
    /// A store that keeps the version in memory only.
    pub fn in_memory(initial: Version) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { path: None, sender }
    }

    /// Open the store persisted at `path`.
    ///
    /// A missing or unreadable file yields the default version; the file
    /// is only written on the first change.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let initial = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<PersistedVersion>(&raw) {
                Ok(persisted) => persisted.active_version,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Ignoring unreadable version store",
                    );
                    Version::default()
                }
            },
            Err(_) => Version::default(),
        };
        tracing::debug!(path = %path.display(), version = %initial, "Loaded active version");

        let (sender, _) = watch::channel(initial);
        Self {
            path: Some(path),
            sender,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The currently active version.
    pub fn active(&self) -> Version {
        self.sender.borrow().clone()
    }

    /// Receiver notified on every change of the active version.
    pub fn subscribe(&self) -> watch::Receiver<Version> {
        self.sender.subscribe()
    }

    /// Make `version` active and persist it. Returns whether it changed.
    pub fn set_active(&self, version: Version) -> ClientResult<bool> {
        if *self.sender.borrow() == version {
            return Ok(false);
        }
        self.persist(&version)?;
        self.sender.send_replace(version);
        Ok(true)
    }

    /// Apply the `v` parameter of a share link's query string.
    ///
    /// Blank or missing values are ignored. Returns the version applied.
    /// Like [`set_active`](Self::set_active) this leaves cached entries
    /// alone; once a client is running, use
    /// [`Orchestrator::open_share_link`](crate::Orchestrator::open_share_link)
    /// instead.
    pub fn initialize_from_url(&self, query: Option<&str>) -> ClientResult<Option<Version>> {
        let Some(version) = query.and_then(share_link::version_from_query) else {
            return Ok(None);
        };
        self.set_active(version.clone())?;
        Ok(Some(version))
    }

    fn persist(&self, version: &Version) -> ClientResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let body = serde_json::to_string_pretty(&PersistedVersion {
            active_version: version.clone(),
        })?;
        std::fs::write(path, body)?;
        Ok(())
    }
}

impl Default for VersionStore {
    fn default() -> Self {
        Self::in_memory(Version::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(label: &str) -> Version {
        Version::parse(label).unwrap()
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = VersionStore::load(dir.path().join("state/active.json"));
        assert_eq!(store.active().as_str(), "7");
    }

    #[test]
    fn active_version_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state/active.json");

        let store = VersionStore::load(&path);
        assert!(store.set_active(v("valentine-2025")).unwrap());
        assert!(!store.set_active(v("valentine-2025")).unwrap());

        let reopened = VersionStore::load(&path);
        assert_eq!(reopened.active(), v("valentine-2025"));
    }

    #[test]
    fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("active.json");
        std::fs::write(&path, "not json").unwrap();
        assert_eq!(VersionStore::load(&path).active(), Version::default());
    }

    #[test]
    fn url_parameter_overrides_when_present() {
        let store = VersionStore::default();
        assert_eq!(store.initialize_from_url(None).unwrap(), None);
        assert_eq!(store.initialize_from_url(Some("?v=%20%20")).unwrap(), None);
        assert_eq!(store.active().as_str(), "7");

        assert_eq!(
            store.initialize_from_url(Some("?v=%208%20")).unwrap(),
            Some(v("8"))
        );
        assert_eq!(store.active().as_str(), "8");
    }

    #[test]
    fn subscribers_see_changes() {
        let store = VersionStore::default();
        let mut rx = store.subscribe();
        store.set_active(v("9")).unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), v("9"));
    }
}
