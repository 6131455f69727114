//! Best-effort persistence of the last known toggle snapshot.
//!
//! The backup lets a client start with the toggles it last saw, even if the server is down at
//! startup. Only one client should run against a given backup file at a time: writers from
//! different processes are not synchronized with each other.
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use crate::{Result, ToggleSnapshot};

/// A single backup file on local storage.
#[derive(Debug, Clone)]
pub struct BackupStore {
    path: PathBuf,
}

impl BackupStore {
    /// Name of the backup file inside the default (temporary) directory.
    pub const DEFAULT_FILE_NAME: &'static str = "unleash-repo.json";

    pub fn new(path: impl Into<PathBuf>) -> BackupStore {
        BackupStore { path: path.into() }
    }

    /// Default backup location: a well-known file in the system temporary directory.
    pub fn default_path() -> PathBuf {
        std::env::temp_dir().join(BackupStore::DEFAULT_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the backed-up snapshot.
    ///
    /// Never fails: a missing, unreadable, or corrupt file yields an empty snapshot.
    pub fn load(&self) -> ToggleSnapshot {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::info!(target: "unleash", path:? = self.path; "no backup file found, starting with no toggles");
                return ToggleSnapshot::empty();
            }
            Err(err) => {
                log::warn!(target: "unleash", path:? = self.path; "unable to read backup file: {:?}", err);
                return ToggleSnapshot::empty();
            }
        };

        match ToggleSnapshot::from_json(&bytes) {
            Ok(snapshot) => {
                log::info!(target: "unleash", path:? = self.path, toggles = snapshot.len(); "loaded toggles from backup");
                snapshot
            }
            Err(err) => {
                log::warn!(target: "unleash", path:? = self.path; "backup file is corrupt, ignoring it: {:?}", err);
                ToggleSnapshot::empty()
            }
        }
    }

    /// Persist `snapshot`.
    ///
    /// Failures are logged and swallowed: the in-memory cache stays valid regardless.
    pub fn save(&self, snapshot: &ToggleSnapshot) {
        if let Err(err) = self.try_save(snapshot) {
            log::warn!(target: "unleash", path:? = self.path; "unable to write backup file: {:?}", err);
        }
    }

    /// Write to a sibling temporary file, then rename it over the target, so that readers never
    /// see a half-written backup.
    fn try_save(&self, snapshot: &ToggleSnapshot) -> Result<()> {
        let bytes = snapshot.to_json()?;

        let tmp_path = self.tmp_path();
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }

        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err.into());
        }

        log::debug!(target: "unleash", path:? = self.path; "saved toggles backup");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        file_name.push(".tmp");
        self.path.with_file_name(file_name)
    }
}

impl Default for BackupStore {
    fn default() -> BackupStore {
        BackupStore::new(BackupStore::default_path())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, fs};

    use super::BackupStore;
    use crate::{Toggle, ToggleSnapshot};

    fn tuples(snapshot: &ToggleSnapshot) -> Vec<Toggle> {
        let mut toggles: Vec<Toggle> = snapshot.toggles().cloned().collect();
        toggles.sort_by(|a, b| a.name.cmp(&b.name));
        toggles
    }

    #[test]
    fn save_then_load_returns_same_toggles() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backup.json"));

        let snapshot = ToggleSnapshot::new([
            Toggle::new("a", true, "default"),
            Toggle::new("b", false, "custom").with_parameters(HashMap::from([(
                "percentage".to_owned(),
                "50".to_owned(),
            )])),
            Toggle::new("c", true, "no-such-strategy"),
        ]);

        store.save(&snapshot);
        let loaded = store.load();

        assert_eq!(tuples(&loaded), tuples(&snapshot));
    }

    #[test]
    fn save_overwrites_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("backup.json"));

        store.save(&ToggleSnapshot::new([Toggle::new("old", true, "default")]));
        store.save(&ToggleSnapshot::new([Toggle::new("new", true, "default")]));

        let loaded = store.load();
        assert!(loaded.get("old").is_none());
        assert!(loaded.get("new").is_some());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("does-not-exist.json"));

        assert!(store.load().is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        fs::write(&path, b"{\"features\": [ {\"name\": ").unwrap();

        assert!(BackupStore::new(path).load().is_empty());
    }

    #[test]
    fn unreadable_path_loads_empty() {
        let dir = tempfile::tempdir().unwrap();

        // A directory cannot be read as a file.
        assert!(BackupStore::new(dir.path()).load().is_empty());
    }

    #[test]
    fn failed_save_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let store = BackupStore::new(dir.path().join("missing-dir").join("backup.json"));

        store.save(&ToggleSnapshot::new([Toggle::new("a", true, "default")]));

        assert!(store.load().is_empty());
    }
}
