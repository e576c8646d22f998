//! # Host Session Abstraction
//!
//! Everything the action does to the outside world — installer property traffic and
//! file-system writes — goes through [`SessionOps`], so the recording logic can be
//! exercised against a mock instead of a live installer run.
//!
//! Implementations:
//! - [`LocalSession`]: standalone command-line runs; properties resolve from the
//!   process environment.
//! - `MsiSession` (Windows only, in the `msi` module): a live `MSIHANDLE`.
//! - [`MockSession`]: tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use log::error;

/// Abstraction over the host installer session and the file system.
pub trait SessionOps {
    /// Look up a session property by name.
    fn property(&self, name: &str) -> Result<String>;

    /// Publish a property back to the host. This is the error channel: the failure
    /// message of a failed action travels through it.
    fn set_property(&self, name: &str, value: &str) -> Result<()>;

    /// Create (or overwrite) a text file.
    fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Read a text file.
    fn read_file(&self, path: &Path) -> Result<String>;

    /// Delete a file.
    fn remove_file(&self, path: &Path) -> Result<()>;

    /// Check that a file exists.
    fn path_exists(&self, path: &Path) -> bool;

    /// Check that a directory exists.
    fn dir_exists(&self, path: &Path) -> bool;
}

/// Session for standalone command-line runs.
///
/// Properties resolve from explicitly seeded values first (e.g. configuration data
/// taken from the command line), then from the process environment. Published
/// properties are logged — there is no installer around to carry them — and retained
/// for inspection.
#[derive(Debug, Default)]
pub struct LocalSession {
    properties: Mutex<HashMap<String, String>>,
}

impl LocalSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a property before the action runs.
    pub fn with_property(name: &str, value: &str) -> Self {
        let session = Self::default();
        session
            .properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        session
    }

    /// Returns a seeded or published property, if any.
    pub fn published(&self, name: &str) -> Option<String> {
        self.properties.lock().unwrap().get(name).cloned()
    }
}

impl SessionOps for LocalSession {
    fn property(&self, name: &str) -> Result<String> {
        if let Some(value) = self.properties.lock().unwrap().get(name) {
            return Ok(value.clone());
        }
        std::env::var(name).with_context(|| format!("property '{name}' is not set"))
    }

    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        // No installer session to carry the property; log it so the outcome is
        // visible to whoever invoked us.
        error!("{name}={value}");
        self.properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        use std::io::Write;
        let mut file = std::fs::File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        file.write_all(content.as_bytes())
            .with_context(|| format!("cannot write {}", path.display()))?;
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        std::fs::remove_file(path).with_context(|| format!("cannot remove {}", path.display()))
    }

    fn path_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

/// A mock host for testing.
///
/// Properties and files live in `Mutex`-guarded maps; directories are whatever the
/// test registers. Nothing touches the real system.
#[derive(Debug, Default)]
pub struct MockSession {
    pub properties: Mutex<HashMap<String, String>>,
    pub files: Mutex<HashMap<PathBuf, String>>,
    pub directories: Mutex<Vec<PathBuf>>,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(name: &str, value: &str) -> Self {
        let session = Self::default();
        session
            .properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        session
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.into(), content.to_string());
    }

    pub fn add_directory(&self, path: impl Into<PathBuf>) {
        self.directories.lock().unwrap().push(path.into());
    }

    /// Content of a mock file, if present.
    pub fn file(&self, path: &Path) -> Option<String> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Value of a mock property, if present.
    pub fn property_value(&self, name: &str) -> Option<String> {
        self.properties.lock().unwrap().get(name).cloned()
    }
}

impl SessionOps for MockSession {
    fn property(&self, name: &str) -> Result<String> {
        self.properties
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("property '{name}' not found in mock session"))
    }

    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        self.properties
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("file {} not found in mock session", path.display()))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("file {} not found in mock session", path.display()))
    }

    fn path_exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn dir_exists(&self, path: &Path) -> bool {
        self.directories.lock().unwrap().contains(&path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_property_wins_over_environment() {
        let session = LocalSession::with_property("SW_TEST_SEEDED", "from-cli");
        assert_eq!(session.property("SW_TEST_SEEDED").unwrap(), "from-cli");
    }

    #[test]
    fn missing_property_is_an_error() {
        let session = LocalSession::new();
        assert!(session.property("SW_TEST_DEFINITELY_NOT_SET").is_err());
    }

    #[test]
    fn published_property_is_retained() {
        let session = LocalSession::new();
        session.set_property("SW_TEST_ERROR", "boom").unwrap();
        assert_eq!(session.published("SW_TEST_ERROR").as_deref(), Some("boom"));
    }

    #[test]
    fn local_session_round_trips_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("SpectrumWorx.paths");
        let session = LocalSession::new();

        session.write_file(&file, "root\npresets").unwrap();
        assert!(session.path_exists(&file));
        assert!(session.dir_exists(dir.path()));
        assert_eq!(session.read_file(&file).unwrap(), "root\npresets");

        session.remove_file(&file).unwrap();
        assert!(!session.path_exists(&file));
        assert!(session.read_file(&file).is_err());
    }

    #[test]
    fn mock_session_tracks_files_and_directories() {
        let session = MockSession::new();
        session.add_directory(r"D:\Support");
        session.write_file(Path::new(r"C:\VST24\SpectrumWorx.paths"), "x").unwrap();

        assert!(session.path_exists(Path::new(r"C:\VST24\SpectrumWorx.paths")));
        assert!(session.dir_exists(Path::new(r"D:\Support")));
        assert!(!session.dir_exists(Path::new(r"D:\Other")));

        session.remove_file(Path::new(r"C:\VST24\SpectrumWorx.paths")).unwrap();
        assert!(!session.path_exists(Path::new(r"C:\VST24\SpectrumWorx.paths")));
    }
}
