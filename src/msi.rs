//! # MSI Custom-Action Entry Points
//!
//! Built as a DLL, this crate *is* the custom action: the installer loads it and
//! calls [`RecordPaths`] (deferred, once the plugin files are laid down) and
//! [`RemovePaths`] (during uninstall). Both receive the live install session and
//! answer with the script-action status codes.
//!
//! Property traffic goes through the raw `Msi*` Win32 API; file traffic is the real
//! file system.

use std::path::Path;

use anyhow::{Context, Result, bail};
use windows::Win32::Foundation::{ERROR_MORE_DATA, ERROR_SUCCESS};
use windows::Win32::System::ApplicationInstallationAndServicing::{
    MSIHANDLE, MsiGetPropertyW, MsiSetPropertyW,
};
use windows::core::{PCWSTR, PWSTR};

use crate::action;
use crate::session::SessionOps;

/// A live Windows Installer session.
pub struct MsiSession {
    handle: MSIHANDLE,
}

impl MsiSession {
    pub fn new(handle: MSIHANDLE) -> Self {
        Self { handle }
    }
}

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

impl SessionOps for MsiSession {
    fn property(&self, name: &str) -> Result<String> {
        let name_w = to_wide(name);

        // First call sizes the value: MsiGetPropertyW reports the length (sans NUL)
        // and ERROR_MORE_DATA when the buffer is too small.
        let mut probe = [0u16; 1];
        let mut len: u32 = 0;
        let rc = unsafe {
            MsiGetPropertyW(
                self.handle,
                PCWSTR(name_w.as_ptr()),
                PWSTR(probe.as_mut_ptr()),
                &mut len,
            )
        };
        if rc != ERROR_SUCCESS.0 && rc != ERROR_MORE_DATA.0 {
            bail!("MsiGetPropertyW('{name}') failed with code {rc}");
        }

        let mut buf = vec![0u16; len as usize + 1];
        let mut cap = buf.len() as u32;
        let rc = unsafe {
            MsiGetPropertyW(
                self.handle,
                PCWSTR(name_w.as_ptr()),
                PWSTR(buf.as_mut_ptr()),
                &mut cap,
            )
        };
        if rc != ERROR_SUCCESS.0 {
            bail!("MsiGetPropertyW('{name}') failed with code {rc}");
        }

        let value = String::from_utf16_lossy(&buf[..cap as usize]);
        if value.is_empty() {
            // The installer answers with an empty string for unknown properties.
            bail!("property '{name}' is not set");
        }
        Ok(value)
    }

    fn set_property(&self, name: &str, value: &str) -> Result<()> {
        let name_w = to_wide(name);
        let value_w = to_wide(value);
        let rc = unsafe {
            MsiSetPropertyW(self.handle, PCWSTR(name_w.as_ptr()), PCWSTR(value_w.as_ptr()))
        };
        if rc != ERROR_SUCCESS.0 {
            bail!("MsiSetPropertyW('{name}') failed with code {rc}");
        }
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

/// Deferred install action: records the locator file next to the plugin binary.
///
/// `CustomActionData` must hold `<plugin dir>|<support dir>`. Returns 1 on success,
/// 3 on failure (failure details land in the `RecordPathsError` property).
#[unsafe(no_mangle)]
pub extern "system" fn RecordPaths(install: MSIHANDLE) -> u32 {
    let session = MsiSession::new(install);
    action::run_record(&session, false).code()
}

/// Uninstall action: removes the locator file. Returns 1 on success, 3 on failure.
#[unsafe(no_mangle)]
pub extern "system" fn RemovePaths(install: MSIHANDLE) -> u32 {
    let session = MsiSession::new(install);
    action::run_remove(&session, None, false).code()
}
