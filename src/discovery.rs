//! # Discovery
//!
//! Locates an existing SpectrumWorx installation when the caller does not say where
//! it is. `doctor` and `remove` run on machines where the install happened long ago,
//! so the plugin directory is found the way a VST 2.x host would look for it:
//!
//! 1. The `SW_VST_DIR` environment override.
//! 2. The `VSTPluginsPath` value under `HKLM\SOFTWARE\VST` — the conventional VST 2.x
//!    plugin-directory registration (Windows only).
//! 3. Well-known plugin folders under Program Files.
//!
//! The first candidate directory that actually contains `SpectrumWorx.paths` wins.

use std::collections::HashSet;
use std::path::PathBuf;

use log::debug;

use crate::paths_file::PATHS_FILE_NAME;
use crate::session::SessionOps;

/// Environment variable overriding the plugin-directory lookup.
pub const VST_DIR_OVERRIDE: &str = "SW_VST_DIR";

/// Returns the locator file of the first discovered installation, if any.
pub fn locate_paths_file(session: &impl SessionOps) -> Option<PathBuf> {
    for dir in candidate_vst_directories() {
        let candidate = dir.join(PATHS_FILE_NAME);
        debug!("Probing {:?}", candidate);
        if session.path_exists(&candidate) {
            return Some(candidate);
        }
    }
    None
}

/// Plugin-directory candidates, most specific first, deduplicated.
pub fn candidate_vst_directories() -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    if let Ok(dir) = std::env::var(VST_DIR_OVERRIDE) {
        if !dir.is_empty() {
            candidates.push(PathBuf::from(dir));
        }
    }

    if let Some(dir) = registry_vst_directory() {
        candidates.push(dir);
    }

    // Steinberg's installer conventions; hosts scan these even when the registry
    // value was never written.
    for program_files in ["ProgramFiles", "ProgramFiles(x86)"] {
        if let Ok(root) = std::env::var(program_files) {
            candidates.push(PathBuf::from(&root).join("Steinberg").join("VstPlugins"));
            candidates.push(PathBuf::from(&root).join("Common Files").join("VST2"));
        }
    }

    dedupe_case_insensitive(candidates)
}

/// Reads the machine-wide VST 2.x plugin directory from the registry.
#[cfg(windows)]
fn registry_vst_directory() -> Option<PathBuf> {
    use windows_registry::LOCAL_MACHINE;

    let key = LOCAL_MACHINE.open(r"SOFTWARE\VST").ok()?;
    let dir = key
        .get_string("VSTPluginsPath")
        .ok()
        .filter(|s| !s.is_empty())?;
    Some(PathBuf::from(dir))
}

/// Off Windows there is no registry to consult; only the override and the
/// well-known folders remain.
#[cfg(not(windows))]
fn registry_vst_directory() -> Option<PathBuf> {
    None
}

/// Order-preserving dedupe. Windows paths compare case-insensitively.
fn dedupe_case_insensitive(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut unique: Vec<PathBuf> = Vec::new();
    for dir in dirs {
        let normalized = dir.to_string_lossy().to_lowercase();
        if seen.insert(normalized) {
            unique.push(dir);
        }
    }
    unique
}
