//! # Locator File Format
//!
//! SpectrumWorx does not hardcode its installation layout. The installer drops a tiny
//! two-line text file, `SpectrumWorx.paths`, next to the plugin binary:
//!
//! ```text
//! D:\Support
//! D:\Support\Presets
//! ```
//!
//! Line one is the plugin's support root, line two its presets folder. At startup the
//! plugin maps this file and splits it at the *first* newline: everything before is
//! the root, everything after — to end of file — is the presets path. That parse rule
//! fixes two format invariants:
//!
//! - exactly one `\n`, joining exactly two lines;
//! - no trailing newline (it would become part of the presets path).
//!
//! This module owns the format: parsing the installer's raw configuration string,
//! composing the locator payload, and parsing a payload back for inspection.

use anyhow::{Result, bail};

use crate::invariants::assert_invariant;

/// File name of the locator, created next to the plugin binary
/// (`SpectrumWorx.dll` -> `SpectrumWorx.paths`).
pub const PATHS_FILE_NAME: &str = "SpectrumWorx.paths";

/// Name of the presets folder underneath the support root.
pub const PRESETS_DIR_NAME: &str = "Presets";

/// Separator joining the two directories in the installer's configuration string.
pub const DATA_SEPARATOR: char = '|';

/// The two directories the installer hands over, already trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    /// Where the plugin binary was copied (the VST folder). The locator file goes here.
    pub plugin_dir: String,
    /// The support root recorded inside the locator file.
    pub support_dir: String,
}

/// Parses the raw configuration string `<plugin dir>|<support dir>`.
///
/// Exactly one separator, both fields non-empty; each field loses at most one
/// trailing path separator. Anything else is malformed input and fails the action.
pub fn parse_custom_action_data(data: &str) -> Result<InstallPaths> {
    let fields: Vec<&str> = data.split(DATA_SEPARATOR).collect();
    if fields.len() != 2 {
        bail!("malformed configuration data {data:?}: expected exactly two '|'-separated directories");
    }

    let plugin_dir = trim_trailing_separator(fields[0]);
    let support_dir = trim_trailing_separator(fields[1]);
    if plugin_dir.is_empty() || support_dir.is_empty() {
        // An empty line in the locator can never resolve to a directory, so refuse
        // to record one.
        bail!("malformed configuration data {data:?}: empty directory field");
    }
    if plugin_dir.contains(['\n', '\r']) || support_dir.contains(['\n', '\r']) {
        // A line break inside a field would smuggle a third line into the payload.
        bail!("malformed configuration data {data:?}: embedded line break");
    }

    Ok(InstallPaths {
        plugin_dir: plugin_dir.to_string(),
        support_dir: support_dir.to_string(),
    })
}

/// Strips one trailing path separator, if present.
///
/// Idempotent: a string without a trailing separator comes back unchanged, so
/// `trim(trim(s)) == trim(s)`.
pub fn trim_trailing_separator(field: &str) -> &str {
    field.strip_suffix(['\\', '/']).unwrap_or(field)
}

/// The locator payload: support root plus presets folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsFile {
    pub root: String,
    pub presets: String,
}

impl PathsFile {
    /// Derives the payload for a support root: the presets folder is always the
    /// `Presets` child of the root. Recorded with Windows separators, the form the
    /// plugin consumes.
    pub fn for_support_dir(support_dir: &str) -> Self {
        Self {
            root: support_dir.to_string(),
            presets: format!("{support_dir}\\{PRESETS_DIR_NAME}"),
        }
    }

    /// Serializes to the on-disk payload: two lines joined by a single `\n`, no
    /// trailing newline.
    pub fn to_payload(&self) -> String {
        let payload = format!("{}\n{}", self.root, self.presets);
        assert_invariant(
            payload.lines().count() == 2,
            "locator payload is exactly two lines",
            Some("PathsFile"),
        );
        assert_invariant(
            !payload.ends_with('\n'),
            "locator payload has no trailing newline",
            Some("PathsFile"),
        );
        payload
    }

    /// Parses an on-disk payload back into its two paths, the way the plugin does:
    /// split at the first `\n`, the remainder (to end of file) is the presets path.
    pub fn parse(payload: &str) -> Result<Self> {
        let Some((root, presets)) = payload.split_once('\n') else {
            bail!("locator payload has no newline separator");
        };
        if presets.contains('\n') {
            // Extra lines (including a trailing newline) would end up inside the
            // presets path and break the plugin's directory check.
            bail!("locator payload has more than two lines");
        }
        if root.is_empty() || presets.is_empty() {
            bail!("locator payload has an empty path line");
        }
        Ok(Self {
            root: root.to_string(),
            presets: presets.to_string(),
        })
    }
}
