//! # spectrumworx-paths
//!
//! Install-time locator recorder for the SpectrumWorx audio plugin.
//!
//! SpectrumWorx finds its installation through a two-line text file,
//! `SpectrumWorx.paths`, sitting next to the plugin binary: the first line names the
//! support root, the second the presets folder. This crate is the piece of the
//! installer that writes that file — plus the doctor and uninstall helpers that keep
//! it honest over the installation's lifetime.
//!
//! Two artifacts come out of the build:
//! - a DLL exporting the MSI custom-action entry points (`RecordPaths`,
//!   `RemovePaths`) — Windows only;
//! - the `sw-paths` binary for scripted installs and support diagnostics.

pub mod action;
pub mod discovery;
pub mod invariants;
pub mod paths_file;
pub mod session;

#[cfg(windows)]
pub mod msi;
