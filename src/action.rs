//! # Action Logic
//!
//! The heart of the installer helper. It is responsible for:
//! 1. Turning the installer's configuration string into the on-disk locator file
//!    (`run_record`).
//! 2. Inspecting an installed locator the way the plugin will at startup (`doctor`).
//! 3. Cleaning the locator up at uninstall time (`run_remove`).
//!
//! Every mutating outcome collapses into one of the two Windows Installer
//! script-action status codes; failures additionally publish their message to the
//! host through [`ERROR_PROPERTY`].

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, error, info, warn};
use serde::Serialize;
use walkdir::WalkDir;

use crate::discovery;
use crate::invariants::assert_invariant;
use crate::paths_file::{self, PATHS_FILE_NAME, PathsFile};
use crate::session::SessionOps;

/// Property carrying the configuration string `<plugin dir>|<support dir>`.
///
/// The record action runs deferred, after the installer has laid the plugin files
/// down; Windows Installer hands deferred actions their arguments through
/// `CustomActionData`.
pub const DATA_PROPERTY: &str = "CustomActionData";

/// Property receiving the failure message when an action fails.
pub const ERROR_PROPERTY: &str = "RecordPathsError";

/// SpectrumWorx preset extension, for the doctor's preset count.
pub const PRESET_EXTENSION: &str = "swp";

/// Outcome reported to the installer framework.
///
/// These are the Windows Installer script-action codes, `msiDoActionStatusSuccess`
/// and `msiDoActionStatusFailure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Success = 1,
    Failure = 3,
}

impl ActionStatus {
    /// The integer handed back to the installer (also used as process exit code).
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// Runs the record action against a host session.
///
/// Never returns an error: any failure is published to [`ERROR_PROPERTY`] and
/// collapses into [`ActionStatus::Failure`].
pub fn run_record(session: &impl SessionOps, dry_run: bool) -> ActionStatus {
    finish(session, record_paths(session, dry_run))
}

/// Runs the uninstall cleanup against a host session.
///
/// `explicit` points straight at the locator file; without it the plugin directory
/// is taken from the host's configuration data, then from discovery.
pub fn run_remove(
    session: &impl SessionOps,
    explicit: Option<&Path>,
    dry_run: bool,
) -> ActionStatus {
    finish(session, remove_paths(session, explicit, dry_run))
}

/// Converts an action result into a status code, publishing failures to the host.
fn finish(session: &impl SessionOps, result: Result<()>) -> ActionStatus {
    match result {
        Ok(()) => ActionStatus::Success,
        Err(e) => {
            let message = format!("{e:#}");
            error!("{message}");
            assert_invariant(
                !message.is_empty(),
                "published failure message is never empty",
                Some("Action"),
            );
            if let Err(publish) = session.set_property(ERROR_PROPERTY, &message) {
                // The session itself is broken; the status code is the only
                // channel left.
                warn!("Could not publish {ERROR_PROPERTY}: {publish:#}");
            }
            ActionStatus::Failure
        }
    }
}

fn record_paths(session: &impl SessionOps, dry_run: bool) -> Result<()> {
    let data = session.property(DATA_PROPERTY)?;
    debug!("{DATA_PROPERTY} = {data:?}");

    let install = paths_file::parse_custom_action_data(&data)?;
    let locator = PathsFile::for_support_dir(&install.support_dir);
    let payload = locator.to_payload();
    let target = Path::new(&install.plugin_dir).join(PATHS_FILE_NAME);

    if dry_run {
        println!("--- DRY RUN: would write {} ---", target.display());
        println!("{payload}");
        return Ok(());
    }

    back_up_existing(session, &target);

    session
        .write_file(&target, &payload)
        .with_context(|| format!("cannot write locator file {}", target.display()))?;
    info!(
        "Recorded install paths to {} (root: {}, presets: {})",
        target.display(),
        locator.root,
        locator.presets
    );
    Ok(())
}

/// Copies a pre-existing locator aside before it is overwritten.
///
/// Best effort: a failed backup is logged and the install proceeds — the previous
/// payload is about to be replaced either way.
fn back_up_existing(session: &impl SessionOps, target: &Path) {
    if !session.path_exists(target) {
        return;
    }

    let Some(base_dirs) = directories::BaseDirs::new() else {
        warn!("No local application-data directory; skipping locator backup");
        return;
    };
    let backup_dir = base_dirs.data_local_dir().join("SpectrumWorx");
    if let Err(e) = std::fs::create_dir_all(&backup_dir) {
        warn!("Failed to create backup directory at {:?}: {}", backup_dir, e);
        return;
    }

    let backup_path = backup_dir.join(format!("{PATHS_FILE_NAME}.bak"));
    match session.read_file(target) {
        Ok(previous) => {
            if let Err(e) = session.write_file(&backup_path, &previous) {
                warn!("Failed to write locator backup: {e:#}");
            } else {
                info!("Backed up previous locator to {:?}", backup_path);
            }
        }
        Err(e) => warn!("Could not read existing locator for backup: {e:#}"),
    }
}

fn remove_paths(session: &impl SessionOps, explicit: Option<&Path>, dry_run: bool) -> Result<()> {
    let Some(target) = resolve_locator(session, explicit) else {
        info!("No {PATHS_FILE_NAME} found; nothing to remove");
        return Ok(());
    };
    if !session.path_exists(&target) {
        // Already gone. Uninstall cleanup must not fail over a file that is absent.
        info!("{} does not exist; nothing to remove", target.display());
        return Ok(());
    }

    if dry_run {
        println!("--- DRY RUN: would remove {} ---", target.display());
        return Ok(());
    }

    session
        .remove_file(&target)
        .with_context(|| format!("cannot remove locator file {}", target.display()))?;
    info!("Removed {}", target.display());
    Ok(())
}

/// Finds the locator file: explicit argument first, then the plugin directory from
/// the host's configuration data, then discovery.
fn resolve_locator(session: &impl SessionOps, explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(dir) = plugin_dir_from_session(session) {
        let candidate = dir.join(PATHS_FILE_NAME);
        if session.path_exists(&candidate) {
            return Some(candidate);
        }
    }
    discovery::locate_paths_file(session)
}

/// Plugin directory from the host's configuration data, when present.
///
/// Uninstall hands over just the plugin directory; the full `<plugin>|<support>`
/// pair is tolerated as well, using its first field.
fn plugin_dir_from_session(session: &impl SessionOps) -> Option<PathBuf> {
    let data = session.property(DATA_PROPERTY).ok()?;
    let first = data.split(paths_file::DATA_SEPARATOR).next().unwrap_or("");
    let dir = paths_file::trim_trailing_separator(first);
    (!dir.is_empty()).then(|| PathBuf::from(dir))
}

/// Health report for an installed locator file.
#[derive(Debug, Serialize)]
pub struct DoctorReport {
    pub locator: String,
    pub root: Option<String>,
    pub presets: Option<String>,
    pub root_exists: bool,
    pub presets_exists: bool,
    pub preset_count: Option<usize>,
    pub problems: Vec<String>,
}

impl DoctorReport {
    pub fn healthy(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Inspects an installed locator the way the plugin will at startup.
///
/// This does not modify the system. Returns an error only when no locator can be
/// found at all; an unhealthy installation still produces a report.
pub fn doctor(
    session: &impl SessionOps,
    explicit: Option<&Path>,
    json: bool,
) -> Result<DoctorReport> {
    let Some(target) = resolve_locator(session, explicit) else {
        bail!(
            "no {PATHS_FILE_NAME} found; pass --path or set {}",
            discovery::VST_DIR_OVERRIDE
        );
    };

    let report = examine_locator(session, &target);
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(report)
}

fn examine_locator(session: &impl SessionOps, target: &Path) -> DoctorReport {
    let mut report = DoctorReport {
        locator: target.display().to_string(),
        root: None,
        presets: None,
        root_exists: false,
        presets_exists: false,
        preset_count: None,
        problems: Vec::new(),
    };

    let payload = match session.read_file(target) {
        Ok(payload) => payload,
        Err(e) => {
            report.problems.push(format!("cannot read locator: {e:#}"));
            return report;
        }
    };

    let parsed = match PathsFile::parse(&payload) {
        Ok(parsed) => parsed,
        Err(e) => {
            report
                .problems
                .push(format!("malformed locator payload: {e:#}"));
            return report;
        }
    };

    report.root_exists = session.dir_exists(Path::new(&parsed.root));
    if !report.root_exists {
        report
            .problems
            .push(format!("support root {} is not a directory", parsed.root));
    }

    report.presets_exists = session.dir_exists(Path::new(&parsed.presets));
    if report.presets_exists {
        report.preset_count = Some(count_presets(Path::new(&parsed.presets)));
    } else {
        report
            .problems
            .push(format!("presets folder {} is not a directory", parsed.presets));
    }

    report.root = Some(parsed.root);
    report.presets = Some(parsed.presets);
    report
}

/// Shallow count of preset files; presets live flat in the folder.
fn count_presets(dir: &Path) -> usize {
    WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(PRESET_EXTENSION))
                .unwrap_or(false)
        })
        .count()
}

fn print_report(report: &DoctorReport) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                SpectrumWorx Install Health Report");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("Locator file: {}", report.locator);
    println!();
    println!("The plugin reads this file at startup to find its installation.");

    if let Some(root) = &report.root {
        println!();
        println!("1. SUPPORT ROOT");
        println!("   {}", root);
        if report.root_exists {
            println!("   ✓ Directory exists");
        } else {
            println!("   ⚠ Problem: not a directory (the plugin will refuse to load)");
        }
    }

    if let Some(presets) = &report.presets {
        println!();
        println!("2. PRESETS FOLDER");
        println!("   {}", presets);
        if report.presets_exists {
            match report.preset_count {
                Some(1) => println!("   ✓ Directory exists (1 preset)"),
                Some(n) => println!("   ✓ Directory exists ({} presets)", n),
                None => println!("   ✓ Directory exists"),
            }
        } else {
            println!("   ⚠ Problem: not a directory (the preset browser will be empty)");
        }
    }

    println!();
    println!("───────────────────────────────────────────────────────────────");
    println!();
    if report.healthy() {
        println!("✓ Installation looks healthy! No action needed.");
    } else {
        for problem in &report.problems {
            println!("  ⚠ {}", problem);
        }
        println!();
        println!("Re-run the installer (or 'sw-paths record') to rewrite the locator.");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::{clear_invariant_log, contract_test};
    use crate::session::{LocalSession, MockSession};
    use proptest::prelude::*;

    fn locator_path(plugin_dir: &str) -> PathBuf {
        Path::new(plugin_dir).join(PATHS_FILE_NAME)
    }

    #[test]
    fn record_writes_locator_next_to_plugin_binary() {
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\|D:\Support\");

        let status = run_record(&session, false);

        assert_eq!(status, ActionStatus::Success);
        assert_eq!(status.code(), 1);
        let content = session.file(&locator_path(r"C:\VST24")).unwrap();
        assert_eq!(content, "D:\\Support\nD:\\Support\\Presets");
    }

    #[test]
    fn record_without_separator_fails_and_publishes_the_error() {
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\D:\Support\");

        let status = run_record(&session, false);

        assert_eq!(status, ActionStatus::Failure);
        assert_eq!(status.code(), 3);
        let error = session.property_value(ERROR_PROPERTY).unwrap();
        assert!(!error.is_empty());
        assert!(session.files.lock().unwrap().is_empty());
    }

    #[test]
    fn record_without_configuration_data_fails() {
        let session = MockSession::new();

        assert_eq!(run_record(&session, false), ActionStatus::Failure);
        assert!(session.property_value(ERROR_PROPERTY).is_some());
    }

    #[test]
    fn record_dry_run_touches_nothing() {
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\|D:\Support\");

        assert_eq!(run_record(&session, true), ActionStatus::Success);
        assert!(session.files.lock().unwrap().is_empty());
    }

    #[test]
    fn record_backs_up_an_existing_locator() {
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\|D:\Support\");
        session.add_file(locator_path(r"C:\VST24"), "old-root\nold-presets");

        assert_eq!(run_record(&session, false), ActionStatus::Success);

        // New payload in place.
        let content = session.file(&locator_path(r"C:\VST24")).unwrap();
        assert_eq!(content, "D:\\Support\nD:\\Support\\Presets");

        // Old payload kept aside (backup location depends on the machine's
        // application-data directory).
        if directories::BaseDirs::new().is_some() {
            let files = session.files.lock().unwrap();
            let backup = files
                .iter()
                .find(|(path, _)| path.to_string_lossy().ends_with(".bak"));
            assert_eq!(backup.map(|(_, content)| content.as_str()), Some("old-root\nold-presets"));
        }
    }

    #[test]
    fn record_contract() {
        clear_invariant_log();
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\|D:\Support\");
        assert_eq!(run_record(&session, false), ActionStatus::Success);
        contract_test(
            "record",
            &[
                "locator payload is exactly two lines",
                "locator payload has no trailing newline",
            ],
        );
    }

    #[test]
    fn record_writes_a_real_file_through_a_local_session() {
        let dir = tempfile::tempdir().unwrap();
        let plugin_dir = dir.path().join("VST24");
        std::fs::create_dir_all(&plugin_dir).unwrap();
        let support_dir = dir.path().join("Support");
        let data = format!("{}|{}", plugin_dir.display(), support_dir.display());
        let session = LocalSession::with_property(DATA_PROPERTY, &data);

        assert_eq!(run_record(&session, false), ActionStatus::Success);

        let written = std::fs::read_to_string(plugin_dir.join(PATHS_FILE_NAME)).unwrap();
        let (root, presets) = written.split_once('\n').unwrap();
        assert_eq!(root, support_dir.display().to_string());
        assert_eq!(presets, format!("{}\\Presets", support_dir.display()));
    }

    #[test]
    fn record_into_a_missing_plugin_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("not-created").join("VST24");
        let data = format!("{}|{}", missing.display(), dir.path().display());
        let session = LocalSession::with_property(DATA_PROPERTY, &data);

        assert_eq!(run_record(&session, false), ActionStatus::Failure);
        assert!(session.published(ERROR_PROPERTY).is_some());
    }

    #[test]
    fn remove_deletes_the_locator() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "root\npresets");

        assert_eq!(run_remove(&session, Some(&target), false), ActionStatus::Success);
        assert!(!session.path_exists(&target));
    }

    #[test]
    fn remove_of_a_missing_locator_is_success() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");

        assert_eq!(run_remove(&session, Some(&target), false), ActionStatus::Success);
    }

    #[test]
    fn remove_dry_run_keeps_the_locator() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "root\npresets");

        assert_eq!(run_remove(&session, Some(&target), true), ActionStatus::Success);
        assert!(session.path_exists(&target));
    }

    #[test]
    fn remove_finds_the_locator_through_configuration_data() {
        let session = MockSession::with_property(DATA_PROPERTY, r"C:\VST24\");
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "root\npresets");

        assert_eq!(run_remove(&session, None, false), ActionStatus::Success);
        assert!(!session.path_exists(&target));
    }

    #[test]
    fn doctor_reports_a_healthy_install() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "D:\\Support\nD:\\Support\\Presets");
        session.add_directory(r"D:\Support");
        session.add_directory(r"D:\Support\Presets");

        let report = doctor(&session, Some(&target), false).unwrap();

        assert!(report.healthy());
        assert!(report.root_exists);
        assert!(report.presets_exists);
        assert_eq!(report.root.as_deref(), Some(r"D:\Support"));
        assert_eq!(report.presets.as_deref(), Some(r"D:\Support\Presets"));
    }

    #[test]
    fn doctor_flags_a_malformed_locator() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "only one line");

        let report = doctor(&session, Some(&target), false).unwrap();

        assert!(!report.healthy());
        assert!(report.problems[0].contains("malformed"));
    }

    #[test]
    fn doctor_flags_missing_directories() {
        let session = MockSession::new();
        let target = locator_path(r"C:\VST24");
        session.add_file(&target, "D:\\Support\nD:\\Support\\Presets");

        let report = doctor(&session, Some(&target), false).unwrap();

        assert!(!report.healthy());
        assert_eq!(report.problems.len(), 2);
    }

    #[test]
    fn doctor_without_any_locator_is_an_error() {
        let session = MockSession::new();
        assert!(doctor(&session, None, false).is_err());
    }

    #[test]
    fn doctor_counts_presets_in_a_real_folder() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("Support");
        let presets = root.join("Presets");
        std::fs::create_dir_all(&presets).unwrap();
        std::fs::write(presets.join("warm.swp"), "").unwrap();
        std::fs::write(presets.join("cold.SWP"), "").unwrap();
        std::fs::write(presets.join("notes.txt"), "").unwrap();
        let target = dir.path().join(PATHS_FILE_NAME);
        std::fs::write(
            &target,
            format!("{}\n{}", root.display(), presets.display()),
        )
        .unwrap();
        let session = LocalSession::new();

        let report = doctor(&session, Some(&target), true).unwrap();

        assert!(report.healthy());
        assert_eq!(report.preset_count, Some(2));
    }

    proptest! {
        #[test]
        fn trimming_any_string_is_idempotent(field in ".*") {
            let once = paths_file::trim_trailing_separator(&field);
            prop_assert_eq!(paths_file::trim_trailing_separator(once), once);
        }

        #[test]
        fn recorded_payload_is_always_two_lines(
            plugin in "[A-Za-z0-9 ._-]{1,12}",
            support in "[A-Za-z0-9 ._-]{1,12}",
        ) {
            let session = MockSession::with_property(
                DATA_PROPERTY,
                &format!("{plugin}|{support}"),
            );

            prop_assert_eq!(run_record(&session, false), ActionStatus::Success);

            let files = session.files.lock().unwrap();
            let payload = files.get(&locator_path(&plugin)).expect("locator written");
            prop_assert_eq!(payload.lines().count(), 2);
            prop_assert!(!payload.ends_with('\n'));
        }
    }
}
