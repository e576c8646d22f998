//! # Runtime Invariants
//!
//! Small helper for the handful of rules that must hold on every run — e.g. "the
//! locator payload is exactly two lines" or "a published failure message is never
//! empty". Satisfied checks are remembered by description, so a test can verify that
//! a code path actually enforced its contract rather than silently skipping it.

use std::collections::HashSet;
use std::sync::Mutex;

use lazy_static::lazy_static;
use log::{error, info};

lazy_static! {
    /// Descriptions of invariants that held during this run.
    static ref SATISFIED: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Asserts a domain invariant.
///
/// A violation panics in debug and test builds. In release builds it logs a critical
/// error and carries on — a reporting bug must not take the whole install down.
pub fn assert_invariant(condition: bool, description: &str, component: Option<&str>) {
    if condition {
        if let Ok(mut seen) = SATISFIED.lock() {
            seen.insert(description.to_string());
        }
        return;
    }

    let msg = format!(
        "INVARIANT VIOLATION [{}]: {description}",
        component.unwrap_or("general")
    );
    error!("{msg}");
    if cfg!(debug_assertions) || cfg!(test) {
        panic!("{msg}");
    }
}

/// Verifies that the listed invariants were actually checked during execution.
///
/// Panics naming the unchecked ones when any are missing.
pub fn contract_test(context: &str, required_invariants: &[&str]) {
    let seen = SATISFIED.lock().unwrap();
    let missing: Vec<&str> = required_invariants
        .iter()
        .copied()
        .filter(|required| !seen.contains(*required))
        .collect();

    if !missing.is_empty() {
        panic!("contract '{context}' incomplete, invariants never checked: {missing:#?}");
    }
    info!("contract '{context}' satisfied");
}

/// Forgets previously recorded checks. Call only from a test that is about to read
/// the log itself; clearing underneath other tests makes their contracts flaky.
pub fn clear_invariant_log() {
    if let Ok(mut seen) = SATISFIED.lock() {
        seen.clear();
    }
}
