//! Test doubles for the remote, warehouse and prompt seams.

mod prompter;
mod remote;
mod warehouse;

use std::sync::{Mutex, MutexGuard};

pub use prompter::ScriptedPrompter;
pub use remote::{MockConnector, MockRemote, MockRemoteSession};
pub use warehouse::MockWarehouse;

/// Locks shared mock state, recovering it if a test thread panicked.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
