//! Process-wide record of which test units have completed a per-class load.
//!
//! The tracker is constructed once per test process and injected into every
//! [`FixtureHook`](crate::hook::FixtureHook). Clones share state. Entries are
//! never evicted: `PER_CLASS` means once per process run.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::declaration::Lifecycle;
use crate::error::{FixtureError, FixtureResult};

#[derive(Debug, Default)]
struct TrackerState {
	loaded: Mutex<HashSet<String>>,
	observed: Mutex<HashMap<String, Lifecycle>>,
	failures: Mutex<HashMap<String, String>>,
}

/// Thread-safe set of test units whose per-class fixtures are loaded.
#[derive(Debug, Clone, Default)]
pub struct LifecycleTracker {
	state: Arc<TrackerState>,
}

impl LifecycleTracker {
	/// Creates an empty tracker.
	pub fn new() -> Self {
		Self::default()
	}

	/// Marks the unit and returns `true` if it was not marked before.
	///
	/// Linearizable: among any number of concurrent callers for the same unit,
	/// exactly one observes `true`.
	///
	/// ```
	/// use kennel_fixtures::lifecycle::LifecycleTracker;
	///
	/// let tracker = LifecycleTracker::new();
	/// assert!(tracker.mark_if_first("owner_listing"));
	/// assert!(!tracker.mark_if_first("owner_listing"));
	/// ```
	pub fn mark_if_first(&self, unit: &str) -> bool {
		let mut loaded = self.state.loaded.lock();
		if loaded.contains(unit) {
			return false;
		}
		loaded.insert(unit.to_owned())
	}

	/// Checks if the unit has been marked.
	pub fn is_marked(&self, unit: &str) -> bool {
		self.state.loaded.lock().contains(unit)
	}

	/// Records the lifecycle a unit was evaluated under.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::Configuration`] if the unit was previously
	/// evaluated under a different lifecycle in this process.
	pub fn observe(&self, unit: &str, lifecycle: Lifecycle) -> FixtureResult<()> {
		match self.state.observed.lock().entry(unit.to_owned()) {
			Entry::Occupied(entry) if *entry.get() != lifecycle => {
				Err(FixtureError::Configuration(format!(
					"test unit `{}` was declared {} earlier in this run and is now declared {}",
					unit,
					entry.get(),
					lifecycle
				)))
			}
			Entry::Occupied(_) => Ok(()),
			Entry::Vacant(entry) => {
				entry.insert(lifecycle);
				Ok(())
			}
		}
	}

	/// Remembers that the unit's load failed, so later cycles fail too.
	pub fn record_failure(&self, unit: &str, reason: impl Into<String>) {
		self.state
			.failures
			.lock()
			.entry(unit.to_owned())
			.or_insert_with(|| reason.into());
	}

	/// Returns the recorded failure for the unit, if any.
	pub fn failure(&self, unit: &str) -> Option<String> {
		self.state.failures.lock().get(unit).cloned()
	}

	/// Returns the number of marked units.
	pub fn len(&self) -> usize {
		self.state.loaded.lock().len()
	}

	/// Returns true if no unit has been marked.
	pub fn is_empty(&self) -> bool {
		self.state.loaded.lock().is_empty()
	}
}
