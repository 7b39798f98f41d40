//! Last observed progress of a running adapter call.
//!
//! A monitor that times out reports the transaction hash and confidence it
//! last saw. Adapters publish both through a [`ProgressTracker`] while they
//! wait, and the monitor reads them after its deadline fires.

use arc_swap::ArcSwapOption;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
	pub transaction_hash: String,
	pub confidence: f64,
}

/// Shared, lock-free slot holding the latest [`Progress`].
///
/// Clones observe the same slot.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
	latest: Arc<ArcSwapOption<Progress>>,
}

impl Default for ProgressTracker {
	fn default() -> Self {
		Self::new()
	}
}

impl ProgressTracker {
	pub fn new() -> Self {
		Self {
			latest: Arc::new(ArcSwapOption::empty()),
		}
	}

	pub fn record(&self, transaction_hash: impl Into<String>, confidence: f64) {
		self.latest.store(Some(Arc::new(Progress {
			transaction_hash: transaction_hash.into(),
			confidence,
		})));
	}

	pub fn snapshot(&self) -> Option<Progress> {
		self.latest.load_full().map(|p| (*p).clone())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_clones_share_progress() {
		let tracker = ProgressTracker::new();
		assert!(tracker.snapshot().is_none());

		let observer = tracker.clone();
		tracker.record("0xabc", 0.5);
		tracker.record("0xabc", 0.75);

		assert_eq!(
			observer.snapshot(),
			Some(Progress {
				transaction_hash: "0xabc".into(),
				confidence: 0.75,
			})
		);
	}
}
