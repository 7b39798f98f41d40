//! Live monitors and their cancellation handles.
//!
//! A [`Subscription`] is the handle of exactly one running monitor. Calling
//! [`Subscription::unsubscribe`] fires the monitor's [`CancelSignal`]; the
//! monitor then completes with a "manually unsubscribed" outcome and stops
//! producing events. Only the first call has any effect, no matter how many
//! tasks race on it.

pub mod registry;

pub use registry::SubscriptionRegistry;

use gateway_types::{Parameter, SubscriptionType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use uuid::Uuid;

struct SubscriptionInner {
	id: Uuid,
	subscription_type: SubscriptionType,
	/// Event or function name watched by occurrence monitors.
	identifier: Option<String>,
	/// Parameter shape watched by occurrence monitors.
	parameter_types: Vec<Parameter>,
	closed: AtomicBool,
	cancel: Mutex<Option<oneshot::Sender<()>>>,
}

/// Cancellation handle of one monitor. Clones refer to the same monitor.
#[derive(Clone)]
pub struct Subscription {
	inner: Arc<SubscriptionInner>,
}

impl std::fmt::Debug for Subscription {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Subscription")
			.field("id", &self.inner.id)
			.field("subscription_type", &self.inner.subscription_type)
			.field("closed", &self.is_closed())
			.finish()
	}
}

impl PartialEq for Subscription {
	fn eq(&self, other: &Self) -> bool {
		self.inner.id == other.inner.id
	}
}

impl Eq for Subscription {}

impl Subscription {
	/// Creates a handle and the signal its monitor listens on.
	pub fn new(subscription_type: SubscriptionType) -> (Self, CancelSignal) {
		Self::build(subscription_type, None, Vec::new())
	}

	/// Creates a handle for an occurrence monitor.
	pub fn for_occurrences(
		subscription_type: SubscriptionType,
		identifier: impl Into<String>,
		parameter_types: Vec<Parameter>,
	) -> (Self, CancelSignal) {
		Self::build(subscription_type, Some(identifier.into()), parameter_types)
	}

	fn build(
		subscription_type: SubscriptionType,
		identifier: Option<String>,
		parameter_types: Vec<Parameter>,
	) -> (Self, CancelSignal) {
		let (sender, receiver) = oneshot::channel();
		let subscription = Self {
			inner: Arc::new(SubscriptionInner {
				id: Uuid::new_v4(),
				subscription_type,
				identifier,
				parameter_types,
				closed: AtomicBool::new(false),
				cancel: Mutex::new(Some(sender)),
			}),
		};
		(subscription, CancelSignal { receiver })
	}

	pub fn id(&self) -> Uuid {
		self.inner.id
	}

	pub fn subscription_type(&self) -> SubscriptionType {
		self.inner.subscription_type
	}

	pub fn identifier(&self) -> Option<&str> {
		self.inner.identifier.as_deref()
	}

	pub fn parameter_types(&self) -> &[Parameter] {
		&self.inner.parameter_types
	}

	/// True once the monitor was cancelled or has completed.
	pub fn is_closed(&self) -> bool {
		self.inner.closed.load(Ordering::Acquire)
	}

	/// Cancels the monitor. Returns true only for the call that actually
	/// cancelled it; later calls, and calls after normal completion, are
	/// no-ops.
	pub fn unsubscribe(&self) -> bool {
		if self.inner.closed.swap(true, Ordering::AcqRel) {
			return false;
		}
		let sender = match self.inner.cancel.lock() {
			Ok(mut guard) => guard.take(),
			Err(poisoned) => poisoned.into_inner().take(),
		};
		if let Some(sender) = sender {
			// The monitor may already be gone
			let _ = sender.send(());
		}
		true
	}

	/// Marks the monitor as completed so later cancellation is a no-op.
	pub(crate) fn close(&self) {
		self.inner.closed.store(true, Ordering::Release);
	}
}

/// Resolves when the owning [`Subscription`] is unsubscribed.
pub struct CancelSignal {
	receiver: oneshot::Receiver<()>,
}

impl CancelSignal {
	/// Waits for cancellation. Never resolves if every handle is dropped
	/// without unsubscribing.
	pub async fn cancelled(self) {
		if self.receiver.await.is_err() {
			std::future::pending::<()>().await;
		}
	}
}
