//! Monitor tasks.
//!
//! Every asynchronous operation the gateway performs on behalf of a caller
//! runs as one independent tokio task registered in the
//! [`SubscriptionRegistry`]. A task ends in exactly one way: the adapter
//! result, a timeout, or cancellation through its [`Subscription`]. When it
//! ends it deregisters itself (unless it has been replaced) and hands the
//! outcome to its continuation.

use crate::subscription::{CancelSignal, Subscription, SubscriptionRegistry};
use futures::stream::BoxStream;
use futures::StreamExt;
use gateway_adapter::{AdapterError, ProgressTracker};
use gateway_types::{truncate_id, ErrorCode, SubscriptionKey};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Ways a monitor can end without a result.
#[derive(Debug, Clone, Error)]
pub enum MonitorError {
	#[error(transparent)]
	Adapter(#[from] AdapterError),
	/// The monitor's deadline elapsed first. Carries the last observed
	/// progress, if any.
	#[error("Monitoring timed out")]
	Timeout {
		transaction_hash: Option<String>,
		reached_confidence: Option<f64>,
	},
	/// Cancelled through its subscription.
	#[error("Manually unsubscribed")]
	ManuallyUnsubscribed,
}

impl MonitorError {
	pub fn code(&self) -> ErrorCode {
		match self {
			MonitorError::Adapter(e) => e.code(),
			MonitorError::Timeout { .. } => ErrorCode::Timeout,
			MonitorError::ManuallyUnsubscribed => ErrorCode::ManuallyUnsubscribed,
		}
	}

	fn timed_out(progress: Option<&ProgressTracker>) -> Self {
		let last = progress.and_then(ProgressTracker::snapshot);
		MonitorError::Timeout {
			transaction_hash: last.as_ref().map(|p| p.transaction_hash.clone()),
			reached_confidence: last.map(|p| p.confidence),
		}
	}
}

/// Runs `fut`, giving up after `limit` if one is set.
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Option<F::Output> {
	match limit {
		Some(limit) => tokio::time::timeout(limit, fut).await.ok(),
		None => Some(fut.await),
	}
}

/// Spawns monitor tasks and keeps the registry in step with them.
#[derive(Clone)]
pub struct Monitor {
	registry: Arc<SubscriptionRegistry>,
}

impl Monitor {
	pub fn new(registry: Arc<SubscriptionRegistry>) -> Self {
		Self { registry }
	}

	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}

	/// Registers `subscription` under `key` and spawns a task resolving one
	/// adapter result.
	///
	/// `work` receives the tracker the adapter reports progress to; the last
	/// reported progress is attached to a timeout. `on_complete` runs exactly
	/// once, after the key has been deregistered.
	pub async fn spawn_single<T, W, Fut, C, CFut>(
		&self,
		key: SubscriptionKey,
		(subscription, signal): (Subscription, CancelSignal),
		timeout: Option<Duration>,
		work: W,
		on_complete: C,
	) where
		T: Send + 'static,
		W: FnOnce(ProgressTracker) -> Fut,
		Fut: Future<Output = Result<T, AdapterError>> + Send + 'static,
		C: FnOnce(SubscriptionKey, Result<T, MonitorError>) -> CFut + Send + 'static,
		CFut: Future<Output = ()> + Send + 'static,
	{
		self.registry.create(key.clone(), subscription.clone()).await;

		let progress = ProgressTracker::new();
		let fut = work(progress.clone());
		let registry = Arc::clone(&self.registry);
		tokio::spawn(async move {
			let result = tokio::select! {
				biased;
				_ = signal.cancelled() => Err(MonitorError::ManuallyUnsubscribed),
				outcome = within(timeout, fut) => match outcome {
					Some(result) => result.map_err(MonitorError::from),
					None => Err(MonitorError::timed_out(Some(&progress))),
				},
			};

			subscription.close();
			registry.remove_if_current(&key, subscription.id()).await;
			log_outcome(&key, result.as_ref().err());
			on_complete(key, result).await;
		});
	}

	/// Opens a stream through `open`, registers `subscription` under `key`
	/// and spawns a task forwarding every item to `on_item`.
	///
	/// The stream is opened before this returns, so nothing that happens on
	/// the chain afterwards is missed. With `single` set the task ends after
	/// the first item. A failure (including failing to open) or a timeout is
	/// forwarded once and ends the task; cancellation ends it silently.
	pub async fn spawn_stream<T, O, I, IFut>(
		&self,
		key: SubscriptionKey,
		(subscription, signal): (Subscription, CancelSignal),
		timeout: Option<Duration>,
		single: bool,
		open: O,
		mut on_item: I,
	) where
		T: Send + 'static,
		O: Future<Output = Result<BoxStream<'static, Result<T, AdapterError>>, AdapterError>>,
		I: FnMut(SubscriptionKey, Result<T, MonitorError>) -> IFut + Send + 'static,
		IFut: Future<Output = ()> + Send,
	{
		let opened = open.await;
		self.registry.create(key.clone(), subscription.clone()).await;

		let registry = Arc::clone(&self.registry);
		tokio::spawn(async move {
			let result = {
				let drive = forward(opened, single, &key, &mut on_item);
				tokio::select! {
					biased;
					_ = signal.cancelled() => Err(MonitorError::ManuallyUnsubscribed),
					outcome = within(timeout, drive) => {
						outcome.unwrap_or_else(|| Err(MonitorError::timed_out(None)))
					},
				}
			};

			subscription.close();
			registry.remove_if_current(&key, subscription.id()).await;
			log_outcome(&key, result.as_ref().err());
			match result {
				Ok(()) | Err(MonitorError::ManuallyUnsubscribed) => {},
				Err(e) => on_item(key, Err(e)).await,
			}
		});
	}
}

async fn forward<T, I, IFut>(
	opened: Result<BoxStream<'static, Result<T, AdapterError>>, AdapterError>,
	single: bool,
	key: &SubscriptionKey,
	on_item: &mut I,
) -> Result<(), MonitorError>
where
	I: FnMut(SubscriptionKey, Result<T, MonitorError>) -> IFut,
	IFut: Future<Output = ()>,
{
	let mut stream = opened?;
	while let Some(item) = stream.next().await {
		on_item(key.clone(), Ok(item?)).await;
		if single {
			break;
		}
	}
	Ok(())
}

fn log_outcome(key: &SubscriptionKey, error: Option<&MonitorError>) {
	match error {
		None => tracing::info!(
			correlation_id = %key.correlation_id,
			chain_id = %key.chain_id,
			"Monitor completed"
		),
		Some(MonitorError::ManuallyUnsubscribed) => tracing::debug!(
			correlation_id = %key.correlation_id,
			chain_id = %key.chain_id,
			"Monitor cancelled"
		),
		Some(MonitorError::Timeout {
			transaction_hash,
			reached_confidence,
		}) => tracing::warn!(
			correlation_id = %key.correlation_id,
			chain_id = %key.chain_id,
			tx_hash = %transaction_hash.as_deref().map(truncate_id).unwrap_or_default(),
			reached_confidence = ?reached_confidence,
			"Monitor timed out"
		),
		Some(MonitorError::Adapter(e)) => tracing::warn!(
			correlation_id = %key.correlation_id,
			chain_id = %key.chain_id,
			error = %e,
			"Monitor failed"
		),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gateway_types::SubscriptionType;
	use tokio::sync::mpsc;

	fn monitor() -> Monitor {
		Monitor::new(Arc::new(SubscriptionRegistry::new()))
	}

	fn key(corr: &str) -> SubscriptionKey {
		SubscriptionKey::new(corr, "eth1")
	}

	#[tokio::test]
	async fn test_single_shot_result_deregisters_key() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		monitor
			.spawn_single(
				key("req-1"),
				Subscription::new(SubscriptionType::SubmitTransaction),
				None,
				|_| async { Ok::<_, AdapterError>(42u32) },
				move |key, result| async move {
					tx.send((key, result)).ok();
				},
			)
			.await;

		let (done_key, result) = rx.recv().await.unwrap();
		assert_eq!(done_key, key("req-1"));
		assert_eq!(result.unwrap(), 42);
		assert!(monitor.registry().is_empty().await);
	}

	#[tokio::test]
	async fn test_concurrent_unsubscribe_completes_once() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let (subscription, signal) = Subscription::new(SubscriptionType::SubmitTransaction);
		monitor
			.spawn_single(
				key("req-2"),
				(subscription.clone(), signal),
				None,
				|_| std::future::pending::<Result<(), AdapterError>>(),
				move |_, result| async move {
					tx.send(result).ok();
				},
			)
			.await;

		let first = tokio::spawn({
			let s = subscription.clone();
			async move { s.unsubscribe() }
		});
		let second = tokio::spawn({
			let s = subscription.clone();
			async move { s.unsubscribe() }
		});
		let cancelled = [first.await.unwrap(), second.await.unwrap()];
		assert_eq!(cancelled.iter().filter(|c| **c).count(), 1);

		let result = rx.recv().await.unwrap();
		assert!(matches!(result, Err(MonitorError::ManuallyUnsubscribed)));
		assert_eq!(result.unwrap_err().code(), ErrorCode::ManuallyUnsubscribed);
		// The continuation ran once and dropped the only sender
		assert!(rx.recv().await.is_none());
		assert!(monitor.registry().is_empty().await);
	}

	#[tokio::test(start_paused = true)]
	async fn test_timeout_carries_last_progress() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		monitor
			.spawn_single(
				key("req-3"),
				Subscription::new(SubscriptionType::EnsureTransactionState),
				Some(Duration::from_secs(30)),
				|progress| async move {
					progress.record("0xabc", 0.42);
					std::future::pending::<Result<(), AdapterError>>().await
				},
				move |_, result| async move {
					tx.send(result).ok();
				},
			)
			.await;

		match rx.recv().await.unwrap() {
			Err(MonitorError::Timeout {
				transaction_hash,
				reached_confidence,
			}) => {
				assert_eq!(transaction_hash.as_deref(), Some("0xabc"));
				assert_eq!(reached_confidence, Some(0.42));
			},
			other => panic!("unexpected outcome: {:?}", other.map(|_| ())),
		}
	}

	#[tokio::test]
	async fn test_replaced_monitor_does_not_evict_successor() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let first_tx = tx.clone();
		monitor
			.spawn_single(
				key("req-4"),
				Subscription::new(SubscriptionType::SubmitTransaction),
				None,
				|_| std::future::pending::<Result<(), AdapterError>>(),
				move |_, result| async move {
					first_tx.send(result.is_err()).ok();
				},
			)
			.await;
		let (second, signal) = Subscription::new(SubscriptionType::SubmitTransaction);
		monitor
			.spawn_single(
				key("req-4"),
				(second.clone(), signal),
				None,
				|_| std::future::pending::<Result<(), AdapterError>>(),
				move |_, result| async move {
					tx.send(result.is_err()).ok();
				},
			)
			.await;

		// The first monitor was cancelled by the replacement
		assert!(rx.recv().await.unwrap());
		assert_eq!(monitor.registry().get(&key("req-4")).await, Some(second));
	}

	#[tokio::test]
	async fn test_stream_forwards_items_then_failure() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let items = futures::stream::iter(vec![
			Ok(1u32),
			Ok(2),
			Err(AdapterError::NodeUnreachable("down".into())),
		])
		.boxed();
		monitor
			.spawn_stream(
				key("req-5"),
				Subscription::new(SubscriptionType::ReceiveTransactions),
				None,
				false,
				async move { Ok(items) },
				move |_, item| {
					let tx = tx.clone();
					async move {
						tx.send(item.map_err(|e| e.code())).ok();
					}
				},
			)
			.await;

		assert_eq!(rx.recv().await.unwrap(), Ok(1));
		assert_eq!(rx.recv().await.unwrap(), Ok(2));
		assert_eq!(rx.recv().await.unwrap(), Err(ErrorCode::NodeUnreachable));
		assert!(rx.recv().await.is_none());
	}

	#[tokio::test]
	async fn test_single_item_stream_ends_after_first() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel();
		let items = futures::stream::iter(vec![Ok::<_, AdapterError>(1u32), Ok(2)]).boxed();
		monitor
			.spawn_stream(
				key("req-6"),
				Subscription::new(SubscriptionType::ReceiveTransaction),
				None,
				true,
				async move { Ok(items) },
				move |_, item| {
					let tx = tx.clone();
					async move {
						tx.send(item.is_ok()).ok();
					}
				},
			)
			.await;

		assert!(rx.recv().await.unwrap());
		assert!(rx.recv().await.is_none());
		assert!(monitor.registry().is_empty().await);
	}

	#[tokio::test]
	async fn test_cancelled_stream_emits_nothing() {
		let monitor = monitor();
		let (tx, mut rx) = mpsc::unbounded_channel::<bool>();
		let (subscription, signal) = Subscription::new(SubscriptionType::ReceiveTransactions);
		monitor
			.spawn_stream(
				key("req-7"),
				(subscription.clone(), signal),
				None,
				false,
				async { Ok(futures::stream::pending::<Result<u32, AdapterError>>().boxed()) },
				move |_, item| {
					let tx = tx.clone();
					async move {
						tx.send(item.is_ok()).ok();
					}
				},
			)
			.await;

		assert!(subscription.unsubscribe());
		assert!(rx.recv().await.is_none());
		assert!(monitor.registry().is_empty().await);
	}
}
