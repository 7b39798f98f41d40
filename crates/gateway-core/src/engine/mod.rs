//! The gateway facade.
//!
//! [`Gateway`] is the single entry point callers use. Every monitoring
//! operation validates its input synchronously, registers a monitor under a
//! [`SubscriptionKey`] and returns that key immediately; the result arrives
//! later as a [`GatewayEvent`] on the event bus. Distributed transactions are
//! delegated to the [`Coordinator`].

pub mod event_bus;
pub mod lifecycle;

use crate::coordinator::{check_arguments, Coordinator, CoordinatorError, ParticipantRequest};
use crate::monitoring::{Monitor, MonitorError};
use crate::subscription::{Subscription, SubscriptionRegistry};
use alloy_primitives::U256;
use chrono::Utc;
use event_bus::EventBus;
use futures::future::{ready, Ready};
use gateway_adapter::{check_required_confidence, AdapterError, AdapterService};
use gateway_config::GatewayConfig;
use gateway_types::{
	AddressParseError, DistributedTransactionSnapshot, ErrorCode, FailureMessage, GatewayEvent,
	Occurrence, OccurrenceKind, OccurrenceTarget, Parameter, ResponseMessage, ScipAddress,
	SubscriptionKey, SubscriptionType, TimeFrame, Transaction, TransactionState,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Errors returned synchronously by gateway calls.
#[derive(Debug, Error)]
pub enum GatewayError {
	#[error(transparent)]
	Address(#[from] AddressParseError),
	#[error(transparent)]
	Adapter(#[from] AdapterError),
	#[error(transparent)]
	Coordinator(#[from] CoordinatorError),
}

impl GatewayError {
	pub fn code(&self) -> ErrorCode {
		match self {
			GatewayError::Address(_) => ErrorCode::AddressParse,
			GatewayError::Adapter(e) => e.code(),
			GatewayError::Coordinator(e) => e.code(),
		}
	}
}

/// Turns monitor results into events.
#[derive(Clone)]
struct Reporter {
	event_bus: EventBus,
	subscription_type: SubscriptionType,
}

impl Reporter {
	fn new(event_bus: &EventBus, subscription_type: SubscriptionType) -> Self {
		Self {
			event_bus: event_bus.clone(),
			subscription_type,
		}
	}

	fn transaction(&self, key: SubscriptionKey, result: Result<Transaction, MonitorError>) -> Ready<()> {
		match result {
			Ok(tx) => self.respond(ResponseMessage {
				correlation_id: key.correlation_id,
				chain_id: key.chain_id,
				subscription_type: self.subscription_type,
				parameters: tx.return_values.clone(),
				state: Some(tx.state),
				transaction: Some(tx),
				timestamp: Utc::now().to_rfc3339(),
			}),
			Err(e) => self.fail(key, None, e),
		}
		ready(())
	}

	fn state(
		&self,
		key: SubscriptionKey,
		tx_hash: &str,
		result: Result<TransactionState, MonitorError>,
	) -> Ready<()> {
		match result {
			Ok(state) => self.respond(ResponseMessage {
				correlation_id: key.correlation_id,
				chain_id: key.chain_id,
				subscription_type: self.subscription_type,
				parameters: vec![],
				transaction: None,
				state: Some(state),
				timestamp: Utc::now().to_rfc3339(),
			}),
			Err(e) => self.fail(key, Some(tx_hash), e),
		}
		ready(())
	}

	fn occurrence(&self, key: SubscriptionKey, result: Result<Occurrence, MonitorError>) -> Ready<()> {
		match result {
			Ok(occurrence) => self.respond(ResponseMessage {
				correlation_id: key.correlation_id,
				chain_id: key.chain_id,
				subscription_type: self.subscription_type,
				timestamp: occurrence.iso_timestamp(),
				parameters: occurrence.parameters,
				transaction: None,
				state: None,
			}),
			Err(e) => self.fail(key, None, e),
		}
		ready(())
	}

	fn respond(&self, message: ResponseMessage) {
		self.event_bus.publish(GatewayEvent::Response(message)).ok();
	}

	fn fail(&self, key: SubscriptionKey, tx_hash: Option<&str>, error: MonitorError) {
		let (transaction_hash, reached_confidence) = match &error {
			// Cancellation is reported to nobody
			MonitorError::ManuallyUnsubscribed => return,
			MonitorError::Timeout {
				transaction_hash,
				reached_confidence,
			} => (
				transaction_hash.clone().or_else(|| tx_hash.map(str::to_string)),
				*reached_confidence,
			),
			MonitorError::Adapter(_) => (tx_hash.map(str::to_string), None),
		};
		self.event_bus
			.publish(GatewayEvent::Failure(FailureMessage {
				correlation_id: key.correlation_id,
				chain_id: key.chain_id,
				error_code: error.code(),
				message: error.to_string(),
				transaction_hash,
				reached_confidence,
			}))
			.ok();
	}
}

/// Blockchain access gateway.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Gateway {
	pub(crate) config: Arc<GatewayConfig>,
	pub(crate) adapters: Arc<AdapterService>,
	pub(crate) registry: Arc<SubscriptionRegistry>,
	monitor: Monitor,
	pub(crate) coordinator: Coordinator,
	event_bus: EventBus,
}

impl Gateway {
	/// Wires the registry, monitors, coordinator and event bus around a set
	/// of chain adapters.
	///
	/// # Arguments
	///
	/// * `config` - Gateway-wide settings: id, default timeouts and event capacity
	/// * `adapters` - One adapter per configured chain
	///
	/// # Returns
	///
	/// A gateway with no live monitors. Call [`Gateway::initialize`] before
	/// serving requests.
	pub fn new(config: GatewayConfig, adapters: AdapterService) -> Self {
		let adapters = Arc::new(adapters);
		let registry = Arc::new(SubscriptionRegistry::new());
		let monitor = Monitor::new(Arc::clone(&registry));
		let event_bus = EventBus::new(config.event_buffer);
		let coordinator = Coordinator::new(
			Arc::clone(&adapters),
			monitor.clone(),
			event_bus.clone(),
			config.dtx_timeout(),
		);
		Self {
			config: Arc::new(config),
			adapters,
			registry,
			monitor,
			coordinator,
			event_bus,
		}
	}

	/// Subscribes to every event the gateway publishes.
	pub fn events(&self) -> broadcast::Receiver<GatewayEvent> {
		self.event_bus.subscribe()
	}

	/// Registry of every live monitor, keyed by subscription key.
	pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
		&self.registry
	}

	pub fn chain_ids(&self) -> Vec<String> {
		self.adapters.chain_ids()
	}

	/// Confidence a transaction `confirmations` blocks deep has on `chain_id`.
	pub fn confidence_for_confirmations(
		&self,
		chain_id: &str,
		confirmations: u64,
	) -> Result<f64, GatewayError> {
		Ok(self
			.adapters
			.confidence_for_confirmations(chain_id, confirmations)?)
	}

	/// Confirmations needed on `chain_id` to reach `required_confidence`.
	///
	/// `None` when the chain can never reach that confidence.
	pub fn required_confirmations(
		&self,
		chain_id: &str,
		required_confidence: f64,
	) -> Result<Option<u64>, GatewayError> {
		Ok(self
			.adapters
			.required_confirmations(chain_id, required_confidence)?)
	}

	/// Explicit timeout, or the configured default for single-result monitors.
	fn single_timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
		timeout.or_else(|| self.config.monitoring_timeout())
	}

	pub async fn test_connection(&self, chain_id: &str) -> Result<(), GatewayError> {
		Ok(self.adapters.test_connection(chain_id).await?)
	}

	/// Transfers `value` to `receiver` and reports the transaction once it
	/// reaches `required_confidence`.
	///
	/// # Arguments
	///
	/// * `correlation_id` - Caller's request id, echoed in every event
	/// * `chain_id` - Chain to submit on
	/// * `receiver` - Chain-native address of the recipient
	/// * `value` - Amount in the chain's smallest unit
	/// * `required_confidence` - Threshold in [0, 1]
	/// * `timeout` - Overrides the configured monitoring timeout
	///
	/// # Returns
	///
	/// The key of the registered monitor. The confirmed transaction, or the
	/// failure, arrives later on the event bus. Unknown chains and invalid
	/// thresholds fail here without registering anything.
	pub async fn submit_transaction(
		&self,
		correlation_id: &str,
		chain_id: &str,
		receiver: &str,
		value: U256,
		required_confidence: f64,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let adapter = self.adapters.get(chain_id)?;
		check_required_confidence(required_confidence)?;
		let key = SubscriptionKey::new(correlation_id, chain_id);
		let reporter = Reporter::new(&self.event_bus, SubscriptionType::SubmitTransaction);
		let receiver = receiver.to_string();

		tracing::info!(correlation_id = %correlation_id, chain_id = %chain_id, "Submitting transaction");
		self.monitor
			.spawn_single(
				key.clone(),
				Subscription::new(SubscriptionType::SubmitTransaction),
				self.single_timeout(timeout),
				move |progress| async move {
					adapter
						.submit_transaction(&receiver, value, required_confidence, &progress)
						.await
				},
				move |key, result| reporter.transaction(key, result),
			)
			.await;
		Ok(key)
	}

	/// Reports the first incoming transaction reaching `required_confidence`,
	/// optionally only one sent by `sender`.
	pub async fn receive_transaction(
		&self,
		correlation_id: &str,
		chain_id: &str,
		required_confidence: f64,
		sender: Option<String>,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let timeout = self.single_timeout(timeout);
		self.watch_incoming(correlation_id, chain_id, required_confidence, sender, timeout, true)
			.await
	}

	/// Reports every incoming transaction reaching `required_confidence`
	/// until unsubscribed.
	pub async fn receive_transactions(
		&self,
		correlation_id: &str,
		chain_id: &str,
		required_confidence: f64,
		sender: Option<String>,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		self.watch_incoming(correlation_id, chain_id, required_confidence, sender, timeout, false)
			.await
	}

	async fn watch_incoming(
		&self,
		correlation_id: &str,
		chain_id: &str,
		required_confidence: f64,
		sender: Option<String>,
		timeout: Option<Duration>,
		single: bool,
	) -> Result<SubscriptionKey, GatewayError> {
		let adapter = self.adapters.get(chain_id)?;
		check_required_confidence(required_confidence)?;
		let subscription_type = if single {
			SubscriptionType::ReceiveTransaction
		} else {
			SubscriptionType::ReceiveTransactions
		};
		let key = SubscriptionKey::new(correlation_id, chain_id);
		let reporter = Reporter::new(&self.event_bus, subscription_type);

		self.monitor
			.spawn_stream(
				key.clone(),
				Subscription::new(subscription_type),
				timeout,
				single,
				async move { adapter.receive_transactions(required_confidence, sender).await },
				move |key, item| reporter.transaction(key, item),
			)
			.await;
		Ok(key)
	}

	/// Reports `Confirmed` once `tx_hash` reaches `required_confidence`, or
	/// `NotFound` if it is orphaned or unknown.
	///
	/// # Returns
	///
	/// The key of the registered monitor; the state arrives on the event bus.
	pub async fn ensure_transaction_state(
		&self,
		correlation_id: &str,
		chain_id: &str,
		tx_hash: &str,
		required_confidence: f64,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let adapter = self.adapters.get(chain_id)?;
		check_required_confidence(required_confidence)?;
		let key = SubscriptionKey::new(correlation_id, chain_id);
		let reporter = Reporter::new(&self.event_bus, SubscriptionType::EnsureTransactionState);
		let hash = tx_hash.to_string();
		let reported_hash = hash.clone();

		self.monitor
			.spawn_single(
				key.clone(),
				Subscription::new(SubscriptionType::EnsureTransactionState),
				self.single_timeout(timeout),
				move |progress| async move {
					adapter
						.ensure_transaction_state(&hash, required_confidence, &progress)
						.await
				},
				move |key, result| reporter.state(key, &reported_hash, result),
			)
			.await;
		Ok(key)
	}

	/// Reports `Pending` the moment `tx_hash` loses its block.
	pub async fn detect_orphaned_transaction(
		&self,
		correlation_id: &str,
		chain_id: &str,
		tx_hash: &str,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let adapter = self.adapters.get(chain_id)?;
		let key = SubscriptionKey::new(correlation_id, chain_id);
		let reporter = Reporter::new(&self.event_bus, SubscriptionType::DetectOrphanedTransaction);
		let hash = tx_hash.to_string();
		let reported_hash = hash.clone();

		self.monitor
			.spawn_single(
				key.clone(),
				Subscription::new(SubscriptionType::DetectOrphanedTransaction),
				self.single_timeout(timeout),
				move |_| async move { adapter.detect_orphaned_transaction(&hash).await },
				move |key, result| reporter.state(key, &reported_hash, result),
			)
			.await;
		Ok(key)
	}

	/// Invokes the contract function named by `address` with `arguments`.
	///
	/// Read-only functions report their outputs right away; state-changing
	/// ones report once the call reaches `required_confidence`.
	///
	/// # Arguments
	///
	/// * `correlation_id` - Caller's request id, echoed in every event
	/// * `address` - SCIP address naming the chain, contract and function signature
	/// * `arguments` - Values for the signature's inputs, in order
	/// * `required_confidence` - Threshold in [0, 1] for state-changing functions
	/// * `timeout` - Overrides the configured monitoring timeout
	///
	/// # Returns
	///
	/// The key of the registered monitor. Malformed addresses and arguments
	/// that do not match the signature fail here.
	pub async fn invoke(
		&self,
		correlation_id: &str,
		address: &str,
		arguments: Vec<Parameter>,
		required_confidence: f64,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let function = ScipAddress::parse(address)?;
		let adapter = self.adapters.get(&function.chain_id)?;
		check_required_confidence(required_confidence)?;
		check_arguments(&function, &arguments)?;
		let key = SubscriptionKey::new(correlation_id, function.chain_id.clone())
			.with_contract_path(function.contract_path());
		let reporter = Reporter::new(&self.event_bus, SubscriptionType::InvokeSmartContractFunction);

		tracing::info!(correlation_id = %correlation_id, function = %function, "Invoking function");
		self.monitor
			.spawn_single(
				key.clone(),
				Subscription::new(SubscriptionType::InvokeSmartContractFunction),
				self.single_timeout(timeout),
				move |progress| async move {
					adapter
						.invoke_smart_contract_function(
							&function,
							&arguments,
							required_confidence,
							&progress,
						)
						.await
				},
				move |key, result| reporter.transaction(key, result),
			)
			.await;
		Ok(key)
	}

	/// Reports every event emission or function invocation matching
	/// `address` once it reaches `required_confidence`.
	///
	/// The address' function name is the event or function identifier and
	/// its parameter list the shape occurrences must have.
	pub async fn subscribe(
		&self,
		correlation_id: &str,
		address: &str,
		kind: OccurrenceKind,
		required_confidence: f64,
		timeout: Option<Duration>,
	) -> Result<SubscriptionKey, GatewayError> {
		let target = ScipAddress::parse(address)?;
		let adapter = self.adapters.get(&target.chain_id)?;
		check_required_confidence(required_confidence)?;
		let key = SubscriptionKey::new(correlation_id, target.chain_id.clone())
			.with_contract_path(target.contract_path());
		let subscription_type = SubscriptionType::from(kind);
		let subscription = Subscription::for_occurrences(
			subscription_type,
			target.function_name.clone(),
			target.parameter_types.clone(),
		);
		let reporter = Reporter::new(&self.event_bus, subscription_type);
		let target = occurrence_target(&target, kind);

		self.monitor
			.spawn_stream(
				key.clone(),
				subscription,
				timeout,
				false,
				async move {
					adapter
						.subscribe_to_occurrences(&target, required_confidence)
						.await
				},
				move |key, item| reporter.occurrence(key, item),
			)
			.await;
		Ok(key)
	}

	/// Returns past occurrences matching `address` inside `time_frame`.
	pub async fn query(
		&self,
		address: &str,
		kind: OccurrenceKind,
		time_frame: &TimeFrame,
	) -> Result<Vec<Occurrence>, GatewayError> {
		let target = ScipAddress::parse(address)?;
		let adapter = self.adapters.get(&target.chain_id)?;
		Ok(adapter
			.query_occurrences(&occurrence_target(&target, kind), time_frame)
			.await?)
	}

	/// Cancels the monitor registered under `key`. Returns false if there is
	/// none or it had already ended.
	pub async fn unsubscribe(&self, key: &SubscriptionKey) -> bool {
		let cancelled = match self.registry.get(key).await {
			Some(subscription) => subscription.unsubscribe(),
			None => false,
		};
		tracing::debug!(subscription_key = %key, cancelled, "Unsubscribe requested");
		cancelled
	}

	/// Cancels every monitor registered under `correlation_id`.
	pub async fn unsubscribe_correlation(&self, correlation_id: &str) -> usize {
		let mut cancelled = 0;
		for key in self.registry.keys_for_correlation(correlation_id).await {
			if self.unsubscribe(&key).await {
				cancelled += 1;
			}
		}
		cancelled
	}

	/// Cancels every occurrence monitor watching the identifier and parameter
	/// shape named by `address`.
	pub async fn unsubscribe_matching(
		&self,
		address: &str,
		kind: OccurrenceKind,
	) -> Result<usize, GatewayError> {
		let target = ScipAddress::parse(address)?;
		let keys = self
			.registry
			.query_by_identifiable(
				&target.chain_id,
				&target.contract_path(),
				Some(&target.function_name),
				&target.parameter_types,
				SubscriptionType::from(kind),
			)
			.await;
		let mut cancelled = 0;
		for key in keys {
			if self.unsubscribe(&key).await {
				cancelled += 1;
			}
		}
		Ok(cancelled)
	}

	/// Starts a distributed transaction across the given participants.
	///
	/// # Arguments
	///
	/// * `participants` - One request per chain, each a transfer or a function call
	/// * `deadline` - Bound on the whole transaction, defaulting to `dtx_timeout_seconds`
	///
	/// # Returns
	///
	/// The transaction id. The verdict is published once on the event bus.
	/// Invalid participants are rejected before any of them is launched.
	pub async fn start_distributed_transaction(
		&self,
		participants: Vec<ParticipantRequest>,
		deadline: Option<Duration>,
	) -> Result<Uuid, GatewayError> {
		Ok(self.coordinator.start(participants, deadline).await?)
	}

	/// Aborts a live distributed transaction.
	pub async fn abort_distributed_transaction(&self, id: Uuid) -> Result<bool, GatewayError> {
		Ok(self.coordinator.abort(id).await?)
	}

	/// Snapshot of a live distributed transaction, `None` once it is done.
	pub fn distributed_transaction(&self, id: Uuid) -> Option<DistributedTransactionSnapshot> {
		self.coordinator.snapshot(id)
	}
}

fn occurrence_target(address: &ScipAddress, kind: OccurrenceKind) -> OccurrenceTarget {
	OccurrenceTarget {
		kind,
		contract_path: address.contract_path(),
		identifier: address.function_name.clone(),
		parameters: address.parameter_types.clone(),
	}
}
