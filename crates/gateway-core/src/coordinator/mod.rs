//! Cross-chain commitment coordinator.
//!
//! A distributed transaction groups one chain-local operation per
//! participating chain. Each operation runs as an ordinary monitor whose
//! terminal result is a vote: a transaction that reached its required
//! confidence votes yes, anything else votes no. The verdict is COMMIT once
//! every participant voted yes before the deadline, and ABORT on the first
//! no vote, on deadline expiry or on explicit abort. An abort cancels every
//! monitor that has not voted yet; chain-local effects that already happened
//! are not compensated.

pub(crate) mod transaction;

use crate::engine::event_bus::EventBus;
use crate::monitoring::{Monitor, MonitorError};
use crate::subscription::Subscription;
use alloy_primitives::U256;
use gateway_adapter::{check_required_confidence, AdapterError, AdapterService, ChainAdapter};
use gateway_types::{
	same_signature, AddressParseError, DistributedTransactionSnapshot, ErrorCode, GatewayEvent,
	Parameter, ScipAddress, SubscriptionKey, SubscriptionType, Transaction, Verdict, VoteOutcome,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use transaction::{Decision, DistributedTransaction};
use uuid::Uuid;

/// Reason recorded when the coordinator deadline fires.
pub const DEADLINE_ELAPSED: &str = "deadline elapsed";

/// Reason recorded when a caller aborts explicitly.
pub const ABORTED_BY_CALLER: &str = "aborted by caller";

#[derive(Debug, Error)]
pub enum CoordinatorError {
	#[error("A distributed transaction needs at least one participant")]
	NoParticipants,
	#[error("Duplicate participant {0}")]
	DuplicateParticipant(String),
	#[error("Distributed transaction not found: {0}")]
	NotFound(Uuid),
	#[error(transparent)]
	Address(#[from] AddressParseError),
	#[error(transparent)]
	Adapter(#[from] AdapterError),
}

impl CoordinatorError {
	pub fn code(&self) -> ErrorCode {
		match self {
			CoordinatorError::NoParticipants | CoordinatorError::DuplicateParticipant(_) => {
				ErrorCode::InvalidParameters
			},
			CoordinatorError::NotFound(_) => ErrorCode::UnknownError,
			CoordinatorError::Address(_) => ErrorCode::AddressParse,
			CoordinatorError::Adapter(e) => e.code(),
		}
	}
}

/// The chain-local operation a participant performs.
#[derive(Debug, Clone, PartialEq)]
pub enum ParticipantOperation {
	/// Native value transfer on a chain.
	Transfer {
		chain_id: String,
		receiver: String,
		value: U256,
	},
	/// Smart contract function call addressed by a SCIP address.
	Invoke {
		address: String,
		arguments: Vec<Parameter>,
	},
}

/// One participant of a distributed transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantRequest {
	pub operation: ParticipantOperation,
	pub required_confidence: f64,
	/// Chain-level timeout. A participant timing out votes no.
	pub timeout: Option<Duration>,
}

impl ParticipantRequest {
	pub fn transfer(
		chain_id: impl Into<String>,
		receiver: impl Into<String>,
		value: U256,
		required_confidence: f64,
	) -> Self {
		Self {
			operation: ParticipantOperation::Transfer {
				chain_id: chain_id.into(),
				receiver: receiver.into(),
				value,
			},
			required_confidence,
			timeout: None,
		}
	}

	pub fn invoke(
		address: impl Into<String>,
		arguments: Vec<Parameter>,
		required_confidence: f64,
	) -> Self {
		Self {
			operation: ParticipantOperation::Invoke {
				address: address.into(),
				arguments,
			},
			required_confidence,
			timeout: None,
		}
	}

	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}
}

enum Action {
	Transfer { receiver: String, value: U256 },
	Invoke { function: ScipAddress, arguments: Vec<Parameter> },
}

struct Participant {
	key: SubscriptionKey,
	adapter: Arc<dyn ChainAdapter>,
	action: Action,
	required_confidence: f64,
	timeout: Option<Duration>,
}

/// Owns every live distributed transaction.
#[derive(Clone)]
pub struct Coordinator {
	adapters: Arc<AdapterService>,
	monitor: Monitor,
	event_bus: EventBus,
	transactions: Arc<Mutex<HashMap<Uuid, Arc<DistributedTransaction>>>>,
	default_deadline: Duration,
}

impl Coordinator {
	pub fn new(
		adapters: Arc<AdapterService>,
		monitor: Monitor,
		event_bus: EventBus,
		default_deadline: Duration,
	) -> Self {
		Self {
			adapters,
			monitor,
			event_bus,
			transactions: Arc::new(Mutex::new(HashMap::new())),
			default_deadline,
		}
	}

	fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<DistributedTransaction>>> {
		self.transactions.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn get(&self, id: Uuid) -> Option<Arc<DistributedTransaction>> {
		self.lock().get(&id).cloned()
	}

	/// Starts a distributed transaction and returns its id.
	///
	/// Every request is validated before anything is submitted: unknown
	/// chains, malformed addresses, mismatching arguments, invalid
	/// confidence thresholds and two participants sharing a chain and
	/// contract path fail the whole call. The verdict is published as a
	/// [`GatewayEvent::Verdict`] whose id is the returned one; participant
	/// monitors are registered under that id as correlation id.
	pub async fn start(
		&self,
		requests: Vec<ParticipantRequest>,
		deadline: Option<Duration>,
	) -> Result<Uuid, CoordinatorError> {
		if requests.is_empty() {
			return Err(CoordinatorError::NoParticipants);
		}

		let id = Uuid::new_v4();
		let mut participants = Vec::with_capacity(requests.len());
		let mut seen = HashSet::new();
		for request in requests {
			let participant = self.resolve(id, request)?;
			if !seen.insert(participant.key.clone()) {
				return Err(CoordinatorError::DuplicateParticipant(
					participant.key.to_string(),
				));
			}
			participants.push(participant);
		}

		let dtx = Arc::new(DistributedTransaction::new(
			id,
			participants.iter().map(|p| p.key.clone()).collect(),
		));
		self.lock().insert(id, Arc::clone(&dtx));
		tracing::info!(
			dtx_id = %id,
			participants = participants.len(),
			"Distributed transaction started"
		);

		let deadline = deadline.unwrap_or(self.default_deadline);
		let this = self.clone();
		let timer = tokio::spawn(async move {
			tokio::time::sleep(deadline).await;
			this.expire(id).await;
		});
		dtx.set_deadline(timer.abort_handle());

		let total = participants.len();
		for (launched, participant) in participants.into_iter().enumerate() {
			if dtx.is_done() {
				tracing::debug!(
					dtx_id = %id,
					skipped = total - launched,
					"Verdict reached before every participant was launched"
				);
				break;
			}
			self.launch(&dtx, participant).await;
		}
		Ok(id)
	}

	fn resolve(&self, id: Uuid, request: ParticipantRequest) -> Result<Participant, CoordinatorError> {
		check_required_confidence(request.required_confidence)?;
		let (key, adapter, action) = match request.operation {
			ParticipantOperation::Transfer {
				chain_id,
				receiver,
				value,
			} => {
				let adapter = self.adapters.get(&chain_id)?;
				(
					SubscriptionKey::new(id.to_string(), chain_id),
					adapter,
					Action::Transfer { receiver, value },
				)
			},
			ParticipantOperation::Invoke { address, arguments } => {
				let function = ScipAddress::parse(&address)?;
				let adapter = self.adapters.get(&function.chain_id)?;
				check_arguments(&function, &arguments)?;
				(
					SubscriptionKey::new(id.to_string(), function.chain_id.clone())
						.with_contract_path(function.contract_path()),
					adapter,
					Action::Invoke {
						function,
						arguments,
					},
				)
			},
		};
		Ok(Participant {
			key,
			adapter,
			action,
			required_confidence: request.required_confidence,
			timeout: request.timeout,
		})
	}

	async fn launch(&self, dtx: &Arc<DistributedTransaction>, participant: Participant) {
		let Participant {
			key,
			adapter,
			action,
			required_confidence,
			timeout,
		} = participant;
		let id = dtx.id();
		let this = self.clone();
		let gate = Arc::clone(dtx);
		let on_complete = move |key: SubscriptionKey, result: Result<Transaction, MonitorError>| async move {
			this.record_vote(id, key, vote_outcome(result)).await;
		};

		match action {
			Action::Transfer { receiver, value } => {
				self.monitor
					.spawn_single(
						key.clone(),
						Subscription::new(SubscriptionType::SubmitTransaction),
						timeout,
						move |progress| async move {
							hold_if_decided(&gate).await;
							adapter
								.submit_transaction(&receiver, value, required_confidence, &progress)
								.await
						},
						on_complete,
					)
					.await
			},
			Action::Invoke {
				function,
				arguments,
			} => {
				self.monitor
					.spawn_single(
						key.clone(),
						Subscription::new(SubscriptionType::InvokeSmartContractFunction),
						timeout,
						move |progress| async move {
							hold_if_decided(&gate).await;
							adapter
								.invoke_smart_contract_function(
									&function,
									&arguments,
									required_confidence,
									&progress,
								)
								.await
						},
						on_complete,
					)
					.await
			},
		}

		// A verdict reached while this participant was being registered
		// never saw its subscription.
		if !dtx.mark_started() {
			if let Some(subscription) = self.monitor.registry().get(&key).await {
				subscription.unsubscribe();
			}
		}
	}

	async fn record_vote(&self, id: Uuid, key: SubscriptionKey, outcome: VoteOutcome) {
		let Some(dtx) = self.get(id) else {
			tracing::debug!(
				dtx_id = %id,
				chain_id = %key.chain_id,
				"Vote for finished distributed transaction ignored"
			);
			return;
		};
		tracing::debug!(
			dtx_id = %id,
			chain_id = %key.chain_id,
			yes = outcome.is_yes(),
			"Vote received"
		);
		if let Some(decision) = dtx.record_vote(key, outcome) {
			self.finalize(decision).await;
		}
	}

	async fn expire(&self, id: Uuid) {
		let Some(dtx) = self.get(id) else {
			return;
		};
		dtx.clear_deadline();
		if let Some(decision) = dtx.abort(DEADLINE_ELAPSED) {
			self.finalize(decision).await;
		}
	}

	/// Cancels the monitors that have not voted, evicts the transaction and
	/// publishes the verdict.
	async fn finalize(&self, decision: Decision) {
		let Decision { outcome, pending } = decision;
		for key in &pending {
			if let Some(subscription) = self.monitor.registry().get(key).await {
				subscription.unsubscribe();
			}
		}
		self.lock().remove(&outcome.id);

		match outcome.verdict {
			Verdict::Commit => tracing::info!(
				dtx_id = %outcome.id,
				verdict = %outcome.verdict,
				"Distributed transaction decided"
			),
			_ => tracing::warn!(
				dtx_id = %outcome.id,
				verdict = %outcome.verdict,
				reason = outcome.reason.as_deref().unwrap_or_default(),
				cancelled = pending.len(),
				"Distributed transaction decided"
			),
		}
		self.event_bus.publish(GatewayEvent::Verdict(outcome)).ok();
	}

	/// Aborts a live distributed transaction. Returns false if its verdict
	/// was already being decided.
	pub async fn abort(&self, id: Uuid) -> Result<bool, CoordinatorError> {
		let dtx = self.get(id).ok_or(CoordinatorError::NotFound(id))?;
		match dtx.abort(ABORTED_BY_CALLER) {
			Some(decision) => {
				self.finalize(decision).await;
				Ok(true)
			},
			None => Ok(false),
		}
	}

	/// Aborts every live distributed transaction with `reason`.
	pub async fn abort_all(&self, reason: &str) -> usize {
		let live: Vec<_> = self.lock().values().cloned().collect();
		let mut aborted = 0;
		for dtx in live {
			if let Some(decision) = dtx.abort(reason) {
				self.finalize(decision).await;
				aborted += 1;
			}
		}
		aborted
	}

	pub fn snapshot(&self, id: Uuid) -> Option<DistributedTransactionSnapshot> {
		self.get(id).map(|dtx| dtx.snapshot())
	}

	/// Number of live distributed transactions.
	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.lock().is_empty()
	}
}

/// Checks that `arguments` bind positionally to the parameters declared by
/// `function` and that each carries a value.
pub(crate) fn check_arguments(
	function: &ScipAddress,
	arguments: &[Parameter],
) -> Result<(), AdapterError> {
	if !same_signature(&function.parameter_types, arguments)
		|| arguments.iter().any(|a| a.value.is_none())
	{
		return Err(AdapterError::InvalidParameters(format!(
			"arguments do not match {}",
			function
		)));
	}
	Ok(())
}

/// Parks participant work whose transaction was decided before the work
/// began. Whoever reached the verdict cancels the monitor, so nothing is
/// submitted to the chain.
async fn hold_if_decided(dtx: &DistributedTransaction) {
	if dtx.is_done() {
		std::future::pending::<()>().await;
	}
}

fn vote_outcome(result: Result<Transaction, MonitorError>) -> VoteOutcome {
	match result {
		Ok(transaction) => VoteOutcome::Completed { transaction },
		Err(e) => VoteOutcome::Failed {
			error_code: e.code(),
			message: e.to_string(),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::subscription::SubscriptionRegistry;
	use crate::test_support::{chain, next_queued, service};
	use gateway_adapter::implementations::simulated::{ChainUpdate, FunctionBehavior, SimulatedAdapter};
	use gateway_types::{DistributedTransactionOutcome, DtxState};
	use tokio::sync::broadcast;

	const RECEIVER: &str = "0x70997970c51812dc3a010c7d01b50e0d17dc79c8";

	fn coordinator(chains: &[&SimulatedAdapter]) -> (Coordinator, broadcast::Receiver<GatewayEvent>) {
		let event_bus = EventBus::new(64);
		let events = event_bus.subscribe();
		let coordinator = Coordinator::new(
			service(chains),
			Monitor::new(Arc::new(SubscriptionRegistry::new())),
			event_bus,
			Duration::from_secs(600),
		);
		(coordinator, events)
	}

	async fn next_verdict(events: &mut broadcast::Receiver<GatewayEvent>) -> DistributedTransactionOutcome {
		loop {
			if let GatewayEvent::Verdict(outcome) = events.recv().await.unwrap() {
				return outcome;
			}
		}
	}

	fn transfers(chains: &[&SimulatedAdapter]) -> Vec<ParticipantRequest> {
		chains
			.iter()
			.map(|c| ParticipantRequest::transfer(c.chain_id(), RECEIVER, U256::from(10), 0.9))
			.collect()
	}

	#[tokio::test]
	async fn test_all_yes_votes_commit() {
		let (eth1, eth2, btc) = (chain("eth1"), chain("eth2"), chain("btc"));
		let chains = [&eth1, &eth2, &btc];
		let mut updates: Vec<_> = chains.iter().map(|c| c.updates()).collect();
		let (coordinator, mut events) = coordinator(&chains);

		let id = coordinator.start(transfers(&chains), None).await.unwrap();
		assert_eq!(coordinator.snapshot(id).unwrap().state, DtxState::Started);

		for (adapter, updates) in chains.iter().zip(updates.iter_mut()) {
			next_queued(updates).await;
			adapter.mine_blocks(1).await;
		}

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.id, id);
		assert_eq!(outcome.verdict, Verdict::Commit);
		assert!(outcome.reason.is_none());
		assert_eq!(outcome.results.len(), 3);
		assert!(coordinator.snapshot(id).is_none());
	}

	#[tokio::test]
	async fn test_unreachable_chain_aborts_and_cancels_others() {
		let (eth1, eth2, btc) = (chain("eth1"), chain("eth2"), chain("btc"));
		let chains = [&eth1, &eth2, &btc];
		let mut updates: Vec<_> = chains.iter().map(|c| c.updates()).collect();
		let (coordinator, mut events) = coordinator(&chains);
		let registry = Arc::clone(coordinator.monitor.registry());

		let id = coordinator.start(transfers(&chains), None).await.unwrap();
		for updates in updates.iter_mut() {
			next_queued(updates).await;
		}
		let eth1_sub = registry
			.get(&SubscriptionKey::new(id.to_string(), "eth1"))
			.await
			.unwrap();
		let btc_sub = registry
			.get(&SubscriptionKey::new(id.to_string(), "btc"))
			.await
			.unwrap();

		eth2.set_reachable(false).await;

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.verdict, Verdict::Abort);
		assert!(outcome.reason.unwrap().contains("eth2"));
		assert_eq!(outcome.results.len(), 1);
		assert_eq!(
			outcome.results[0].outcome,
			VoteOutcome::Failed {
				error_code: ErrorCode::NodeUnreachable,
				message: "Node unreachable: chain 'eth2' is not reachable".into(),
			}
		);
		assert!(eth1_sub.is_closed());
		assert!(btc_sub.is_closed());

		// Mining now must not produce a second verdict
		eth1.mine_blocks(1).await;
		btc.mine_blocks(1).await;
		tokio::task::yield_now().await;
		assert!(matches!(
			events.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
	}

	async fn wait_until_idle(registry: &SubscriptionRegistry) {
		tokio::time::timeout(Duration::from_secs(5), async {
			while !registry.is_empty().await {
				tokio::task::yield_now().await;
			}
		})
		.await
		.unwrap();
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_participant_launched_after_verdict_submits_nothing() {
		let eth1 = chain("eth1");
		let mut updates = eth1.updates();
		let (coordinator, mut events) = coordinator(&[&eth1]);
		let id = Uuid::new_v4();
		let participant = coordinator
			.resolve(id, ParticipantRequest::transfer("eth1", RECEIVER, U256::from(10), 0.9))
			.unwrap();
		let dtx = Arc::new(DistributedTransaction::new(id, vec![participant.key.clone()]));
		assert!(dtx.abort(ABORTED_BY_CALLER).is_some());

		coordinator.launch(&dtx, participant).await;
		wait_until_idle(coordinator.monitor.registry()).await;

		assert!(matches!(
			updates.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
		assert!(matches!(
			events.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
	}

	#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
	async fn test_fast_failure_among_many_participants() {
		let down = chain("down");
		down.set_reachable(false).await;
		let healthy: Vec<_> = (0..32).map(|i| chain(&format!("eth{}", i))).collect();
		let mut chains = vec![&down];
		chains.extend(healthy.iter());
		let mut updates: Vec<_> = healthy.iter().map(|c| c.updates()).collect();
		let (coordinator, mut events) = coordinator(&chains);

		let id = coordinator.start(transfers(&chains), None).await.unwrap();

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.id, id);
		assert_eq!(outcome.verdict, Verdict::Abort);
		assert!(outcome.reason.unwrap().contains("down"));
		assert_eq!(outcome.results.len(), 1);

		wait_until_idle(coordinator.monitor.registry()).await;
		assert!(coordinator.is_empty());
		for updates in updates.iter_mut() {
			let mut queued = 0;
			while let Ok(update) = updates.try_recv() {
				if matches!(update, ChainUpdate::TransactionQueued { .. }) {
					queued += 1;
				}
			}
			assert!(queued <= 1);
		}

		// Confirmations arriving now have no monitor left to vote
		for adapter in &healthy {
			adapter.mine_blocks(1).await;
		}
		tokio::time::sleep(Duration::from_millis(50)).await;
		assert!(matches!(
			events.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_aborts() {
		let (eth1, eth2) = (chain("eth1"), chain("eth2"));
		let chains = [&eth1, &eth2];
		let (coordinator, mut events) = coordinator(&chains);

		let id = coordinator
			.start(transfers(&chains), Some(Duration::from_secs(5)))
			.await
			.unwrap();

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.id, id);
		assert_eq!(outcome.verdict, Verdict::Abort);
		assert_eq!(outcome.reason.as_deref(), Some(DEADLINE_ELAPSED));
		assert!(outcome.results.is_empty());
		assert!(coordinator.is_empty());
	}

	#[tokio::test(start_paused = true)]
	async fn test_participant_timeout_votes_no() {
		let eth1 = chain("eth1");
		let (coordinator, mut events) = coordinator(&[&eth1]);

		coordinator
			.start(
				vec![ParticipantRequest::transfer("eth1", RECEIVER, U256::from(1), 0.9)
					.with_timeout(Duration::from_secs(2))],
				Some(Duration::from_secs(60)),
			)
			.await
			.unwrap();

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.verdict, Verdict::Abort);
		assert!(matches!(
			outcome.results[0].outcome,
			VoteOutcome::Failed {
				error_code: ErrorCode::Timeout,
				..
			}
		));
	}

	#[tokio::test]
	async fn test_duplicate_vote_after_commit_is_ignored() {
		let eth1 = chain("eth1");
		let mut updates = eth1.updates();
		let (coordinator, mut events) = coordinator(&[&eth1]);

		let id = coordinator
			.start(transfers(&[&eth1]), None)
			.await
			.unwrap();
		next_queued(&mut updates).await;
		eth1.mine_blocks(1).await;
		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.verdict, Verdict::Commit);

		let key = SubscriptionKey::new(id.to_string(), "eth1");
		let vote = outcome.results[0].outcome.clone();
		coordinator.record_vote(id, key.clone(), vote).await;
		coordinator
			.record_vote(
				id,
				key,
				VoteOutcome::Failed {
					error_code: ErrorCode::NodeUnreachable,
					message: "late".into(),
				},
			)
			.await;

		assert!(matches!(
			events.try_recv(),
			Err(broadcast::error::TryRecvError::Empty)
		));
		assert!(matches!(
			coordinator.abort(id).await,
			Err(CoordinatorError::NotFound(_))
		));
	}

	#[tokio::test]
	async fn test_explicit_abort() {
		let eth1 = chain("eth1");
		let (coordinator, mut events) = coordinator(&[&eth1]);

		let id = coordinator
			.start(transfers(&[&eth1]), None)
			.await
			.unwrap();
		assert!(coordinator.abort(id).await.unwrap());

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.verdict, Verdict::Abort);
		assert_eq!(outcome.reason.as_deref(), Some(ABORTED_BY_CALLER));
	}

	#[tokio::test]
	async fn test_read_only_invocation_votes_yes() {
		let (eth1, eth2) = (chain("eth1"), chain("eth2"));
		let owner = "scip://eth1/0xdf12ab/getOwner?:address";
		eth1.deploy_function(
			&ScipAddress::parse(owner).unwrap(),
			FunctionBehavior::ReadOnly {
				outputs: vec![Parameter::with_value("owner", "address", RECEIVER)],
			},
		)
		.await;
		let mut updates = eth2.updates();
		let (coordinator, mut events) = coordinator(&[&eth1, &eth2]);

		coordinator
			.start(
				vec![
					ParticipantRequest::invoke(owner, vec![], 0.9),
					ParticipantRequest::transfer("eth2", RECEIVER, U256::from(3), 0.9),
				],
				None,
			)
			.await
			.unwrap();
		next_queued(&mut updates).await;
		eth2.mine_blocks(1).await;

		let outcome = next_verdict(&mut events).await;
		assert_eq!(outcome.verdict, Verdict::Commit);
		assert!(outcome
			.results
			.iter()
			.any(|vote| vote.key.contract_path == "0xdf12ab"));
	}

	#[tokio::test]
	async fn test_start_fails_fast() {
		let eth1 = chain("eth1");
		let (coordinator, _events) = coordinator(&[&eth1]);

		let err = coordinator.start(vec![], None).await.unwrap_err();
		assert!(matches!(err, CoordinatorError::NoParticipants));

		let err = coordinator
			.start(
				vec![ParticipantRequest::transfer("btc", RECEIVER, U256::from(1), 0.9)],
				None,
			)
			.await
			.unwrap_err();
		assert_eq!(err.code(), ErrorCode::ChainIdNotFound);

		let err = coordinator
			.start(vec![ParticipantRequest::invoke("eth1/c/f?:void", vec![], 0.9)], None)
			.await
			.unwrap_err();
		assert_eq!(err.code(), ErrorCode::AddressParse);

		let err = coordinator
			.start(
				vec![ParticipantRequest::invoke(
					"scip://eth1/c/set?key=uint:void",
					vec![Parameter::with_value("key", "string", "x")],
					0.9,
				)],
				None,
			)
			.await
			.unwrap_err();
		assert_eq!(err.code(), ErrorCode::InvalidParameters);

		let err = coordinator
			.start(
				vec![ParticipantRequest::transfer("eth1", RECEIVER, U256::from(1), 1.5)],
				None,
			)
			.await
			.unwrap_err();
		assert_eq!(err.code(), ErrorCode::InvalidParameters);

		let err = coordinator
			.start(transfers(&[&eth1, &eth1]), None)
			.await
			.unwrap_err();
		assert!(matches!(err, CoordinatorError::DuplicateParticipant(_)));

		assert!(coordinator.is_empty());
		assert!(coordinator.monitor.registry().is_empty().await);
	}
}
