//! In-process simulated chain.
//!
//! The simulated family keeps a whole chain in memory: a height, a mempool,
//! transactions with their including blocks, deployed contract functions and
//! the occurrences they produced. Blocks are produced on demand through
//! [`SimulatedAdapter::mine_blocks`] or, when `block_interval_ms` is set, by
//! a background task. Fault injection (orphaning, unreachability) and
//! incoming traffic are driven through the public handle.
//!
//! Every mutation is announced on a broadcast channel. Waiting operations
//! subscribe to it and re-evaluate the chain state on each announcement.

use crate::{
	check_required_confidence, AdapterError, AdapterRegistry, ChainAdapter, ConfidenceCalculator,
	OccurrenceStream, ProgressTracker, TransactionStream,
};
use alloy_primitives::U256;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use gateway_types::{
	same_signature, truncate_id, Block, ConfigSchema, Field, FieldType, ImplementationRegistry,
	Occurrence, OccurrenceKind, OccurrenceTarget, Parameter, Schema, ScipAddress, TimeFrame,
	Transaction, TransactionState, ValidationError,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

/// Capacity of the chain update channel.
const UPDATE_BUFFER: usize = 256;

/// Default address transfers are sent from.
const DEFAULT_ACCOUNT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";

/// Announced after every change to the simulated chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainUpdate {
	BlockMined { height: u64 },
	TransactionQueued { hash: String },
	TransactionOrphaned { hash: String },
	OccurrenceRecorded,
	ReachabilityChanged { reachable: bool },
}

/// How a deployed function behaves when invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBehavior {
	/// Returns the given outputs without touching chain state.
	ReadOnly { outputs: Vec<Parameter> },
	/// Produces a transaction and a function invocation occurrence once mined.
	StateChanging,
}

#[derive(Debug, Clone)]
struct DeployedFunction {
	parameters: Vec<Parameter>,
	return_type: String,
	behavior: FunctionBehavior,
}

#[derive(Debug, Clone)]
struct RecordedOccurrence {
	kind: OccurrenceKind,
	contract_path: String,
	identifier: String,
	parameters: Vec<Parameter>,
	block_number: u64,
	timestamp: DateTime<Utc>,
	/// Transaction that produced the occurrence, if any.
	source: Option<String>,
}

impl RecordedOccurrence {
	fn matches(&self, target: &OccurrenceTarget) -> bool {
		self.kind == target.kind
			&& self.contract_path == target.contract_path
			&& self.identifier == target.identifier
			&& same_signature(&target.parameters, &self.parameters)
	}

	fn to_occurrence(&self) -> Occurrence {
		Occurrence {
			parameters: self.parameters.clone(),
			timestamp: self.timestamp,
		}
	}
}

/// Where a queued transaction came from.
enum Origin {
	Local,
	Incoming,
	Invocation(Invocation),
}

#[derive(Debug, Clone)]
struct Invocation {
	contract_path: String,
	function_name: String,
	arguments: Vec<Parameter>,
}

#[derive(Debug)]
struct ChainState {
	height: u64,
	reachable: bool,
	balance: U256,
	/// Transactions by hash. Stored with `Pending` state; the block tells
	/// whether they are included.
	transactions: HashMap<String, Transaction>,
	mempool: Vec<String>,
	orphaned: HashSet<String>,
	/// Hashes of transfers addressed to the local account, in arrival order.
	incoming: Vec<String>,
	invocations: HashMap<String, Invocation>,
	functions: HashMap<(String, String), DeployedFunction>,
	occurrences: Vec<RecordedOccurrence>,
}

impl ChainState {
	fn is_live(&self, occurrence: &RecordedOccurrence) -> bool {
		occurrence
			.source
			.as_ref()
			.is_none_or(|hash| !self.orphaned.contains(hash))
	}
}

struct Inner {
	chain_id: String,
	account: String,
	calculator: ConfidenceCalculator,
	smart_contracts: bool,
	state: Mutex<ChainState>,
	updates: broadcast::Sender<ChainUpdate>,
}

impl Inner {
	fn announce(&self, update: ChainUpdate) {
		// No receivers simply means nobody is waiting
		let _ = self.updates.send(update);
	}

	fn unreachable(&self) -> AdapterError {
		AdapterError::NodeUnreachable(format!("chain '{}' is not reachable", self.chain_id))
	}

	async fn ensure_reachable(&self) -> Result<(), AdapterError> {
		if self.state.lock().await.reachable {
			Ok(())
		} else {
			Err(self.unreachable())
		}
	}

	fn require_smart_contracts(&self) -> Result<(), AdapterError> {
		if self.smart_contracts {
			Ok(())
		} else {
			Err(AdapterError::UnsupportedOperation(format!(
				"chain '{}' has no smart contracts",
				self.chain_id
			)))
		}
	}

	/// Re-evaluates `check` against the chain state after every update until
	/// it produces a result. Fails as soon as the chain becomes unreachable.
	async fn wait_for<T, F>(&self, mut check: F) -> Result<T, AdapterError>
	where
		F: FnMut(&ChainState) -> Option<Result<T, AdapterError>> + Send,
		T: Send,
	{
		let mut updates = self.updates.subscribe();
		loop {
			{
				let state = self.state.lock().await;
				if !state.reachable {
					return Err(self.unreachable());
				}
				if let Some(result) = check(&state) {
					return result;
				}
			}
			match updates.recv().await {
				Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
				Err(broadcast::error::RecvError::Closed) => return Err(self.unreachable()),
			}
		}
	}

	/// Waits until the transaction reaches `required` confidence or is orphaned.
	async fn wait_for_confidence(
		&self,
		hash: &str,
		required: f64,
		progress: &ProgressTracker,
	) -> Result<Transaction, AdapterError> {
		self.wait_for(|state| {
			if state.orphaned.contains(hash) {
				let mut tx = state.transactions.get(hash)?.clone();
				tx.state = TransactionState::NotFound;
				return Some(Ok(tx));
			}
			let tx = match state.transactions.get(hash) {
				Some(tx) => tx,
				None => {
					return Some(Err(AdapterError::InvalidTransaction(format!(
						"unknown transaction {}",
						hash
					))))
				},
			};
			tx.block.as_ref()?;
			let confidence = self.calculator.confidence(tx, state.height);
			progress.record(hash, confidence);
			(confidence >= required).then(|| {
				let mut confirmed = tx.clone();
				confirmed.state = TransactionState::Confirmed;
				Ok(confirmed)
			})
		})
		.await
	}

	async fn mine(&self) -> u64 {
		let mut state = self.state.lock().await;
		state.height += 1;
		let height = state.height;
		let block = Block {
			number: height,
			hash: format!("0x{}", Uuid::new_v4().simple()),
		};
		let timestamp = Utc::now();

		let included = std::mem::take(&mut state.mempool);
		for hash in included {
			if let Some(tx) = state.transactions.get_mut(&hash) {
				tx.block = Some(block.clone());
			}
			if let Some(invocation) = state.invocations.remove(&hash) {
				state.occurrences.push(RecordedOccurrence {
					kind: OccurrenceKind::FunctionInvocation,
					contract_path: invocation.contract_path,
					identifier: invocation.function_name,
					parameters: invocation.arguments,
					block_number: height,
					timestamp,
					source: Some(hash),
				});
			}
		}
		drop(state);

		self.announce(ChainUpdate::BlockMined { height });
		height
	}

	/// Adds a transaction to the mempool and returns its hash.
	async fn queue(&self, mut tx: Transaction, origin: Origin) -> String {
		let hash = format!("0x{}", Uuid::new_v4().simple());
		tx.hash = hash.clone();
		tx.state = TransactionState::Pending;

		let mut state = self.state.lock().await;
		state.transactions.insert(hash.clone(), tx);
		state.mempool.push(hash.clone());
		match origin {
			Origin::Local => {},
			Origin::Incoming => state.incoming.push(hash.clone()),
			Origin::Invocation(invocation) => {
				state.invocations.insert(hash.clone(), invocation);
			},
		}
		drop(state);

		self.announce(ChainUpdate::TransactionQueued { hash: hash.clone() });
		hash
	}
}

/// Handle to a simulated chain.
///
/// Clones share the same chain.
#[derive(Clone)]
pub struct SimulatedAdapter {
	inner: Arc<Inner>,
}

impl SimulatedAdapter {
	/// Creates a simulated chain from its `settings` table.
	///
	/// When `block_interval_ms` is positive and a tokio runtime is available,
	/// a background task mines a block at that interval for as long as any
	/// handle to the chain is alive.
	pub fn new(
		chain_id: &str,
		calculator: ConfidenceCalculator,
		config: &toml::Value,
	) -> Result<Self, AdapterError> {
		SimulatedSchema
			.validate(config)
			.map_err(|e| AdapterError::Configuration(format!("Invalid configuration: {}", e)))?;

		let initial_height = config
			.get("initial_height")
			.and_then(|v| v.as_integer())
			.unwrap_or(0) as u64;
		let block_interval_ms = config
			.get("block_interval_ms")
			.and_then(|v| v.as_integer())
			.unwrap_or(0) as u64;
		let account = config
			.get("account")
			.and_then(|v| v.as_str())
			.unwrap_or(DEFAULT_ACCOUNT)
			.to_string();
		let balance = match config.get("balance").and_then(|v| v.as_str()) {
			Some(s) => U256::from_str_radix(s, 10)
				.map_err(|e| AdapterError::Configuration(format!("Invalid balance: {}", e)))?,
			None => U256::MAX,
		};
		let smart_contracts = config
			.get("smart_contracts")
			.and_then(|v| v.as_bool())
			.unwrap_or(true);

		let (updates, _) = broadcast::channel(UPDATE_BUFFER);
		let inner = Arc::new(Inner {
			chain_id: chain_id.to_string(),
			account,
			calculator,
			smart_contracts,
			state: Mutex::new(ChainState {
				height: initial_height,
				reachable: true,
				balance,
				transactions: HashMap::new(),
				mempool: Vec::new(),
				orphaned: HashSet::new(),
				incoming: Vec::new(),
				invocations: HashMap::new(),
				functions: HashMap::new(),
				occurrences: Vec::new(),
			}),
			updates,
		});

		if block_interval_ms > 0 {
			match tokio::runtime::Handle::try_current() {
				Ok(handle) => {
					handle.spawn(produce_blocks(
						Arc::downgrade(&inner),
						Duration::from_millis(block_interval_ms),
					));
				},
				Err(_) => tracing::warn!(
					chain_id = %chain_id,
					"No runtime available, timed block production disabled"
				),
			}
		}

		tracing::info!(
			chain_id = %chain_id,
			height = initial_height,
			block_interval_ms,
			"Simulated chain created"
		);

		Ok(Self { inner })
	}

	/// The account transfers are sent from and incoming transfers go to.
	pub fn account(&self) -> &str {
		&self.inner.account
	}

	/// Subscribes to chain updates.
	pub fn updates(&self) -> broadcast::Receiver<ChainUpdate> {
		self.inner.updates.subscribe()
	}

	/// Mines `count` blocks and returns the new height.
	pub async fn mine_blocks(&self, count: u64) -> u64 {
		let mut height = self.inner.state.lock().await.height;
		for _ in 0..count {
			height = self.inner.mine().await;
		}
		height
	}

	/// Removes a transaction from its block. Returns false if it was not
	/// included.
	pub async fn orphan_transaction(&self, hash: &str) -> bool {
		let mut state = self.inner.state.lock().await;
		let Some(tx) = state.transactions.get_mut(hash) else {
			return false;
		};
		if tx.block.take().is_none() {
			return false;
		}
		state.orphaned.insert(hash.to_string());
		drop(state);

		tracing::info!(
			chain_id = %self.inner.chain_id,
			tx_hash = %truncate_id(hash),
			"Transaction orphaned"
		);
		self.inner.announce(ChainUpdate::TransactionOrphaned {
			hash: hash.to_string(),
		});
		true
	}

	/// Makes the chain endpoint reachable or unreachable. Pending waits fail
	/// with `NodeUnreachable` while it is unreachable.
	pub async fn set_reachable(&self, reachable: bool) {
		self.inner.state.lock().await.reachable = reachable;
		self.inner
			.announce(ChainUpdate::ReachabilityChanged { reachable });
	}

	/// Queues a transfer from `sender` to the local account.
	pub async fn inject_incoming_transaction(&self, sender: &str, value: U256) -> String {
		let tx = Transaction {
			hash: String::new(),
			block: None,
			from: sender.to_string(),
			to: self.inner.account.clone(),
			value,
			state: TransactionState::Pending,
			return_values: vec![],
		};
		self.inner.queue(tx, Origin::Incoming).await
	}

	/// Deploys the function named by `address` with the given behavior.
	pub async fn deploy_function(&self, address: &ScipAddress, behavior: FunctionBehavior) {
		let mut state = self.inner.state.lock().await;
		state.functions.insert(
			(address.contract_path(), address.function_name.clone()),
			DeployedFunction {
				parameters: address.parameter_types.clone(),
				return_type: address.return_type.clone(),
				behavior,
			},
		);
	}

	/// Records an event emission in the current head block.
	pub async fn emit_event(&self, contract_path: &str, name: &str, parameters: Vec<Parameter>) {
		let mut state = self.inner.state.lock().await;
		let block_number = state.height;
		state.occurrences.push(RecordedOccurrence {
			kind: OccurrenceKind::Event,
			contract_path: contract_path.to_string(),
			identifier: name.to_string(),
			parameters,
			block_number,
			timestamp: Utc::now(),
			source: None,
		});
		drop(state);
		self.inner.announce(ChainUpdate::OccurrenceRecorded);
	}
}

async fn produce_blocks(inner: Weak<Inner>, interval: Duration) {
	let mut ticker = tokio::time::interval(interval);
	// The first tick completes immediately
	ticker.tick().await;
	loop {
		ticker.tick().await;
		let Some(inner) = inner.upgrade() else {
			break;
		};
		let height = inner.mine().await;
		tracing::trace!(chain_id = %inner.chain_id, height, "Block produced");
	}
}

/// Outputs of a read-only function, or an error if they do not satisfy the
/// declared return type.
fn read_only_result(
	function: &ScipAddress,
	outputs: &[Parameter],
) -> Result<Transaction, AdapterError> {
	if !function.has_return_value() && !outputs.is_empty() {
		return Err(AdapterError::InvalidParameters(format!(
			"{} declares no return value",
			function
		)));
	}
	Ok(Transaction::return_value(outputs.to_vec()))
}

#[async_trait]
impl ChainAdapter for SimulatedAdapter {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(SimulatedSchema)
	}

	fn chain_id(&self) -> &str {
		&self.inner.chain_id
	}

	fn confidence(&self) -> &ConfidenceCalculator {
		&self.inner.calculator
	}

	async fn current_height(&self) -> Result<u64, AdapterError> {
		let state = self.inner.state.lock().await;
		if !state.reachable {
			return Err(self.inner.unreachable());
		}
		Ok(state.height)
	}

	async fn submit_transaction(
		&self,
		receiver: &str,
		value: U256,
		required_confidence: f64,
		progress: &ProgressTracker,
	) -> Result<Transaction, AdapterError> {
		check_required_confidence(required_confidence)?;
		if receiver.is_empty() || receiver.chars().any(char::is_whitespace) {
			return Err(AdapterError::InvalidTransaction(format!(
				"malformed receiver '{}'",
				receiver
			)));
		}

		{
			let mut state = self.inner.state.lock().await;
			if !state.reachable {
				return Err(self.inner.unreachable());
			}
			if value > state.balance {
				return Err(AdapterError::InvalidTransaction(
					"insufficient balance".to_string(),
				));
			}
			state.balance -= value;
		}

		let hash = self
			.inner
			.queue(
				Transaction {
					hash: String::new(),
					block: None,
					from: self.inner.account.clone(),
					to: receiver.to_string(),
					value,
					state: TransactionState::Pending,
					return_values: vec![],
				},
				Origin::Local,
			)
			.await;
		progress.record(hash.as_str(), 0.0);

		tracing::debug!(
			chain_id = %self.inner.chain_id,
			tx_hash = %truncate_id(&hash),
			"Transaction submitted"
		);

		self.inner
			.wait_for_confidence(&hash, required_confidence, progress)
			.await
	}

	async fn receive_transactions(
		&self,
		required_confidence: f64,
		sender: Option<String>,
	) -> Result<TransactionStream, AdapterError> {
		check_required_confidence(required_confidence)?;
		let inner = Arc::clone(&self.inner);
		let start = {
			let state = inner.state.lock().await;
			if !state.reachable {
				return Err(inner.unreachable());
			}
			state.incoming.len()
		};

		let stream = async_stream::stream! {
			let mut updates = inner.updates.subscribe();
			let mut cursor = start;
			let mut watching: Vec<String> = Vec::new();
			loop {
				let ready = {
					let state = inner.state.lock().await;
					if state.reachable {
						for hash in &state.incoming[cursor..] {
							let from_sender = match (&sender, state.transactions.get(hash)) {
								(Some(sender), Some(tx)) => &tx.from == sender,
								(None, Some(_)) => true,
								(_, None) => false,
							};
							if from_sender {
								watching.push(hash.clone());
							}
						}
						cursor = state.incoming.len();

						let mut ready = Vec::new();
						watching.retain(|hash| {
							if state.orphaned.contains(hash) {
								return false;
							}
							match state.transactions.get(hash) {
								Some(tx) if tx.block.is_some()
									&& inner.calculator.confidence(tx, state.height)
										>= required_confidence =>
								{
									let mut confirmed = tx.clone();
									confirmed.state = TransactionState::Confirmed;
									ready.push(confirmed);
									false
								},
								Some(_) => true,
								None => false,
							}
						});
						ready.sort_by_key(|tx| tx.block_number());
						Ok(ready)
					} else {
						Err(inner.unreachable())
					}
				};

				match ready {
					Ok(ready) => {
						for tx in ready {
							yield Ok(tx);
						}
					},
					Err(e) => {
						yield Err(e);
						break;
					},
				}

				match updates.recv().await {
					Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		};

		Ok(stream.boxed())
	}

	async fn ensure_transaction_state(
		&self,
		tx_hash: &str,
		required_confidence: f64,
		progress: &ProgressTracker,
	) -> Result<TransactionState, AdapterError> {
		check_required_confidence(required_confidence)?;
		self.inner.ensure_reachable().await?;
		if !self.inner.state.lock().await.transactions.contains_key(tx_hash) {
			return Ok(TransactionState::NotFound);
		}
		progress.record(tx_hash, 0.0);
		self.inner
			.wait_for_confidence(tx_hash, required_confidence, progress)
			.await
			.map(|tx| tx.state)
	}

	async fn detect_orphaned_transaction(
		&self,
		tx_hash: &str,
	) -> Result<TransactionState, AdapterError> {
		let mut included = false;
		self.inner
			.wait_for(|state| {
				let Some(tx) = state.transactions.get(tx_hash) else {
					return Some(Err(AdapterError::InvalidTransaction(format!(
						"unknown transaction {}",
						tx_hash
					))));
				};
				if tx.block.is_some() {
					included = true;
					None
				} else if included || state.orphaned.contains(tx_hash) {
					Some(Ok(TransactionState::Pending))
				} else {
					None
				}
			})
			.await
	}

	async fn invoke_smart_contract_function(
		&self,
		function: &ScipAddress,
		arguments: &[Parameter],
		required_confidence: f64,
		progress: &ProgressTracker,
	) -> Result<Transaction, AdapterError> {
		self.inner.require_smart_contracts()?;
		check_required_confidence(required_confidence)?;
		if !same_signature(&function.parameter_types, arguments)
			|| arguments.iter().any(|a| a.value.is_none())
		{
			return Err(AdapterError::InvalidParameters(format!(
				"arguments do not match {}",
				function
			)));
		}

		let deployed = {
			let state = self.inner.state.lock().await;
			if !state.reachable {
				return Err(self.inner.unreachable());
			}
			state
				.functions
				.get(&(function.contract_path(), function.function_name.clone()))
				.cloned()
				.ok_or_else(|| {
					AdapterError::InvalidTransaction(format!("no function deployed at {}", function))
				})?
		};
		if !same_signature(&deployed.parameters, arguments)
			|| deployed.return_type != function.return_type
		{
			return Err(AdapterError::InvalidParameters(format!(
				"{} does not match the deployed signature",
				function
			)));
		}

		match deployed.behavior {
			FunctionBehavior::ReadOnly { outputs } => read_only_result(function, &outputs),
			FunctionBehavior::StateChanging => {
				let tx = Transaction {
					hash: String::new(),
					block: None,
					from: self.inner.account.clone(),
					to: function.contract_path(),
					value: U256::ZERO,
					state: TransactionState::Pending,
					return_values: vec![],
				};
				let invocation = Invocation {
					contract_path: function.contract_path(),
					function_name: function.function_name.clone(),
					arguments: arguments.to_vec(),
				};
				let hash = self.inner.queue(tx, Origin::Invocation(invocation)).await;
				progress.record(hash.as_str(), 0.0);
				self.inner
					.wait_for_confidence(&hash, required_confidence, progress)
					.await
			},
		}
	}

	async fn subscribe_to_occurrences(
		&self,
		target: &OccurrenceTarget,
		required_confidence: f64,
	) -> Result<OccurrenceStream, AdapterError> {
		self.inner.require_smart_contracts()?;
		check_required_confidence(required_confidence)?;
		let inner = Arc::clone(&self.inner);
		let target = target.clone();
		let start = {
			let state = inner.state.lock().await;
			if !state.reachable {
				return Err(inner.unreachable());
			}
			state.occurrences.len()
		};
		// None when the threshold is out of reach: matches are then never reported.
		let required_depth = inner.calculator.required_depth(required_confidence);

		let stream = async_stream::stream! {
			let mut updates = inner.updates.subscribe();
			let mut cursor = start;
			let mut watching: Vec<usize> = Vec::new();
			loop {
				let ready = {
					let state = inner.state.lock().await;
					if state.reachable {
						watching.extend(
							(cursor..state.occurrences.len())
								.filter(|&i| state.occurrences[i].matches(&target)),
						);
						cursor = state.occurrences.len();

						let mut ready = Vec::new();
						watching.retain(|&i| {
							let occurrence = &state.occurrences[i];
							if !state.is_live(occurrence) {
								return false;
							}
							let depth = (state.height + 1).saturating_sub(occurrence.block_number);
							if required_depth.is_some_and(|required| depth >= required) {
								ready.push(occurrence.to_occurrence());
								false
							} else {
								true
							}
						});
						Ok(ready)
					} else {
						Err(inner.unreachable())
					}
				};

				match ready {
					Ok(ready) => {
						for occurrence in ready {
							yield Ok(occurrence);
						}
					},
					Err(e) => {
						yield Err(e);
						break;
					},
				}

				match updates.recv().await {
					Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {},
					Err(broadcast::error::RecvError::Closed) => break,
				}
			}
		};

		Ok(stream.boxed())
	}

	async fn query_occurrences(
		&self,
		target: &OccurrenceTarget,
		time_frame: &TimeFrame,
	) -> Result<Vec<Occurrence>, AdapterError> {
		self.inner.require_smart_contracts()?;
		let state = self.inner.state.lock().await;
		if !state.reachable {
			return Err(self.inner.unreachable());
		}
		let mut found: Vec<Occurrence> = state
			.occurrences
			.iter()
			.filter(|o| o.matches(target) && state.is_live(o) && time_frame.contains(&o.timestamp))
			.map(RecordedOccurrence::to_occurrence)
			.collect();
		found.sort_by_key(|o| o.timestamp);
		Ok(found)
	}
}

/// Configuration schema for the simulated family.
pub struct SimulatedSchema;

impl ConfigSchema for SimulatedSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let non_negative = || FieldType::Integer {
			min: Some(0),
			max: None,
		};
		let schema = Schema::new(
			vec![],
			vec![
				Field::new("block_interval_ms", non_negative()),
				Field::new("initial_height", non_negative()),
				Field::new("account", FieldType::String).with_validator(|v| {
					match v.as_str() {
						Some(s) if s.is_empty() => Err("account cannot be empty".to_string()),
						_ => Ok(()),
					}
				}),
				Field::new("balance", FieldType::String).with_validator(|v| {
					v.as_str()
						.map(|s| U256::from_str_radix(s, 10).map(|_| ()))
						.unwrap_or(Ok(()))
						.map_err(|e| format!("not a decimal amount: {}", e))
				}),
				Field::new("smart_contracts", FieldType::Boolean),
			],
		);
		schema.validate(config)
	}
}

/// Registry for the simulated chain family.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "simulated";
	type Factory = crate::AdapterFactory;

	fn factory() -> Self::Factory {
		create_simulated_adapter
	}
}

impl AdapterRegistry for Registry {}

/// Factory function for the simulated family.
pub fn create_simulated_adapter(
	chain_id: &str,
	calculator: ConfidenceCalculator,
	config: &toml::Value,
) -> Result<Box<dyn ChainAdapter>, AdapterError> {
	Ok(Box::new(SimulatedAdapter::new(chain_id, calculator, config)?))
}
