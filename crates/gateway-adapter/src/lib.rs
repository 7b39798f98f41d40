//! Chain adapter module for the blockchain access gateway.
//!
//! A chain adapter is the gateway's only way to talk to a chain. Each chain
//! family provides one implementation of [`ChainAdapter`] and registers it
//! under the family name used in configuration. The rest of the gateway
//! submits, observes and queries through this interface without knowing
//! which family it is talking to.

use alloy_primitives::U256;
use async_trait::async_trait;
use futures::stream::BoxStream;
use gateway_types::{
	ConfigSchema, ErrorCode, ImplementationRegistry, Occurrence, OccurrenceTarget, Parameter,
	ScipAddress, TimeFrame, Transaction, TransactionState,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

mod confidence;
mod progress;

pub use confidence::{check_required_confidence, ConfidenceCalculator, MAX_SEARCH_DEPTH};
pub use progress::{Progress, ProgressTracker};

/// Re-export implementations
pub mod implementations {
	pub mod simulated;
}

/// Errors raised by chain adapters.
#[derive(Debug, Clone, Error)]
pub enum AdapterError {
	/// The chain endpoint could not be reached.
	#[error("Node unreachable: {0}")]
	NodeUnreachable(String),
	/// The chain rejected the operation.
	#[error("Invalid transaction: {0}")]
	InvalidTransaction(String),
	/// The chain family does not provide this capability.
	#[error("Unsupported operation: {0}")]
	UnsupportedOperation(String),
	/// No adapter is configured for the chain id.
	#[error("Chain id not found: {0}")]
	ChainIdNotFound(String),
	/// Arguments do not match the function signature.
	#[error("Invalid parameters: {0}")]
	InvalidParameters(String),
	/// The adapter configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl AdapterError {
	pub fn code(&self) -> ErrorCode {
		match self {
			AdapterError::NodeUnreachable(_) => ErrorCode::NodeUnreachable,
			AdapterError::InvalidTransaction(_) => ErrorCode::InvalidTransaction,
			AdapterError::UnsupportedOperation(_) => ErrorCode::UnsupportedOperation,
			AdapterError::ChainIdNotFound(_) => ErrorCode::ChainIdNotFound,
			AdapterError::InvalidParameters(_) => ErrorCode::InvalidParameters,
			AdapterError::Configuration(_) => ErrorCode::UnknownError,
		}
	}
}

/// Lazy, infinite, non-restartable sequence of incoming transactions.
pub type TransactionStream = BoxStream<'static, Result<Transaction, AdapterError>>;

/// Lazy, infinite, non-restartable sequence of observed occurrences.
pub type OccurrenceStream = BoxStream<'static, Result<Occurrence, AdapterError>>;

/// Interface every chain family implements.
///
/// Confidence thresholds are probabilities in [0, 1], evaluated with the
/// adapter's [`ConfidenceCalculator`]. Operations a family cannot perform
/// fail with [`AdapterError::UnsupportedOperation`]; the smart contract
/// operations default to exactly that.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
	/// Schema for the family-specific `settings` table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Identifier of the chain this adapter serves.
	fn chain_id(&self) -> &str;

	/// Calculator converting this chain's block depths into confidence.
	fn confidence(&self) -> &ConfidenceCalculator;

	/// Current height of the canonical chain.
	async fn current_height(&self) -> Result<u64, AdapterError>;

	/// Checks that the chain endpoint answers.
	async fn test_connection(&self) -> Result<(), AdapterError> {
		self.current_height().await.map(|_| ())
	}

	/// Transfers `value` to `receiver` and waits for the transfer to reach
	/// `required_confidence`.
	///
	/// # Arguments
	///
	/// * `receiver` - Chain-native address of the recipient
	/// * `value` - Amount in the chain's smallest unit
	/// * `required_confidence` - Threshold in [0, 1] the transfer must reach
	/// * `progress` - Slot updated with the hash and confidence seen so far
	///
	/// # Returns
	///
	/// A `Confirmed` transaction, or a `NotFound` one if the transaction is
	/// orphaned first. Rejected submissions fail with
	/// [`AdapterError::InvalidTransaction`] and an unreachable chain with
	/// [`AdapterError::NodeUnreachable`].
	async fn submit_transaction(
		&self,
		receiver: &str,
		value: U256,
		required_confidence: f64,
		progress: &ProgressTracker,
	) -> Result<Transaction, AdapterError>;

	/// Streams incoming transactions once each reaches `required_confidence`,
	/// optionally only those sent by `sender`.
	async fn receive_transactions(
		&self,
		required_confidence: f64,
		sender: Option<String>,
	) -> Result<TransactionStream, AdapterError>;

	/// Waits for a known transaction to settle.
	///
	/// # Arguments
	///
	/// * `tx_hash` - Hash of the transaction to watch
	/// * `required_confidence` - Threshold in [0, 1] it must reach
	/// * `progress` - Slot updated with the confidence seen so far
	///
	/// # Returns
	///
	/// `Confirmed` once the transaction reaches `required_confidence`, or
	/// `NotFound` if it is orphaned or unknown.
	async fn ensure_transaction_state(
		&self,
		tx_hash: &str,
		required_confidence: f64,
		progress: &ProgressTracker,
	) -> Result<TransactionState, AdapterError>;

	/// Resolves to `Pending` the moment the transaction loses its block.
	async fn detect_orphaned_transaction(
		&self,
		tx_hash: &str,
	) -> Result<TransactionState, AdapterError>;

	/// Calls a contract function.
	///
	/// State-changing functions behave like [`submit_transaction`]. Read-only
	/// functions complete immediately with a `ReturnValue` transaction
	/// carrying the outputs.
	///
	/// # Arguments
	///
	/// * `function` - Address of the function, including its signature
	/// * `arguments` - Values matching the signature's input types in order
	/// * `required_confidence` - Threshold for state-changing functions
	/// * `progress` - Slot updated while a state-changing call settles
	///
	/// # Returns
	///
	/// The resulting transaction. Arguments that do not match the signature
	/// fail with [`AdapterError::InvalidParameters`].
	///
	/// [`submit_transaction`]: ChainAdapter::submit_transaction
	async fn invoke_smart_contract_function(
		&self,
		_function: &ScipAddress,
		_arguments: &[Parameter],
		_required_confidence: f64,
		_progress: &ProgressTracker,
	) -> Result<Transaction, AdapterError> {
		Err(AdapterError::UnsupportedOperation(format!(
			"chain '{}' has no smart contracts",
			self.chain_id()
		)))
	}

	/// Streams event emissions or function invocations matching `target`
	/// once each reaches `required_confidence`.
	async fn subscribe_to_occurrences(
		&self,
		_target: &OccurrenceTarget,
		_required_confidence: f64,
	) -> Result<OccurrenceStream, AdapterError> {
		Err(AdapterError::UnsupportedOperation(format!(
			"chain '{}' has no smart contracts",
			self.chain_id()
		)))
	}

	/// Returns past occurrences matching `target` inside `time_frame`.
	async fn query_occurrences(
		&self,
		_target: &OccurrenceTarget,
		_time_frame: &TimeFrame,
	) -> Result<Vec<Occurrence>, AdapterError> {
		Err(AdapterError::UnsupportedOperation(format!(
			"chain '{}' has no smart contracts",
			self.chain_id()
		)))
	}
}

/// Type alias for adapter factory functions.
///
/// Receives the chain id, the chain's confidence calculator and its
/// `settings` table.
pub type AdapterFactory = fn(
	&str,
	ConfidenceCalculator,
	&toml::Value,
) -> Result<Box<dyn ChainAdapter>, AdapterError>;

/// Registry trait for chain family implementations.
pub trait AdapterRegistry: ImplementationRegistry<Factory = AdapterFactory> {}

/// Get all registered chain families.
///
/// Returns a vector of (name, factory) tuples for all available families.
pub fn get_all_implementations() -> Vec<(&'static str, AdapterFactory)> {
	use implementations::simulated;

	vec![(simulated::Registry::NAME, simulated::Registry::factory())]
}

/// Routes calls to the adapter of each configured chain.
pub struct AdapterService {
	adapters: HashMap<String, Arc<dyn ChainAdapter>>,
}

impl AdapterService {
	/// Creates the service from adapters keyed by chain id.
	pub fn new(adapters: HashMap<String, Arc<dyn ChainAdapter>>) -> Self {
		Self { adapters }
	}

	/// Returns the adapter serving `chain_id`.
	pub fn get(&self, chain_id: &str) -> Result<Arc<dyn ChainAdapter>, AdapterError> {
		self.adapters
			.get(chain_id)
			.cloned()
			.ok_or_else(|| AdapterError::ChainIdNotFound(chain_id.to_string()))
	}

	pub fn contains(&self, chain_id: &str) -> bool {
		self.adapters.contains_key(chain_id)
	}

	/// Configured chain ids in sorted order.
	pub fn chain_ids(&self) -> Vec<String> {
		let mut ids: Vec<String> = self.adapters.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub async fn test_connection(&self, chain_id: &str) -> Result<(), AdapterError> {
		self.get(chain_id)?.test_connection().await
	}

	/// Converts a number of confirmations into confidence on one chain.
	///
	/// # Arguments
	///
	/// * `chain_id` - Chain whose finality parameters apply
	/// * `confirmations` - Depth of the transaction, where 1 is the chain head
	///
	/// # Returns
	///
	/// The confidence in [0, 1], or [`AdapterError::ChainIdNotFound`].
	pub fn confidence_for_confirmations(
		&self,
		chain_id: &str,
		confirmations: u64,
	) -> Result<f64, AdapterError> {
		Ok(self.get(chain_id)?.confidence().for_depth(confirmations))
	}

	/// Converts a confidence threshold into the confirmations it needs.
	///
	/// # Arguments
	///
	/// * `chain_id` - Chain whose finality parameters apply
	/// * `required_confidence` - Threshold in [0, 1]
	///
	/// # Returns
	///
	/// The smallest sufficient depth, or `None` when the chain can never
	/// reach the threshold within [`MAX_SEARCH_DEPTH`] blocks.
	pub fn required_confirmations(
		&self,
		chain_id: &str,
		required_confidence: f64,
	) -> Result<Option<u64>, AdapterError> {
		check_required_confidence(required_confidence)?;
		Ok(self
			.get(chain_id)?
			.confidence()
			.required_depth(required_confidence))
	}
}
