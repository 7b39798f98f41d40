//! Subscription identity types.

use crate::OccurrenceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Uniquely identifies one live monitor.
///
/// Equality and hashing cover all three fields. Chain-level monitors use an
/// empty contract path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
	pub correlation_id: String,
	pub chain_id: String,
	#[serde(default)]
	pub contract_path: String,
}

impl SubscriptionKey {
	/// Creates a chain-level key.
	pub fn new(correlation_id: impl Into<String>, chain_id: impl Into<String>) -> Self {
		Self {
			correlation_id: correlation_id.into(),
			chain_id: chain_id.into(),
			contract_path: String::new(),
		}
	}

	/// Sets the contract path of this key.
	pub fn with_contract_path(mut self, contract_path: impl Into<String>) -> Self {
		self.contract_path = contract_path.into();
		self
	}
}

impl fmt::Display for SubscriptionKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.contract_path.is_empty() {
			write!(f, "{}@{}", self.correlation_id, self.chain_id)
		} else {
			write!(
				f,
				"{}@{}/{}",
				self.correlation_id, self.chain_id, self.contract_path
			)
		}
	}
}

/// The operation a monitor was created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionType {
	SubmitTransaction,
	ReceiveTransaction,
	ReceiveTransactions,
	DetectOrphanedTransaction,
	EnsureTransactionState,
	InvokeSmartContractFunction,
	EventOccurrences,
	FunctionInvocations,
}

impl SubscriptionType {
	/// Returns true for monitors that watch a stream of occurrences.
	pub fn is_occurrence_monitor(&self) -> bool {
		matches!(
			self,
			SubscriptionType::EventOccurrences | SubscriptionType::FunctionInvocations
		)
	}
}

impl From<OccurrenceKind> for SubscriptionType {
	fn from(kind: OccurrenceKind) -> Self {
		match kind {
			OccurrenceKind::Event => SubscriptionType::EventOccurrences,
			OccurrenceKind::FunctionInvocation => SubscriptionType::FunctionInvocations,
		}
	}
}
