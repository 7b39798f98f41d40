//! Chain-level data types.
//!
//! Every chain family is reduced to the same small vocabulary: blocks with a
//! monotonically increasing number, transactions that may or may not be
//! included in a block, typed parameters, and occurrences of events or
//! function invocations observed on a contract.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A block as observed on a chain. Immutable once observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
	/// Height of the block.
	pub number: u64,
	/// Chain-specific block hash.
	pub hash: String,
}

/// Monitoring state of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
	Unknown,
	Pending,
	Confirmed,
	NotFound,
	Invalid,
	/// Synthetic state carrying the result of a read-only function call.
	ReturnValue,
}

impl TransactionState {
	/// Returns true for terminal states that count as success.
	pub fn is_success(&self) -> bool {
		matches!(
			self,
			TransactionState::Confirmed | TransactionState::ReturnValue
		)
	}
}

impl fmt::Display for TransactionState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			TransactionState::Unknown => "UNKNOWN",
			TransactionState::Pending => "PENDING",
			TransactionState::Confirmed => "CONFIRMED",
			TransactionState::NotFound => "NOT_FOUND",
			TransactionState::Invalid => "INVALID",
			TransactionState::ReturnValue => "RETURN_VALUE",
		};
		write!(f, "{}", s)
	}
}

/// A named, typed parameter with an optional value.
///
/// Inside a SCIP address only `name` and `type_name` are set; arguments and
/// return values additionally carry their value in string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parameter {
	pub name: String,
	#[serde(rename = "type")]
	pub type_name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
}

impl Parameter {
	/// Creates a parameter declaration without a value.
	pub fn typed(name: impl Into<String>, type_name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			type_name: type_name.into(),
			value: None,
		}
	}

	/// Creates a parameter carrying a value.
	pub fn with_value(
		name: impl Into<String>,
		type_name: impl Into<String>,
		value: impl Into<String>,
	) -> Self {
		Self {
			name: name.into(),
			type_name: type_name.into(),
			value: Some(value.into()),
		}
	}
}

/// Compares two parameter lists by shape: same length and the same type at
/// every position. Names and values are ignored.
pub fn same_signature(left: &[Parameter], right: &[Parameter]) -> bool {
	left.len() == right.len()
		&& left
			.iter()
			.zip(right.iter())
			.all(|(l, r)| l.type_name == r.type_name)
}

/// A transaction as reported by a chain adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
	pub hash: String,
	/// The including block, absent while pending or for return values.
	pub block: Option<Block>,
	pub from: String,
	pub to: String,
	#[serde(with = "u256_serde")]
	pub value: U256,
	pub state: TransactionState,
	#[serde(default)]
	pub return_values: Vec<Parameter>,
}

impl Transaction {
	/// Builds the synthetic placeholder carrying a read-only function's outputs.
	pub fn return_value(return_values: Vec<Parameter>) -> Self {
		Self {
			hash: String::new(),
			block: None,
			from: String::new(),
			to: String::new(),
			value: U256::ZERO,
			state: TransactionState::ReturnValue,
			return_values,
		}
	}

	/// Number of the including block, if any.
	pub fn block_number(&self) -> Option<u64> {
		self.block.as_ref().map(|b| b.number)
	}
}

/// Kind of occurrence a monitor or query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccurrenceKind {
	/// A contract event emission.
	Event,
	/// A state-changing function invocation.
	FunctionInvocation,
}

/// Identifies which occurrences a monitor or query is interested in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceTarget {
	pub kind: OccurrenceKind,
	/// Contract path segments joined with `/`.
	pub contract_path: String,
	/// Event or function name.
	pub identifier: String,
	/// Parameter shape; only the types are significant.
	pub parameters: Vec<Parameter>,
}

/// A single event emission or function invocation observed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
	pub parameters: Vec<Parameter>,
	/// Time of the including block. Serialized as an ISO-8601 string.
	pub timestamp: DateTime<Utc>,
}

impl Occurrence {
	/// ISO-8601 representation of the occurrence time.
	pub fn iso_timestamp(&self) -> String {
		self.timestamp.to_rfc3339()
	}
}

/// Optional closed time window used when querying past occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFrame {
	pub from: Option<DateTime<Utc>>,
	pub to: Option<DateTime<Utc>>,
}

impl TimeFrame {
	pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
		self.from.is_none_or(|from| *timestamp >= from) && self.to.is_none_or(|to| *timestamp <= to)
	}
}

/// Serde module for U256 values encoded as decimal strings.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		value.to_string().serialize(serializer)
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(D::Error::custom)
	}
}
