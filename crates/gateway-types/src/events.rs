//! Callback events produced by the gateway.
//!
//! Every monitor's terminal result, every streamed occurrence and every
//! distributed transaction verdict is published on the event bus as a
//! [`GatewayEvent`]. Delivering these to external callers is the concern of
//! whoever subscribes to the bus.

use crate::{
	DistributedTransactionOutcome, ErrorCode, Parameter, SubscriptionType, Transaction,
	TransactionState,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GatewayEvent {
	/// A monitor produced a result.
	Response(ResponseMessage),
	/// A monitor failed or timed out.
	Failure(FailureMessage),
	/// A distributed transaction reached its verdict.
	Verdict(DistributedTransactionOutcome),
}

impl GatewayEvent {
	/// Correlation id the event belongs to. Verdicts use the transaction id.
	pub fn correlation_id(&self) -> String {
		match self {
			GatewayEvent::Response(r) => r.correlation_id.clone(),
			GatewayEvent::Failure(f) => f.correlation_id.clone(),
			GatewayEvent::Verdict(v) => v.id.to_string(),
		}
	}
}

/// Successful monitor result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
	pub correlation_id: String,
	pub chain_id: String,
	pub subscription_type: SubscriptionType,
	/// Return values or occurrence parameters.
	#[serde(default)]
	pub parameters: Vec<Parameter>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction: Option<Transaction>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub state: Option<TransactionState>,
	/// ISO-8601 time of the observation.
	pub timestamp: String,
}

/// Failed or timed-out monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureMessage {
	pub correlation_id: String,
	pub chain_id: String,
	pub error_code: ErrorCode,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub transaction_hash: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reached_confidence: Option<f64>,
}
