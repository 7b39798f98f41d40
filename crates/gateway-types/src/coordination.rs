//! Distributed transaction views.
//!
//! The coordinator owns the live aggregate; these are the values it hands
//! out: the lifecycle state, the verdict, each participant's vote and the
//! final outcome published once the transaction is done.

use crate::{ErrorCode, SubscriptionKey, Transaction};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a distributed transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DtxState {
	AwaitingRequests,
	Started,
	Done,
}

impl fmt::Display for DtxState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			DtxState::AwaitingRequests => "AWAITING_REQUESTS",
			DtxState::Started => "STARTED",
			DtxState::Done => "DONE",
		};
		write!(f, "{}", s)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
	NotDecided,
	Commit,
	Abort,
}

impl fmt::Display for Verdict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			Verdict::NotDecided => "NOT_DECIDED",
			Verdict::Commit => "COMMIT",
			Verdict::Abort => "ABORT",
		};
		write!(f, "{}", s)
	}
}

/// Result reported by one participant's monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VoteOutcome {
	/// The monitor completed with a transaction.
	Completed { transaction: Transaction },
	/// The monitor failed.
	Failed {
		error_code: ErrorCode,
		message: String,
	},
}

impl VoteOutcome {
	/// A participant votes yes only when its transaction reached a success state.
	pub fn is_yes(&self) -> bool {
		match self {
			VoteOutcome::Completed { transaction } => transaction.state.is_success(),
			VoteOutcome::Failed { .. } => false,
		}
	}
}

/// One participant's recorded vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainVote {
	pub key: SubscriptionKey,
	pub outcome: VoteOutcome,
}

/// Published once when a distributed transaction reaches its verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributedTransactionOutcome {
	pub id: Uuid,
	pub verdict: Verdict,
	/// Why the transaction aborted. Absent on commit.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub reason: Option<String>,
	/// Votes received before the verdict, in arrival order.
	pub results: Vec<ChainVote>,
}

/// Point-in-time view of a live distributed transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributedTransactionSnapshot {
	pub id: Uuid,
	pub participating_chain_ids: Vec<String>,
	pub state: DtxState,
	pub verdict: Verdict,
	pub yes_votes: usize,
}
