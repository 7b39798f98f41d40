//! The distributed transaction aggregate.
//!
//! Lifecycle state, verdict, vote count and recorded votes live behind one
//! lock so that counting a vote and deciding the verdict happen atomically.
//! The first terminal transition wins; every later vote or abort is ignored.

use gateway_types::{
	ChainVote, DistributedTransactionOutcome, DistributedTransactionSnapshot, DtxState,
	SubscriptionKey, Verdict, VoteOutcome,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// A verdict that has just been reached.
#[derive(Debug)]
pub(crate) struct Decision {
	pub outcome: DistributedTransactionOutcome,
	/// Participants that had not voted yet. Their monitors must be cancelled.
	pub pending: Vec<SubscriptionKey>,
}

struct Aggregate {
	state: DtxState,
	verdict: Verdict,
	yes_votes: usize,
	results: Vec<ChainVote>,
	voted: HashSet<SubscriptionKey>,
	deadline: Option<AbortHandle>,
}

pub(crate) struct DistributedTransaction {
	id: Uuid,
	participating_chain_ids: Vec<String>,
	participants: Vec<SubscriptionKey>,
	aggregate: Mutex<Aggregate>,
}

impl DistributedTransaction {
	pub fn new(id: Uuid, participants: Vec<SubscriptionKey>) -> Self {
		Self {
			id,
			participating_chain_ids: participants.iter().map(|k| k.chain_id.clone()).collect(),
			participants,
			aggregate: Mutex::new(Aggregate {
				state: DtxState::AwaitingRequests,
				verdict: Verdict::NotDecided,
				yes_votes: 0,
				results: Vec::new(),
				voted: HashSet::new(),
				deadline: None,
			}),
		}
	}

	pub fn id(&self) -> Uuid {
		self.id
	}

	fn lock(&self) -> MutexGuard<'_, Aggregate> {
		self.aggregate.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Moves to `Started` once a participant monitor is registered. Returns
	/// false if the transaction is already done.
	pub fn mark_started(&self) -> bool {
		let mut aggregate = self.lock();
		match aggregate.state {
			DtxState::Done => false,
			DtxState::Started => true,
			DtxState::AwaitingRequests => {
				aggregate.state = DtxState::Started;
				true
			},
		}
	}

	pub fn is_done(&self) -> bool {
		self.lock().state == DtxState::Done
	}

	/// Attaches the deadline task. It is aborted when the verdict is reached,
	/// immediately if that has already happened.
	pub fn set_deadline(&self, handle: AbortHandle) {
		let mut aggregate = self.lock();
		if aggregate.state == DtxState::Done {
			handle.abort();
		} else {
			aggregate.deadline = Some(handle);
		}
	}

	/// Detaches the deadline task without aborting it. Called by the
	/// deadline task itself before it aborts the transaction.
	pub fn clear_deadline(&self) {
		self.lock().deadline = None;
	}

	/// Counts one participant's vote. Returns the decision if this vote
	/// settled the verdict.
	pub fn record_vote(&self, key: SubscriptionKey, outcome: VoteOutcome) -> Option<Decision> {
		let mut aggregate = self.lock();
		if aggregate.state == DtxState::Done
			|| !self.participants.contains(&key)
			|| aggregate.voted.contains(&key)
		{
			return None;
		}
		if aggregate.state == DtxState::AwaitingRequests {
			aggregate.state = DtxState::Started;
		}

		let reason = (!outcome.is_yes()).then(|| match &outcome {
			VoteOutcome::Failed { error_code, message } => {
				format!("chain '{}' failed with {}: {}", key.chain_id, error_code, message)
			},
			VoteOutcome::Completed { transaction } => format!(
				"chain '{}' ended in state {}",
				key.chain_id, transaction.state
			),
		});
		if reason.is_none() {
			aggregate.yes_votes += 1;
		}
		aggregate.voted.insert(key.clone());
		aggregate.results.push(ChainVote { key, outcome });

		match reason {
			Some(reason) => self.decide(&mut aggregate, Verdict::Abort, Some(reason)),
			None if aggregate.yes_votes == self.participants.len() => {
				self.decide(&mut aggregate, Verdict::Commit, None)
			},
			None => None,
		}
	}

	/// Aborts unless a verdict has already been reached.
	pub fn abort(&self, reason: impl Into<String>) -> Option<Decision> {
		let mut aggregate = self.lock();
		self.decide(&mut aggregate, Verdict::Abort, Some(reason.into()))
	}

	fn decide(
		&self,
		aggregate: &mut Aggregate,
		verdict: Verdict,
		reason: Option<String>,
	) -> Option<Decision> {
		if !is_valid_transition(aggregate.state, DtxState::Done) {
			return None;
		}
		aggregate.state = DtxState::Done;
		aggregate.verdict = verdict;
		if let Some(deadline) = aggregate.deadline.take() {
			deadline.abort();
		}

		let pending = self
			.participants
			.iter()
			.filter(|k| !aggregate.voted.contains(*k))
			.cloned()
			.collect();
		Some(Decision {
			outcome: DistributedTransactionOutcome {
				id: self.id,
				verdict,
				reason,
				results: std::mem::take(&mut aggregate.results),
			},
			pending,
		})
	}

	pub fn snapshot(&self) -> DistributedTransactionSnapshot {
		let aggregate = self.lock();
		DistributedTransactionSnapshot {
			id: self.id,
			participating_chain_ids: self.participating_chain_ids.clone(),
			state: aggregate.state,
			verdict: aggregate.verdict,
			yes_votes: aggregate.yes_votes,
		}
	}
}

/// Checks whether a lifecycle transition is allowed.
fn is_valid_transition(from: DtxState, to: DtxState) -> bool {
	static TRANSITIONS: Lazy<HashMap<DtxState, HashSet<DtxState>>> = Lazy::new(|| {
		let mut m = HashMap::new();
		m.insert(
			DtxState::AwaitingRequests,
			HashSet::from([DtxState::Started, DtxState::Done]),
		);
		m.insert(DtxState::Started, HashSet::from([DtxState::Done]));
		m.insert(DtxState::Done, HashSet::new()); // terminal
		m
	});

	TRANSITIONS
		.get(&from)
		.is_some_and(|allowed| allowed.contains(&to))
}
