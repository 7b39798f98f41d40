//! Process-wide table of live monitors.
//!
//! The registry holds at most one [`Subscription`] per [`SubscriptionKey`].
//! Registering a key that is already present cancels the previous monitor
//! before the new one takes its place. Every operation goes through a single
//! lock so inserts, replacements and queries are linearizable.

use super::Subscription;
use gateway_types::{same_signature, truncate_id, Parameter, SubscriptionKey, SubscriptionType};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory index of live monitors. Not durable.
#[derive(Default)]
pub struct SubscriptionRegistry {
	entries: Mutex<HashMap<SubscriptionKey, Subscription>>,
}

impl SubscriptionRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Registers `subscription` under `key`, cancelling and replacing any
	/// monitor already registered there.
	pub async fn create(&self, key: SubscriptionKey, subscription: Subscription) {
		let mut entries = self.entries.lock().await;
		if let Some(previous) = entries.insert(key.clone(), subscription) {
			previous.unsubscribe();
			tracing::warn!(
				correlation_id = %key.correlation_id,
				chain_id = %key.chain_id,
				contract_path = %truncate_id(&key.contract_path),
				replaced = %previous.id(),
				"Duplicate subscription replaced"
			);
		} else {
			tracing::debug!(subscription_key = %key, "Subscription registered");
		}
	}

	pub async fn get(&self, key: &SubscriptionKey) -> Option<Subscription> {
		self.entries.lock().await.get(key).cloned()
	}

	/// Removes the entry without cancelling it.
	pub async fn remove(&self, key: &SubscriptionKey) -> Option<Subscription> {
		self.entries.lock().await.remove(key)
	}

	/// Removes the entry only if it still belongs to the monitor `id`.
	///
	/// A finishing monitor uses this so it never evicts the monitor that
	/// replaced it.
	pub async fn remove_if_current(&self, key: &SubscriptionKey, id: Uuid) -> bool {
		let mut entries = self.entries.lock().await;
		match entries.get(key) {
			Some(current) if current.id() == id => {
				entries.remove(key);
				true
			},
			_ => false,
		}
	}

	pub async fn query_by_type(&self, subscription_type: SubscriptionType) -> HashSet<SubscriptionKey> {
		self.entries
			.lock()
			.await
			.iter()
			.filter(|(_, s)| s.subscription_type() == subscription_type)
			.map(|(k, _)| k.clone())
			.collect()
	}

	/// Finds occurrence monitors on `chain_id`/`contract_path` watching
	/// `identifier` with the given parameter shape.
	///
	/// Only parameter types are compared, positionally. An absent
	/// `identifier` matches any.
	pub async fn query_by_identifiable(
		&self,
		chain_id: &str,
		contract_path: &str,
		identifier: Option<&str>,
		parameter_types: &[Parameter],
		subscription_type: SubscriptionType,
	) -> HashSet<SubscriptionKey> {
		if !subscription_type.is_occurrence_monitor() {
			return HashSet::new();
		}
		self.entries
			.lock()
			.await
			.iter()
			.filter(|(key, s)| {
				key.chain_id == chain_id
					&& key.contract_path == contract_path
					&& s.subscription_type() == subscription_type
					&& identifier.is_none_or(|id| s.identifier() == Some(id))
					&& same_signature(s.parameter_types(), parameter_types)
			})
			.map(|(k, _)| k.clone())
			.collect()
	}

	/// Keys registered under `correlation_id`, on any chain.
	pub async fn keys_for_correlation(&self, correlation_id: &str) -> Vec<SubscriptionKey> {
		self.entries
			.lock()
			.await
			.keys()
			.filter(|k| k.correlation_id == correlation_id)
			.cloned()
			.collect()
	}

	/// Cancels and removes every monitor. Returns how many were cancelled.
	pub async fn unsubscribe_all(&self) -> usize {
		let drained: Vec<_> = self.entries.lock().await.drain().collect();
		drained
			.into_iter()
			.filter(|(_, subscription)| subscription.unsubscribe())
			.count()
	}

	pub async fn len(&self) -> usize {
		self.entries.lock().await.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.entries.lock().await.is_empty()
	}
}
