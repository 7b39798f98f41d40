//! Lifecycle management for the gateway.
//!
//! Startup checks every configured chain; shutdown aborts live distributed
//! transactions and cancels every live monitor.

use super::{Gateway, GatewayError};

/// Abort reason recorded for distributed transactions cut short by shutdown.
pub const SHUTTING_DOWN: &str = "gateway shutting down";

impl Gateway {
	/// Tests the connection to every configured chain.
	///
	/// Unreachable chains are logged, not fatal: they may come up later and
	/// every operation reports `NodeUnreachable` until then.
	pub async fn initialize(&self) -> Result<(), GatewayError> {
		tracing::info!(
			gateway_id = %self.config.id,
			chains = self.adapters.chain_ids().len(),
			"Initializing gateway"
		);
		for chain_id in self.adapters.chain_ids() {
			match self.adapters.test_connection(&chain_id).await {
				Ok(()) => {
					let adapter = self.adapters.get(&chain_id)?;
					let finality = adapter.confidence();
					tracing::info!(
						chain_id = %chain_id,
						adversary_ratio = finality.adversary_ratio(),
						saturation_ceiling = finality.saturation_ceiling(),
						"Chain reachable"
					)
				},
				Err(e) => tracing::warn!(
					chain_id = %chain_id,
					error = %e,
					"Chain not reachable at startup"
				),
			}
		}
		Ok(())
	}

	/// Aborts every live distributed transaction and cancels every monitor.
	pub async fn shutdown(&self) -> Result<(), GatewayError> {
		tracing::info!(gateway_id = %self.config.id, "Shutting down gateway");

		let aborted = self.coordinator.abort_all(SHUTTING_DOWN).await;
		let cancelled = self.registry.unsubscribe_all().await;

		tracing::info!(aborted, cancelled, "Gateway stopped");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use crate::coordinator::ParticipantRequest;
	use crate::test_support::{chain, gateway};
	use alloy_primitives::U256;
	use gateway_types::{GatewayEvent, Verdict};

	#[tokio::test]
	async fn test_shutdown_cancels_everything() {
		let (eth1, eth2) = (chain("eth1"), chain("eth2"));
		let gateway = gateway(&[&eth1, &eth2]);
		let mut events = gateway.events();
		eth2.set_reachable(false).await;
		gateway.initialize().await.unwrap();

		gateway
			.receive_transactions("watch", "eth1", 0.5, None, None)
			.await
			.unwrap();
		let id = gateway
			.start_distributed_transaction(
				vec![ParticipantRequest::transfer("eth1", "0x02", U256::from(1), 0.5)],
				None,
			)
			.await
			.unwrap();

		gateway.shutdown().await.unwrap();

		match events.recv().await.unwrap() {
			GatewayEvent::Verdict(outcome) => {
				assert_eq!(outcome.id, id);
				assert_eq!(outcome.verdict, Verdict::Abort);
				assert_eq!(outcome.reason.as_deref(), Some(super::SHUTTING_DOWN));
			},
			other => panic!("expected a verdict, got {:?}", other),
		}
		assert!(gateway.registry().is_empty().await);
		assert!(gateway.distributed_transaction(id).is_none());
	}
}
