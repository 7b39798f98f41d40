//! Broadcast channel carrying every [`GatewayEvent`].
//!
//! Publishing never blocks. Subscribers that fall behind by more than the
//! channel capacity miss the oldest events and observe a lag error.

use gateway_types::GatewayEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<GatewayEvent>,
}

/// Smallest capacity the underlying channel accepts.
const MIN_CAPACITY: usize = 1;

impl EventBus {
	/// Creates a bus holding up to `capacity` undelivered events per
	/// subscriber. A capacity of zero is raised to one.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity.max(MIN_CAPACITY));
		Self { sender }
	}

	pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
		self.sender.subscribe()
	}

	/// Publishes `event` to current subscribers. Fails only when there are
	/// none.
	pub fn publish(
		&self,
		event: GatewayEvent,
	) -> Result<usize, broadcast::error::SendError<GatewayEvent>> {
		self.sender.send(event)
	}
}
