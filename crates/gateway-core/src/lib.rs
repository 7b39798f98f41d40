//! Core engine of the blockchain access gateway.
//!
//! This crate tracks every outstanding monitor in a subscription registry,
//! runs each monitor as an independent task with cancellation and timeouts,
//! coordinates cross-chain commitments and exposes all of it through the
//! [`Gateway`] facade. Results are delivered as events on a broadcast bus.

pub mod builder;
pub mod coordinator;
pub mod engine;
pub mod monitoring;
pub mod subscription;

pub use builder::{BuilderError, GatewayBuilder, GatewayFactories};
pub use coordinator::{
	Coordinator, CoordinatorError, ParticipantOperation, ParticipantRequest, ABORTED_BY_CALLER,
	DEADLINE_ELAPSED,
};
pub use engine::{event_bus::EventBus, Gateway, GatewayError};
pub use monitoring::{Monitor, MonitorError};
pub use subscription::{CancelSignal, Subscription, SubscriptionRegistry};
