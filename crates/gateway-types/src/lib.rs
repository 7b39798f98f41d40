//! Common types module for the blockchain access gateway.
//!
//! This module defines the data model shared by every gateway component:
//! chain-level values (blocks, transactions, occurrences), the SCIP addressing
//! grammar, subscription identities, callback events and the stable error codes
//! handed to external callers.

/// SCIP address parsing and formatting.
pub mod address;
/// Chain-level data: blocks, transactions, parameters and occurrences.
pub mod chain;
/// Distributed transaction states, verdicts and outcomes.
pub mod coordination;
/// Stable numeric error codes exposed to callers.
pub mod errors;
/// Callback event types published for every terminal monitor result.
pub mod events;
/// Registry trait for chain family implementations.
pub mod registry;
/// Subscription keys and subscription kinds.
pub mod subscription;
/// Utility functions for logging.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use address::{AddressParseError, ScipAddress};
pub use chain::*;
pub use coordination::*;
pub use errors::ErrorCode;
pub use events::*;
pub use registry::ImplementationRegistry;
pub use subscription::{SubscriptionKey, SubscriptionType};
pub use utils::truncate_id;
pub use validation::*;
