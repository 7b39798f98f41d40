//! Builder for constructing a gateway from configuration.
//!
//! Each configured chain names a chain family; the family's factory creates
//! the adapter from the chain's confidence parameters and `settings` table.

use crate::engine::Gateway;
use gateway_adapter::{AdapterError, AdapterService, ChainAdapter, ConfidenceCalculator};
use gateway_config::Config;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during gateway construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions available to the builder, keyed by chain family.
pub struct GatewayFactories<AF> {
	pub adapter_factories: HashMap<String, AF>,
}

/// Builder for constructing a [`Gateway`] with pluggable chain families.
pub struct GatewayBuilder {
	config: Config,
}

impl GatewayBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the gateway, creating one adapter per configured chain.
	pub fn build<AF>(self, factories: GatewayFactories<AF>) -> Result<Gateway, BuilderError>
	where
		AF: Fn(&str, ConfidenceCalculator, &toml::Value) -> Result<Box<dyn ChainAdapter>, AdapterError>,
	{
		let config = self.config;
		let mut adapters: HashMap<String, Arc<dyn ChainAdapter>> = HashMap::new();

		let mut chain_ids: Vec<_> = config.chains.keys().cloned().collect();
		chain_ids.sort();
		for chain_id in chain_ids {
			let chain = &config.chains[&chain_id];
			let factory = factories.adapter_factories.get(&chain.family).ok_or_else(|| {
				BuilderError::MissingComponent(format!(
					"chain family '{}' for chain '{}'",
					chain.family, chain_id
				))
			})?;
			let calculator = ConfidenceCalculator::new(chain.adversary_ratio, chain.saturation_ceiling)
				.map_err(|e| BuilderError::Config(format!("Chain '{}': {}", chain_id, e)))?;

			match factory(&chain_id, calculator, &chain.settings_value()) {
				Ok(adapter) => {
					tracing::info!(
						component = "adapter",
						chain_id = %chain_id,
						family = %chain.family,
						"Loaded"
					);
					adapters.insert(chain_id, Arc::from(adapter));
				},
				Err(e) => {
					tracing::error!(
						component = "adapter",
						chain_id = %chain_id,
						family = %chain.family,
						error = %e,
						"Failed to create chain adapter"
					);
					return Err(BuilderError::Config(format!(
						"Failed to create adapter for chain '{}': {}",
						chain_id, e
					)));
				},
			}
		}

		if adapters.is_empty() {
			return Err(BuilderError::Config("No chains configured".into()));
		}

		Ok(Gateway::new(config.gateway, AdapterService::new(adapters)))
	}
}
