//! Dynamic factory registry for chain families.
//!
//! Every chain family compiled into the binary registers its factory here.
//! Configured chains pick a family by name; the registry resolves those names
//! before the gateway is built.

use gateway_adapter::AdapterFactory;
use gateway_config::Config;
use gateway_core::{Gateway, GatewayBuilder, GatewayFactories};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Global registry for all chain family factories
pub struct FactoryRegistry {
	pub adapter: HashMap<String, AdapterFactory>,
}

impl Default for FactoryRegistry {
	fn default() -> Self {
		Self::new()
	}
}

impl FactoryRegistry {
	/// Create a new empty registry
	pub fn new() -> Self {
		Self {
			adapter: HashMap::new(),
		}
	}

	/// Register a chain family
	pub fn register_adapter(&mut self, name: impl Into<String>, factory: AdapterFactory) {
		self.adapter.insert(name.into(), factory);
	}
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

/// Initialize the global registry with all available chain families
pub fn initialize_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| {
		let mut registry = FactoryRegistry::new();
		for (name, factory) in gateway_adapter::get_all_implementations() {
			tracing::debug!("Registering chain family: {}", name);
			registry.register_adapter(name, factory);
		}
		registry
	})
}

/// Get the global factory registry
pub fn get_registry() -> &'static FactoryRegistry {
	initialize_registry()
}

/// Build the gateway using the registry and config
pub fn build_gateway_from_config(config: Config) -> Result<Gateway, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let mut adapter_factories = HashMap::new();
	for (chain_id, chain) in &config.chains {
		match registry.adapter.get(&chain.family) {
			Some(factory) => {
				adapter_factories.insert(chain.family.clone(), *factory);
			},
			None => {
				let mut available: Vec<_> = registry.adapter.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown chain family '{}' for chain '{}'. Available: [{}]",
					chain.family,
					chain_id,
					available.join(", ")
				)
				.into());
			},
		}
	}

	Ok(GatewayBuilder::new(config).build(GatewayFactories { adapter_factories })?)
}
