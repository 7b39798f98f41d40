//! Configuration for the blockchain access gateway.
//!
//! A configuration names the gateway instance, sets the default monitor and
//! distributed transaction timeouts, and lists every chain the gateway can
//! reach. Each chain entry selects a chain family by name, carries the
//! parameters of its finality model and an opaque `settings` table that the
//! family validates itself.
//!
//! ```toml
//! [gateway]
//! id = "gateway-1"
//!
//! [chains.eth1]
//! family = "simulated"
//! adversary_ratio = 0.1
//! [chains.eth1.settings]
//! block_interval_ms = 1000
//! ```
//!
//! `${VAR}` and `${VAR:-default}` placeholders are substituted from the
//! environment before the TOML is parsed.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering repeats the input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Characters that would break SCIP address parsing if used in a chain id.
const RESERVED_CHAIN_ID_CHARS: &[char] = &['/', '?', ':', '&', '='];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub gateway: GatewayConfig,
	/// Chains keyed by chain id.
	pub chains: HashMap<String, ChainConfig>,
}

/// Settings of the gateway instance itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
	/// Unique identifier for this gateway instance.
	pub id: String,
	/// Default timeout applied to monitors that do not carry their own.
	/// Zero disables the default.
	#[serde(default = "default_monitoring_timeout_seconds")]
	pub monitoring_timeout_seconds: u64,
	/// Default deadline of a distributed transaction.
	#[serde(default = "default_dtx_timeout_seconds")]
	pub dtx_timeout_seconds: u64,
	/// Capacity of the event bus.
	#[serde(default = "default_event_buffer")]
	pub event_buffer: usize,
}

impl GatewayConfig {
	pub fn monitoring_timeout(&self) -> Option<Duration> {
		(self.monitoring_timeout_seconds > 0)
			.then(|| Duration::from_secs(self.monitoring_timeout_seconds))
	}

	pub fn dtx_timeout(&self) -> Duration {
		Duration::from_secs(self.dtx_timeout_seconds)
	}
}

fn default_monitoring_timeout_seconds() -> u64 {
	3600
}

fn default_dtx_timeout_seconds() -> u64 {
	600
}

fn default_event_buffer() -> usize {
	1024
}

/// One reachable chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	/// Chain family implementation, e.g. `"simulated"`.
	pub family: String,
	/// Assumed share of adversarial block production, in [0, 1).
	#[serde(default = "default_adversary_ratio")]
	pub adversary_ratio: f64,
	/// Upper bound on reported confidence when the adversary ratio is 0.5 or more.
	#[serde(default = "default_saturation_ceiling")]
	pub saturation_ceiling: f64,
	/// Family-specific settings.
	#[serde(default)]
	pub settings: toml::Table,
}

impl ChainConfig {
	/// The settings table as a TOML value, as expected by adapter factories.
	pub fn settings_value(&self) -> toml::Value {
		toml::Value::Table(self.settings.clone())
	}
}

fn default_adversary_ratio() -> f64 {
	0.1
}

fn default_saturation_ceiling() -> f64 {
	0.99
}

/// Substitutes `${VAR}` and `${VAR:-default}` placeholders.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(full), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..full.start()]);
		result.push_str(&value);
		last = full.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

impl Config {
	/// Loads, resolves and validates a configuration file.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Checks the invariants serde cannot express.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.gateway.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Gateway ID cannot be empty".into(),
			));
		}
		if self.gateway.dtx_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"dtx_timeout_seconds must be greater than zero".into(),
			));
		}
		if self.gateway.event_buffer == 0 {
			return Err(ConfigError::Validation(
				"event_buffer must be greater than zero".into(),
			));
		}
		if self.chains.is_empty() {
			return Err(ConfigError::Validation(
				"At least one chain must be configured".into(),
			));
		}

		for (chain_id, chain) in &self.chains {
			if chain_id.is_empty()
				|| chain_id.contains(RESERVED_CHAIN_ID_CHARS)
				|| chain_id.chars().any(char::is_whitespace)
			{
				return Err(ConfigError::Validation(format!(
					"Invalid chain id '{}': must be non-empty without whitespace or any of / ? : & =",
					chain_id
				)));
			}
			if chain.family.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Chain '{}' must specify a family",
					chain_id
				)));
			}
			if !(0.0..1.0).contains(&chain.adversary_ratio) {
				return Err(ConfigError::Validation(format!(
					"Chain '{}': adversary_ratio {} must be in [0, 1)",
					chain_id, chain.adversary_ratio
				)));
			}
			if !(chain.saturation_ceiling > 0.0 && chain.saturation_ceiling < 1.0) {
				return Err(ConfigError::Validation(format!(
					"Chain '{}': saturation_ceiling {} must be in (0, 1)",
					chain_id, chain.saturation_ceiling
				)));
			}
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const MINIMAL: &str = r#"
[gateway]
id = "gateway-test"

[chains.eth1]
family = "simulated"
"#;

	#[test]
	fn test_defaults_applied() {
		let config: Config = MINIMAL.parse().unwrap();
		assert_eq!(config.gateway.monitoring_timeout_seconds, 3600);
		assert_eq!(config.gateway.dtx_timeout(), Duration::from_secs(600));
		assert_eq!(config.gateway.event_buffer, 1024);

		let chain = &config.chains["eth1"];
		assert_eq!(chain.adversary_ratio, 0.1);
		assert_eq!(chain.saturation_ceiling, 0.99);
		assert!(chain.settings.is_empty());
	}

	#[test]
	fn test_zero_monitoring_timeout_disables_default() {
		let config: Config = r#"
[gateway]
id = "g"
monitoring_timeout_seconds = 0

[chains.eth1]
family = "simulated"
"#
		.parse()
		.unwrap();
		assert_eq!(config.gateway.monitoring_timeout(), None);
	}

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("GATEWAY_TEST_HOST", "localhost");
		std::env::set_var("GATEWAY_TEST_PORT", "8545");

		let result = resolve_env_vars("url = \"${GATEWAY_TEST_HOST}:${GATEWAY_TEST_PORT}\"").unwrap();
		assert_eq!(result, "url = \"localhost:8545\"");

		std::env::remove_var("GATEWAY_TEST_HOST");
		std::env::remove_var("GATEWAY_TEST_PORT");
	}

	#[test]
	fn test_env_var_default_and_missing() {
		let result = resolve_env_vars("id = \"${GATEWAY_TEST_UNSET_ID:-fallback}\"").unwrap();
		assert_eq!(result, "id = \"fallback\"");

		let err = resolve_env_vars("id = \"${GATEWAY_TEST_UNSET_ID}\"").unwrap_err();
		assert!(err.to_string().contains("GATEWAY_TEST_UNSET_ID"));
	}

	#[test]
	fn test_rejects_reserved_chain_id_characters() {
		let err = r#"
[gateway]
id = "g"

[chains."eth:1"]
family = "simulated"
"#
		.parse::<Config>()
		.unwrap_err();
		assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("eth:1")));
	}

	#[test]
	fn test_rejects_out_of_range_finality_parameters() {
		let ratio = MINIMAL.replace("family = \"simulated\"", "family = \"simulated\"\nadversary_ratio = 1.0");
		assert!(ratio.parse::<Config>().is_err());

		let ceiling =
			MINIMAL.replace("family = \"simulated\"", "family = \"simulated\"\nsaturation_ceiling = 0.0");
		assert!(ceiling.parse::<Config>().is_err());

		let certain =
			MINIMAL.replace("family = \"simulated\"", "family = \"simulated\"\nsaturation_ceiling = 1.0");
		assert!(matches!(
			certain.parse::<Config>(),
			Err(ConfigError::Validation(message)) if message.contains("(0, 1)")
		));
	}

	#[test]
	fn test_rejects_empty_chain_table_and_id() {
		assert!("[gateway]\nid = \"g\"\n[chains]\n".parse::<Config>().is_err());
		assert!(MINIMAL
			.replace("gateway-test", " ")
			.parse::<Config>()
			.is_err());
	}

	#[tokio::test]
	async fn test_from_file_keeps_family_settings() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			"{}[chains.eth1.settings]\nblock_interval_ms = 250\n",
			MINIMAL
		)
		.unwrap();

		let config = Config::from_file(file.path()).await.unwrap();
		let settings = config.chains["eth1"].settings_value();
		assert_eq!(settings["block_interval_ms"].as_integer(), Some(250));
	}

	#[tokio::test]
	async fn test_from_file_missing_path() {
		let err = Config::from_file("/nonexistent/gateway.toml").await.unwrap_err();
		assert!(matches!(err, ConfigError::Io(_)));
	}
}
