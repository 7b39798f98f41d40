//! Main entry point for the blockchain access gateway service.
//!
//! This binary loads the gateway configuration, creates one adapter per
//! configured chain from the registered chain families and runs the gateway
//! until interrupted. Every event the gateway publishes is logged.

use clap::Parser;
use gateway_config::Config;
use gateway_core::Gateway;
use gateway_types::GatewayEvent;
use std::path::PathBuf;
use tokio::sync::broadcast;

mod factory_registry;

/// Command-line arguments for the gateway service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "GATEWAY_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the gateway service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the gateway with all chain families
/// 5. Logs gateway events until interrupted, then shuts down
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started gateway");

	let config = Config::from_file(&args.config).await?;
	tracing::info!("Loaded configuration [{}]", config.gateway.id);

	let gateway = factory_registry::build_gateway_from_config(config)?;
	gateway.initialize().await?;

	let logger = tokio::spawn(log_events(gateway.events()));

	run_until_interrupted(&gateway).await?;

	logger.abort();
	tracing::info!("Stopped gateway");
	Ok(())
}

async fn run_until_interrupted(gateway: &Gateway) -> Result<(), Box<dyn std::error::Error>> {
	tokio::signal::ctrl_c().await?;
	tracing::info!("Shutdown signal received");
	gateway.shutdown().await?;
	Ok(())
}

/// Logs every event until the bus closes.
async fn log_events(mut events: broadcast::Receiver<GatewayEvent>) {
	loop {
		match events.recv().await {
			Ok(event) => log_event(&event),
			Err(broadcast::error::RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "Event logger lagged behind");
			},
			Err(broadcast::error::RecvError::Closed) => break,
		}
	}
}

fn log_event(event: &GatewayEvent) {
	match event {
		GatewayEvent::Response(response) => tracing::info!(
			correlation_id = %response.correlation_id,
			chain_id = %response.chain_id,
			subscription_type = ?response.subscription_type,
			"Response"
		),
		GatewayEvent::Failure(failure) => tracing::warn!(
			correlation_id = %failure.correlation_id,
			chain_id = %failure.chain_id,
			error_code = %failure.error_code,
			message = %failure.message,
			"Failure"
		),
		GatewayEvent::Verdict(outcome) => tracing::info!(
			dtx_id = %outcome.id,
			verdict = %outcome.verdict,
			"Verdict"
		),
	}
	if let Ok(payload) = serde_json::to_string(event) {
		tracing::debug!(payload = %payload, "Event payload");
	}
}
