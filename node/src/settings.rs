use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use pvss_consensus::ConsensusIntervals;

#[derive(Parser, Clone, Debug)]
#[clap(name = "pvss-node", about = "Delegated proof-of-stake consensus core")]
pub struct CommandLineOptions {
	#[clap(short = 'c', long = "config-path", env = "PVSS_CONFIG_PATH")]
	pub config_path: Option<PathBuf>,

	/// Use the shorter testnet interval set instead of mainnet.
	#[clap(long = "testnet", env = "PVSS_TESTNET")]
	pub testnet: bool,

	/// Path to a file listing the local node's owned delegate identities,
	/// one 32-byte hex string per line. Absent means witness-only
	/// operation (no locally-owned delegate).
	#[clap(long = "identities-file", env = "PVSS_IDENTITIES_FILE")]
	pub identities_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NetworkSettings {
	#[serde(default)]
	pub testnet: bool,
}

impl NetworkSettings {
	pub fn intervals(&self) -> ConsensusIntervals {
		if self.testnet {
			ConsensusIntervals::testnet()
		} else {
			ConsensusIntervals::mainnet()
		}
	}
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct P2pSettings {
	#[serde(default = "default_bind_address")]
	pub bind_address: String,
	#[serde(default)]
	pub bootstrap_peers: Vec<String>,
}

fn default_bind_address() -> String {
	"0.0.0.0:9000".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct KeySettings {
	pub identities_file: Option<PathBuf>,
}

/// Layered settings: a default file plus environment overrides plus CLI
/// flags. CLI flags take precedence over both the file and the
/// environment.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
	#[serde(default)]
	pub network: NetworkSettings,
	#[serde(default)]
	pub p2p: P2pSettings,
	#[serde(default)]
	pub keys: KeySettings,
}

impl Settings {
	pub fn new(opts: &CommandLineOptions) -> Result<Self, ConfigError> {
		let default_path = opts.config_path.as_deref().unwrap_or_else(|| std::path::Path::new("config/default.toml"));

		let config = Config::builder()
			.add_source(File::from(default_path).required(false))
			.add_source(Environment::with_prefix("PVSS").separator("__"))
			.build()?;

		let mut settings: Settings = config.try_deserialize()?;

		if opts.testnet {
			settings.network.testnet = true;
		}
		if let Some(path) = &opts.identities_file {
			settings.keys.identities_file = Some(path.clone());
		}

		Ok(settings)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cli_testnet_flag_overrides_file_default() {
		let opts = CommandLineOptions { config_path: None, testnet: true, identities_file: None };
		let settings = Settings::new(&opts).expect("settings load even with no config file present");
		assert!(settings.network.testnet);
	}
}
