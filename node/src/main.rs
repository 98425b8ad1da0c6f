mod app;
mod logging;
mod settings;

use clap::Parser;
use tracing::info;

use settings::{CommandLineOptions, Settings};

/// Entry point. Host integration — the chain-sync loop that calls
/// `app::App::on_new_block`, the `BlockChain`/`TxPool`/`PeerNet`/
/// `LocalStore` implementations, and the actual network transport — is
/// supplied by an embedding application; this binary only validates that
/// configuration loads and logging initializes cleanly, as a smoke check
/// for operators standing up a new node.
fn main() -> anyhow::Result<()> {
	let opts = CommandLineOptions::parse();
	let settings = Settings::new(&opts)?;

	logging::init(false);

	info!(
		testnet = settings.network.testnet,
		bind_address = %settings.p2p.bind_address,
		"pvss-node configuration loaded",
	);

	Ok(())
}
