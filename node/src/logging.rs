use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const CONSENSUS_TARGET: &str = "consensus";
pub const PVSS_TARGET: &str = "pvss";
pub const P2P_TARGET: &str = "p2p";

/// Installs the global `tracing` subscriber: JSON output to stdout, level
/// controlled by `RUST_LOG` (defaulting to `info`). Each component logs
/// under its own target (`consensus`, `pvss`, `p2p`) rather than a single
/// undifferentiated stream.
pub fn init(json: bool) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

	let registry = tracing_subscriber::registry().with(filter);

	if json {
		registry.with(fmt::layer().json().with_target(true)).init();
	} else {
		registry.with(fmt::layer().with_target(true)).init();
	}
}
