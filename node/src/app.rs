use std::sync::{Arc, Mutex};

use anyhow::Result;
use pvss_consensus::{BlockChain, BlockHash, ConsensusDriver, EvolveOutput, TxPool};
use pvss_multisig::Identity;
use pvss_p2p::{ConsensusHandle, GossipDriver, LocalStore, PeerNet, SystemClock};
use tracing::info;

use crate::settings::Settings;

/// Ties the consensus driver and the gossip driver together behind one
/// shared `Arc<Mutex<ConsensusDriver>>`: `GossipDriver` only ever sees it
/// through the narrow `ConsensusHandle` capability, while `App` alone
/// drives `evolve`, so no code outside this struct holds both a mutable
/// and a shared reference to the same driver at once.
pub struct App {
	consensus: Arc<Mutex<ConsensusDriver>>,
	gossip: Arc<GossipDriver>,
	blockchain: Arc<dyn BlockChain + Send + Sync>,
}

impl App {
	pub fn new(
		settings: &Settings,
		local_idents: Vec<Identity>,
		blockchain: Arc<dyn BlockChain + Send + Sync>,
		txpool: Arc<dyn TxPool + Send + Sync>,
		net: Box<dyn PeerNet>,
		local_store: Box<dyn LocalStore>,
	) -> Self {
		let intervals = settings.network.intervals();
		let consensus = Arc::new(Mutex::new(ConsensusDriver::new(intervals, local_idents, Arc::clone(&blockchain), txpool)));
		let handle: Box<dyn ConsensusHandle> = Box::new(Arc::clone(&consensus));
		let max_len = intervals.consensus_interval() as usize + 1;
		let gossip = Arc::new(GossipDriver::new(max_len, handle, local_store, net, Box::new(SystemClock)));
		App { consensus, gossip, blockchain }
	}

	pub fn gossip(&self) -> &Arc<GossipDriver> {
		&self.gossip
	}

	/// Drives one `Evolve` step for the block at `height`/`hash`: advances
	/// the consensus window, keeps the gossip side's chain-view in step via
	/// `primary_update`, and marks any distribute share this node just
	/// produced for its own delegates as already held (so a later bulletin
	/// advertises it without first fetching it from a peer).
	///
	/// Actually broadcasting `EvolveOutput::distribute_data`/
	/// `publish_data` onto the wire, and persisting them somewhere
	/// `LocalStore::lookup` can find them, is the caller's responsibility —
	/// both the transport and the storage backing it are host collaborators
	/// this crate never touches directly.
	pub fn on_new_block(&self, height: u64, hash: BlockHash) -> Result<EvolveOutput> {
		let weights = self.blockchain.enrolled_weights(&hash);
		self.gossip.primary_update(height, &[(height, hash, weights)]);

		let out = {
			let mut consensus = self.consensus.lock().expect("poisoned mutex");
			consensus.evolve(height, hash, &mut rand::thread_rng())?
		};

		for ident in out.distribute_data.keys() {
			self.gossip.record_self_distribute(&hash, *ident);
		}
		if !out.distribute_data.is_empty() || !out.publish_data.is_empty() {
			info!(height, "evolve produced distribute/publish data for this node's delegates");
		}

		Ok(out)
	}
}
