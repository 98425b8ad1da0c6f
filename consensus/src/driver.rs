use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use pvss_multisig::crypto::Point;
use pvss_multisig::{Agreement, CollectedEnvelope, Identity, PvssVote, Scalar, SealedBox};
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, warn};

use crate::constants::ConsensusIntervals;
use crate::error::ConsensusError;
use crate::traits::{BlockChain, BlockHash, TxPool};

/// Output of one `Evolve` call: data the host must hand to the gossip
/// channel and transaction pool.
#[derive(Default)]
pub struct EvolveOutput {
	pub enroll_data: BTreeMap<Identity, SealedBox>,
	/// Per-delegate distribute share-map, signed with that delegate's own
	/// enrollment key (`(share_map, sig_r, sig_s)`), ready to fold into an
	/// outbound distribute envelope.
	pub distribute_data: BTreeMap<Identity, (BTreeMap<Identity, Vec<Scalar>>, Point, Scalar)>,
	/// Per-delegate publish share-map, signed the same way as
	/// `distribute_data`.
	pub publish_data: BTreeMap<Identity, (BTreeMap<Identity, Vec<(u32, Scalar)>>, Point, Scalar)>,
	pub distribute_anchor_of_publish: Option<BlockHash>,
}

/// Maintains the sliding window of `PvssVote`s, indexed both by target
/// height and by distribute anchor, and drives their phase transitions.
///
/// `by_target` and `by_distribute_anchor` share the same underlying
/// `PvssVote` via `Arc<Mutex<_>>` once a vote reaches the enroll phase, so
/// a distribute/publish handled through either index is visible through
/// the other immediately.
pub struct ConsensusDriver {
	intervals: ConsensusIntervals,
	local_idents: Vec<Identity>,
	by_target: BTreeMap<u64, Arc<Mutex<PvssVote>>>,
	by_distribute_anchor: BTreeMap<BlockHash, Arc<Mutex<PvssVote>>>,
	anchor_of_target: BTreeMap<u64, BlockHash>,
	blockchain: Arc<dyn BlockChain + Send + Sync>,
	txpool: Arc<dyn TxPool + Send + Sync>,
}

impl ConsensusDriver {
	pub fn new(
		intervals: ConsensusIntervals,
		local_idents: Vec<Identity>,
		blockchain: Arc<dyn BlockChain + Send + Sync>,
		txpool: Arc<dyn TxPool + Send + Sync>,
	) -> Self {
		ConsensusDriver {
			intervals,
			local_idents,
			by_target: BTreeMap::new(),
			by_distribute_anchor: BTreeMap::new(),
			anchor_of_target: BTreeMap::new(),
			blockchain,
			txpool,
		}
	}

	fn evict(&mut self, delete_h: u64) {
		if delete_h == 0 {
			return;
		}
		if self.by_target.remove(&delete_h).is_some() {
			if let Some(anchor) = self.anchor_of_target.remove(&delete_h) {
				self.by_distribute_anchor.remove(&anchor);
			}
			debug!(target_height = delete_h, "evicted expired vote");
		}
	}

	/// Advances every vote in the window by one block. `h` is the height of
	/// the block that just became canonical; `hash_block` is its hash.
	pub fn evolve<R: RngCore + CryptoRng>(
		&mut self,
		h: u64,
		hash_block: BlockHash,
		rng: &mut R,
	) -> Result<EvolveOutput, ConsensusError> {
		let target_h = h + self.intervals.consensus_interval() as u64;
		let enroll_end_h = h + self.intervals.distribute_interval as u64 + 1;
		let publish_h = h + 1;
		let delete_h = h.saturating_sub(self.intervals.consensus_interval() as u64);

		self.evict(delete_h);

		let mut out = EvolveOutput::default();

		// Setup phase.
		if !self.by_target.contains_key(&target_h) {
			let vote = PvssVote::setup(&self.local_idents, self.intervals.max_delegate_thresh, rng)?;
			let vote = Arc::new(Mutex::new(vote));
			self.by_target.insert(target_h, vote);
			info!(target_height = target_h, "new vote created at setup phase");
		}
		if let Some(vote) = self.by_target.get(&target_h) {
			let vote = vote.lock().expect("poisoned mutex");
			out.enroll_data = vote.enroll_data();
			for (ident, sealed_box) in &out.enroll_data {
				self.txpool.submit_enroll_tx(*ident, sealed_box.clone());
			}
		}

		// Enroll / distribute phase.
		if let Some(vote_arc) = self.by_target.get(&enroll_end_h).cloned() {
			if let Some(old_anchor) = self.anchor_of_target.get(&enroll_end_h).copied() {
				if old_anchor != hash_block {
					self.by_distribute_anchor.remove(&old_anchor);
					warn!(target_height = enroll_end_h, ?old_anchor, new_anchor = ?hash_block, "distribute anchor changed by reorg");
				}
			}
			self.anchor_of_target.insert(enroll_end_h, hash_block);
			self.by_distribute_anchor.insert(hash_block, vote_arc.clone());

			let weights = self.blockchain.enrolled_weights(&hash_block);
			let enroll_data = self.blockchain.enroll_data(&hash_block);
			let candidates = build_candidates(&weights, &enroll_data);

			let mut vote = vote_arc.lock().expect("poisoned mutex");
			vote.enroll(&candidates)?;
			out.distribute_data = vote.sign_distribute(rng);
			info!(target_height = enroll_end_h, anchor = ?hash_block, "vote enrolled and distributed");
		}

		// Publish phase.
		if let Some(vote_arc) = self.by_target.get(&publish_h).cloned() {
			let already_published = vote_arc.lock().expect("poisoned mutex").is_published();
			if !already_published {
				let mut vote = vote_arc.lock().expect("poisoned mutex");
				if vote.state() == pvss_multisig::VoteState::Enrolled {
					out.publish_data = vote.sign_publish(rng);
					out.distribute_anchor_of_publish = self.anchor_of_target.get(&publish_h).copied();
					info!(target_height = publish_h, "vote published");
				}
			}
		}

		Ok(out)
	}

	/// Forwards an inbound distribute frame to the vote installed under
	/// `anchor` — the only identifier a distribute wire frame actually
	/// carries.
	pub fn handle_distribute(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: &BTreeMap<Identity, Vec<Scalar>>,
	) -> Result<(), ConsensusError> {
		let vote = self.by_distribute_anchor.get(anchor).ok_or(ConsensusError::UnknownAnchor(*anchor))?;
		let mut vote = vote.lock().expect("poisoned mutex");
		vote.accept(from, share_map)?;
		Ok(())
	}

	/// Forwards an inbound publish frame to the vote installed under
	/// `anchor`. Returns whether collection is now complete.
	pub fn handle_publish(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
	) -> Result<bool, ConsensusError> {
		let vote = self.by_distribute_anchor.get(anchor).ok_or(ConsensusError::UnknownAnchor(*anchor))?;
		let mut vote = vote.lock().expect("poisoned mutex");
		Ok(vote.collect(from, share_map)?)
	}

	pub fn get_agreement(&self, target_h: u64) -> Option<Agreement> {
		let vote = self.by_target.get(&target_h)?;
		let vote = vote.lock().expect("poisoned mutex");
		vote.get_agreement()
	}

	pub fn get_proof(&self, target_h: u64) -> Option<Vec<CollectedEnvelope>> {
		let vote = self.by_target.get(&target_h)?;
		let vote = vote.lock().expect("poisoned mutex");
		Some(vote.get_proof().to_vec())
	}

	/// Verifies a distribute/publish envelope's signature against the
	/// vote installed under `anchor`, before its payload is forwarded to
	/// `handle_distribute`/`handle_publish`. Returns `false` for an
	/// unknown anchor rather than erroring, matching the drop-silently
	/// policy for out-of-range anchors.
	pub fn verify_signature(
		&self,
		anchor: &BlockHash,
		ident: &Identity,
		message: &[u8],
		r: &pvss_multisig::crypto::Point,
		s: &pvss_multisig::crypto::Scalar,
	) -> bool {
		match self.by_distribute_anchor.get(anchor) {
			Some(vote) => vote.lock().expect("poisoned mutex").verify_signature(ident, message, r, s),
			None => false,
		}
	}

	pub fn window_len(&self) -> usize {
		self.by_target.len()
	}
}

fn build_candidates(
	weights: &BTreeMap<Identity, u32>,
	enroll_data: &BTreeMap<Identity, SealedBox>,
) -> Vec<pvss_multisig::Candidate> {
	weights
		.iter()
		.filter_map(|(ident, weight)| {
			enroll_data.get(ident).map(|sealed_box| pvss_multisig::Candidate {
				ident: *ident,
				weight: *weight,
				sealed_box: sealed_box.clone(),
			})
		})
		.collect()
}
