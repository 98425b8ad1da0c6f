use std::collections::BTreeMap;

use pvss_multisig::{Identity, SealedBox};

/// A block hash, opaque to this crate.
pub type BlockHash = [u8; 32];

/// The block-store collaborator. `ConsensusDriver` only ever reads from
/// this; it never mutates chain state. Implemented by the host's own
/// chain state.
pub trait BlockChain {
	/// The weight of every delegate enrolled as of the block at `hash`,
	/// ascending by identity.
	fn enrolled_weights(&self, hash: &BlockHash) -> BTreeMap<Identity, u32>;

	/// The raw enrollment data (sealed boxes) published in the block at
	/// `hash`, one entry per delegate that enrolled there.
	fn enroll_data(&self, hash: &BlockHash) -> BTreeMap<Identity, SealedBox>;

	/// Resolves `(fork, height)` to the canonical block hash on that fork.
	fn block_hash_at(&self, fork: u64, height: u64) -> Option<BlockHash>;
}

/// The transaction-pool collaborator. Receives the enrollment transactions
/// `ConsensusDriver` builds for locally-owned delegate identities.
pub trait TxPool {
	/// Submits a self-enrollment transaction carrying `sealed_box` for
	/// `ident`, built once per enrollment cycle.
	fn submit_enroll_tx(&self, ident: Identity, sealed_box: SealedBox);
}
