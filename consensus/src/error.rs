use thiserror::Error;

use crate::traits::BlockHash;

/// Error kinds for `ConsensusDriver`'s cross-cutting handlers. None of
/// these ever escape `evolve`/`handle_distribute`/`handle_publish`; they
/// are logged at the call site and translated into a drop/ignore policy
/// by the gossip layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
	#[error("no vote exists for target height {0}")]
	NoSuchTarget(u64),

	#[error("no vote is installed for distribute anchor {0:?}")]
	UnknownAnchor(BlockHash),

	#[error("vote for target height {0} has not completed enrollment yet")]
	NotEnrolled(u64),

	#[error(transparent)]
	Pvss(#[from] pvss_multisig::PvssError),
}
