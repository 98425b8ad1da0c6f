use thiserror::Error;

use crate::wire::BlockHash;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GossipError {
	#[error("frame failed to decode: {0}")]
	Malformed(&'static str),

	#[error("anchor {0:?} is out of the current chain-view range")]
	OutOfRangeAnchor(BlockHash),

	#[error("inbound item was not assigned to the sending peer")]
	Unsolicited,

	#[error(transparent)]
	Consensus(#[from] pvss_consensus::ConsensusError),
}
