use serde::{Deserialize, Serialize};

use crate::pvss_box::SealedBox;

/// Opaque 32-byte delegate identifier. The consensus core never interprets
/// its contents; the host assigns these.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(pub [u8; 32]);

impl std::fmt::Debug for Identity {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "Identity({})", hex::encode(self.0))
	}
}

/// One enrollment candidate, as read off an `EnrollTx` by the host and
/// handed to `SecretShare::enroll`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Candidate {
	pub ident: Identity,
	pub weight: u32,
	pub sealed_box: SealedBox,
}

impl Candidate {
	/// Verifies the enrollment signature binds `sealed_box` to `ident`.
	/// Candidates that fail this are dropped from the enrolled set.
	pub fn verify(&self) -> bool {
		self.sealed_box.verify_signature(&self.ident.0)
	}
}

/// The contiguous index range `[start, end)` a weighted participant
/// occupies in the shared `[1, total_weight]` index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRange {
	pub start: u32,
	pub end: u32,
}

impl IndexRange {
	pub fn weight(&self) -> u32 {
		self.end - self.start
	}

	pub fn contains(&self, index: u32) -> bool {
		index >= self.start && index < self.end
	}
}

/// An enrolled peer as tracked by one's own `SecretShare`: its sealed box,
/// index range, the derived pairwise shared key, and the shares we have
/// decrypted and verified from it so far.
#[derive(Clone, Debug)]
pub struct Participant {
	pub ident: Identity,
	pub weight: u32,
	pub index_range: IndexRange,
	pub sealed_box: SealedBox,
	/// `None` until the owning side has derived it (it never needs its own).
	pub shared_key: Option<crate::crypto::Point>,
	/// Populated once `SecretShare::accept` has verified this peer's
	/// distribute payload; empty means "not yet accepted".
	pub decrypted_shares: Vec<crate::crypto::Scalar>,
}

impl Participant {
	pub fn is_accepted(&self) -> bool {
		!self.decrypted_shares.is_empty()
	}
}
