use std::collections::BTreeMap;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::crypto::Scalar;
use crate::error::PvssError;
use crate::participant::{Candidate, Identity};
use crate::secret_share::SecretShare;

/// `PvssVote`'s lifecycle. Transitions fire only from `ConsensusDriver`; a
/// `PvssVote` never drives its own phase change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteState {
	Setup,
	Enrolled,
	Published,
}

/// One signed distribute or publish envelope, kept in order for
/// `get_proof`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CollectedEnvelope {
	pub from: Identity,
	pub share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
}

/// An agreement: the reconstructed shared randomness plus the ballot that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Agreement {
	pub value: [u8; 32],
	pub total_weight: u32,
	pub ballot: BTreeMap<Identity, u32>,
}

/// Per-target-height consensus object. Owns the local node's voting
/// `SecretShare` instances (one per locally-held delegate identity) plus a
/// non-voting `witness` that observes every publish in order to derive the
/// agreement regardless of which identities are locally owned.
pub struct PvssVote {
	state: VoteState,
	threshold: usize,
	delegates: BTreeMap<Identity, SecretShare>,
	witness: SecretShare,
	collected: Vec<CollectedEnvelope>,
	is_published: bool,
}

impl PvssVote {
	/// Creates the witness (the only participant guaranteed to exist even
	/// when the local node owns no delegate identity in this cycle) and
	/// one `SecretShare` per locally-owned identity.
	pub fn setup<R: RngCore + CryptoRng>(
		local_idents: &[Identity],
		max_threshold: usize,
		rng: &mut R,
	) -> Result<Self, PvssError> {
		// The witness identity is never matched against real candidates
		// (no delegate is ever enrolled under this value by construction
		// elsewhere), so it always takes the "observer, zero weight" role
		// described in `secret_share`'s doc comment.
		let witness_ident = Identity([0u8; 32]);
		let witness = SecretShare::setup(witness_ident, max_threshold, rng)?;

		let mut delegates = BTreeMap::new();
		for ident in local_idents {
			delegates.insert(*ident, SecretShare::setup(*ident, max_threshold, rng)?);
		}

		Ok(PvssVote {
			state: VoteState::Setup,
			threshold: 0,
			delegates,
			witness,
			collected: Vec::new(),
			is_published: false,
		})
	}

	pub fn state(&self) -> VoteState {
		self.state
	}

	/// Enrollment data to publish for every locally-owned delegate: their
	/// sealed box, keyed by identity, for the host to fold into an
	/// enrollment transaction.
	pub fn enroll_data(&self) -> BTreeMap<Identity, crate::pvss_box::SealedBox> {
		self.delegates
			.iter()
			.map(|(ident, share)| (*ident, share.sealed_box().clone()))
			.collect()
	}

	/// Enrolls the witness first (so reconstruction is always possible)
	/// then every locally-owned delegate.
	pub fn enroll(&mut self, candidates: &[Candidate]) -> Result<(), PvssError> {
		self.witness.enroll(candidates)?;
		for share in self.delegates.values_mut() {
			share.enroll(candidates)?;
		}
		self.threshold = self.witness.threshold();
		self.state = VoteState::Enrolled;
		debug!(threshold = self.threshold, delegates = self.delegates.len(), "vote enrolled");
		Ok(())
	}

	/// Per-delegate distribute payloads to broadcast, merged across every
	/// locally-owned identity.
	pub fn distribute(&self) -> BTreeMap<Identity, BTreeMap<Identity, Vec<Scalar>>> {
		self.delegates
			.iter()
			.map(|(ident, share)| (*ident, share.distribute()))
			.collect()
	}

	/// Like [`Self::distribute`], but each delegate's share-map is also
	/// signed with that delegate's own enrollment key, ready for the wire
	/// envelope.
	pub fn sign_distribute<R: RngCore + CryptoRng>(
		&self,
		rng: &mut R,
	) -> BTreeMap<Identity, (BTreeMap<Identity, Vec<Scalar>>, crate::crypto::Point, Scalar)> {
		self.delegates
			.iter()
			.map(|(ident, share)| {
				let share_map = share.distribute();
				let hash = crate::envelope::hash_distribute_map(&share_map);
				let (r, s) = share.sign(&hash, rng);
				(*ident, (share_map, r, s))
			})
			.collect()
	}

	/// Forwards an inbound distribute envelope's share-map entries to the
	/// witness and to every locally-owned delegate that it concerns. A
	/// single failure aborts the whole call, leaving no partial state
	/// change for this envelope.
	pub fn accept(&mut self, from: Identity, share_map: &BTreeMap<Identity, Vec<Scalar>>) -> Result<(), PvssError> {
		if self.state != VoteState::Enrolled {
			return Err(PvssError::PhaseOrder);
		}
		if let Some(shares) = share_map.get(&self.witness.self_ident()) {
			self.witness.accept(from, shares)?;
		}
		for (ident, share) in self.delegates.iter_mut() {
			if let Some(shares) = share_map.get(ident) {
				share.accept(from, shares)?;
			}
		}
		Ok(())
	}

	/// Publish payloads to broadcast for every locally-owned identity.
	pub fn publish(&mut self) -> BTreeMap<Identity, BTreeMap<Identity, Vec<(u32, Scalar)>>> {
		self.is_published = true;
		self.state = VoteState::Published;
		self.delegates
			.iter()
			.map(|(ident, share)| (*ident, share.publish()))
			.collect()
	}

	/// Like [`Self::publish`], but each delegate's share-map is also signed
	/// with that delegate's own enrollment key.
	pub fn sign_publish<R: RngCore + CryptoRng>(
		&mut self,
		rng: &mut R,
	) -> BTreeMap<Identity, (BTreeMap<Identity, Vec<(u32, Scalar)>>, crate::crypto::Point, Scalar)> {
		self.is_published = true;
		self.state = VoteState::Published;
		self.delegates
			.iter()
			.map(|(ident, share)| {
				let share_map = share.publish();
				let hash = crate::envelope::hash_publish_map(&share_map);
				let (r, s) = share.sign(&hash, rng);
				(*ident, (share_map, r, s))
			})
			.collect()
	}

	pub fn is_published(&self) -> bool {
		self.is_published
	}

	/// Records an inbound publish envelope against the witness (always)
	/// and every locally-owned delegate that can make use of it, then
	/// appends it to the ordered proof list on success.
	pub fn collect(&mut self, from: Identity, share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>) -> Result<bool, PvssError> {
		let witness_completed = self.witness.collect(from, &share_map)?;
		for share in self.delegates.values_mut() {
			// Locally-owned delegates only need the witness's view to
			// derive the agreement; forwarding keeps their own state
			// consistent with a node that also observes every publish.
			let _ = share.collect(from, &share_map);
		}
		self.collected.push(CollectedEnvelope { from, share_map });
		Ok(witness_completed)
	}

	pub fn is_collect_completed(&self) -> bool {
		self.witness.is_collect_completed()
	}

	/// Reconstructs the witness's view and, if any secret was recovered,
	/// derives the agreement by hashing every reconstructed secret in
	/// ascending-identity order.
	pub fn get_agreement(&self) -> Option<Agreement> {
		let reconstructed = self.witness.reconstruct();
		if reconstructed.is_empty() {
			return None;
		}

		let mut hasher = Sha256::new();
		let mut total_weight = 0u32;
		let mut ballot = BTreeMap::new();
		for (ident, (secret, weight)) in &reconstructed {
			hasher.update(secret.to_bytes());
			total_weight += weight;
			ballot.insert(*ident, *weight);
		}
		let value: [u8; 32] = hasher.finalize().into();

		Some(Agreement { value, total_weight, ballot })
	}

	/// The ordered proof-of-agreement: every publish envelope collected so
	/// far, serialized for the host.
	pub fn get_proof(&self) -> &[CollectedEnvelope] {
		&self.collected
	}

	/// Verifies a distribute/publish envelope's signature against the
	/// enrolled public key for `ident`, as looked up via the witness (which
	/// tracks every enrolled identity regardless of local ownership).
	pub fn verify_signature(&self, ident: &Identity, message: &[u8], r: &crate::crypto::Point, s: &Scalar) -> bool {
		match self.witness.peer_pubkey(ident) {
			Some(pubkey) => crate::crypto::sign::verify(&pubkey, message, r, s),
			None => {
				warn!(?ident, "verify_signature requested for an identity this vote doesn't track");
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn run_cycle(weights: &[u32], local: &[usize]) -> (Vec<PvssVote>, Vec<Identity>) {
		let mut rng = rand::rngs::StdRng::seed_from_u64(42);
		let idents: Vec<Identity> = (0..weights.len())
			.map(|i| {
				let mut bytes = [0u8; 32];
				bytes[0] = (i + 1) as u8;
				Identity(bytes)
			})
			.collect();

		let mut votes: Vec<PvssVote> = (0..weights.len())
			.map(|i| {
				let owned: Vec<Identity> = if local.contains(&i) { vec![idents[i]] } else { vec![] };
				PvssVote::setup(&owned, 8, &mut rng).unwrap()
			})
			.collect();

		let candidates: Vec<Candidate> = idents
			.iter()
			.zip(weights)
			.enumerate()
			.map(|(i, (ident, weight))| Candidate {
				ident: *ident,
				weight: *weight,
				sealed_box: votes[i].enroll_data()[ident].clone(),
			})
			.collect();

		for vote in votes.iter_mut() {
			vote.enroll(&candidates).unwrap();
		}

		let distributes: Vec<BTreeMap<Identity, BTreeMap<Identity, Vec<Scalar>>>> =
			votes.iter().map(|v| v.distribute()).collect();

		for (sender_idx, sender_ident) in idents.iter().enumerate() {
			let per_delegate = &distributes[sender_idx];
			for (delegate_ident, share_map) in per_delegate {
				let owner_idx = idents.iter().position(|i| i == delegate_ident).unwrap();
				votes[owner_idx].accept(*sender_ident, share_map).unwrap();
			}
		}

		let publishes: Vec<BTreeMap<Identity, BTreeMap<Identity, Vec<(u32, Scalar)>>>> =
			votes.iter_mut().map(|v| v.publish()).collect();

		for (sender_idx, sender_ident) in idents.iter().enumerate() {
			let per_delegate = &publishes[sender_idx];
			for (_delegate_ident, share_map) in per_delegate {
				for vote in votes.iter_mut() {
					vote.collect(*sender_ident, share_map.clone()).unwrap();
				}
			}
		}

		(votes, idents)
	}

	#[test]
	fn four_equal_weight_delegates_agree() {
		let (votes, idents) = run_cycle(&[1, 1, 1, 1], &[0, 1, 2, 3]);
		let agreements: Vec<Agreement> = votes.iter().map(|v| v.get_agreement().expect("agreement")).collect();
		for a in &agreements[1..] {
			assert_eq!(a.value, agreements[0].value);
			assert_eq!(a.total_weight, 4);
		}
		assert_eq!(agreements[0].ballot.len(), idents.len());
	}

	#[test]
	fn observer_with_no_local_delegate_still_derives_agreement() {
		let (votes, _idents) = run_cycle(&[1, 1, 1], &[0, 1]);
		// votes[2] owns no local delegate identity but still enrolled a
		// witness and observed every publish.
		assert!(votes[2].get_agreement().is_some());
	}
}
