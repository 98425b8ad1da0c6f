use std::collections::BTreeMap;

use rand::{CryptoRng, RngCore};
use tracing::{debug, warn};

use crate::crypto::Scalar;
use crate::error::PvssError;
use crate::participant::{Candidate, IndexRange, Identity, Participant};
use crate::pvss_box::{OpenedBox, SealedBox};
use crate::worker_pool;

/// One identity's view of a PVSS enrollment cycle: its own polynomial,
/// the enrolled peer table, and whatever plaintext share points it has
/// collected about each identity so far.
///
/// [`encrypt_share`]/[`decrypt_share`] below use a simple XOR scheme kept
/// exactly as-is for wire compatibility, not strengthened.
pub struct SecretShare {
	self_ident: Identity,
	opened_box: OpenedBox,
	sealed_box: SealedBox,
	threshold: usize,
	self_index_range: IndexRange,
	participants: BTreeMap<Identity, Participant>,
	opened_shares: BTreeMap<Identity, Vec<(u32, Scalar)>>,
}

fn xor_scalar(value: &Scalar, key: &crate::crypto::Point) -> Scalar {
	let mut bytes = value.to_bytes();
	let key_bytes = key.to_bytes();
	for (b, k) in bytes.iter_mut().zip(key_bytes.iter()) {
		*b ^= k;
	}
	Scalar::from_bytes_mod_order(bytes)
}

/// XOR is self-inverse, so encryption and decryption are the same
/// transform; kept as two names so call sites read intentionally.
fn encrypt_share(value: &Scalar, key: &crate::crypto::Point) -> Scalar {
	xor_scalar(value, key)
}

fn decrypt_share(value: &Scalar, key: &crate::crypto::Point) -> Scalar {
	xor_scalar(value, key)
}

impl SecretShare {
	/// Samples a fresh `OpenedBox`/`SealedBox` pair for this enrollment
	/// cycle. The enrollment transaction built from the returned
	/// `sealed_box` is the host's responsibility.
	pub fn setup<R: RngCore + CryptoRng>(
		self_ident: Identity,
		max_threshold: usize,
		rng: &mut R,
	) -> Result<Self, PvssError> {
		let opened_box = OpenedBox::generate(max_threshold, rng);
		let sealed_box = opened_box.seal(&self_ident.0, rng)?;
		Ok(SecretShare {
			self_ident,
			opened_box,
			sealed_box,
			threshold: 0,
			self_index_range: IndexRange { start: 0, end: 0 },
			participants: BTreeMap::new(),
			opened_shares: BTreeMap::new(),
		})
	}

	pub fn sealed_box(&self) -> &SealedBox {
		&self.sealed_box
	}

	pub fn threshold(&self) -> usize {
		self.threshold
	}

	pub fn self_ident(&self) -> Identity {
		self.self_ident
	}

	pub fn self_weight(&self) -> u32 {
		self.self_index_range.weight()
	}

	/// The enrolled public key for `ident`, if known. Used by
	/// `PvssVote::verify_signature` to check a distribute/publish
	/// envelope's signature without exposing the whole participant table.
	pub fn peer_pubkey(&self, ident: &Identity) -> Option<crate::crypto::Point> {
		if *ident == self.self_ident {
			Some(self.sealed_box.pub_key)
		} else {
			self.participants.get(ident).map(|p| p.sealed_box.pub_key)
		}
	}

	/// Signs `message` with this identity's enrollment private key. Used to
	/// sign this identity's outbound distribute/publish envelope.
	pub fn sign<R: RngCore + CryptoRng>(&self, message: &[u8], rng: &mut R) -> (crate::crypto::Point, Scalar) {
		self.opened_box.sign(message, rng)
	}

	/// Verifies every candidate's enrollment signature (in parallel),
	/// drops the ones that fail, and assigns contiguous index ranges to
	/// the survivors in ascending-identity order. Computes the cycle's
	/// actual threshold `t = floor(total_weight / 2) + 1`.
	pub fn enroll(&mut self, candidates: &[Candidate]) -> Result<(), PvssError> {
		let verified: Vec<bool> = worker_pool::transform(candidates, |c| c.verify());

		let mut ordered: Vec<(&Candidate, bool)> = candidates.iter().zip(verified).collect();
		ordered.sort_by_key(|(c, _)| c.ident);

		let mut participants = BTreeMap::new();
		let mut self_index_range = None;
		let mut cursor: u32 = 0;
		for (candidate, ok) in ordered {
			if !ok {
				warn!(ident = ?candidate.ident, "candidate failed signature verification, dropping");
				continue;
			}
			let range = IndexRange {
				start: cursor + 1,
				end: cursor + 1 + candidate.weight,
			};
			cursor += candidate.weight;

			if candidate.ident == self.self_ident {
				self_index_range = Some(range);
				continue;
			}

			participants.insert(
				candidate.ident,
				Participant {
					ident: candidate.ident,
					weight: candidate.weight,
					index_range: range,
					sealed_box: candidate.sealed_box.clone(),
					shared_key: Some(self.opened_box.shared_key_with(&candidate.sealed_box.pub_key)),
					decrypted_shares: Vec::new(),
				},
			);
		}

		let self_index_range =
			self_index_range.ok_or(PvssError::InternalInvariant("self identity missing from enrolled candidates"))?;

		let total_weight = cursor;
		self.threshold = total_weight as usize / 2 + 1;
		self.self_index_range = self_index_range;
		self.participants = participants;
		self.opened_shares = BTreeMap::new();
		debug!(total_weight, threshold = self.threshold, "enrollment complete");
		Ok(())
	}

	/// Evaluates this node's polynomial at every enrolled peer's index
	/// range and encrypts each resulting share under the pairwise shared
	/// key.
	pub fn distribute(&self) -> BTreeMap<Identity, Vec<Scalar>> {
		let threshold = self.threshold;
		let entries: Vec<(Identity, Vec<Scalar>)> = worker_pool::transform(
			&self.participants.values().collect::<Vec<_>>(),
			|p| {
				let key = self.opened_box.shared_key_with(&p.sealed_box.pub_key);
				let shares = (p.index_range.start..p.index_range.end)
					.map(|x| encrypt_share(&self.opened_box.evaluate(threshold, x), &key))
					.collect();
				(p.ident, shares)
			},
		);
		entries.into_iter().collect()
	}

	/// Decrypts and verifies the shares `from` sent for our own index
	/// range, caching them on success. Idempotent: a repeat call with the
	/// same sender is a no-op success.
	pub fn accept(&mut self, from: Identity, encrypted_shares: &[Scalar]) -> Result<(), PvssError> {
		let weight = self.self_index_range.weight() as usize;
		let participant = self
			.participants
			.get_mut(&from)
			.ok_or(PvssError::UnknownParticipant(from))?;

		if participant.is_accepted() {
			return Ok(());
		}
		if encrypted_shares.len() != weight {
			return Err(PvssError::WeightMismatch { expected: weight, got: encrypted_shares.len() });
		}

		let key = participant
			.shared_key
			.expect("shared key is derived for every participant during enroll");

		let start = self.self_index_range.start;
		let mut decrypted = Vec::with_capacity(weight);
		for (i, enc) in encrypted_shares.iter().enumerate() {
			let x = start + i as u32;
			let plain = decrypt_share(enc, &key);
			if !participant.sealed_box.verify_commitment(self.threshold, x, &plain) {
				return Err(PvssError::ShareVerifyFail(from));
			}
			decrypted.push(plain);
		}
		participant.decrypted_shares = decrypted;
		Ok(())
	}

	/// Emits the plaintext shares of every peer we've accepted, plus our
	/// own evaluation at our own index range.
	pub fn publish(&self) -> BTreeMap<Identity, Vec<(u32, Scalar)>> {
		let mut out = BTreeMap::new();
		for p in self.participants.values() {
			if !p.is_accepted() {
				continue;
			}
			let points: Vec<(u32, Scalar)> = (p.index_range.start..p.index_range.end)
				.zip(p.decrypted_shares.iter().copied())
				.collect();
			out.insert(p.ident, points);
		}
		let own_points: Vec<(u32, Scalar)> = (self.self_index_range.start..self.self_index_range.end)
			.map(|x| (x, self.opened_box.evaluate(self.threshold, x)))
			.collect();
		out.insert(self.self_ident, own_points);
		out
	}

	fn weight_of(&self, ident: &Identity) -> Option<u32> {
		if *ident == self.self_ident {
			Some(self.self_weight())
		} else {
			self.participants.get(ident).map(|p| p.weight)
		}
	}

	fn commitment_check(&self, ident: &Identity, x: u32, share: &Scalar) -> bool {
		if *ident == self.self_ident {
			self.sealed_box.verify_commitment(self.threshold, x, share)
		} else {
			self.participants
				.get(ident)
				.map(|p| p.sealed_box.verify_commitment(self.threshold, x, share))
				.unwrap_or(false)
		}
	}

	/// Records every `(identity, points)` pair `from` has published,
	/// verifying each point against that identity's sealed-box commitment.
	/// Our own identity's points are verified but never recorded (we
	/// already know our own secret). Returns whether collection is now
	/// complete for every accepted identity.
	pub fn collect(&mut self, from: Identity, published: &BTreeMap<Identity, Vec<(u32, Scalar)>>) -> Result<bool, PvssError> {
		if from != self.self_ident && !self.participants.contains_key(&from) {
			return Err(PvssError::UnknownParticipant(from));
		}

		for (ident, points) in published {
			let expected_weight = self
				.weight_of(ident)
				.ok_or(PvssError::UnknownParticipant(*ident))?;
			if points.len() != expected_weight as usize {
				return Err(PvssError::WeightMismatch { expected: expected_weight as usize, got: points.len() });
			}

			let all_valid = worker_pool::execute_until(points, |(x, y)| self.commitment_check(ident, *x, y));
			if !all_valid {
				return Err(PvssError::ShareVerifyFail(*ident));
			}

			if *ident == self.self_ident {
				continue;
			}

			let entry = self.opened_shares.entry(*ident).or_default();
			for (x, y) in points {
				if entry.len() >= self.threshold {
					break;
				}
				if !entry.iter().any(|(ex, _)| ex == x) {
					entry.push((*x, *y));
				}
			}
		}

		Ok(self.is_collect_completed())
	}

	/// Counts identities we have accepted distribute data from versus
	/// identities we have collected a full threshold of opened points for.
	pub fn is_collect_completed(&self) -> bool {
		let distributed_count = usize::from(self.self_weight() > 0)
			+ self.participants.values().filter(|p| p.is_accepted()).count();
		let collected_count = self
			.opened_shares
			.values()
			.filter(|points| points.len() >= self.threshold)
			.count();

		(distributed_count == 0 && collected_count == self.opened_shares.len())
			|| collected_count >= distributed_count
	}

	/// Interpolates the constant term for every identity whose opened-share
	/// set has reached the threshold.
	pub fn reconstruct(&self) -> BTreeMap<Identity, (Scalar, u32)> {
		let threshold = self.threshold;
		let ready: Vec<(Identity, Vec<(u32, Scalar)>)> = self
			.opened_shares
			.iter()
			.filter(|(_, points)| points.len() >= threshold)
			.map(|(ident, points)| (*ident, points.clone()))
			.collect();

		let reconstructed: Vec<(Identity, Scalar)> = worker_pool::transform(&ready, |(ident, points)| {
			(*ident, crate::interpolation::reconstruct_secret(&points[..threshold]))
		});

		reconstructed
			.into_iter()
			.filter_map(|(ident, secret)| self.weight_of(&ident).map(|w| (ident, (secret, w))))
			.filter(|(_, (_, w))| *w > 0)
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn make_candidate(ident: Identity, weight: u32, rng: &mut rand::rngs::StdRng) -> (Candidate, SecretShare) {
		let share = SecretShare::setup(ident, 8, rng).unwrap();
		let candidate = Candidate { ident, weight, sealed_box: share.sealed_box().clone() };
		(candidate, share)
	}

	#[test]
	fn enroll_computes_threshold_and_drops_invalid_candidates() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(100);
		let self_ident = Identity([1u8; 32]);
		let other_ident = Identity([2u8; 32]);
		let (self_candidate, mut share) = make_candidate(self_ident, 21, &mut rng);
		let (mut bad_candidate, _) = make_candidate(other_ident, 5, &mut rng);
		// Corrupt the signature so enroll() must drop this candidate.
		bad_candidate.sealed_box.sig_s = bad_candidate.sealed_box.sig_s + Scalar::from_u64(1);

		share.enroll(&[self_candidate, bad_candidate]).unwrap();
		assert_eq!(share.threshold(), (21 - 1) / 2 + 1);
		assert_eq!(share.self_weight(), 21);
		assert!(share.participants.is_empty());
	}

	#[test]
	fn enroll_threshold_rounds_down_for_even_total_weight() {
		// W=4 must give t=3 (floor(4/2)+1), not t=2: the two halves of this
		// formula only agree for odd W, so an even total weight is the
		// boundary case that actually exercises the rounding.
		let mut rng = rand::rngs::StdRng::seed_from_u64(102);
		let a_ident = Identity([1u8; 32]);
		let b_ident = Identity([2u8; 32]);
		let (a_candidate, mut share) = make_candidate(a_ident, 2, &mut rng);
		let (b_candidate, _) = make_candidate(b_ident, 2, &mut rng);

		share.enroll(&[a_candidate, b_candidate]).unwrap();
		assert_eq!(share.threshold(), 3);
	}

	#[test]
	fn witness_reconstructs_lone_delegate_secret() {
		// A witness (weight 0, not itself a delegate) observes a single
		// real delegate and reconstructs its secret, mirroring how
		// `PvssVote`'s witness derives the agreement for a one-delegate
		// committee.
		let mut rng = rand::rngs::StdRng::seed_from_u64(101);
		let delegate_ident = Identity([1u8; 32]);
		let witness_ident = Identity([0xFFu8; 32]);

		let (delegate_candidate, mut delegate_share) = make_candidate(delegate_ident, 21, &mut rng);
		let (witness_candidate, mut witness_share) = make_candidate(witness_ident, 0, &mut rng);

		let candidates = vec![delegate_candidate, witness_candidate];
		delegate_share.enroll(&candidates).unwrap();
		witness_share.enroll(&candidates).unwrap();

		let dist = delegate_share.distribute();
		witness_share.accept(delegate_ident, &dist[&witness_ident]).unwrap();

		let published = delegate_share.publish();
		witness_share.collect(delegate_ident, &published).unwrap();

		let recon = witness_share.reconstruct();
		let (secret, weight) = recon.get(&delegate_ident).expect("threshold reached (1 of 1)");
		assert_eq!(*weight, 21);
		assert_eq!(*secret, delegate_share.opened_box.secret());
	}

	#[test]
	fn three_delegates_distribute_accept_publish_collect_reconstruct() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(200);
		let idents = [Identity([1u8; 32]), Identity([2u8; 32]), Identity([3u8; 32])];
		let mut candidates = Vec::new();
		let mut shares = Vec::new();
		for ident in idents {
			let (c, s) = make_candidate(ident, 1, &mut rng);
			candidates.push(c);
			shares.push(s);
		}

		for share in shares.iter_mut() {
			share.enroll(&candidates).unwrap();
		}

		let distributions: Vec<BTreeMap<Identity, Vec<Scalar>>> =
			shares.iter().map(|s| s.distribute()).collect();

		for (i, share) in shares.iter_mut().enumerate() {
			for (j, dist) in distributions.iter().enumerate() {
				if i == j {
					continue;
				}
				let sender = idents[j];
				share.accept(sender, &dist[&idents[i]]).unwrap();
			}
		}

		let publishes: Vec<BTreeMap<Identity, Vec<(u32, Scalar)>>> =
			shares.iter().map(|s| s.publish()).collect();

		for (i, share) in shares.iter_mut().enumerate() {
			for (j, publish) in publishes.iter().enumerate() {
				share.collect(idents[j], publish).unwrap();
				let _ = i;
			}
		}

		for (target_idx, target_ident) in idents.iter().enumerate() {
			let recon = shares[(target_idx + 1) % 3].reconstruct();
			let (secret, weight) = recon.get(target_ident).expect("threshold reached");
			assert_eq!(*weight, 1);
			assert_eq!(*secret, shares[target_idx].opened_box.secret());
		}
	}
}
