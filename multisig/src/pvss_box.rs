use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::tables::natural_pow;
use crate::crypto::{sign, Point, Scalar};
use crate::error::PvssError;

/// The owner-only half of a polynomial commitment: the plaintext
/// coefficients and the ephemeral enrollment private key. Never leaves the
/// owning node.
#[derive(Clone)]
pub struct OpenedBox {
	priv_key: Scalar,
	coeffs: Vec<Scalar>,
}

impl OpenedBox {
	/// Samples a fresh private key and `threshold` coefficients, resampling
	/// until none of the coefficients is zero (a zero coefficient would
	/// make evaluation degenerate).
	pub fn generate<R: RngCore + CryptoRng>(threshold: usize, rng: &mut R) -> Self {
		loop {
			let priv_key = Scalar::random(rng);
			let coeffs: Vec<Scalar> = (0..threshold).map(|_| Scalar::random(rng)).collect();
			if coeffs.iter().all(|c| !c.is_zero()) {
				return OpenedBox { priv_key, coeffs };
			}
		}
	}

	pub fn public_key(&self) -> Point {
		sign::derive_pubkey(&self.priv_key)
	}

	/// `secret` is the owner's contribution to the shared agreement: the
	/// constant term of the polynomial, `coeffs[0]`.
	pub fn secret(&self) -> Scalar {
		self.coeffs[0]
	}

	/// `Σ coeffs[i] * x^i` for `i` in `[0, threshold)`. `threshold` is the
	/// cycle's actual committee threshold, which
	/// may be smaller than the number of coefficients this box was sampled
	/// with (`generate` always samples up to `MAX_DELEGATE_THRESH`
	/// coefficients so a box need not be regenerated when committee size
	/// changes between cycles; unused trailing coefficients are simply
	/// never evaluated). Used both to produce a peer's share (`x` = that
	/// peer's index) and, for `x` within the table range, accelerated by
	/// [`natural_pow`].
	pub fn evaluate(&self, threshold: usize, x: u32) -> Scalar {
		let threshold = threshold.min(self.coeffs.len());
		let mut acc = self.coeffs[0];
		for (i, coeff) in self.coeffs.iter().enumerate().take(threshold).skip(1) {
			acc = acc + *coeff * natural_pow(x as u64, i as u32);
		}
		acc
	}

	/// Seals the box for publication: encrypts each coefficient as
	/// `coeff * B`, derives the public key, and signs `ident` with the
	/// ephemeral private key. Fails only if a coefficient is zero, which
	/// `generate` already guards against — kept fallible for callers
	/// constructing an `OpenedBox` by hand (e.g. in tests).
	pub fn seal<R: RngCore + CryptoRng>(&self, ident: &[u8; 32], rng: &mut R) -> Result<SealedBox, PvssError> {
		if self.coeffs.iter().any(|c| c.is_zero()) {
			return Err(PvssError::ZeroCoefficient);
		}
		let pub_key = self.public_key();
		let enc_coeffs: Vec<Point> = self.coeffs.iter().map(Point::base_mul).collect();
		let (sig_r, sig_s) = sign::sign(&self.priv_key, &pub_key, ident, rng);
		Ok(SealedBox {
			enc_coeffs,
			pub_key,
			sig_r,
			sig_s,
		})
	}

	pub fn threshold(&self) -> usize {
		self.coeffs.len()
	}

	/// The pairwise Diffie-Hellman shared point with `peer_pub`, used as the
	/// share-encryption key in `SecretShare::distribute`/`accept`.
	pub fn shared_key_with(&self, peer_pub: &Point) -> Point {
		sign::shared_key(&self.priv_key, peer_pub)
	}

	/// Signs `message` with this box's ephemeral private key, the same key
	/// used for `seal`. Used to sign outbound distribute/publish envelopes.
	pub fn sign<R: RngCore + CryptoRng>(&self, message: &[u8], rng: &mut R) -> (Point, Scalar) {
		sign::sign(&self.priv_key, &self.public_key(), message, rng)
	}
}

/// The published half of a polynomial commitment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SealedBox {
	pub enc_coeffs: Vec<Point>,
	pub pub_key: Point,
	pub sig_r: Point,
	pub sig_s: Scalar,
}

impl SealedBox {
	pub fn threshold(&self) -> usize {
		self.enc_coeffs.len()
	}

	/// Verifies the enrollment signature binds this box to `ident`.
	pub fn verify_signature(&self, ident: &[u8; 32]) -> bool {
		sign::verify(&self.pub_key, ident, &self.sig_r, &self.sig_s)
	}

	/// `Σ enc_coeffs[i] * x^i` over the cycle's actual `threshold`
	/// coefficients, the commitment to `evaluate(threshold, x)` without
	/// revealing it.
	pub fn commitment_at(&self, threshold: usize, x: u32) -> Point {
		let threshold = threshold.min(self.enc_coeffs.len());
		let mut acc = self.enc_coeffs[0];
		for (i, enc_coeff) in self.enc_coeffs.iter().enumerate().take(threshold).skip(1) {
			acc = acc + *enc_coeff * natural_pow(x as u64, i as u32);
		}
		acc
	}

	/// Checks that `share` is consistent with the published commitment at
	/// index `x`: `share * B == commitment_at(threshold, x)`.
	pub fn verify_commitment(&self, threshold: usize, x: u32, share: &Scalar) -> bool {
		Point::base_mul(share) == self.commitment_at(threshold, x)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	#[test]
	fn evaluate_and_commitment_agree() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(10);
		let opened = OpenedBox::generate(4, &mut rng);
		let ident = [7u8; 32];
		let sealed = opened.seal(&ident, &mut rng).unwrap();
		for x in 1..=20u32 {
			let share = opened.evaluate(4, x);
			assert!(sealed.verify_commitment(4, x, &share));
		}
	}

	#[test]
	fn tampered_share_fails_commitment() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(11);
		let opened = OpenedBox::generate(3, &mut rng);
		let ident = [8u8; 32];
		let sealed = opened.seal(&ident, &mut rng).unwrap();
		let mut share = opened.evaluate(3, 5);
		share = share + Scalar::from_u64(1);
		assert!(!sealed.verify_commitment(3, 5, &share));
	}

	#[test]
	fn seal_signature_verifies_against_ident() {
		let mut rng = rand::rngs::StdRng::seed_from_u64(12);
		let opened = OpenedBox::generate(2, &mut rng);
		let ident = [9u8; 32];
		let sealed = opened.seal(&ident, &mut rng).unwrap();
		assert!(sealed.verify_signature(&ident));
		assert!(!sealed.verify_signature(&[10u8; 32]));
	}
}
