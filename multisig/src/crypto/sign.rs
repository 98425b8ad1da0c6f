//! Schnorr sign/verify and Diffie-Hellman shared-key derivation over
//! Ed25519.

use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use super::point::Point;
use super::scalar::Scalar;

/// `priv * B`. The enrollment's public key.
pub fn derive_pubkey(priv_key: &Scalar) -> Point {
	Point::base_mul(priv_key)
}

/// The identity point is never an acceptable public key; `Point::from_bytes`
/// already enforces this on every point ever unpacked off the wire, so this
/// exists only to re-check points built in memory without a round trip.
pub fn validate_pubkey(pubkey: &Point) -> bool {
	!pubkey.is_identity()
}

fn challenge(nonce_point: &Point, pubkey: &Point, message: &[u8]) -> Scalar {
	let mut hasher = Sha256::new();
	hasher.update(nonce_point.to_bytes());
	hasher.update(pubkey.to_bytes());
	hasher.update(message);
	let digest: [u8; 32] = hasher.finalize().into();
	Scalar::from_bytes_mod_order(digest)
}

/// Schnorr signature: samples a fresh nonce `r`, commits to `R = r*B`, and
/// responds `S = r + e*priv` where `e` is the Fiat-Shamir challenge over
/// `(R, pub, message)`.
pub fn sign<R: RngCore + CryptoRng>(
	priv_key: &Scalar,
	pubkey: &Point,
	message: &[u8],
	rng: &mut R,
) -> (Point, Scalar) {
	let r = Scalar::random(rng);
	let nonce_point = Point::base_mul(&r);
	let e = challenge(&nonce_point, pubkey, message);
	let s = r + e * *priv_key;
	(nonce_point, s)
}

/// Verifies `S*B == R + e*pub`.
pub fn verify(pubkey: &Point, message: &[u8], nonce_point: &Point, s: &Scalar) -> bool {
	let e = challenge(nonce_point, pubkey, message);
	let lhs = Point::base_mul(s);
	let rhs = *nonce_point + *pubkey * e;
	lhs == rhs
}

/// Diffie-Hellman shared point `priv * peer_pub`, used to derive the
/// per-peer share-encryption key in `SecretShare::distribute`/`accept`.
pub fn shared_key(priv_key: &Scalar, peer_pub: &Point) -> Point {
	*peer_pub * *priv_key
}
