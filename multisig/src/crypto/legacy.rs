//! The "defect" multisign clamp variant, preserved bit-exact for wire
//! compatibility with historical blocks signed by older peers. Dead on the
//! current hot path — it exists only so that `verify_legacy_defect` can
//! check old signatures, never to produce new ones. Do not "modernise" the
//! clamp or the hash construction; any behavioural change here breaks
//! verification of historical data.

use sha2::{Digest, Sha512};

/// Applies the legacy private-scalar clamp: clear the low 3 bits (cofactor
/// clearing), clear the top bit, and set the second-highest bit. Bit-exact
/// copy of the clamp historically applied before the codebase switched to
/// `curve25519-dalek`'s own scalar sampling.
pub fn legacy_clamp(mut key: [u8; 32]) -> [u8; 32] {
	key[0] &= 0xF8;
	key[31] &= 0x7F;
	key[31] |= 0x40;
	key
}

/// Legacy challenge hash: SHA-512 of `R || pub || message`, truncated by
/// reduction mod the group order. Distinct from the current
/// [`super::sign::sign`]'s SHA-256 challenge; kept separate rather than
/// unified so neither path can silently drift into the other.
pub fn legacy_challenge_bytes(nonce_point_bytes: &[u8; 32], pubkey_bytes: &[u8; 32], message: &[u8]) -> [u8; 64] {
	let mut hasher = Sha512::new();
	hasher.update(nonce_point_bytes);
	hasher.update(pubkey_bytes);
	hasher.update(message);
	hasher.finalize().into()
}
