use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::crypto::Scalar;
use crate::participant::Identity;

/// Deterministic hash of a distribute share-map: the message a distribute
/// envelope's signature covers. Hashes field-by-field in map order rather
/// than through a byte-stream codec, so this must stay the single shared
/// implementation between the signing and verifying sides.
pub fn hash_distribute_map(share_map: &BTreeMap<Identity, Vec<Scalar>>) -> [u8; 32] {
	let mut hasher = Sha256::new();
	for (ident, shares) in share_map {
		hasher.update(ident.0);
		hasher.update((shares.len() as u64).to_le_bytes());
		for s in shares {
			hasher.update(s.to_bytes());
		}
	}
	hasher.finalize().into()
}

/// Same shape as [`hash_distribute_map`] for a publish share-map, whose
/// entries carry an index alongside each opened point.
pub fn hash_publish_map(share_map: &BTreeMap<Identity, Vec<(u32, Scalar)>>) -> [u8; 32] {
	let mut hasher = Sha256::new();
	for (ident, points) in share_map {
		hasher.update(ident.0);
		hasher.update((points.len() as u64).to_le_bytes());
		for (x, y) in points {
			hasher.update(x.to_le_bytes());
			hasher.update(y.to_bytes());
		}
	}
	hasher.finalize().into()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn distribute_hash_changes_with_content() {
		let a = Identity([1u8; 32]);
		let mut m1 = BTreeMap::new();
		m1.insert(a, vec![Scalar::from_u64(1)]);
		let mut m2 = BTreeMap::new();
		m2.insert(a, vec![Scalar::from_u64(2)]);
		assert_ne!(hash_distribute_map(&m1), hash_distribute_map(&m2));
	}

	#[test]
	fn publish_hash_is_order_independent_of_insertion() {
		let a = Identity([1u8; 32]);
		let b = Identity([2u8; 32]);
		let mut m1 = BTreeMap::new();
		m1.insert(a, vec![(1u32, Scalar::from_u64(1))]);
		m1.insert(b, vec![(2u32, Scalar::from_u64(2))]);
		let mut m2 = BTreeMap::new();
		m2.insert(b, vec![(2u32, Scalar::from_u64(2))]);
		m2.insert(a, vec![(1u32, Scalar::from_u64(1))]);
		assert_eq!(hash_publish_map(&m1), hash_publish_map(&m2));
	}
}
