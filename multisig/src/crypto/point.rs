use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::{CompressedEdwardsY, EdwardsPoint};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::helpers::derive_point_impls;
use super::scalar::Scalar;
use crate::error::PvssError;

/// A valid point on the Ed25519 curve. `point_unpack` rejects invalid
/// encodings and the identity element, since PVSS commitments and public
/// keys must never be identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point(pub(crate) EdwardsPoint);

derive_point_impls!(Point, Scalar, EdwardsPoint);

impl Point {
	pub fn identity() -> Self {
		Point(EdwardsPoint::default())
	}

	pub fn is_identity(&self) -> bool {
		self.0 == EdwardsPoint::default()
	}

	/// `scalar * B`, the base-point multiplication used for public keys and
	/// commitment coefficients.
	pub fn base_mul(scalar: &Scalar) -> Self {
		Point(ED25519_BASEPOINT_POINT * scalar.0)
	}

	pub fn to_bytes(self) -> [u8; 32] {
		self.0.compress().to_bytes()
	}

	/// Decompresses a point, rejecting malformed encodings and the identity
	/// element: an enrollment whose public key or commitment is identity is
	/// always invalid.
	pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, PvssError> {
		let compressed = CompressedEdwardsY(*bytes);
		let point = compressed
			.decompress()
			.ok_or(PvssError::InvalidEncoding)?;
		let point = Point(point);
		if point.is_identity() {
			return Err(PvssError::InvalidEncoding);
		}
		Ok(point)
	}
}

impl Serialize for Point {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_bytes(&self.to_bytes())
	}
}

impl<'de> Deserialize<'de> for Point {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
		let array: [u8; 32] = bytes
			.try_into()
			.map_err(|_| serde::de::Error::custom("point must be 32 bytes"))?;
		Point::from_bytes(&array).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn identity_is_rejected_on_unpack() {
		let identity_bytes = Point::identity().to_bytes();
		assert!(Point::from_bytes(&identity_bytes).is_err());
	}

	#[test]
	fn round_trip_pack_unpack() {
		let p = Point::base_mul(&Scalar::from_u64(9));
		let bytes = p.to_bytes();
		assert_eq!(Point::from_bytes(&bytes).unwrap(), p);
	}

	#[test]
	fn base_mul_is_additive() {
		let a = Scalar::from_u64(3);
		let b = Scalar::from_u64(4);
        let lhs = Point::base_mul(&(a + b));
        let rhs = Point::base_mul(&a) + Point::base_mul(&b);
        assert_eq!(lhs, rhs);
	}
}
