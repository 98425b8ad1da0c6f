use curve25519_dalek::scalar::Scalar as DalekScalar;
use serde::{Deserialize, Serialize};

use super::helpers::derive_scalar_impls;

/// An element of the Ed25519 scalar field (integers mod the group order
/// `ell`). All reduction happens on construction; every operation past that
/// point stays inside the field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scalar(pub(crate) DalekScalar);

derive_scalar_impls!(Scalar, DalekScalar);

impl Scalar {
	pub fn zero() -> Self {
		Scalar(DalekScalar::ZERO)
	}

	pub fn is_zero(&self) -> bool {
		self.0 == DalekScalar::ZERO
	}

	/// Reduces an arbitrary 32-byte string into the field. Used for sampling
	/// and for unpacking share/commitment bytes off the wire.
	pub fn from_bytes_mod_order(bytes: [u8; 32]) -> Self {
		Scalar(DalekScalar::from_bytes_mod_order(bytes))
	}

	pub fn to_bytes(self) -> [u8; 32] {
		self.0.to_bytes()
	}

	/// Uniform sample in `[0, ell)`, as used by `PvssBox::Setup` for the
	/// owner's private key and polynomial coefficients.
	pub fn random<R: rand::RngCore + rand::CryptoRng>(rng: &mut R) -> Self {
		Scalar(DalekScalar::random(rng))
	}

	/// `x^power` evaluated in the field, used when the natural-power table
	/// doesn't cover the requested `(x, power)` pair.
	pub fn pow(x: u64, power: u32) -> Self {
		let mut acc = DalekScalar::ONE;
		let base = DalekScalar::from(x);
		for _ in 0..power {
			acc *= base;
		}
		Scalar(acc)
	}

	pub fn from_u64(v: u64) -> Self {
		Scalar(DalekScalar::from(v))
	}

	/// Multiplicative inverse mod `ell`. Used by Lagrange/Newton
	/// interpolation's denominators; panics on zero, which callers must
	/// never construct (interpolation abscissas are always distinct).
	pub fn invert(self) -> Self {
		Scalar(self.0.invert())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn zero_is_additive_identity() {
		let s = Scalar::from_u64(42);
		assert_eq!(s + Scalar::zero(), s);
	}

	#[test]
	fn round_trip_bytes() {
		let s = Scalar::from_u64(7);
		let bytes = s.to_bytes();
		assert_eq!(Scalar::from_bytes_mod_order(bytes), s);
	}

	#[test]
	fn pow_matches_repeated_mul() {
		let x = 5u64;
		let direct = Scalar::from_u64(x) * Scalar::from_u64(x) * Scalar::from_u64(x);
		assert_eq!(Scalar::pow(x, 3), direct);
	}
}
