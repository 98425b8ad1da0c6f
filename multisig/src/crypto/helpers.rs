// Copyright 2025 Chainflip Labs GmbH
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

/// Forwards the standard arithmetic operator traits to a newtype wrapping an
/// inner field/group element, and makes the type zeroize itself on drop.
macro_rules! derive_scalar_impls {
	($name:ident, $inner:ty) => {
		impl Default for $name {
			fn default() -> Self {
				$name(<$inner>::from(0u64))
			}
		}

		impl Drop for $name {
			fn drop(&mut self) {
				self.0 = <$inner>::from(0u64);
			}
		}

		impl zeroize::DefaultIsZeroes for $name {}

		impl std::ops::Add for $name {
			type Output = $name;
			fn add(self, rhs: $name) -> $name {
				$name(self.0 + rhs.0)
			}
		}

		impl std::ops::Add<&$name> for &$name {
			type Output = $name;
			fn add(self, rhs: &$name) -> $name {
				$name(self.0 + rhs.0)
			}
		}

		impl std::ops::Sub for $name {
			type Output = $name;
			fn sub(self, rhs: $name) -> $name {
				$name(self.0 - rhs.0)
			}
		}

		impl std::ops::Neg for $name {
			type Output = $name;
			fn neg(self) -> $name {
				$name(-self.0)
			}
		}

		impl std::ops::Mul for $name {
			type Output = $name;
			fn mul(self, rhs: $name) -> $name {
				$name(self.0 * rhs.0)
			}
		}

		impl std::ops::Mul<&$name> for &$name {
			type Output = $name;
			fn mul(self, rhs: &$name) -> $name {
				$name(self.0 * rhs.0)
			}
		}

		impl std::iter::Sum for $name {
			fn sum<I: Iterator<Item = $name>>(iter: I) -> Self {
				iter.fold($name::default(), |acc, x| acc + x)
			}
		}
	};
}

/// Forwards +/- and scalar-multiplication to a newtype wrapping a curve
/// point, and gives it a `Default` that is the point at infinity rather
/// than zero (there is no meaningful "zero point" other than identity).
macro_rules! derive_point_impls {
	($name:ident, $scalar:ty, $inner:ty) => {
		impl Default for $name {
			fn default() -> Self {
				Self::identity()
			}
		}

		impl zeroize::DefaultIsZeroes for $name {}

		impl std::ops::Add for $name {
			type Output = $name;
			fn add(self, rhs: $name) -> $name {
				$name(self.0 + rhs.0)
			}
		}

		impl std::ops::Sub for $name {
			type Output = $name;
			fn sub(self, rhs: $name) -> $name {
				$name(self.0 - rhs.0)
			}
		}

		impl std::ops::Mul<$scalar> for $name {
			type Output = $name;
			fn mul(self, rhs: $scalar) -> $name {
				$name(self.0 * rhs.0)
			}
		}

		impl std::ops::Mul<&$scalar> for &$name {
			type Output = $name;
			fn mul(self, rhs: &$scalar) -> $name {
				$name(self.0 * rhs.0)
			}
		}

		impl std::iter::Sum for $name {
			fn sum<I: Iterator<Item = $name>>(iter: I) -> Self {
				iter.fold($name::identity(), |acc, x| acc + x)
			}
		}
	};
}

pub(crate) use derive_point_impls;
pub(crate) use derive_scalar_impls;
