//! Precomputed natural-power table used to accelerate polynomial evaluation
//! at small indices: `x` ranges over `1..=50` (delegate indices are always
//! within this range for `MAX_DELEGATE_THRESH = 23` and realistic
//! committee sizes) and the power `i` over `1..=25`.

use std::sync::OnceLock;

use super::scalar::Scalar;

pub const MAX_TABLE_X: u64 = 50;
pub const MAX_TABLE_POWER: u32 = 25;

struct NaturalPowTable {
	// table[x - 1][i - 1] == x^i
	table: Vec<Vec<Scalar>>,
}

impl NaturalPowTable {
	fn build() -> Self {
		let mut table = Vec::with_capacity(MAX_TABLE_X as usize);
		for x in 1..=MAX_TABLE_X {
			let mut row = Vec::with_capacity(MAX_TABLE_POWER as usize);
			let mut acc = Scalar::from_u64(1);
			let base = Scalar::from_u64(x);
			for _ in 1..=MAX_TABLE_POWER {
				acc = acc * base;
				row.push(acc);
			}
			table.push(row);
		}
		NaturalPowTable { table }
	}

	fn get(&self, x: u64, power: u32) -> Option<Scalar> {
		if x == 0 || x > MAX_TABLE_X || power == 0 || power > MAX_TABLE_POWER {
			return None;
		}
		Some(self.table[(x - 1) as usize][(power - 1) as usize])
	}
}

static TABLE: OnceLock<NaturalPowTable> = OnceLock::new();

/// Returns `x^power` as a scalar, using the precomputed table when `x` and
/// `power` are within its bounds and falling back to repeated
/// multiplication otherwise.
pub fn natural_pow(x: u64, power: u32) -> Scalar {
	if power == 0 {
		return Scalar::from_u64(1);
	}
	let table = TABLE.get_or_init(NaturalPowTable::build);
	table.get(x, power).unwrap_or_else(|| Scalar::pow(x, power))
}
