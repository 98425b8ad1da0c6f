use crate::crypto::Scalar;

/// Newton divided-difference interpolation evaluated at `x = 0`: the
/// constant term of the unique polynomial through `points`. `points` must
/// have at least `threshold` distinct abscissas; only the first `threshold`
/// are used.
///
/// Builds the divided-difference table in place (descending index order so
/// each entry only reads values not yet overwritten this pass), then
/// evaluates the resulting Newton form at zero via nested multiplication.
pub fn reconstruct_secret(points: &[(u32, Scalar)]) -> Scalar {
	let n = points.len();
	let xs: Vec<Scalar> = points.iter().map(|(x, _)| Scalar::from_u64(*x as u64)).collect();
	let mut coef: Vec<Scalar> = points.iter().map(|(_, y)| *y).collect();

	for j in 1..n {
		for i in (j..n).rev() {
			let denom = xs[i] - xs[i - j];
			coef[i] = (coef[i] - coef[i - 1]) * denom.invert();
		}
	}

	let mut secret = *coef.last().unwrap_or(&Scalar::zero());
	for k in (0..n.saturating_sub(1)).rev() {
		secret = secret * (-xs[k]) + coef[k];
	}
	secret
}

/// Lagrange interpolation at `x = 0`, used only as a test cross-check
/// against [`reconstruct_secret`]'s Newton form — never called from
/// production code.
#[cfg(test)]
fn reconstruct_secret_lagrange(points: &[(u32, Scalar)]) -> Scalar {
	let mut secret = Scalar::zero();
	for (i, (x_i, y_i)) in points.iter().enumerate() {
		let mut numerator = Scalar::from_u64(1);
		let mut denominator = Scalar::from_u64(1);
		for (j, (x_j, _)) in points.iter().enumerate() {
			if i == j {
				continue;
			}
			// 0 - x_j
			numerator = numerator * (-Scalar::from_u64(*x_j as u64));
			// x_i - x_j
			denominator = denominator * (Scalar::from_u64(*x_i as u64) - Scalar::from_u64(*x_j as u64));
		}
		secret = secret + *y_i * numerator * denominator.invert();
	}
	secret
}
