//! Fork-join worker pool for the three CPU-bound, embarrassingly-parallel
//! operations of this crate: candidate verification during `enroll`,
//! polynomial evaluation during `distribute`, and interpolation during
//! `reconstruct`. Built on `rayon`'s global thread pool.

use rayon::prelude::*;

/// Applies `f` to every item of `items` and collects the results, run
/// across the global rayon thread pool.
pub fn transform<T, R, F>(items: &[T], f: F) -> Vec<R>
where
	T: Sync,
	R: Send,
	F: Fn(&T) -> R + Sync,
{
	items.par_iter().map(|item| f(item)).collect()
}

/// Applies `f` to every item of `items` for side effects only.
pub fn execute<T, F>(items: &[T], f: F)
where
	T: Sync,
	F: Fn(&T) + Sync,
{
	items.par_iter().for_each(|item| f(item));
}

/// Applies the fallible predicate `f` to every item, short-circuiting and
/// returning `false` as soon as one item fails. Used by
/// `SecretShare::collect` to verify every `(identity, share)` pair in a
/// publish frame.
pub fn execute_until<T, F>(items: &[T], f: F) -> bool
where
	T: Sync,
	F: Fn(&T) -> bool + Sync,
{
	items.par_iter().all(|item| f(item))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transform_preserves_order() {
		let items = vec![1, 2, 3, 4];
		let doubled = transform(&items, |x| x * 2);
		assert_eq!(doubled, vec![2, 4, 6, 8]);
	}

	#[test]
	fn execute_until_short_circuits_on_failure() {
		let items = vec![1, 2, 0, 4];
		assert!(!execute_until(&items, |x| *x != 0));
	}

	#[test]
	fn execute_until_true_when_all_pass() {
		let items = vec![1, 2, 3];
		assert!(execute_until(&items, |x| *x > 0));
	}
}
