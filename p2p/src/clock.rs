use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A monotonic, second-precision instant since an arbitrary epoch. Kept as
/// a plain integer rather than `std::time::Instant` so it can cross an
/// `Arc<dyn Clock>` boundary and be asserted against in tests.
pub type Tick = u64;

/// Injectable clock so `publishReleaseTime` logic can be driven under
/// virtual time in tests instead of real wall-clock time.
pub trait Clock: Send + Sync {
	fn now(&self) -> Tick;
}

/// The real wall clock, seconds since the Unix epoch.
#[derive(Default)]
pub struct SystemClock;

impl Clock for SystemClock {
	fn now(&self) -> Tick {
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_secs()
	}
}

/// A manually-advanced clock for tests.
pub struct VirtualClock {
	now: std::sync::atomic::AtomicU64,
}

impl VirtualClock {
	pub fn new(start: Tick) -> Self {
		VirtualClock { now: std::sync::atomic::AtomicU64::new(start) }
	}

	pub fn advance(&self, delta: u64) {
		self.now.fetch_add(delta, std::sync::atomic::Ordering::SeqCst);
	}
}

impl Clock for VirtualClock {
	fn now(&self) -> Tick {
		self.now.load(std::sync::atomic::Ordering::SeqCst)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn virtual_clock_advances_on_demand() {
		let clock = VirtualClock::new(100);
		assert_eq!(clock.now(), 100);
		clock.advance(5);
		assert_eq!(clock.now(), 105);
	}
}
