use std::collections::{BTreeMap, BTreeSet};

use pvss_multisig::Identity;

use crate::wire::{BlockHash, ItemKind};

pub type PeerNonce = u64;

/// One unit of fetchable inventory: a delegate's distribute or publish
/// data at a specific anchor.
pub type Item = (BlockHash, ItemKind, Identity);

/// Tracks which connected peers are known to hold which inventory items
/// and assigns at most one fetch per item to the least-loaded holder.
#[derive(Default)]
pub struct PeerScheduler {
	peers: BTreeSet<PeerNonce>,
	known: BTreeMap<Item, BTreeSet<PeerNonce>>,
	assigned: BTreeMap<Item, PeerNonce>,
	outstanding: BTreeMap<PeerNonce, usize>,
}

impl PeerScheduler {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add_peer(&mut self, nonce: PeerNonce) {
		self.peers.insert(nonce);
		self.outstanding.entry(nonce).or_insert(0);
	}

	/// Drops the peer and frees every item it was assigned, so the next
	/// `schedule` call can reassign them to a different holder.
	pub fn remove_peer(&mut self, nonce: PeerNonce) {
		self.peers.remove(&nonce);
		self.outstanding.remove(&nonce);
		self.assigned.retain(|_, assignee| *assignee != nonce);
		for holders in self.known.values_mut() {
			holders.remove(&nonce);
		}
	}

	/// Called once per `1` bit in an incoming bulletin, resolved against
	/// the known enrolled list.
	pub fn record_known(&mut self, nonce: PeerNonce, item: Item) {
		if self.peers.contains(&nonce) {
			self.known.entry(item).or_default().insert(nonce);
		}
	}

	/// Called once an item has been fetched, successfully or with an
	/// empty body, so it is dropped from the outstanding-assignment
	/// count and can never be double-counted against its assignee.
	pub fn remove_known(&mut self, item: &Item) {
		self.known.remove(item);
		if let Some(assignee) = self.assigned.remove(item) {
			if let Some(count) = self.outstanding.get_mut(&assignee) {
				*count = count.saturating_sub(1);
			}
		}
	}

	/// Assigns every unassigned, filter-passing item to the holder with
	/// the fewest outstanding assignments, ties broken by nonce. Returns
	/// the newly-made assignments only.
	pub fn schedule(&mut self, filter: impl Fn(&Item) -> bool) -> Vec<(PeerNonce, Item)> {
		let pending: Vec<Item> = self
			.known
			.keys()
			.filter(|item| !self.assigned.contains_key(*item) && filter(item))
			.cloned()
			.collect();

		let mut out = Vec::new();
		for item in pending {
			let holders = &self.known[&item];
			let best = holders
				.iter()
				.min_by_key(|nonce| (self.outstanding.get(nonce).copied().unwrap_or(0), **nonce))
				.copied();
			if let Some(nonce) = best {
				self.assigned.insert(item.clone(), nonce);
				*self.outstanding.entry(nonce).or_insert(0) += 1;
				out.push((nonce, item));
			}
		}
		out
	}

	/// Fast-path lookup used by inbound-data validation to reject
	/// unsolicited shares (`sender != GetAssignedPeer(item)`).
	pub fn get_assigned_peer(&self, item: &Item) -> Option<PeerNonce> {
		self.assigned.get(item).copied()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(n: u8) -> Item {
		([n; 32], ItemKind::Distribute, Identity([n; 32]))
	}

	#[test]
	fn assigns_to_least_loaded_holder_breaking_ties_by_nonce() {
		let mut sched = PeerScheduler::new();
		sched.add_peer(2);
		sched.add_peer(1);
		sched.record_known(2, item(1));
		sched.record_known(1, item(1));

		let assignments = sched.schedule(|_| true);
		assert_eq!(assignments, vec![(1, item(1))]);
		assert_eq!(sched.get_assigned_peer(&item(1)), Some(1));
	}

	#[test]
	fn removing_peer_frees_its_assignments_for_reschedule() {
		let mut sched = PeerScheduler::new();
		sched.add_peer(1);
		sched.record_known(1, item(1));
		sched.schedule(|_| true);
		assert_eq!(sched.get_assigned_peer(&item(1)), Some(1));

		sched.remove_peer(1);
		assert_eq!(sched.get_assigned_peer(&item(1)), None);
		assert!(sched.schedule(|_| true).is_empty());
	}

	#[test]
	fn filter_excludes_out_of_range_anchors() {
		let mut sched = PeerScheduler::new();
		sched.add_peer(1);
		sched.record_known(1, item(7));
		let assignments = sched.schedule(|_| false);
		assert!(assignments.is_empty());
		assert_eq!(sched.get_assigned_peer(&item(7)), None);
	}

	#[test]
	fn remove_known_clears_outstanding_count() {
		let mut sched = PeerScheduler::new();
		sched.add_peer(1);
		sched.record_known(1, item(1));
		sched.schedule(|_| true);
		assert_eq!(sched.get_assigned_peer(&item(1)), Some(1));

		sched.remove_known(&item(1));

		sched.add_peer(2);
		sched.record_known(1, item(3));
		sched.record_known(2, item(3));
		let assignments = sched.schedule(|_| true);
		// peer 1's earlier assignment was cleared, so both holders are now
		// equally loaded (0 outstanding); the tie breaks to the lower nonce.
		assert_eq!(assignments, vec![(1, item(3))]);
	}
}
