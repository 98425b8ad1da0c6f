use std::collections::{BTreeSet, VecDeque};

use pvss_multisig::Identity;

use crate::clock::Tick;
use crate::wire::BlockHash;

struct AnchorEntry {
	anchor: BlockHash,
	height: u64,
	enrolled_list: Vec<Identity>,
	distribute_have: BTreeSet<Identity>,
	publish_have: BTreeSet<Identity>,
	publish_release_time: Option<Tick>,
}

/// The gossip side's bounded view of recent anchors: which delegates are
/// enrolled at each, and which of their distribute/publish shares have
/// been locally observed. Drives the have/need bitmaps advertised in
/// bulletins. Kept in lock-step with the consensus driver's own window via
/// `primary_update`, but never stores share payloads itself — only
/// presence.
///
/// New anchors are pushed to the back; `back()` is therefore the newest
/// anchor and the one publish installation is checked against.
pub struct ChainView {
	max_len: usize,
	entries: VecDeque<AnchorEntry>,
}

impl ChainView {
	pub fn new(max_len: usize) -> Self {
		ChainView { max_len, entries: VecDeque::new() }
	}

	/// Rules 1-3: clears the deque if the caller's view has rewound behind
	/// the current tail, then appends one entry per incoming block,
	/// trimming from the front to stay within `max_len`.
	pub fn primary_update(&mut self, start_height: u64, blocks: &[(u64, BlockHash, std::collections::BTreeMap<Identity, u32>)]) {
		if let Some(front) = self.entries.front() {
			if start_height < front.height {
				self.entries.clear();
			}
		}
		for (height, anchor, weights) in blocks {
			let mut enrolled_list: Vec<Identity> = weights.keys().copied().collect();
			enrolled_list.sort();
			self.entries.push_back(AnchorEntry {
				anchor: *anchor,
				height: *height,
				enrolled_list,
				distribute_have: BTreeSet::new(),
				publish_have: BTreeSet::new(),
				publish_release_time: None,
			});
			while self.entries.len() > self.max_len {
				self.entries.pop_front();
			}
		}
	}

	fn find_mut(&mut self, anchor: &BlockHash) -> Option<&mut AnchorEntry> {
		self.entries.iter_mut().find(|e| &e.anchor == anchor)
	}

	fn find(&self, anchor: &BlockHash) -> Option<&AnchorEntry> {
		self.entries.iter().find(|e| &e.anchor == anchor)
	}

	pub fn is_out_of_range(&self, anchor: &BlockHash) -> bool {
		self.find(anchor).is_none()
	}

	/// Whether this node already holds `ident`'s data of `kind` at
	/// `anchor`. Used to avoid scheduling a fetch for data already on
	/// hand when recording a peer's bulletin.
	pub fn has(&self, anchor: &BlockHash, kind: crate::wire::ItemKind, ident: &Identity) -> bool {
		match self.find(anchor) {
			Some(e) => match kind {
				crate::wire::ItemKind::Distribute => e.distribute_have.contains(ident),
				crate::wire::ItemKind::Publish => e.publish_have.contains(ident),
			},
			None => false,
		}
	}

	/// Records that we now hold `ident`'s distribute share for `anchor`.
	/// Returns `false` if `anchor` is out of range.
	pub fn record_distribute(&mut self, anchor: &BlockHash, ident: Identity) -> bool {
		match self.find_mut(anchor) {
			Some(entry) => {
				entry.distribute_have.insert(ident);
				true
			}
			None => false,
		}
	}

	/// Rule 5: installs the publish map in bulk, gated on the deque being
	/// full and `publish_anchor` matching the newest (back) entry. A
	/// no-op (returns `false`) otherwise, matching the "only when" wording
	/// exactly rather than partially applying.
	pub fn install_publish(&mut self, publish_anchor: BlockHash, publish_idents: &BTreeSet<Identity>, release_time: Tick) -> bool {
		if self.entries.len() != self.max_len {
			return false;
		}
		let Some(back) = self.entries.back_mut() else { return false };
		if back.anchor != publish_anchor {
			return false;
		}
		back.publish_have = publish_idents.clone();
		back.publish_release_time = Some(release_time);
		true
	}

	fn bitmap(enrolled_list: &[Identity], have: &BTreeSet<Identity>) -> u64 {
		let mut bm = 0u64;
		for (i, ident) in enrolled_list.iter().enumerate().take(64) {
			if have.contains(ident) {
				bm |= 1 << i;
			}
		}
		bm
	}

	pub fn distribute_bitmap(&self, anchor: &BlockHash) -> u64 {
		self.find(anchor).map(|e| Self::bitmap(&e.enrolled_list, &e.distribute_have)).unwrap_or(0)
	}

	/// Returns 0 before `publish_release_time`: publish timing must not
	/// leak a peer's collection latency.
	pub fn publish_bitmap(&self, anchor: &BlockHash, now: Tick) -> u64 {
		match self.find(anchor) {
			Some(e) => match e.publish_release_time {
				Some(release) if now >= release => Self::bitmap(&e.enrolled_list, &e.publish_have),
				_ => 0,
			},
			None => 0,
		}
	}

	pub fn back_anchor(&self) -> Option<BlockHash> {
		self.entries.back().map(|e| e.anchor)
	}

	/// Every in-range anchor other than the current back, paired with its
	/// distribute bitmap, for the bulletin's `extra` field. Only anchors
	/// with a non-zero bitmap are worth advertising.
	pub fn extra_distribute_bitmaps(&self) -> Vec<(BlockHash, u64)> {
		let back = self.back_anchor();
		self.entries
			.iter()
			.filter(|e| Some(e.anchor) != back)
			.map(|e| (e.anchor, Self::bitmap(&e.enrolled_list, &e.distribute_have)))
			.filter(|(_, bm)| *bm != 0)
			.collect()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::BTreeMap;

	fn idents(n: u8) -> Vec<Identity> {
		(0..n).map(|i| Identity([i + 1; 32])).collect()
	}

	#[test]
	fn trims_to_max_len_and_clears_on_rewind() {
		let mut view = ChainView::new(2);
		let is = idents(2);
		let weights: BTreeMap<Identity, u32> = is.iter().map(|i| (*i, 1)).collect();
		view.primary_update(1, &[(1, [1u8; 32], weights.clone()), (2, [2u8; 32], weights.clone()), (3, [3u8; 32], weights.clone())]);
		assert_eq!(view.len(), 2);
		assert_eq!(view.back_anchor(), Some([3u8; 32]));

		view.primary_update(0, &[(1, [9u8; 32], weights)]);
		assert_eq!(view.len(), 1);
		assert_eq!(view.back_anchor(), Some([9u8; 32]));
	}

	#[test]
	fn distribute_bitmap_reflects_recorded_shares() {
		let mut view = ChainView::new(3);
		let is = idents(3);
		let weights: BTreeMap<Identity, u32> = is.iter().map(|i| (*i, 1)).collect();
		view.primary_update(1, &[(1, [1u8; 32], weights)]);

		assert_eq!(view.distribute_bitmap(&[1u8; 32]), 0);
		view.record_distribute(&[1u8; 32], is[1]);
		assert_eq!(view.distribute_bitmap(&[1u8; 32]), 0b010);
	}

	#[test]
	fn publish_bitmap_gated_on_full_deque_matching_back_and_release_time() {
		let mut view = ChainView::new(2);
		let is = idents(2);
		let weights: BTreeMap<Identity, u32> = is.iter().map(|i| (*i, 1)).collect();
		view.primary_update(1, &[(1, [1u8; 32], weights.clone()), (2, [2u8; 32], weights)]);

		let publish_have: BTreeSet<Identity> = is.iter().copied().collect();
		assert!(view.install_publish([2u8; 32], &publish_have, 100));
		assert_eq!(view.publish_bitmap(&[2u8; 32], 50), 0);
		assert_eq!(view.publish_bitmap(&[2u8; 32], 100), 0b11);
	}

	#[test]
	fn publish_install_rejected_when_anchor_is_not_the_back() {
		let mut view = ChainView::new(2);
		let is = idents(1);
		let weights: BTreeMap<Identity, u32> = is.iter().map(|i| (*i, 1)).collect();
		view.primary_update(1, &[(1, [1u8; 32], weights.clone()), (2, [2u8; 32], weights)]);

		let publish_have: BTreeSet<Identity> = is.iter().copied().collect();
		assert!(!view.install_publish([1u8; 32], &publish_have, 10));
	}
}
