use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use async_trait::async_trait;
use pvss_consensus::ConsensusError;
use pvss_multisig::{hash_distribute_map, hash_publish_map, Agreement, CollectedEnvelope, Identity, Scalar};
use tracing::{debug, info, warn};

use crate::chain_view::ChainView;
use crate::clock::{Clock, Tick};
use crate::error::GossipError;
use crate::scheduler::{Item, PeerNonce, PeerScheduler};
use crate::wire::{BlockHash, BulletinFrame, DataFrame, DataPayload, FrameType, GetFrame, ItemKind};

/// One-way capability handle into the consensus task, per the
/// cyclic-ownership resolution: `GossipDriver` never touches
/// `ConsensusDriver`'s `Evolve`/window-mutation surface, only this narrow,
/// thread-safe read/forward surface.
pub trait ConsensusHandle: Send + Sync {
	fn handle_distribute(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: &BTreeMap<Identity, Vec<Scalar>>,
	) -> Result<(), ConsensusError>;

	fn handle_publish(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
	) -> Result<bool, ConsensusError>;

	fn get_agreement(&self, target_h: u64) -> Option<Agreement>;

	fn get_proof(&self, target_h: u64) -> Option<Vec<CollectedEnvelope>>;

	fn verify_signature(
		&self,
		anchor: &BlockHash,
		ident: &Identity,
		message: &[u8],
		r: &pvss_multisig::crypto::Point,
		s: &Scalar,
	) -> bool;
}

impl ConsensusHandle for std::sync::Arc<Mutex<pvss_consensus::ConsensusDriver>> {
	fn handle_distribute(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: &BTreeMap<Identity, Vec<Scalar>>,
	) -> Result<(), ConsensusError> {
		self.lock().expect("poisoned mutex").handle_distribute(anchor, from, share_map)
	}

	fn handle_publish(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
	) -> Result<bool, ConsensusError> {
		self.lock().expect("poisoned mutex").handle_publish(anchor, from, share_map)
	}

	fn get_agreement(&self, target_h: u64) -> Option<Agreement> {
		self.lock().expect("poisoned mutex").get_agreement(target_h)
	}

	fn get_proof(&self, target_h: u64) -> Option<Vec<CollectedEnvelope>> {
		self.lock().expect("poisoned mutex").get_proof(target_h)
	}

	fn verify_signature(
		&self,
		anchor: &BlockHash,
		ident: &Identity,
		message: &[u8],
		r: &pvss_multisig::crypto::Point,
		s: &Scalar,
	) -> bool {
		self.lock().expect("poisoned mutex").verify_signature(anchor, ident, message, r, s)
	}
}

impl ConsensusHandle for Mutex<pvss_consensus::ConsensusDriver> {
	fn handle_distribute(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: &BTreeMap<Identity, Vec<Scalar>>,
	) -> Result<(), ConsensusError> {
		self.lock().expect("poisoned mutex").handle_distribute(anchor, from, share_map)
	}

	fn handle_publish(
		&self,
		anchor: &BlockHash,
		from: Identity,
		share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
	) -> Result<bool, ConsensusError> {
		self.lock().expect("poisoned mutex").handle_publish(anchor, from, share_map)
	}

	fn get_agreement(&self, target_h: u64) -> Option<Agreement> {
		self.lock().expect("poisoned mutex").get_agreement(target_h)
	}

	fn get_proof(&self, target_h: u64) -> Option<Vec<CollectedEnvelope>> {
		self.lock().expect("poisoned mutex").get_proof(target_h)
	}

	fn verify_signature(
		&self,
		anchor: &BlockHash,
		ident: &Identity,
		message: &[u8],
		r: &pvss_multisig::crypto::Point,
		s: &Scalar,
	) -> bool {
		self.lock().expect("poisoned mutex").verify_signature(anchor, ident, message, r, s)
	}
}

/// The network-send half of the boundary: wire frames out, peer roster
/// queries, and misbehaviour reporting. Implemented by the host's
/// connection manager; `GossipDriver` never opens a socket itself.
#[async_trait]
pub trait PeerNet: Send + Sync {
	async fn send_bulletin(&self, nonce: PeerNonce, frame: &BulletinFrame);
	async fn send_get(&self, nonce: PeerNonce, frame: &GetFrame);
	async fn send_data(&self, nonce: PeerNonce, frame: &DataFrame);
	async fn report_misbehaviour(&self, nonce: PeerNonce, reason: &'static str);
	fn connected_peers(&self) -> Vec<PeerNonce>;
	/// Whether `nonce` is already known to have at least one bit of
	/// `bitmap` for `anchor`, to suppress a redundant bulletin.
	fn peer_knows_any(&self, nonce: PeerNonce, anchor: &BlockHash, bitmap: u64) -> bool;
}

/// A single resolved local copy of a delegate's distribute or publish
/// payload, as stored by the consensus side and handed to `GossipDriver`
/// for `GetDelegated` responses.
pub enum LocalPayload {
	Distribute { share_map: BTreeMap<Identity, Vec<Scalar>>, r: pvss_multisig::crypto::Point, s: Scalar },
	Publish { share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>, r: pvss_multisig::crypto::Point, s: Scalar },
}

/// Supplies the locally-held payload bytes for a `GetDelegated` request.
/// Kept separate from `ConsensusHandle` because it is a pure read with no
/// error surface: an absent entry is a valid "I don't have it" reply.
pub trait LocalStore: Send + Sync {
	fn lookup(&self, anchor: &BlockHash, kind: ItemKind, delegate_id: &Identity) -> Option<LocalPayload>;
}

/// Drives the gossip/bulletin data plane: chain-view bookkeeping, peer
/// scheduling, and translation between wire frames and the consensus
/// handle.
pub struct GossipDriver {
	chain_view: Mutex<ChainView>,
	scheduler: Mutex<PeerScheduler>,
	consensus: Box<dyn ConsensusHandle>,
	local_store: Box<dyn LocalStore>,
	net: Box<dyn PeerNet>,
	clock: Box<dyn Clock>,
}

impl GossipDriver {
	pub fn new(
		max_len: usize,
		consensus: Box<dyn ConsensusHandle>,
		local_store: Box<dyn LocalStore>,
		net: Box<dyn PeerNet>,
		clock: Box<dyn Clock>,
	) -> Self {
		GossipDriver {
			chain_view: Mutex::new(ChainView::new(max_len)),
			scheduler: Mutex::new(PeerScheduler::new()),
			consensus,
			local_store,
			net,
			clock,
		}
	}

	pub fn on_peer_active(&self, nonce: PeerNonce, serves_delegated: bool) {
		if serves_delegated {
			self.scheduler.lock().expect("poisoned mutex").add_peer(nonce);
		}
	}

	pub fn on_peer_deactive(&self, nonce: PeerNonce) {
		self.scheduler.lock().expect("poisoned mutex").remove_peer(nonce);
	}

	/// `PrimaryUpdate`'s chain-view half, called in lock-step with the
	/// consensus driver's `Evolve`.
	pub fn primary_update(&self, start_height: u64, blocks: &[(u64, BlockHash, BTreeMap<Identity, u32>)]) {
		self.chain_view.lock().expect("poisoned mutex").primary_update(start_height, blocks);
	}

	/// Marks `ident`'s distribute share as already held at `anchor`,
	/// without going through `on_data_frame` — used for shares this node
	/// produced itself rather than received from a peer.
	pub fn record_self_distribute(&self, anchor: &BlockHash, ident: Identity) {
		self.chain_view.lock().expect("poisoned mutex").record_distribute(anchor, ident);
	}

	pub fn install_publish(&self, anchor: BlockHash, publish_idents: BTreeSet<Identity>, release_tick: Tick) {
		let installed = self.chain_view.lock().expect("poisoned mutex").install_publish(anchor, &publish_idents, release_tick);
		if installed {
			info!(?anchor, release_tick, "publish map installed, scheduling release bulletin");
		}
	}

	/// Records every `1` bit of an inbound bulletin as known inventory —
	/// skipping any bit for data we already hold locally, so fetches are
	/// never scheduled for items already on hand — then schedules new
	/// fetches. `anchor`/`extra` are resolved against the chain-view's own
	/// enrolled lists by the caller before this is invoked (kept out of
	/// this crate's responsibility per the `BlockChain` boundary).
	pub async fn on_bulletin(&self, from: PeerNonce, frame: BulletinFrame, enrolled: &[(BlockHash, Vec<Identity>)]) {
		let mut sched = self.scheduler.lock().expect("poisoned mutex");
		let chain_view = self.chain_view.lock().expect("poisoned mutex");
		record_known_from_bulletin(&mut sched, &chain_view, from, frame.anchor, frame.bm_distribute, ItemKind::Distribute, enrolled);
		record_known_from_bulletin(&mut sched, &chain_view, from, frame.anchor, frame.bm_publish, ItemKind::Publish, enrolled);
		for (anchor, bm) in &frame.extra {
			record_known_from_bulletin(&mut sched, &chain_view, from, *anchor, *bm, ItemKind::Distribute, enrolled);
		}

		let assignments = sched.schedule(|(anchor, _, _)| !chain_view.is_out_of_range(anchor));
		drop(chain_view);
		drop(sched);

		for (nonce, (anchor, kind, delegate_id)) in assignments {
			self.net.send_get(nonce, &GetFrame { anchor, kind, delegate_id }).await;
		}
	}

	pub async fn on_get_delegated(&self, from: PeerNonce, frame: GetFrame) {
		let payload = self.local_store.lookup(&frame.anchor, frame.kind, &frame.delegate_id);
		let frame_type = match frame.kind {
			ItemKind::Distribute => FrameType::Distribute,
			ItemKind::Publish => FrameType::Publish,
		};
		let data_payload = payload.map(|p| match p {
			LocalPayload::Distribute { share_map, r, s } => DataPayload::Distribute { id_from: frame.delegate_id, share_map, r, s },
			LocalPayload::Publish { share_map, r, s } => DataPayload::Publish { id_from: frame.delegate_id, share_map, r, s },
		});
		let reply = DataFrame { frame_type, anchor: frame.anchor, delegate_id: frame.delegate_id, payload: data_payload };
		self.net.send_data(from, &reply).await;
	}

	/// Handles an inbound distribute or publish response: rejects
	/// unsolicited data, drops silently on an out-of-range anchor, else
	/// forwards to the consensus handle and, on success, records the item
	/// and broadcasts a bulletin.
	pub async fn on_data_frame(&self, from: PeerNonce, frame: DataFrame) -> Result<(), GossipError> {
		let item: Item = (frame.anchor, item_kind_of(frame.frame_type), frame.delegate_id);

		{
			let chain_view = self.chain_view.lock().expect("poisoned mutex");
			if chain_view.is_out_of_range(&frame.anchor) {
				debug!(anchor = ?frame.anchor, "dropping data frame for out-of-range anchor");
				return Ok(());
			}
		}

		{
			let sched = self.scheduler.lock().expect("poisoned mutex");
			if sched.get_assigned_peer(&item) != Some(from) {
				self.net.report_misbehaviour(from, "unsolicited distribute/publish data").await;
				return Err(GossipError::Unsolicited);
			}
		}

		let Some(payload) = frame.payload else {
			self.scheduler.lock().expect("poisoned mutex").remove_known(&item);
			return Ok(());
		};

		match payload {
			DataPayload::Distribute { id_from, share_map, r, s } => {
				let message = hash_distribute_map(&share_map);
				if !self.consensus.verify_signature(&frame.anchor, &id_from, &message, &r, &s) {
					self.net.report_misbehaviour(from, "distribute envelope signature verification failed").await;
					return Err(GossipError::Unsolicited);
				}
				self.consensus.handle_distribute(&frame.anchor, id_from, &share_map)?;
				self.chain_view.lock().expect("poisoned mutex").record_distribute(&frame.anchor, frame.delegate_id);
			}
			DataPayload::Publish { id_from, share_map, r, s } => {
				let message = hash_publish_map(&share_map);
				if !self.consensus.verify_signature(&frame.anchor, &id_from, &message, &r, &s) {
					self.net.report_misbehaviour(from, "publish envelope signature verification failed").await;
					return Err(GossipError::Unsolicited);
				}
				let completed = self.consensus.handle_publish(&frame.anchor, id_from, share_map)?;
				debug!(completed, "publish frame forwarded to consensus handle");
			}
		};

		// Freeing this slot may let another pending item be assigned right
		// away rather than waiting for the next inbound bulletin; `forced`
		// reflects whether that reassignment actually found a new holder.
		let assignments = {
			let mut sched = self.scheduler.lock().expect("poisoned mutex");
			let chain_view = self.chain_view.lock().expect("poisoned mutex");
			sched.remove_known(&item);
			sched.schedule(|(anchor, _, _)| !chain_view.is_out_of_range(anchor))
		};
		let forced = assignments.is_empty();
		for (nonce, (anchor, kind, delegate_id)) in assignments {
			self.net.send_get(nonce, &GetFrame { anchor, kind, delegate_id }).await;
		}
		self.push_bulletin(forced).await;
		Ok(())
	}

	/// Broadcasts the primary (back-anchor) bulletin plus any other
	/// in-range anchor with a non-zero distribute bitmap. Skips any peer
	/// already known to hold every bit being advertised, unless `forced`.
	pub async fn push_bulletin(&self, forced: bool) {
		let now = self.clock.now();
		let (anchor, bm_distribute, bm_publish, extra) = {
			let chain_view = self.chain_view.lock().expect("poisoned mutex");
			let Some(anchor) = chain_view.back_anchor() else { return };
			(
				anchor,
				chain_view.distribute_bitmap(&anchor),
				chain_view.publish_bitmap(&anchor, now),
				chain_view.extra_distribute_bitmaps(),
			)
		};
		let frame = BulletinFrame { anchor, bm_distribute, bm_publish, extra };

		for nonce in self.net.connected_peers() {
			if !forced && self.net.peer_knows_any(nonce, &anchor, bm_distribute | bm_publish) {
				continue;
			}
			self.net.send_bulletin(nonce, &frame).await;
		}
	}

	pub fn get_agreement(&self, target_h: u64) -> Option<Agreement> {
		self.consensus.get_agreement(target_h)
	}

	pub fn get_proof(&self, target_h: u64) -> Option<Vec<CollectedEnvelope>> {
		self.consensus.get_proof(target_h)
	}
}

fn item_kind_of(frame_type: FrameType) -> ItemKind {
	match frame_type {
		FrameType::Publish => ItemKind::Publish,
		_ => ItemKind::Distribute,
	}
}

fn record_known_from_bulletin(
	sched: &mut PeerScheduler,
	chain_view: &ChainView,
	from: PeerNonce,
	anchor: BlockHash,
	bitmap: u64,
	kind: ItemKind,
	enrolled: &[(BlockHash, Vec<Identity>)],
) {
	let Some((_, list)) = enrolled.iter().find(|(a, _)| *a == anchor) else {
		warn!(?anchor, "bulletin referenced an anchor with no known enrolled list");
		return;
	};
	for (i, ident) in list.iter().enumerate().take(64) {
		if bitmap & (1 << i) != 0 && !chain_view.has(&anchor, kind, ident) {
			sched.record_known(from, (anchor, kind, *ident));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;

	use pvss_multisig::crypto::Point;

	use crate::clock::VirtualClock;

	#[derive(Default)]
	struct FakeNetState {
		sent_get: Vec<(PeerNonce, GetFrame)>,
		sent_bulletin: Vec<PeerNonce>,
		sent_data: Vec<(PeerNonce, DataFrame)>,
		misbehaviour: Vec<(PeerNonce, &'static str)>,
	}

	struct FakeNet {
		state: Arc<Mutex<FakeNetState>>,
		peers: Vec<PeerNonce>,
		knows_any: bool,
	}

	#[async_trait]
	impl PeerNet for FakeNet {
		async fn send_bulletin(&self, nonce: PeerNonce, _frame: &BulletinFrame) {
			self.state.lock().expect("poisoned mutex").sent_bulletin.push(nonce);
		}
		async fn send_get(&self, nonce: PeerNonce, frame: &GetFrame) {
			self.state.lock().expect("poisoned mutex").sent_get.push((nonce, frame.clone()));
		}
		async fn send_data(&self, nonce: PeerNonce, frame: &DataFrame) {
			self.state.lock().expect("poisoned mutex").sent_data.push((nonce, frame.clone()));
		}
		async fn report_misbehaviour(&self, nonce: PeerNonce, reason: &'static str) {
			self.state.lock().expect("poisoned mutex").misbehaviour.push((nonce, reason));
		}
		fn connected_peers(&self) -> Vec<PeerNonce> {
			self.peers.clone()
		}
		fn peer_knows_any(&self, _nonce: PeerNonce, _anchor: &BlockHash, _bitmap: u64) -> bool {
			self.knows_any
		}
	}

	struct FakeConsensus;

	impl ConsensusHandle for FakeConsensus {
		fn handle_distribute(
			&self,
			_anchor: &BlockHash,
			_from: Identity,
			_share_map: &BTreeMap<Identity, Vec<Scalar>>,
		) -> Result<(), ConsensusError> {
			Ok(())
		}
		fn handle_publish(
			&self,
			_anchor: &BlockHash,
			_from: Identity,
			_share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
		) -> Result<bool, ConsensusError> {
			Ok(true)
		}
		fn get_agreement(&self, _target_h: u64) -> Option<Agreement> {
			None
		}
		fn get_proof(&self, _target_h: u64) -> Option<Vec<CollectedEnvelope>> {
			None
		}
		fn verify_signature(&self, _anchor: &BlockHash, _ident: &Identity, _message: &[u8], _r: &Point, _s: &Scalar) -> bool {
			true
		}
	}

	struct FakeLocalStore {
		has_payload: bool,
	}

	impl LocalStore for FakeLocalStore {
		fn lookup(&self, _anchor: &BlockHash, _kind: ItemKind, _delegate_id: &Identity) -> Option<LocalPayload> {
			self.has_payload.then(|| LocalPayload::Distribute {
				share_map: BTreeMap::new(),
				r: Point::base_mul(&Scalar::from_u64(1)),
				s: Scalar::from_u64(2),
			})
		}
	}

	fn make_driver(peers: Vec<PeerNonce>, has_payload: bool, knows_any: bool) -> (GossipDriver, Arc<Mutex<FakeNetState>>) {
		let state = Arc::new(Mutex::new(FakeNetState::default()));
		let net = FakeNet { state: state.clone(), peers, knows_any };
		let driver = GossipDriver::new(
			8,
			Box::new(FakeConsensus),
			Box::new(FakeLocalStore { has_payload }),
			Box::new(net),
			Box::new(VirtualClock::new(0)),
		);
		(driver, state)
	}

	fn weights(idents: &[Identity]) -> BTreeMap<Identity, u32> {
		idents.iter().map(|i| (*i, 1)).collect()
	}

	#[tokio::test]
	async fn get_delegated_sends_payload_when_local_store_has_it() {
		let (driver, state) = make_driver(vec![5], true, false);
		let frame = GetFrame { anchor: [1u8; 32], kind: ItemKind::Distribute, delegate_id: Identity([2u8; 32]) };
		driver.on_get_delegated(5, frame).await;

		let sent = state.lock().expect("poisoned mutex");
		assert_eq!(sent.sent_data.len(), 1);
		assert!(sent.sent_data[0].1.payload.is_some());
	}

	#[tokio::test]
	async fn get_delegated_sends_empty_reply_when_local_store_is_empty() {
		let (driver, state) = make_driver(vec![5], false, false);
		let frame = GetFrame { anchor: [1u8; 32], kind: ItemKind::Distribute, delegate_id: Identity([2u8; 32]) };
		driver.on_get_delegated(5, frame).await;

		let sent = state.lock().expect("poisoned mutex");
		assert!(sent.sent_data[0].1.payload.is_none());
	}

	#[tokio::test]
	async fn bulletin_schedules_fetch_for_newly_known_item() {
		let (driver, state) = make_driver(vec![1], false, false);
		let anchor = [1u8; 32];
		let id_a = Identity([10u8; 32]);
		driver.primary_update(1, &[(1, anchor, weights(&[id_a]))]);
		driver.on_peer_active(1, true);

		let frame = BulletinFrame { anchor, bm_distribute: 0b1, bm_publish: 0, extra: vec![] };
		driver.on_bulletin(1, frame, &[(anchor, vec![id_a])]).await;

		let sent = state.lock().expect("poisoned mutex");
		assert_eq!(sent.sent_get, vec![(1, GetFrame { anchor, kind: ItemKind::Distribute, delegate_id: id_a })]);
	}

	#[tokio::test]
	async fn data_frame_from_unassigned_peer_is_rejected() {
		let (driver, state) = make_driver(vec![1], false, false);
		let anchor = [2u8; 32];
		let id_a = Identity([11u8; 32]);
		driver.primary_update(1, &[(1, anchor, weights(&[id_a]))]);

		let frame = DataFrame { frame_type: FrameType::Distribute, anchor, delegate_id: id_a, payload: None };
		let result = driver.on_data_frame(99, frame).await;

		assert!(matches!(result, Err(GossipError::Unsolicited)));
		assert_eq!(state.lock().expect("poisoned mutex").misbehaviour.len(), 1);
	}

	#[tokio::test]
	async fn data_frame_for_out_of_range_anchor_is_dropped_silently() {
		let (driver, state) = make_driver(vec![1], false, false);
		let anchor = [3u8; 32];
		let id_a = Identity([12u8; 32]);

		let frame = DataFrame { frame_type: FrameType::Distribute, anchor, delegate_id: id_a, payload: None };
		let result = driver.on_data_frame(1, frame).await;

		assert!(result.is_ok());
		let sent = state.lock().expect("poisoned mutex");
		assert!(sent.misbehaviour.is_empty());
		assert!(sent.sent_bulletin.is_empty());
	}

	#[tokio::test]
	async fn successful_data_frame_with_nothing_left_forces_bulletin_broadcast() {
		let (driver, state) = make_driver(vec![1], false, true);
		let anchor = [4u8; 32];
		let id_a = Identity([13u8; 32]);
		driver.primary_update(1, &[(1, anchor, weights(&[id_a]))]);
		driver.on_peer_active(1, true);

		let bulletin = BulletinFrame { anchor, bm_distribute: 0b1, bm_publish: 0, extra: vec![] };
		driver.on_bulletin(1, bulletin, &[(anchor, vec![id_a])]).await;
		{
			let mut sent = state.lock().expect("poisoned mutex");
			sent.sent_get.clear();
			sent.sent_bulletin.clear();
		}

		let payload =
			DataPayload::Distribute { id_from: id_a, share_map: BTreeMap::new(), r: Point::base_mul(&Scalar::from_u64(1)), s: Scalar::from_u64(2) };
		let frame = DataFrame { frame_type: FrameType::Distribute, anchor, delegate_id: id_a, payload: Some(payload) };
		let result = driver.on_data_frame(1, frame).await;
		assert!(result.is_ok());

		let sent = state.lock().expect("poisoned mutex");
		// Nothing was left to reassign, so the bulletin must go out forced
		// — i.e. even to a peer `peer_knows_any` already reports as
		// informed.
		assert!(sent.sent_get.is_empty());
		assert_eq!(sent.sent_bulletin, vec![1]);
	}

	#[tokio::test]
	async fn data_frame_completion_reassigns_a_previously_out_of_range_item() {
		let (driver, state) = make_driver(vec![1, 2], false, false);
		let anchor_a = [5u8; 32];
		let anchor_b = [6u8; 32];
		let id_a = Identity([14u8; 32]);
		let id_b = Identity([15u8; 32]);

		driver.primary_update(1, &[(1, anchor_a, weights(&[id_a]))]);
		driver.on_peer_active(1, true);
		driver.on_peer_active(2, true);

		let bulletin_a = BulletinFrame { anchor: anchor_a, bm_distribute: 0b1, bm_publish: 0, extra: vec![] };
		driver.on_bulletin(1, bulletin_a, &[(anchor_a, vec![id_a])]).await;

		// Peer 2 knows id_b's share at anchor_b, but chain_view doesn't yet
		// track anchor_b, so this item is recorded as known but stays
		// unassigned rather than scheduled immediately.
		let bulletin_b = BulletinFrame { anchor: anchor_b, bm_distribute: 0b1, bm_publish: 0, extra: vec![] };
		driver.on_bulletin(2, bulletin_b, &[(anchor_b, vec![id_b])]).await;
		{
			let sent = state.lock().expect("poisoned mutex");
			assert!(!sent.sent_get.iter().any(|(_, f)| f.anchor == anchor_b));
		}

		driver.primary_update(2, &[(2, anchor_b, weights(&[id_b]))]);
		state.lock().expect("poisoned mutex").sent_get.clear();

		let payload =
			DataPayload::Distribute { id_from: id_a, share_map: BTreeMap::new(), r: Point::base_mul(&Scalar::from_u64(1)), s: Scalar::from_u64(2) };
		let frame = DataFrame { frame_type: FrameType::Distribute, anchor: anchor_a, delegate_id: id_a, payload: Some(payload) };
		driver.on_data_frame(1, frame).await.unwrap();

		// Freeing peer 1's slot triggered a fresh `schedule()` call, which
		// picked up anchor_b's now-in-range, previously-unassignable item
		// and dispatched it to peer 2 without waiting for another bulletin.
		let sent = state.lock().expect("poisoned mutex");
		assert!(sent.sent_get.iter().any(|(nonce, f)| *nonce == 2 && f.anchor == anchor_b && f.delegate_id == id_b));
	}
}
