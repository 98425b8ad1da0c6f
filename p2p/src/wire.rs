use std::collections::BTreeMap;

use pvss_multisig::{Identity, Scalar};
use serde::{Deserialize, Serialize};

use crate::error::GossipError;

pub type BlockHash = [u8; 32];

pub const MAGIC: u32 = 0x5056_5353;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameType {
	Bulletin = 1,
	Get = 2,
	Distribute = 3,
	Publish = 4,
}

impl FrameType {
	fn from_u8(b: u8) -> Result<Self, GossipError> {
		match b {
			1 => Ok(FrameType::Bulletin),
			2 => Ok(FrameType::Get),
			3 => Ok(FrameType::Distribute),
			4 => Ok(FrameType::Publish),
			_ => Err(GossipError::Malformed("unknown frame type")),
		}
	}
}

/// Which half of a delegate's per-anchor data an inventory item names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ItemKind {
	Distribute = 1,
	Publish = 2,
}

impl ItemKind {
	fn from_u8(b: u8) -> Result<Self, GossipError> {
		match b {
			1 => Ok(ItemKind::Distribute),
			2 => Ok(ItemKind::Publish),
			_ => Err(GossipError::Malformed("unknown item kind")),
		}
	}
}

fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
	loop {
		let byte = (value & 0x7f) as u8;
		value >>= 7;
		if value == 0 {
			buf.push(byte);
			break;
		}
		buf.push(byte | 0x80);
	}
}

fn read_varint(buf: &[u8], cursor: &mut usize) -> Result<u64, GossipError> {
	let mut value: u64 = 0;
	let mut shift = 0u32;
	loop {
		let byte = *buf.get(*cursor).ok_or(GossipError::Malformed("varint truncated"))?;
		*cursor += 1;
		value |= u64::from(byte & 0x7f) << shift;
		if byte & 0x80 == 0 {
			break;
		}
		shift += 7;
		if shift >= 64 {
			return Err(GossipError::Malformed("varint overflow"));
		}
	}
	Ok(value)
}

fn read_exact<'a>(buf: &'a [u8], cursor: &mut usize, len: usize) -> Result<&'a [u8], GossipError> {
	let end = cursor.checked_add(len).ok_or(GossipError::Malformed("length overflow"))?;
	let slice = buf.get(*cursor..end).ok_or(GossipError::Malformed("frame truncated"))?;
	*cursor = end;
	Ok(slice)
}

fn write_header(buf: &mut Vec<u8>, frame_type: FrameType, anchor: &BlockHash) {
	buf.extend_from_slice(&MAGIC.to_le_bytes());
	buf.push(frame_type as u8);
	buf.extend_from_slice(anchor);
}

fn read_header(buf: &[u8], cursor: &mut usize) -> Result<(FrameType, BlockHash), GossipError> {
	let magic_bytes = read_exact(buf, cursor, 4)?;
	let magic = u32::from_le_bytes(magic_bytes.try_into().unwrap());
	if magic != MAGIC {
		return Err(GossipError::Malformed("bad magic"));
	}
	let frame_type = FrameType::from_u8(*buf.get(*cursor).ok_or(GossipError::Malformed("frame truncated"))?)?;
	*cursor += 1;
	let anchor: BlockHash = read_exact(buf, cursor, 32)?.try_into().unwrap();
	Ok((frame_type, anchor))
}

/// The periodic/triggered have/need advertisement, per the `(anchor,
/// bmDistribute, bmPublish, extraBitmaps)` body. The primary anchor is the
/// peer's current back-of-deque anchor; `extra` carries any other
/// in-range anchor whose distribute bitmap is non-zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulletinFrame {
	pub anchor: BlockHash,
	pub bm_distribute: u64,
	pub bm_publish: u64,
	pub extra: Vec<(BlockHash, u64)>,
}

impl BulletinFrame {
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::new();
		write_header(&mut buf, FrameType::Bulletin, &self.anchor);
		buf.extend_from_slice(&self.bm_distribute.to_le_bytes());
		buf.extend_from_slice(&self.bm_publish.to_le_bytes());
		buf.push(self.extra.len() as u8);
		for (anchor, bm) in &self.extra {
			buf.extend_from_slice(anchor);
			buf.extend_from_slice(&bm.to_le_bytes());
		}
		buf
	}

	/// `max_extra` enforces the bulletin extra-bitmap capacity bound (kept
	/// as a `u8` count on the wire, but rejected above the live chain-view
	/// depth rather than trusted up to 255).
	pub fn decode(buf: &[u8], max_extra: usize) -> Result<Self, GossipError> {
		let mut cursor = 0;
		let (frame_type, anchor) = read_header(buf, &mut cursor)?;
		if frame_type != FrameType::Bulletin {
			return Err(GossipError::Malformed("not a bulletin frame"));
		}
		let bm_distribute = u64::from_le_bytes(read_exact(buf, &mut cursor, 8)?.try_into().unwrap());
		let bm_publish = u64::from_le_bytes(read_exact(buf, &mut cursor, 8)?.try_into().unwrap());
		let extra_count = *buf.get(cursor).ok_or(GossipError::Malformed("frame truncated"))? as usize;
		cursor += 1;
		if extra_count > max_extra {
			return Err(GossipError::Malformed("extra bitmap count exceeds chain-view depth"));
		}
		let mut extra = Vec::with_capacity(extra_count);
		for _ in 0..extra_count {
			let extra_anchor: BlockHash = read_exact(buf, &mut cursor, 32)?.try_into().unwrap();
			let bm = u64::from_le_bytes(read_exact(buf, &mut cursor, 8)?.try_into().unwrap());
			extra.push((extra_anchor, bm));
		}
		Ok(BulletinFrame { anchor, bm_distribute, bm_publish, extra })
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetFrame {
	pub anchor: BlockHash,
	pub kind: ItemKind,
	pub delegate_id: Identity,
}

impl GetFrame {
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::new();
		write_header(&mut buf, FrameType::Get, &self.anchor);
		buf.push(self.kind as u8);
		buf.extend_from_slice(&self.delegate_id.0);
		buf
	}

	pub fn decode(buf: &[u8]) -> Result<Self, GossipError> {
		let mut cursor = 0;
		let (frame_type, anchor) = read_header(buf, &mut cursor)?;
		if frame_type != FrameType::Get {
			return Err(GossipError::Malformed("not a get frame"));
		}
		let kind = ItemKind::from_u8(*buf.get(cursor).ok_or(GossipError::Malformed("frame truncated"))?)?;
		cursor += 1;
		let delegate_id = Identity(read_exact(buf, &mut cursor, 32)?.try_into().unwrap());
		Ok(GetFrame { anchor, kind, delegate_id })
	}
}

/// The signed, serialized body of a distribute or publish response. Both
/// response frames carry the same shape — a share map plus a Schnorr
/// signature over it — differing only in what a share's value means
/// (an encrypted scalar vs. an opened `(index, scalar)` point).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DataPayload {
	Distribute {
		id_from: Identity,
		share_map: BTreeMap<Identity, Vec<Scalar>>,
		r: pvss_multisig::crypto::Point,
		s: Scalar,
	},
	Publish {
		id_from: Identity,
		share_map: BTreeMap<Identity, Vec<(u32, Scalar)>>,
		r: pvss_multisig::crypto::Point,
		s: Scalar,
	},
}

/// A distribute or publish response. `payload` is `None` when the
/// responder holds no data for the requested item — a valid, expected
/// reply, not an error.
#[derive(Clone, Debug)]
pub struct DataFrame {
	pub frame_type: FrameType,
	pub anchor: BlockHash,
	pub delegate_id: Identity,
	pub payload: Option<DataPayload>,
}

impl DataFrame {
	pub fn encode(&self) -> Vec<u8> {
		let mut buf = Vec::new();
		write_header(&mut buf, self.frame_type, &self.anchor);
		buf.extend_from_slice(&self.delegate_id.0);
		match &self.payload {
			None => write_varint(&mut buf, 0),
			Some(payload) => {
				let encoded = bincode::serialize(payload).expect("DataPayload is always serializable");
				write_varint(&mut buf, encoded.len() as u64);
				buf.extend_from_slice(&encoded);
			}
		}
		buf
	}

	pub fn decode(buf: &[u8]) -> Result<Self, GossipError> {
		let mut cursor = 0;
		let (frame_type, anchor) = read_header(buf, &mut cursor)?;
		if !matches!(frame_type, FrameType::Distribute | FrameType::Publish) {
			return Err(GossipError::Malformed("not a distribute/publish frame"));
		}
		let delegate_id = Identity(read_exact(buf, &mut cursor, 32)?.try_into().unwrap());
		let payload_len = read_varint(buf, &mut cursor)? as usize;
		let payload = if payload_len == 0 {
			None
		} else {
			let bytes = read_exact(buf, &mut cursor, payload_len)?;
			Some(bincode::deserialize(bytes).map_err(|_| GossipError::Malformed("payload deserialization failed"))?)
		};
		Ok(DataFrame { frame_type, anchor, delegate_id, payload })
	}
}
