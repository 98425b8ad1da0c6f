pub mod crypto;
mod envelope;
mod error;
mod interpolation;
mod participant;
mod pvss_box;
mod secret_share;
mod vote;
mod worker_pool;

pub use envelope::{hash_distribute_map, hash_publish_map};
pub use error::PvssError;
pub use participant::{Candidate, Identity, IndexRange, Participant};
pub use pvss_box::{OpenedBox, SealedBox};
pub use secret_share::SecretShare;
pub use vote::{Agreement, CollectedEnvelope, PvssVote, VoteState};
