pub mod chain_view;
pub mod clock;
mod driver;
pub mod error;
pub mod scheduler;
pub mod wire;

pub use chain_view::ChainView;
pub use clock::{Clock, SystemClock, Tick, VirtualClock};
pub use driver::{ConsensusHandle, GossipDriver, LocalPayload, LocalStore, PeerNet};
pub use error::GossipError;
pub use scheduler::{PeerNonce, PeerScheduler};
