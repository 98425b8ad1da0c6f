pub mod constants;
mod driver;
mod error;
mod traits;

pub use constants::{ConsensusIntervals, BULLETIN_TIMEOUT};
pub use driver::{ConsensusDriver, EvolveOutput};
pub use error::ConsensusError;
pub use traits::{BlockChain, BlockHash, TxPool};
