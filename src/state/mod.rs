// Stored types and pure accounting logic of the vault

pub mod accumulator;
pub mod config;
pub mod epoch;
pub mod price;
pub mod stake;

pub use accumulator::*;
pub use config::*;
pub use epoch::*;
pub use price::*;
pub use stake::*;

/// Added to every yield stake's baseline, in the pool's favour, so that a
/// stake/unstake round trip can never gain from truncation.
pub const STAKE_ROUNDING_BIAS: u64 = 1;

/// First id handed out by the shared epoch/stake counter.
pub const FIRST_ID: u64 = 1;

