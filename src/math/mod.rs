pub mod common;
pub mod index;

pub use common::{TryAdd, TryDiv, TryMul, TrySub};
pub use index::YieldIndex;
