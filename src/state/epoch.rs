use odra::casper_types::{U256, U512};

use crate::{
    error::VaultError,
    math::{TryAdd, YieldIndex},
    state::PriceReading,
};

/// Accounting period of one strike, from its opening until the strike is crossed.
#[odra::odra_type]
pub struct Epoch {
    pub strike: U256,
    pub closed: bool,
    /// Block time the epoch was opened at
    pub opened_at: u64,
    /// Global yield-per-unit at the last checkpoint of this epoch
    pub yield_per_unit: U512,
    /// Yield earned by the epoch's stakers up to the last checkpoint
    pub cumulative_yield: U512,
    /// Yield-per-unit frozen when the epoch closed; zero while open
    pub terminal_yield_per_unit: U512,
}

impl Epoch {
    pub fn open(strike: U256, opened_at: u64) -> Self {
        Self {
            strike,
            closed: false,
            opened_at,
            yield_per_unit: U512::zero(),
            cumulative_yield: U512::zero(),
            terminal_yield_per_unit: U512::zero(),
        }
    }

    pub fn checkpoint_index(&self) -> YieldIndex {
        YieldIndex::from_scaled_val(self.yield_per_unit)
    }

    /// Index a stake of this epoch earns at: the terminal value once closed,
    /// otherwise the supplied live value.
    pub fn effective_index(&self, live: YieldIndex) -> YieldIndex {
        if self.closed {
            YieldIndex::from_scaled_val(self.terminal_yield_per_unit)
        } else {
            live
        }
    }

    /// Yield attributed to this epoch given `staked` units and the live index.
    pub fn cumulative_yield_at(
        &self,
        staked: U512,
        live: YieldIndex,
    ) -> Result<U512, VaultError> {
        let earned = self
            .effective_index(live)
            .saturating_since(self.checkpoint_index())
            .try_floor_mul(staked)?;
        self.cumulative_yield.try_add(earned)
    }

    /// Whether `reading` is valid evidence that the strike was crossed during this epoch.
    pub fn accepts_evidence(&self, reading: &PriceReading) -> bool {
        reading.crosses(self.strike) && reading.timestamp >= self.opened_at
    }
}
