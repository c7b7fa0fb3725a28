//! Lazily updated global yield accumulator.
//!
//! The pool's yield is never distributed eagerly. Instead the accumulator
//! keeps a yield-per-staked-unit index which is brought up to date at
//! checkpoints, and every stake compares the index against its own baseline.
//! A checkpoint has to run before anything changes `staked_total` or freezes
//! an epoch, otherwise yield earned under the old weighting would be spread
//! using the new one.

use odra::casper_types::U512;

use crate::{
    error::VaultError,
    math::{common::mul_div_floor, TryAdd, TrySub, YieldIndex},
    state::Epoch,
};

/// Pool-wide accounting state, loaded once per call and written back at the end.
#[odra::odra_type]
pub struct Accumulator {
    /// Yield-per-unit at the last checkpoint (WAD scaled)
    pub yield_per_unit: U512,
    /// Total cumulative yield at the last checkpoint
    pub cumulative_yield: U512,
    /// Sum of all yield stakes in open epochs
    pub staked_total: U512,
    /// Yield paid out so far (nominal)
    pub claimed: U512,
    /// Collateral the vault believes it has deposited, net of nominal withdrawals
    pub deposits: U512,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            yield_per_unit: U512::zero(),
            cumulative_yield: U512::zero(),
            staked_total: U512::zero(),
            claimed: U512::zero(),
            deposits: U512::zero(),
        }
    }
}

impl Accumulator {
    /// Yield-per-unit as of the last checkpoint.
    pub fn index(&self) -> YieldIndex {
        YieldIndex::from_scaled_val(self.yield_per_unit)
    }

    /// Yield earned by the whole pool since inception. A custodian balance
    /// below `deposits` counts as zero additional yield.
    pub fn total_cumulative_yield(&self, custodian_balance: U512) -> Result<U512, VaultError> {
        custodian_balance
            .saturating_sub(self.deposits)
            .try_add(self.claimed)
    }

    /// Live yield-per-unit. Never moves below the checkpointed value, and
    /// stays put while nothing is staked.
    pub fn live_index(&self, custodian_balance: U512) -> Result<YieldIndex, VaultError> {
        let live = self.total_cumulative_yield(custodian_balance)?;
        if live < self.cumulative_yield || self.staked_total.is_zero() {
            return Ok(self.index());
        }
        let delta = live.try_sub(self.cumulative_yield)?;
        self.index()
            .try_add(YieldIndex::from_ratio(delta, self.staked_total)?)
    }

    /// Bring the global index and `epoch`'s snapshot up to date.
    /// `epoch_staked` is the epoch's staked total before any pending change.
    pub fn checkpoint(
        &mut self,
        epoch: &mut Epoch,
        epoch_staked: U512,
        custodian_balance: U512,
    ) -> Result<YieldIndex, VaultError> {
        if epoch.closed {
            return Err(VaultError::EpochClosed);
        }
        let live = self.total_cumulative_yield(custodian_balance)?;
        let index = self.live_index(custodian_balance)?;

        epoch.cumulative_yield = epoch.cumulative_yield_at(epoch_staked, index)?;
        epoch.yield_per_unit = index.to_scaled_val();

        self.yield_per_unit = index.to_scaled_val();
        // with nobody staked the yield stays pending for the next stakers
        if !self.staked_total.is_zero() {
            self.cumulative_yield = self.cumulative_yield.max(live);
        }
        Ok(index)
    }

    /// Checkpoint `epoch` one last time, freeze its terminal index and drop
    /// its stakes from the global weighting.
    pub fn close_epoch(
        &mut self,
        epoch: &mut Epoch,
        epoch_staked: &mut U512,
        custodian_balance: U512,
    ) -> Result<(), VaultError> {
        let terminal = self.checkpoint(epoch, *epoch_staked, custodian_balance)?;
        epoch.terminal_yield_per_unit = terminal.to_scaled_val();
        self.staked_total = self.staked_total.try_sub(*epoch_staked)?;
        *epoch_staked = U512::zero();
        epoch.closed = true;
        Ok(())
    }

    /// Count `amount` of new y stake in the epoch and the global total.
    pub fn add_stake(&mut self, epoch_staked: &mut U512, amount: U512) -> Result<(), VaultError> {
        *epoch_staked = epoch_staked.try_add(amount)?;
        self.staked_total = self.staked_total.try_add(amount)?;
        Ok(())
    }

    pub fn remove_stake(
        &mut self,
        epoch_staked: &mut U512,
        amount: U512,
    ) -> Result<(), VaultError> {
        *epoch_staked = epoch_staked.try_sub(amount)?;
        self.staked_total = self.staked_total.try_sub(amount)?;
        Ok(())
    }

    pub fn record_deposit(&mut self, amount: U512) -> Result<(), VaultError> {
        self.deposits = self.deposits.try_add(amount)?;
        Ok(())
    }

    /// Deposits shrink by the nominal amount, not by what was actually paid.
    pub fn record_withdrawal(&mut self, nominal: U512) -> Result<(), VaultError> {
        self.deposits = self.deposits.try_sub(nominal)?;
        Ok(())
    }

    /// Book a claim at its nominal value, even when less was paid.
    pub fn record_claim(&mut self, amount: U512) -> Result<(), VaultError> {
        self.claimed = self.claimed.try_add(amount)?;
        Ok(())
    }

    /// Actual payout for a `nominal` withdrawal. After a negative rebase the
    /// amount is scaled by `balance / deposits`; it never exceeds the balance.
    pub fn adjust_withdrawal(
        &self,
        nominal: U512,
        custodian_balance: U512,
    ) -> Result<U512, VaultError> {
        let scaled = if custodian_balance < self.deposits {
            mul_div_floor(nominal, custodian_balance, self.deposits)?
        } else {
            nominal
        };
        Ok(scaled.min(custodian_balance))
    }
}
