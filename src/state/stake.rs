use odra::casper_types::U512;
use odra::prelude::*;

use crate::{
    error::VaultError,
    math::{TryAdd, TrySub, YieldIndex},
    state::STAKE_ROUNDING_BIAS,
};

/// Staked redemption position.
#[odra::odra_type]
pub struct HodlStake {
    pub owner: Address,
    pub epoch_id: u64,
    /// Remaining staked amount; the record stays once it reaches zero
    pub amount: U512,
}

impl HodlStake {
    pub fn new(owner: Address, epoch_id: u64, amount: U512) -> Self {
        Self { owner, epoch_id, amount }
    }

    /// Remove `amount` from the stake, either for redemption or unstaking.
    pub fn take(&mut self, amount: U512) -> Result<(), VaultError> {
        if amount.is_zero() {
            return Err(VaultError::InvalidAmount);
        }
        if amount > self.amount {
            return Err(VaultError::AmountExceedsStake);
        }
        self.amount = self.amount.try_sub(amount)?;
        Ok(())
    }
}

/// Staked yield position.
#[odra::odra_type]
pub struct YStake {
    pub owner: Address,
    pub epoch_id: u64,
    /// Staked amount, zero after unstaking
    pub amount: U512,
    /// Yield already paid, including the baseline taken at stake time
    pub claimed: U512,
    /// Accrual locked in at unstake time; nonzero only when `amount` is zero
    pub frozen_accrual: U512,
}

impl YStake {
    /// New stake whose baseline is the yield `amount` units would have
    /// earned since inception at `index`, plus the rounding bias.
    pub fn new(
        owner: Address,
        epoch_id: u64,
        amount: U512,
        index: YieldIndex,
    ) -> Result<Self, VaultError> {
        if amount.is_zero() {
            return Err(VaultError::InvalidAmount);
        }
        let claimed = index
            .try_floor_mul(amount)?
            .try_add(U512::from(STAKE_ROUNDING_BIAS))?;
        Ok(Self {
            owner,
            epoch_id,
            amount,
            claimed,
            frozen_accrual: U512::zero(),
        })
    }

    pub fn is_staked(&self) -> bool {
        !self.amount.is_zero()
    }

    /// Yield owed at `index` (the epoch's effective index). Floors at zero.
    pub fn claimable(&self, index: YieldIndex) -> Result<U512, VaultError> {
        if !self.is_staked() {
            return Ok(self.frozen_accrual.saturating_sub(self.claimed));
        }
        let earned = index.try_floor_mul(self.amount)?;
        Ok(earned.saturating_sub(self.claimed))
    }

    /// Lock in the accrual at `index` and zero the stake. Returns the amount
    /// of yield position to hand back.
    pub fn freeze(&mut self, index: YieldIndex) -> Result<U512, VaultError> {
        if !self.is_staked() {
            return Err(VaultError::AlreadyUnstaked);
        }
        self.frozen_accrual = self.claimed.try_add(self.claimable(index)?)?;
        let returned = self.amount;
        self.amount = U512::zero();
        Ok(returned)
    }

    pub fn record_claim(&mut self, amount: U512) -> Result<(), VaultError> {
        self.claimed = self.claimed.try_add(amount)?;
        Ok(())
    }
}
