use odra::prelude::*;

use crate::error::VaultError;

/// Hard cap on the mint fee, in basis points (10%).
pub const MAX_FEE_BPS: u32 = 1_000;

/// Wiring and fee parameters fixed at deployment.
#[odra::odra_type]
pub struct EngineConfig {
    pub oracle: Address,
    pub custodian: Address,
    pub treasury: Address,
    pub fee_bps: u32,
    /// Freshness window for the current oracle price, in milliseconds
    pub max_price_age: u64,
}

impl EngineConfig {
    pub fn validate(&self, engine: Address) -> Result<(), VaultError> {
        if self.fee_bps > MAX_FEE_BPS {
            return Err(VaultError::FeeTooHigh);
        }
        if self.max_price_age == 0 {
            return Err(VaultError::InvalidConfig);
        }
        let wired = [self.oracle, self.custodian, self.treasury];
        if wired.contains(&engine) {
            return Err(VaultError::InvalidConfig);
        }
        if self.oracle == self.custodian
            || self.oracle == self.treasury
            || self.custodian == self.treasury
        {
            return Err(VaultError::InvalidConfig);
        }
        Ok(())
    }
}
