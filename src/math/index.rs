//! WAD-scaled yield-per-unit index.

use {
    crate::{
        error::VaultError,
        math::common::*,
    },
    alloc::{string::ToString, vec},
    core::fmt,
    odra::casper_types::U512,
};

/// Cumulative yield earned by one staked unit, precise to 18 digits
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Eq, Ord)]
pub struct YieldIndex(pub U512);

impl YieldIndex {
    /// Zero
    pub fn zero() -> Self {
        Self(U512::zero())
    }

    fn wad() -> U512 {
        U512::from(WAD)
    }

    /// Return raw scaled value
    #[allow(clippy::wrong_self_convention)]
    pub fn to_scaled_val(&self) -> U512 {
        self.0
    }

    /// Create index from scaled value
    pub fn from_scaled_val(scaled_val: U512) -> Self {
        Self(scaled_val)
    }

    /// Index increment for `value` spread across `units`.
    pub fn from_ratio(value: U512, units: U512) -> Result<Self, VaultError> {
        Ok(Self(mul_div_floor(value, Self::wad(), units)?))
    }

    /// `amount` units valued at this index, rounded down.
    pub fn try_floor_mul(&self, amount: U512) -> Result<U512, VaultError> {
        mul_div_floor(self.0, amount, Self::wad())
    }

    /// Distance travelled since `earlier`, zero if `earlier` is ahead.
    pub fn saturating_since(&self, earlier: YieldIndex) -> YieldIndex {
        Self(self.0.saturating_sub(earlier.0))
    }
}

impl fmt::Display for YieldIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scaled_val = self.0.to_string();
        if scaled_val.len() <= SCALE {
            scaled_val.insert_str(0, &vec!["0"; SCALE - scaled_val.len()].join(""));
            scaled_val.insert_str(0, "0.");
        } else {
            scaled_val.insert(scaled_val.len() - SCALE, '.');
        }
        f.write_str(&scaled_val)
    }
}

impl TryAdd for YieldIndex {
    fn try_add(self, rhs: Self) -> Result<Self, VaultError> {
        Ok(Self(self.0.try_add(rhs.0)?))
    }
}

impl TrySub for YieldIndex {
    fn try_sub(self, rhs: Self) -> Result<Self, VaultError> {
        Ok(Self(self.0.try_sub(rhs.0)?))
    }
}
