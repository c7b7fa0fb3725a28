//! Shared scalers and checked arithmetic for vault accounting.
//!
//! All traits report `VaultError::MathOverflow` so that accounting code can
//! propagate with `?` and the contract boundary turns the error into a revert.

use crate::error::VaultError;
use odra::casper_types::U512;

/// Scale of precision
pub const SCALE: usize = 18;
/// Identity
pub const WAD: u64 = 1_000_000_000_000_000_000;
/// Basis points in one whole
pub const BPS_SCALER: u64 = 10_000;

/// Try to subtract, return an error on underflow
pub trait TrySub: Sized {
    /// Subtract
    fn try_sub(self, rhs: Self) -> Result<Self, VaultError>;
}

/// Try to add, return an error on overflow
pub trait TryAdd: Sized {
    /// Add
    fn try_add(self, rhs: Self) -> Result<Self, VaultError>;
}

/// Try to divide, return an error on overflow or divide by zero
pub trait TryDiv<RHS>: Sized {
    /// Divide
    fn try_div(self, rhs: RHS) -> Result<Self, VaultError>;
}

/// Try to multiply, return an error on overflow
pub trait TryMul<RHS>: Sized {
    /// Multiply
    fn try_mul(self, rhs: RHS) -> Result<Self, VaultError>;
}

impl TryAdd for U512 {
    fn try_add(self, rhs: Self) -> Result<Self, VaultError> {
        self.checked_add(rhs).ok_or(VaultError::MathOverflow)
    }
}

impl TrySub for U512 {
    fn try_sub(self, rhs: Self) -> Result<Self, VaultError> {
        self.checked_sub(rhs).ok_or(VaultError::MathOverflow)
    }
}

impl TryMul<U512> for U512 {
    fn try_mul(self, rhs: U512) -> Result<Self, VaultError> {
        self.checked_mul(rhs).ok_or(VaultError::MathOverflow)
    }
}

impl TryDiv<U512> for U512 {
    fn try_div(self, rhs: U512) -> Result<Self, VaultError> {
        self.checked_div(rhs).ok_or(VaultError::MathOverflow)
    }
}

/// `a * b / c`, rounded down.
pub fn mul_div_floor(a: U512, b: U512, c: U512) -> Result<U512, VaultError> {
    a.try_mul(b)?.try_div(c)
}

/// Portion of `amount` expressed in basis points, rounded down.
pub fn bps_of(amount: U512, bps: u32) -> Result<U512, VaultError> {
    mul_div_floor(amount, U512::from(bps), U512::from(BPS_SCALER))
}
