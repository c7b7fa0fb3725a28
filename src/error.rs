use core::fmt;
use odra::prelude::*;

/// Errors raised by the vault, the oracle and the custodian.
#[odra::odra_error]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VaultError {
    // 0
    NotInitialized = 0,
    AlreadyInitialized = 1,
    Unauthorized = 2,
    InvalidConfig = 3,
    FeeTooHigh = 4,

    // 5
    InvalidAmount = 5,
    InsufficientBalance = 6,
    MathOverflow = 7,

    // 10
    StalePrice = 10,
    NoPriceData = 11,
    UnknownRound = 12,
    StrikeAlreadyCrossed = 13,

    // 15
    EpochNotFound = 15,
    EpochClosed = 16,
    StakeNotFound = 17,
    NotStakeOwner = 18,
    AmountExceedsStake = 19,

    // 20
    AlreadyUnstaked = 20,
    NotRedeemable = 21,
    InsufficientCustody = 22,
}

impl VaultError {
    pub fn message(&self) -> &str {
        match self {
            VaultError::NotInitialized => "Contract is not initialized",
            VaultError::AlreadyInitialized => "Contract is already initialized",
            VaultError::Unauthorized => "Caller is not allowed to perform this action",
            VaultError::InvalidConfig => "Input config value is invalid",
            VaultError::FeeTooHigh => "Protocol fee exceeds the hard cap",
            VaultError::InvalidAmount => "Input amount is invalid",
            VaultError::InsufficientBalance => "Position balance is too small",
            VaultError::MathOverflow => "Math operation overflow",
            VaultError::StalePrice => "Oracle price is older than the freshness window",
            VaultError::NoPriceData => "Oracle has not published a price yet",
            VaultError::UnknownRound => "Oracle round does not exist",
            VaultError::StrikeAlreadyCrossed => "Current price is at or above the strike",
            VaultError::EpochNotFound => "No epoch exists for this strike or id",
            VaultError::EpochClosed => "Epoch is closed",
            VaultError::StakeNotFound => "Stake does not exist",
            VaultError::NotStakeOwner => "Caller does not own the stake",
            VaultError::AmountExceedsStake => "Amount exceeds the remaining staked amount",
            VaultError::AlreadyUnstaked => "Stake was already unstaked",
            VaultError::NotRedeemable => "Strike has not been crossed for this position",
            VaultError::InsufficientCustody => "Custodian does not hold enough collateral",
        }
    }
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}
