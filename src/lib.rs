#![allow(clippy::arithmetic_side_effects)]
#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

//! Strike vault: paired redemption and yield positions over yield-bearing
//! collateral, for the casper blockchain.

pub mod custodian;
pub mod error;
pub mod ledger;
pub mod math;
pub mod oracle;
pub mod processor;
pub mod state;

#[cfg(test)]
mod tests;

extern crate alloc;
