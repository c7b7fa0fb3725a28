//! Semi-fungible position ledger keyed by strike.
//!
//! Balances live under `(strike, generation, owner)`. Bumping a strike's
//! generation orphans every balance of the previous generation at once, which
//! is how all yield positions at a crossed strike are burned without walking
//! the holders.

use odra::casper_types::{U256, U512};
use odra::prelude::*;

use crate::{
    error::VaultError,
    math::{TryAdd, TrySub},
};

#[odra::module]
pub struct PositionLedger {
    generations: Mapping<U256, u64>,
    balances: Mapping<(U256, u64, Address), U512>,
    supplies: Mapping<(U256, u64), U512>,
}

#[odra::module]
impl PositionLedger {
    /// Live generation of `strike`
    pub fn generation(&self, strike: U256) -> u64 {
        self.generations.get_or_default(&strike)
    }

    pub fn balance_of(&self, owner: Address, strike: U256) -> U512 {
        let generation = self.generation(strike);
        self.balances.get_or_default(&(strike, generation, owner))
    }

    pub fn total_supply(&self, strike: U256) -> U512 {
        let generation = self.generation(strike);
        self.supplies.get_or_default(&(strike, generation))
    }

    pub fn mint(&mut self, owner: Address, strike: U256, amount: U512) {
        let generation = self.generation(strike);
        let key = (strike, generation, owner);
        let balance = self
            .balances
            .get_or_default(&key)
            .try_add(amount)
            .unwrap_or_revert(&self.env());
        let supply = self
            .supplies
            .get_or_default(&(strike, generation))
            .try_add(amount)
            .unwrap_or_revert(&self.env());
        self.balances.set(&key, balance);
        self.supplies.set(&(strike, generation), supply);
    }

    pub fn burn(&mut self, owner: Address, strike: U256, amount: U512) {
        let generation = self.generation(strike);
        let key = (strike, generation, owner);
        let balance = self.balances.get_or_default(&key);
        if amount > balance {
            self.env().revert(VaultError::InsufficientBalance);
        }
        let supply = self
            .supplies
            .get_or_default(&(strike, generation))
            .try_sub(amount)
            .unwrap_or_revert(&self.env());
        self.balances.set(&key, balance - amount);
        self.supplies.set(&(strike, generation), supply);
    }

    pub fn transfer(&mut self, from: Address, to: Address, strike: U256, amount: U512) {
        self.burn(from, strike, amount);
        self.mint(to, strike, amount);
    }

    /// Burn every balance at `strike` by moving it to a fresh generation.
    pub fn invalidate(&mut self, strike: U256) -> u64 {
        let next = self
            .generation(strike)
            .checked_add(1)
            .unwrap_or_revert_with(&self.env(), VaultError::MathOverflow);
        self.generations.set(&strike, next);
        next
    }
}
