//! Collateral custodian ("yield source").
//!
//! Holds the native-token collateral on behalf of a single operator (the
//! vault). Its balance can grow through `accrue` or shrink through `slash`
//! without the operator's involvement, which is exactly what the vault's
//! yield and negative-rebase accounting has to cope with.

use odra::casper_types::U512;
use odra::prelude::*;

use crate::error::VaultError;

/// Custody interface consumed by the vault.
#[odra::external_contract]
pub trait Custodian {
    fn balance(&self) -> U512;
    fn deposit(&mut self) -> U512;
    fn withdraw(&mut self, amount: U512, recipient: Address);
}

#[odra::module(
    events = [OperatorSet, Deposited, Withdrawn, YieldAccrued, Slashed],
    errors = VaultError
)]
pub struct YieldSource {
    admin: Var<Address>,
    operator: Var<Address>,
}

#[odra::module]
impl YieldSource {
    pub fn init(&mut self) {
        self.admin.set(self.env().caller());
    }

    /// Bind the operator allowed to deposit and withdraw. Can only happen once.
    pub fn set_operator(&mut self, operator: Address) {
        self.assert_admin();
        if self.operator.get().is_some() {
            self.env().revert(VaultError::AlreadyInitialized);
        }
        self.operator.set(operator);
        self.env().emit_event(OperatorSet { operator });
    }

    pub fn operator(&self) -> Option<Address> {
        self.operator.get()
    }

    pub fn balance(&self) -> U512 {
        self.env().self_balance()
    }

    /// Take custody of the attached value, returns the amount received
    #[odra(payable)]
    pub fn deposit(&mut self) -> U512 {
        self.assert_operator();
        let amount = self.env().attached_value();
        self.env().emit_event(Deposited { amount });
        amount
    }

    pub fn withdraw(&mut self, amount: U512, recipient: Address) {
        self.assert_operator();
        if amount > self.balance() {
            self.env().revert(VaultError::InsufficientCustody);
        }
        if !amount.is_zero() {
            self.env().transfer_tokens(&recipient, &amount);
        }
        self.env().emit_event(Withdrawn { amount, recipient });
    }

    /// Organic yield: anyone may top up the pool
    #[odra(payable)]
    pub fn accrue(&mut self) {
        let amount = self.env().attached_value();
        self.env().emit_event(YieldAccrued { amount });
    }

    /// Collateral loss (e.g. slashing), moved out to `recipient`
    pub fn slash(&mut self, amount: U512, recipient: Address) {
        self.assert_admin();
        if amount > self.balance() {
            self.env().revert(VaultError::InsufficientCustody);
        }
        self.env().transfer_tokens(&recipient, &amount);
        self.env().emit_event(Slashed { amount });
    }
}

impl YieldSource {
    fn assert_admin(&self) {
        if self.admin.get() != Some(self.env().caller()) {
            self.env().revert(VaultError::Unauthorized);
        }
    }

    fn assert_operator(&self) {
        if self.operator.get() != Some(self.env().caller()) {
            self.env().revert(VaultError::Unauthorized);
        }
    }
}

#[odra::event]
pub struct OperatorSet {
    pub operator: Address,
}

#[odra::event]
pub struct Deposited {
    pub amount: U512,
}

#[odra::event]
pub struct Withdrawn {
    pub amount: U512,
    pub recipient: Address,
}

#[odra::event]
pub struct YieldAccrued {
    pub amount: U512,
}

#[odra::event]
pub struct Slashed {
    pub amount: U512,
}
