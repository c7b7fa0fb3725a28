use odra::casper_types::U256;
use odra::prelude::*;

use crate::{error::VaultError, state::PriceReading};

/// Price feed consumed by the vault.
#[odra::external_contract]
pub trait Oracle {
    fn current_price(&self) -> U256;
    fn current_timestamp(&self) -> u64;
    fn price_at(&self, round: u64) -> U256;
    fn timestamp_at(&self, round: u64) -> u64;
    fn latest_round_id(&self) -> u64;
}

/// Round-indexed price feed. Every push opens a new round stamped with the
/// block time; past rounds stay readable so they can serve as evidence.
#[odra::module(
    events = [PriceUpdated, PublisherAdded, PublisherRemoved, AdminTransferred],
    errors = VaultError
)]
pub struct PriceOracle {
    rounds: Mapping<u64, PriceReading>,
    latest_round: Var<u64>,
    approved_publishers: Mapping<Address, bool>,
    admin: Var<Address>,
}

#[odra::module]
impl PriceOracle {
    /// Initialize the oracle with the deployer as admin
    pub fn init(&mut self) {
        self.admin.set(self.env().caller());
    }

    /// Publish a new price, returns the round id
    pub fn push_price(&mut self, price: U256) -> u64 {
        let caller = self.env().caller();
        if !self.is_admin(caller) && !self.is_approved_publisher(caller) {
            self.env().revert(VaultError::Unauthorized);
        }

        let round = self
            .latest_round
            .get_or_default()
            .checked_add(1)
            .unwrap_or_revert_with(&self.env(), VaultError::MathOverflow);
        let timestamp = self.env().get_block_time();
        self.rounds.set(&round, PriceReading::new(price, timestamp));
        self.latest_round.set(round);

        self.env().emit_event(PriceUpdated {
            round,
            price,
            timestamp,
            publisher: caller,
        });
        round
    }

    /// Add approved price publisher
    pub fn add_publisher(&mut self, publisher: Address) {
        let caller = self.assert_admin();
        self.approved_publishers.set(&publisher, true);
        self.env().emit_event(PublisherAdded {
            publisher,
            added_by: caller,
        });
    }

    /// Remove price publisher
    pub fn remove_publisher(&mut self, publisher: Address) {
        let caller = self.assert_admin();
        self.approved_publishers.set(&publisher, false);
        self.env().emit_event(PublisherRemoved {
            publisher,
            removed_by: caller,
        });
    }

    /// Transfer admin rights
    pub fn transfer_admin(&mut self, new_admin: Address) {
        let previous_admin = self.assert_admin();
        self.admin.set(new_admin);
        self.env().emit_event(AdminTransferred {
            previous_admin,
            new_admin,
        });
    }

    pub fn is_approved_publisher(&self, address: Address) -> bool {
        self.approved_publishers.get(&address).unwrap_or(false)
    }

    pub fn latest_round_id(&self) -> u64 {
        self.latest_round.get_or_default()
    }

    pub fn round(&self, round: u64) -> Option<PriceReading> {
        self.rounds.get(&round)
    }

    pub fn current_price(&self) -> U256 {
        self.latest().price
    }

    pub fn current_timestamp(&self) -> u64 {
        self.latest().timestamp
    }

    pub fn price_at(&self, round: u64) -> U256 {
        self.reading_at(round).price
    }

    pub fn timestamp_at(&self, round: u64) -> u64 {
        self.reading_at(round).timestamp
    }
}

impl PriceOracle {
    fn is_admin(&self, address: Address) -> bool {
        self.admin.get() == Some(address)
    }

    fn assert_admin(&self) -> Address {
        let caller = self.env().caller();
        if !self.is_admin(caller) {
            self.env().revert(VaultError::Unauthorized);
        }
        caller
    }

    fn latest(&self) -> PriceReading {
        self.rounds
            .get(&self.latest_round_id())
            .unwrap_or_revert_with(&self.env(), VaultError::NoPriceData)
    }

    fn reading_at(&self, round: u64) -> PriceReading {
        self.rounds
            .get(&round)
            .unwrap_or_revert_with(&self.env(), VaultError::UnknownRound)
    }
}

#[odra::event]
pub struct PriceUpdated {
    pub round: u64,
    pub price: U256,
    pub timestamp: u64,
    pub publisher: Address,
}

#[odra::event]
pub struct PublisherAdded {
    pub publisher: Address,
    pub added_by: Address,
}

#[odra::event]
pub struct PublisherRemoved {
    pub publisher: Address,
    pub removed_by: Address,
}

#[odra::event]
pub struct AdminTransferred {
    pub previous_admin: Address,
    pub new_admin: Address,
}
