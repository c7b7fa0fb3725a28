//! Strike vault processor.
//!
//! Issues paired redemption ("hodl") and yield ("y") positions against
//! collateral held by a custodian, keyed by strike. Every mutating entry
//! point loads the `Accumulator` once, threads it through the call and stores
//! it back; `checkpoint` is the only place the global yield index moves.

use odra::casper_types::{U256, U512};
use odra::prelude::*;
use odra::ContractRef;

use crate::{
    custodian::CustodianContractRef,
    error::VaultError,
    ledger::PositionLedger,
    math::{common::bps_of, TrySub, YieldIndex},
    oracle::OracleContractRef,
    state::{Accumulator, EngineConfig, Epoch, HodlStake, PriceReading, YStake, FIRST_ID},
};

#[odra::module(
    events = [
        Minted, EpochOpened, EpochClosed, HodlStaked, HodlUnstaked, YStaked, YUnstaked,
        Redeemed, TokensRedeemed, Merged, Claimed
    ],
    errors = VaultError
)]
pub struct StrikeVault {
    config: Var<EngineConfig>,

    // Position ledgers
    hodl: SubModule<PositionLedger>,
    y: SubModule<PositionLedger>,

    // Epoch registry; ids are shared with stakes
    next_id: Var<u64>,
    strike_to_epoch: Mapping<U256, u64>,
    epochs: Mapping<u64, Epoch>,

    // Stake ledgers
    hodl_stakes: Mapping<u64, HodlStake>,
    y_stakes: Mapping<u64, YStake>,
    y_staked: Mapping<u64, U512>,

    accumulator: Var<Accumulator>,
}

#[odra::module]
impl StrikeVault {
    // ===========================================================================
    // CONSTRUCTOR
    // ===========================================================================
    /// Wire the vault to its oracle, custodian and treasury. Reverts on an invalid config.
    pub fn init(
        &mut self,
        oracle: Address,
        custodian: Address,
        treasury: Address,
        fee_bps: u32,
        max_price_age: u64,
    ) {
        let config = EngineConfig {
            oracle,
            custodian,
            treasury,
            fee_bps,
            max_price_age,
        };
        config
            .validate(self.env().self_address())
            .unwrap_or_revert(&self.env());
        self.config.set(config);
        self.next_id.set(FIRST_ID);
        self.accumulator.set(Accumulator::default());
    }

    // ===========================================================================
    // MINT / MERGE
    // ===========================================================================

    /// Deposit the attached value and mint equal hodl and y positions at
    /// `strike`. Returns the amount minted.
    #[odra(payable, non_reentrant)]
    pub fn mint(&mut self, strike: U256) -> U512 {
        let value = self.env().attached_value();
        if value.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }
        if self.fresh_price().crosses(strike) {
            self.env().revert(VaultError::StrikeAlreadyCrossed);
        }

        let config = self.config();
        let fee = bps_of(value, config.fee_bps).unwrap_or_revert(&self.env());
        if !fee.is_zero() {
            self.env().transfer_tokens(&config.treasury, &fee);
        }
        let net = value.try_sub(fee).unwrap_or_revert(&self.env());
        let amount = self.custodian().with_tokens(net).deposit();
        if amount.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }

        let mut acc = self.load_accumulator();
        acc.record_deposit(amount).unwrap_or_revert(&self.env());
        self.accumulator.set(acc);

        let epoch_id = match self.open_epoch_of(strike) {
            Some(id) => id,
            None => self.open_epoch(strike),
        };

        let caller = self.env().caller();
        self.hodl.mint(caller, strike, amount);
        self.y.mint(caller, strike, amount);

        self.env().emit_event(Minted {
            owner: caller,
            strike,
            epoch_id,
            amount,
            fee,
        });
        amount
    }

    /// Burn equal hodl and y positions and release the matching collateral.
    #[odra(non_reentrant)]
    pub fn merge(&mut self, strike: U256, amount: U512) -> U512 {
        if amount.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }
        let caller = self.env().caller();
        self.hodl.burn(caller, strike, amount);
        self.y.burn(caller, strike, amount);

        let mut acc = self.load_accumulator();
        let paid = self.pay_principal(&mut acc, amount, caller);
        self.accumulator.set(acc);

        self.env().emit_event(Merged {
            owner: caller,
            strike,
            amount,
            paid,
        });
        paid
    }

    // ===========================================================================
    // REDEMPTION POSITIONS
    // ===========================================================================

    /// Move the caller's unstaked hodl balance into a stake owned by
    /// `recipient`, tied to the strike's current epoch.
    #[odra(non_reentrant)]
    pub fn hodl_stake(&mut self, strike: U256, amount: U512, recipient: Address) -> u64 {
        if amount.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }
        let epoch_id = self
            .open_epoch_of(strike)
            .unwrap_or_revert_with(&self.env(), VaultError::EpochNotFound);
        let caller = self.env().caller();
        self.hodl.burn(caller, strike, amount);

        let stake_id = self.next_id();
        self.hodl_stakes
            .set(&stake_id, HodlStake::new(recipient, epoch_id, amount));

        self.env().emit_event(HodlStaked {
            stake_id,
            owner: recipient,
            epoch_id,
            amount,
        });
        stake_id
    }

    /// Return part or all of a hodl stake to `recipient` as unstaked balance.
    #[odra(non_reentrant)]
    pub fn hodl_unstake(&mut self, stake_id: u64, amount: U512, recipient: Address) {
        let mut stake = self.owned_hodl_stake(stake_id);
        stake.take(amount).unwrap_or_revert(&self.env());
        let strike = self.epoch_or_revert(stake.epoch_id).strike;
        self.hodl_stakes.set(&stake_id, stake);

        self.hodl.mint(recipient, strike, amount);

        self.env().emit_event(HodlUnstaked {
            stake_id,
            recipient,
            amount,
        });
    }

    /// Redeem `amount` of a hodl stake. `round` selects the oracle round used
    /// as crossing evidence, the latest fresh price when absent.
    #[odra(non_reentrant)]
    pub fn redeem(&mut self, stake_id: u64, round: Option<u64>, amount: U512) -> U512 {
        let mut stake = self.owned_hodl_stake(stake_id);
        if !self.stake_can_redeem(&stake, round) {
            self.env().revert(VaultError::NotRedeemable);
        }
        stake.take(amount).unwrap_or_revert(&self.env());
        let epoch_id = stake.epoch_id;
        let owner = stake.owner;
        self.hodl_stakes.set(&stake_id, stake);

        let mut acc = self.load_accumulator();
        self.close_epoch(&mut acc, epoch_id);
        let paid = self.pay_principal(&mut acc, amount, owner);
        self.accumulator.set(acc);

        self.env().emit_event(Redeemed {
            stake_id,
            epoch_id,
            amount,
            paid,
        });
        paid
    }

    /// Redeem unstaked hodl balance directly; only while the live price is at
    /// or above the strike.
    #[odra(non_reentrant)]
    pub fn redeem_tokens(&mut self, strike: U256, amount: U512) -> U512 {
        if amount.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }
        if !self.fresh_price().crosses(strike) {
            self.env().revert(VaultError::NotRedeemable);
        }
        let caller = self.env().caller();
        self.hodl.burn(caller, strike, amount);

        let mut acc = self.load_accumulator();
        if let Some(epoch_id) = self.open_epoch_of(strike) {
            self.close_epoch(&mut acc, epoch_id);
        }
        let paid = self.pay_principal(&mut acc, amount, caller);
        self.accumulator.set(acc);

        self.env().emit_event(TokensRedeemed {
            owner: caller,
            strike,
            amount,
            paid,
        });
        paid
    }

    // ===========================================================================
    // YIELD POSITIONS
    // ===========================================================================

    /// Stake the caller's unstaked y balance into the strike's current epoch,
    /// on behalf of `recipient`.
    #[odra(non_reentrant)]
    pub fn y_stake(&mut self, strike: U256, amount: U512, recipient: Address) -> u64 {
        if amount.is_zero() {
            self.env().revert(VaultError::InvalidAmount);
        }
        let epoch_id = self
            .open_epoch_of(strike)
            .unwrap_or_revert_with(&self.env(), VaultError::EpochNotFound);

        let mut acc = self.load_accumulator();
        let index = self.checkpoint(&mut acc, epoch_id);

        let caller = self.env().caller();
        self.y.burn(caller, strike, amount);

        let mut staked = self.y_staked.get_or_default(&epoch_id);
        acc.add_stake(&mut staked, amount).unwrap_or_revert(&self.env());
        let stake = YStake::new(recipient, epoch_id, amount, index).unwrap_or_revert(&self.env());

        let stake_id = self.next_id();
        self.y_staked.set(&epoch_id, staked);
        self.y_stakes.set(&stake_id, stake);
        self.accumulator.set(acc);

        self.env().emit_event(YStaked {
            stake_id,
            owner: recipient,
            epoch_id,
            amount,
        });
        stake_id
    }

    /// Unstake a y stake in full, locking in what it has earned so far.
    #[odra(non_reentrant)]
    pub fn y_unstake(&mut self, stake_id: u64, recipient: Address) {
        let mut stake = self.owned_y_stake(stake_id);
        let epoch_id = stake.epoch_id;
        let epoch = self.epoch_or_revert(epoch_id);
        if epoch.closed {
            self.env().revert(VaultError::EpochClosed);
        }

        let mut acc = self.load_accumulator();
        let index = self.checkpoint(&mut acc, epoch_id);
        let amount = stake.freeze(index).unwrap_or_revert(&self.env());

        let mut staked = self.y_staked.get_or_default(&epoch_id);
        acc.remove_stake(&mut staked, amount).unwrap_or_revert(&self.env());
        self.y_staked.set(&epoch_id, staked);
        self.y_stakes.set(&stake_id, stake);
        self.accumulator.set(acc);

        self.y.mint(recipient, epoch.strike, amount);

        self.env().emit_event(YUnstaked {
            stake_id,
            recipient,
            amount,
        });
    }

    /// Pay out the yield accrued by a y stake.
    #[odra(non_reentrant)]
    pub fn claim(&mut self, stake_id: u64) -> U512 {
        let mut stake = self.owned_y_stake(stake_id);
        let mut acc = self.load_accumulator();
        let owed = self.claimable_with(&acc, &stake);
        if owed.is_zero() {
            return U512::zero();
        }

        let owner = stake.owner;
        stake.record_claim(owed).unwrap_or_revert(&self.env());
        self.y_stakes.set(&stake_id, stake);
        let paid = self.pay_yield(&mut acc, owed, owner);
        self.accumulator.set(acc);

        self.env().emit_event(Claimed {
            stake_id,
            owner,
            amount: owed,
            paid,
        });
        paid
    }

    // ===========================================================================
    // LEDGER TRANSFERS
    // ===========================================================================

    #[odra(non_reentrant)]
    /// Move unstaked hodl balance at `strike` from the caller to `to`.
    pub fn transfer_hodl(&mut self, to: Address, strike: U256, amount: U512) {
        let caller = self.env().caller();
        self.hodl.transfer(caller, to, strike, amount);
    }

    #[odra(non_reentrant)]
    /// Move unstaked y balance at `strike` from the caller to `to`.
    pub fn transfer_y(&mut self, to: Address, strike: U256, amount: U512) {
        let caller = self.env().caller();
        self.y.transfer(caller, to, strike, amount);
    }

    // ===========================================================================
    // VIEWS
    // ===========================================================================

    /// Whether the hodl stake may redeem now, using `round` as crossing evidence when given.
    pub fn can_redeem(&self, stake_id: u64, round: Option<u64>) -> bool {
        let stake = self
            .hodl_stakes
            .get(&stake_id)
            .unwrap_or_revert_with(&self.env(), VaultError::StakeNotFound);
        self.stake_can_redeem(&stake, round)
    }

    /// Yield the y stake could claim right now.
    pub fn claimable(&self, stake_id: u64) -> U512 {
        let stake = self
            .y_stakes
            .get(&stake_id)
            .unwrap_or_revert_with(&self.env(), VaultError::StakeNotFound);
        self.claimable_with(&self.load_accumulator(), &stake)
    }

    /// Yield attributed to the stakers of `epoch_id` since it opened.
    pub fn cumulative_yield(&self, epoch_id: u64) -> U512 {
        let epoch = self.epoch_or_revert(epoch_id);
        let live = self.live_index(&self.load_accumulator());
        epoch
            .cumulative_yield_at(self.y_staked.get_or_default(&epoch_id), live)
            .unwrap_or_revert(&self.env())
    }

    /// Yield earned by the whole pool since inception, claimed or not.
    pub fn total_cumulative_yield(&self) -> U512 {
        self.load_accumulator()
            .total_cumulative_yield(self.custodian().balance())
            .unwrap_or_revert(&self.env())
    }

    /// Live yield-per-staked-unit index, WAD scaled.
    pub fn yield_per_unit(&self) -> U512 {
        self.live_index(&self.load_accumulator()).to_scaled_val()
    }

    pub fn config(&self) -> EngineConfig {
        self.config.get_or_revert_with(VaultError::NotInitialized)
    }

    pub fn epoch(&self, epoch_id: u64) -> Option<Epoch> {
        self.epochs.get(&epoch_id)
    }

    /// Latest epoch of `strike`, open or closed.
    pub fn epoch_of_strike(&self, strike: U256) -> Option<u64> {
        self.strike_to_epoch.get(&strike)
    }

    pub fn hodl_stake_info(&self, stake_id: u64) -> Option<HodlStake> {
        self.hodl_stakes.get(&stake_id)
    }

    pub fn y_stake_info(&self, stake_id: u64) -> Option<YStake> {
        self.y_stakes.get(&stake_id)
    }

    /// Collateral deposited, net of nominal principal withdrawals.
    pub fn deposits(&self) -> U512 {
        self.load_accumulator().deposits
    }

    /// Amount of y positions staked in `epoch_id`.
    pub fn y_staked(&self, epoch_id: u64) -> U512 {
        self.y_staked.get_or_default(&epoch_id)
    }

    /// Amount of y positions staked across all open epochs.
    pub fn y_staked_total(&self) -> U512 {
        self.load_accumulator().staked_total
    }

    /// Nominal yield claimed so far.
    pub fn claimed_total(&self) -> U512 {
        self.load_accumulator().claimed
    }

    /// Unstaked hodl balance of `owner` at `strike`.
    pub fn hodl_balance_of(&self, owner: Address, strike: U256) -> U512 {
        self.hodl.balance_of(owner, strike)
    }

    /// Unstaked y balance of `owner` in the strike's live generation.
    pub fn y_balance_of(&self, owner: Address, strike: U256) -> U512 {
        self.y.balance_of(owner, strike)
    }

    /// Unstaked hodl supply at `strike`.
    pub fn hodl_total_supply(&self, strike: U256) -> U512 {
        self.hodl.total_supply(strike)
    }

    /// Unstaked y supply in the strike's live generation.
    pub fn y_total_supply(&self, strike: U256) -> U512 {
        self.y.total_supply(strike)
    }
}

// ===========================================================================
// INTERNALS
// ===========================================================================

impl StrikeVault {
    fn custodian(&self) -> CustodianContractRef {
        CustodianContractRef::new(self.env(), self.config().custodian)
    }

    fn oracle(&self) -> OracleContractRef {
        OracleContractRef::new(self.env(), self.config().oracle)
    }

    fn load_accumulator(&self) -> Accumulator {
        self.accumulator.get_or_default()
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id.get().unwrap_or(FIRST_ID);
        let next = id
            .checked_add(1)
            .unwrap_or_revert_with(&self.env(), VaultError::MathOverflow);
        self.next_id.set(next);
        id
    }

    /// Latest oracle reading, rejected when older than the freshness window.
    fn fresh_price(&self) -> PriceReading {
        let oracle = self.oracle();
        let reading = PriceReading::new(oracle.current_price(), oracle.current_timestamp());
        if reading.is_stale(self.env().get_block_time(), self.config().max_price_age) {
            self.env().revert(VaultError::StalePrice);
        }
        reading
    }

    fn reading_at(&self, round: u64) -> PriceReading {
        let oracle = self.oracle();
        PriceReading::new(oracle.price_at(round), oracle.timestamp_at(round))
    }

    fn epoch_or_revert(&self, epoch_id: u64) -> Epoch {
        self.epochs
            .get(&epoch_id)
            .unwrap_or_revert_with(&self.env(), VaultError::EpochNotFound)
    }

    /// Current epoch of `strike`, if one is open.
    fn open_epoch_of(&self, strike: U256) -> Option<u64> {
        let epoch_id = self.strike_to_epoch.get(&strike)?;
        match self.epochs.get(&epoch_id) {
            Some(epoch) if !epoch.closed => Some(epoch_id),
            _ => None,
        }
    }

    fn open_epoch(&mut self, strike: U256) -> u64 {
        let epoch_id = self.next_id();
        let opened_at = self.env().get_block_time();
        self.epochs.set(&epoch_id, Epoch::open(strike, opened_at));
        self.strike_to_epoch.set(&strike, epoch_id);
        self.env().emit_event(EpochOpened {
            epoch_id,
            strike,
            opened_at,
        });
        epoch_id
    }

    fn live_index(&self, acc: &Accumulator) -> YieldIndex {
        acc.live_index(self.custodian().balance())
            .unwrap_or_revert(&self.env())
    }

    /// Synchronise the global index and the epoch's snapshot. Must run before
    /// anything touches `staked_total` or freezes the epoch.
    fn checkpoint(&mut self, acc: &mut Accumulator, epoch_id: u64) -> YieldIndex {
        let mut epoch = self.epoch_or_revert(epoch_id);
        let staked = self.y_staked.get_or_default(&epoch_id);
        let index = acc
            .checkpoint(&mut epoch, staked, self.custodian().balance())
            .unwrap_or_revert(&self.env());
        self.epochs.set(&epoch_id, epoch);
        index
    }

    /// Close `epoch_id` and open the next epoch of the same strike. No-op when
    /// the epoch is already closed.
    fn close_epoch(&mut self, acc: &mut Accumulator, epoch_id: u64) {
        let mut epoch = self.epoch_or_revert(epoch_id);
        if epoch.closed {
            return;
        }
        let mut staked = self.y_staked.get_or_default(&epoch_id);
        acc.close_epoch(&mut epoch, &mut staked, self.custodian().balance())
            .unwrap_or_revert(&self.env());
        self.y_staked.set(&epoch_id, staked);

        let strike = epoch.strike;
        self.y.invalidate(strike);
        self.epochs.set(&epoch_id, epoch);
        let next_epoch_id = self.open_epoch(strike);

        self.env().emit_event(EpochClosed {
            epoch_id,
            strike,
            next_epoch_id,
        });
    }

    fn stake_can_redeem(&self, stake: &HodlStake, round: Option<u64>) -> bool {
        let epoch = self.epoch_or_revert(stake.epoch_id);
        if epoch.closed {
            return true;
        }
        let reading = match round {
            Some(round) => self.reading_at(round),
            None => self.fresh_price(),
        };
        epoch.accepts_evidence(&reading)
    }

    fn claimable_with(&self, acc: &Accumulator, stake: &YStake) -> U512 {
        let epoch = self.epoch_or_revert(stake.epoch_id);
        let index = epoch.effective_index(self.live_index(acc));
        stake.claimable(index).unwrap_or_revert(&self.env())
    }

    /// Return principal. `deposits` shrinks by `nominal` whatever is paid.
    fn pay_principal(
        &mut self,
        acc: &mut Accumulator,
        nominal: U512,
        recipient: Address,
    ) -> U512 {
        let paid = self.withdraw_adjusted(acc, nominal, recipient);
        acc.record_withdrawal(nominal).unwrap_or_revert(&self.env());
        paid
    }

    /// Pay out yield, booked as claimed at its nominal value.
    fn pay_yield(
        &mut self,
        acc: &mut Accumulator,
        nominal: U512,
        recipient: Address,
    ) -> U512 {
        let paid = self.withdraw_adjusted(acc, nominal, recipient);
        acc.record_claim(nominal).unwrap_or_revert(&self.env());
        paid
    }

    /// Single exit for collateral. Scales `nominal` down after a negative rebase.
    fn withdraw_adjusted(
        &mut self,
        acc: &Accumulator,
        nominal: U512,
        recipient: Address,
    ) -> U512 {
        let mut custodian = self.custodian();
        let paid = acc
            .adjust_withdrawal(nominal, custodian.balance())
            .unwrap_or_revert(&self.env());
        custodian.withdraw(paid, recipient);
        paid
    }

    fn owned_hodl_stake(&self, stake_id: u64) -> HodlStake {
        let stake = self
            .hodl_stakes
            .get(&stake_id)
            .unwrap_or_revert_with(&self.env(), VaultError::StakeNotFound);
        if stake.owner != self.env().caller() {
            self.env().revert(VaultError::NotStakeOwner);
        }
        stake
    }

    fn owned_y_stake(&self, stake_id: u64) -> YStake {
        let stake = self
            .y_stakes
            .get(&stake_id)
            .unwrap_or_revert_with(&self.env(), VaultError::StakeNotFound);
        if stake.owner != self.env().caller() {
            self.env().revert(VaultError::NotStakeOwner);
        }
        stake
    }
}

// ===========================================================================
// EVENTS
// ===========================================================================

#[odra::event]
pub struct Minted {
    pub owner: Address,
    pub strike: U256,
    pub epoch_id: u64,
    pub amount: U512,
    pub fee: U512,
}

#[odra::event]
pub struct EpochOpened {
    pub epoch_id: u64,
    pub strike: U256,
    pub opened_at: u64,
}

#[odra::event]
pub struct EpochClosed {
    pub epoch_id: u64,
    pub strike: U256,
    pub next_epoch_id: u64,
}

#[odra::event]
pub struct HodlStaked {
    pub stake_id: u64,
    pub owner: Address,
    pub epoch_id: u64,
    pub amount: U512,
}

#[odra::event]
pub struct HodlUnstaked {
    pub stake_id: u64,
    pub recipient: Address,
    pub amount: U512,
}

#[odra::event]
pub struct YStaked {
    pub stake_id: u64,
    pub owner: Address,
    pub epoch_id: u64,
    pub amount: U512,
}

#[odra::event]
pub struct YUnstaked {
    pub stake_id: u64,
    pub recipient: Address,
    pub amount: U512,
}

#[odra::event]
pub struct Redeemed {
    pub stake_id: u64,
    pub epoch_id: u64,
    pub amount: U512,
    pub paid: U512,
}

#[odra::event]
pub struct TokensRedeemed {
    pub owner: Address,
    pub strike: U256,
    pub amount: U512,
    pub paid: U512,
}

#[odra::event]
pub struct Merged {
    pub owner: Address,
    pub strike: U256,
    pub amount: U512,
    pub paid: U512,
}

#[odra::event]
pub struct Claimed {
    pub stake_id: u64,
    pub owner: Address,
    pub amount: U512,
    pub paid: U512,
}
