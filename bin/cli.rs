//! Deploys the strike vault together with its oracle and custodian, and
//! reports the vault's yield accounting.

use odra::host::{HostEnv, NoArgs};
use odra::prelude::Addressable;

use odra_cli::{
    deploy::DeployScript,
    scenario::{Args, Error, Scenario, ScenarioMetadata},
    CommandArg, ContractProvider, DeployedContractsContainer, DeployerExt, OdraCli,
};

use strike_vault::{
    custodian::YieldSource,
    math::YieldIndex,
    oracle::PriceOracle,
    processor::{StrikeVault, StrikeVaultInitArgs},
};

const DEPLOY_GAS: u64 = 200_000_000_000;
const CALL_GAS: u64 = 5_000_000_000;

/// 0.5%
const FEE_BPS: u32 = 50;
/// One hour, in milliseconds.
const MAX_PRICE_AGE: u64 = 3_600_000;

pub struct VaultDeployScript;

impl DeployScript for VaultDeployScript {
    fn deploy(
        &self,
        env: &HostEnv,
        container: &mut DeployedContractsContainer,
    ) -> Result<(), odra_cli::deploy::Error> {
        let oracle = PriceOracle::load_or_deploy(env, NoArgs, container, DEPLOY_GAS)?;
        log::info!("price oracle at {:?}", oracle.address());

        let mut custodian = YieldSource::load_or_deploy(env, NoArgs, container, DEPLOY_GAS)?;
        log::info!("custodian at {:?}", custodian.address());

        let vault = StrikeVault::load_or_deploy(
            env,
            StrikeVaultInitArgs {
                oracle: oracle.address(),
                custodian: custodian.address(),
                treasury: env.caller(),
                fee_bps: FEE_BPS,
                max_price_age: MAX_PRICE_AGE,
            },
            container,
            DEPLOY_GAS,
        )?;
        log::info!("strike vault at {:?}", vault.address());

        if custodian.operator().is_none() {
            env.set_gas(CALL_GAS);
            custodian.set_operator(vault.address());
            log::info!("custodian operator bound to the vault");
        }

        Ok(())
    }
}

/// Prints the vault's global yield counters.
pub struct YieldReportScenario;

impl Scenario for YieldReportScenario {
    fn args(&self) -> Vec<CommandArg> {
        vec![]
    }

    fn run(
        &self,
        env: &HostEnv,
        container: &DeployedContractsContainer,
        _args: Args,
    ) -> Result<(), Error> {
        let vault = container.contract_ref::<StrikeVault>(env)?;
        let custodian = container.contract_ref::<YieldSource>(env)?;

        log::info!("custodian balance:   {}", custodian.balance());
        log::info!("deposits:            {}", vault.deposits());
        log::info!("cumulative yield:    {}", vault.total_cumulative_yield());
        log::info!("claimed:             {}", vault.claimed_total());
        log::info!(
            "yield per unit:      {}",
            YieldIndex::from_scaled_val(vault.yield_per_unit())
        );
        log::info!("staked y positions:  {}", vault.y_staked_total());

        Ok(())
    }
}

impl ScenarioMetadata for YieldReportScenario {
    const NAME: &'static str = "yield-report";
    const DESCRIPTION: &'static str = "Prints deposits, cumulative yield and claims of the vault";
}

pub fn main() {
    OdraCli::new()
        .about("CLI tool for the strike vault")
        .deploy(VaultDeployScript)
        .contract::<PriceOracle>()
        .contract::<YieldSource>()
        .contract::<StrikeVault>()
        .scenario(YieldReportScenario)
        .build()
        .run();
}
