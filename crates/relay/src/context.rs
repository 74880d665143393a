//! Ledger backend selection and shared command state

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use camino::Utf8Path;
use relay_core::types::RelayConfig;
use relay_core::ConfigLoader;
use relay_ledger::{Address, Coins, ContestFactory, GatewayClient, LedgerClient, SandboxLedger};
use tracing::{debug, info};

/// Factory used by the sandbox when none is configured
const SANDBOX_FACTORY: &str = "EQAU5chXz9IKIIqCbYCfHpOGfaF-Ec1Mq2_VMWQoJU2SvSJK";

/// Reads the sandbox factory answers before it counts a new contest
const SANDBOX_VISIBILITY_LAG: u32 = 2;

/// Null address lookups the sandbox returns for a freshly visible contest
const SANDBOX_ADDRESS_LAG: u32 = 1;

/// Everything a command needs: resolved configuration and a ledger client
pub struct RelayContext {
    pub config: RelayConfig,
    pub client: Arc<dyn LedgerClient>,
}

impl RelayContext {
    /// Load configuration and connect to the selected ledger
    pub fn load(config_path: Option<&Utf8Path>, sandbox: bool) -> Result<Self> {
        let loaded = ConfigLoader::new()?.load(config_path)?;
        if let Some(source) = &loaded.source {
            debug!(path = %source, "using configuration file");
        }
        Self::from_config(loaded.config, sandbox)
    }

    pub fn from_config(config: RelayConfig, sandbox: bool) -> Result<Self> {
        let client: Arc<dyn LedgerClient> = if sandbox {
            let factory = match &config.contest.factory_address {
                Some(address) => Address::parse(address)?,
                None => Address::parse(SANDBOX_FACTORY)?,
            };
            info!(factory = %factory, "using in-memory sandbox ledger");
            Arc::new(
                SandboxLedger::new(factory)
                    .with_visibility_lag(SANDBOX_VISIBILITY_LAG)
                    .with_address_lag(SANDBOX_ADDRESS_LAG),
            )
        } else {
            let gateway = GatewayClient::from_config(&config.network)
                .context("Failed to build gateway client")?;
            info!(endpoint = gateway.endpoint(), "using ledger gateway");
            Arc::new(gateway)
        };

        Ok(Self { config, client })
    }

    /// Factory at `override_address`, or the configured one
    pub fn factory(&self, override_address: Option<&str>) -> Result<ContestFactory> {
        let raw = match (override_address, &self.config.contest.factory_address) {
            (Some(address), _) => address,
            (None, Some(address)) => address.as_str(),
            (None, None) if self.client.name() == "sandbox" => SANDBOX_FACTORY,
            (None, None) => {
                return Err(anyhow!(
                    "No factory address configured (set contest.factory-address, RELAY_FACTORY_ADDRESS or --factory)"
                ))
            }
        };
        let address = Address::parse(raw)?;
        Ok(ContestFactory::new(self.client.clone(), address))
    }

    /// Parse an amount from configuration or a flag
    pub fn coins(&self, amount: &str) -> Result<Coins> {
        Ok(Coins::parse(amount)?)
    }
}
