// crates/tally-daemon/src/config.rs
//
// Runtime configuration for the Tally daemon.
// Loaded from a TOML file or populated with sensible defaults.
//
// Contract parameters live in their own tables ([liquidity], [stablecoin],
// [referral], [rewards]); `owner` and `oracles` sit at the top level next to
// the daemon settings.
//
// Every duration and rate in the contract tables is read in clock units:
// seconds under the system clock, blocks under the block clock. That covers
// lock tier `min_duration`, `halving_interval_secs`, the streak
// `window_secs`, promo `start`/`end`, `early_bird_deadline`, and the
// per-second emission rates. The defaults are written for the system clock;
// a block-mode config has to restate them in blocks.

use serde::Deserialize;
use std::fs;

use tally_economics::RuntimeConfig;

/// A starting balance minted by the owner at startup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GenesisAllocation {
    pub account: String,
    pub asset: String,
    /// Amount in base units.
    pub amount: u64,
}

/// Runtime configuration for the daemon.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Host address for the RPC server.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    /// Port for the RPC server.
    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Clock source: "system" (unix seconds) or "block" (block height).
    /// Contract durations and rates are interpreted in this clock's units.
    #[serde(default = "default_clock_mode")]
    pub clock_mode: String,

    /// Wall-clock seconds between blocks in block mode.
    #[serde(default = "default_block_time_secs")]
    pub block_time_secs: u64,

    /// Block height the block clock starts at.
    #[serde(default)]
    pub start_block: u64,

    /// Owner, oracles, and per-contract parameters.
    #[serde(flatten)]
    pub runtime: RuntimeConfig,

    /// Balances minted at startup.
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    50051
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_clock_mode() -> String {
    "system".to_string()
}

fn default_block_time_secs() -> u64 {
    12
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            log_level: default_log_level(),
            clock_mode: default_clock_mode(),
            block_time_secs: default_block_time_secs(),
            start_block: 0,
            runtime: RuntimeConfig::default(),
            genesis: Vec::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from a TOML file at the given path.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: DaemonConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        match self.clock_mode.as_str() {
            "system" => {}
            "block" => {
                if self.block_time_secs == 0 {
                    return Err("block_time_secs must be greater than zero".to_string());
                }
            }
            other => {
                return Err(format!(
                    "Unknown clock mode: {}. Use 'system' or 'block'.",
                    other
                ))
            }
        }
        if let Some(bad) = self.genesis.iter().find(|g| g.amount == 0) {
            return Err(format!(
                "genesis allocation of {} to {} has zero amount",
                bad.asset, bad.account
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = DaemonConfig::parse("").unwrap();
        assert_eq!(config.rpc_port, 50051);
        assert_eq!(config.clock_mode, "system");
        assert_eq!(config.runtime.owner, "owner");
        assert!(config.genesis.is_empty());
    }

    #[test]
    fn test_parses_contract_tables_and_genesis() {
        let toml = r#"
            rpc_port = 6000
            clock_mode = "block"
            block_time_secs = 2
            owner = "alice"
            oracles = ["bot"]

            [stablecoin]
            collateral_ratio_bp = 20000

            [[genesis]]
            account = "bob"
            asset = "LP"
            amount = 5000
        "#;
        let config = DaemonConfig::parse(toml).unwrap();
        assert_eq!(config.rpc_port, 6000);
        assert_eq!(config.clock_mode, "block");
        assert_eq!(config.runtime.owner, "alice");
        assert_eq!(config.runtime.oracles, vec!["bot".to_string()]);
        assert_eq!(config.runtime.stablecoin.collateral_ratio_bp, 20000);
        assert_eq!(config.runtime.stablecoin.mint_fee_bp, 50);
        assert_eq!(
            config.genesis,
            vec![GenesisAllocation {
                account: "bob".to_string(),
                asset: "LP".to_string(),
                amount: 5000,
            }]
        );
    }

    #[test]
    fn test_block_mode_durations_are_taken_in_blocks() {
        let toml = r#"
            clock_mode = "block"
            block_time_secs = 12

            [liquidity]
            reward_rate_per_sec = 120
            tiers = [
                { min_duration = 7200, multiplier_bp = 12000 },
                { min_duration = 21600, multiplier_bp = 15000 },
            ]

            [referral.streak]
            window_secs = 7200
            per_task_bonus_pct = 5
            max_bonus_pct = 50
        "#;
        let config = DaemonConfig::parse(toml).unwrap();
        let liquidity = &config.runtime.liquidity;
        assert_eq!(liquidity.reward_rate_per_sec, 120);
        assert_eq!(liquidity.tiers[0].min_duration, 7200);
        assert_eq!(liquidity.tiers[1].min_duration, 21600);
        assert_eq!(config.runtime.referral.streak.window_secs, 7200);
    }

    #[test]
    fn test_rejects_unknown_clock_mode() {
        assert!(DaemonConfig::parse("clock_mode = \"lunar\"").is_err());
    }

    #[test]
    fn test_rejects_zero_block_time() {
        assert!(DaemonConfig::parse("clock_mode = \"block\"\nblock_time_secs = 0").is_err());
    }
}
