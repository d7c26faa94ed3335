//! Configuration merge: CLI flags > environment variables > an optional TOML
//! file > built-in defaults, matching the `autopilot::config::native_price`
//! deserialize idiom (kebab-case fields, `#[serde(default = "fn")]`).

use {
    eth::TokenAddress,
    serde::Deserialize,
    std::{net::SocketAddr, time::Duration},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default = "default_deadline", with = "humantime_serde")]
    pub deadline: Duration,
    #[serde(default = "default_oracle_timeout", with = "humantime_serde")]
    pub oracle_timeout: Duration,
    #[serde(default = "default_oracle_coverage_threshold")]
    pub oracle_coverage_threshold: f64,
    #[serde(default = "default_oracle_batch_concurrency")]
    pub oracle_batch_concurrency: usize,
    #[serde(default = "default_max_hops")]
    pub max_hops: u32,
    #[serde(default = "default_intermediary_tokens")]
    pub intermediary_tokens: Vec<TokenAddress>,
    #[serde(default = "default_gas_base")]
    pub gas_base: u64,
    #[serde(default = "default_gas_per_extra_hop")]
    pub gas_per_extra_hop: u64,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deadline: default_deadline(),
            oracle_timeout: default_oracle_timeout(),
            oracle_coverage_threshold: default_oracle_coverage_threshold(),
            oracle_batch_concurrency: default_oracle_batch_concurrency(),
            max_hops: default_max_hops(),
            intermediary_tokens: default_intermediary_tokens(),
            gas_base: default_gas_base(),
            gas_per_extra_hop: default_gas_per_extra_hop(),
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_deadline() -> Duration {
    Duration::from_secs(10)
}

fn default_oracle_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_oracle_coverage_threshold() -> f64 {
    0.70
}

fn default_oracle_batch_concurrency() -> usize {
    10
}

fn default_max_hops() -> u32 {
    3
}

fn default_gas_base() -> u64 {
    150_000
}

fn default_gas_per_extra_hop() -> u64 {
    100_000
}

fn default_listen_addr() -> SocketAddr {
    "127.0.0.1:7872".parse().unwrap()
}

/// WETH/USDC/USDT/DAI/WBTC mainnet addresses, the hard-coded intermediary
/// list the source carried; kept only as the *default* value of a
/// configuration field instead.
fn default_intermediary_tokens() -> Vec<TokenAddress> {
    [
        "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", // WETH
        "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", // USDC
        "0xdAC17F958D2ee523a2206206994597C13D831ec7", // USDT
        "0x6B175474E89094C44Da98b954EedeAC495271d0F", // DAI
        "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599", // WBTC
    ]
    .iter()
    .map(|s| s.parse().expect("hard-coded address is valid"))
    .collect()
}

/// Loads configuration from an optional TOML file, falling back to
/// [`Config::default`] for anything the file doesn't set. CLI flags and
/// environment variables are layered on top of this by [`crate::cli::Args`]
/// itself (clap's `env` attribute reads the environment directly).
pub fn load(path: Option<&std::path::Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&contents)?)
}
