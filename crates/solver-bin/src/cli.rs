use std::{net::SocketAddr, path::PathBuf};

/// Arg types favour explicit fields over a free-form map so a misconfigured
/// deployment fails at startup rather than mid-auction.
#[derive(Debug, clap::Parser)]
pub struct Args {
    /// Overrides the configured listen address.
    #[clap(long, env = "SOLVER_BIND_ADDR")]
    pub bind_addr: Option<SocketAddr>,
    /// Optional TOML configuration file; CLI flags and environment
    /// variables still take precedence over anything it sets.
    #[clap(long, env = "SOLVER_CONFIG")]
    pub config: Option<PathBuf>,
    /// RPC endpoint used for pool-state fetches outside the `/solve` path.
    /// Unused by the pure solve pipeline itself.
    #[clap(long, env = "ETHEREUM_RPC_URL")]
    pub ethrpc: Option<String>,
    /// This solver's identity in outbound calldata. Unused by `/solve`.
    #[clap(long, env = "SOLVER_ADDRESS")]
    pub solver_address: Option<String>,
}
