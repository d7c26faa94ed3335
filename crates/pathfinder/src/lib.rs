//! The liquidity pathfinder (C6): routes a single order through the pool
//! snapshot, direct or via up to [`Config::max_hops`] whitelisted
//! intermediary tokens, picking the route that delivers the most output.

use {
    eth::{Gas, GasPrice, TokenAddress},
    order::{Kind, ParsedOrder},
    pools::Pool,
    settlement::{ExecutionPath, Hop},
};

#[derive(Debug, Clone)]
pub struct Config {
    pub max_hops: u32,
    pub intermediary_tokens: Vec<TokenAddress>,
    pub gas_base: u64,
    pub gas_per_extra_hop: u64,
    /// Priced against each candidate route's gas estimate so the pathfinder
    /// picks the route with the best net surplus, not just the best output.
    pub gas_price: GasPrice,
}

impl Config {
    fn gas_for(&self, hops: usize) -> u64 {
        self.gas_base + self.gas_per_extra_hop * (hops.saturating_sub(1) as u64)
    }
}

struct Best {
    hops: Vec<Hop>,
    amount_out: alloy_primitives::U256,
    gas: u64,
    net: alloy_primitives::U256,
}

/// An order's surplus at a candidate `amount_out`, used only to rank routes
/// against their gas cost. Sell orders measure it against their minimum
/// acceptable buy amount; buy orders have no such floor at this layer (their
/// surplus lives on the sell side, scored properly once the final solution
/// is built), so more output is simply taken as strictly better.
fn surplus(order: &ParsedOrder, amount_out: alloy_primitives::U256) -> alloy_primitives::U256 {
    match order.kind() {
        Kind::Sell => amount_out.saturating_sub(order.min_buy_after_fee.unwrap_or_default()),
        Kind::Buy => amount_out,
    }
}

/// Finds the best route for `order` through `pools`, or `None` if no route
/// within the hop budget connects its sell and buy tokens.
///
/// Sell orders route their post-fee sell amount forward to the buy token;
/// buy orders route the most they're willing to pay (`max_sell_after_fee`)
/// forward the same way, and the caller compares the resulting output
/// against what the order actually demands.
pub fn find_path(order: &ParsedOrder, pools: &[Pool], config: &Config) -> Option<ExecutionPath> {
    let amount_in = match order.kind() {
        Kind::Sell => order
            .order
            .sell_amount
            .checked_sub(order.order.fee_amount)?,
        Kind::Buy => order.max_sell_after_fee?,
    };

    let mut best: Option<Best> = None;
    explore(
        order.sell_token(),
        order.buy_token(),
        amount_in,
        &mut Vec::new(),
        pools,
        order,
        config,
        &mut best,
    );

    best.map(|b| ExecutionPath {
        order: order.uid().clone(),
        hops: b.hops,
        amount_in,
        amount_out: b.amount_out,
        gas_estimate: b.gas,
    })
}

fn explore(
    current_token: TokenAddress,
    target_token: TokenAddress,
    amount: alloy_primitives::U256,
    path: &mut Vec<Hop>,
    pools: &[Pool],
    order: &ParsedOrder,
    config: &Config,
    best: &mut Option<Best>,
) {
    if !path.is_empty() && current_token == target_token {
        consider(path, amount, order, config, best);
    }
    if path.len() >= config.max_hops as usize {
        return;
    }

    for pool in pools {
        if !pool.is_quotable() {
            continue;
        }
        let Some(idx_in) = pool.tokens.iter().position(|t| *t == current_token) else {
            continue;
        };
        for (idx_out, &token_out) in pool.tokens.iter().enumerate() {
            if idx_out == idx_in {
                continue;
            }
            if token_out != target_token && !config.intermediary_tokens.contains(&token_out) {
                continue;
            }
            if path
                .iter()
                .any(|h| h.token_in == token_out || h.token_out == token_out)
            {
                continue;
            }
            let amount_out = match pool.quote(current_token, token_out, amount) {
                Ok(amount_out) => amount_out,
                Err(err) => {
                    tracing::trace!(%err, reason = "pool_unquotable", pool = ?pool.address, "skipping pool");
                    continue;
                }
            };

            path.push(Hop {
                pool: pool.address,
                token_in: current_token,
                token_out,
                amount_in: amount,
                amount_out,
            });
            explore(token_out, target_token, amount_out, path, pools, order, config, best);
            path.pop();
        }
    }
}

fn consider(path: &[Hop], amount_out: alloy_primitives::U256, order: &ParsedOrder, config: &Config, best: &mut Option<Best>) {
    let gas = config.gas_for(path.len());
    let gas_cost = Gas(gas).cost(config.gas_price).0;
    let net = surplus(order, amount_out).saturating_sub(gas_cost);
    let is_better = match best {
        None => true,
        Some(current) => match net.cmp(&current.net) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => match path.len().cmp(&current.hops.len()) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Greater => false,
                std::cmp::Ordering::Equal => gas < current.gas,
            },
        },
    };
    if is_better {
        *best = Some(Best {
            hops: path.to_vec(),
            amount_out,
            gas,
            net,
        });
    }
}
