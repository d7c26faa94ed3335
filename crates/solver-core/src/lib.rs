//! The solver driver (C9): wires the CoW matcher, pathfinder, uniform-price
//! enforcer, oracle and solution builder into a single `solve` call, under
//! one deadline for the whole auction.

use {
    eth::{GasPrice, OrderUid, TokenAddress},
    order::{Order, ParsedOrder},
    pools::Pool,
    settlement::Settlement,
    solution::Solution,
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
        time::Duration,
    },
    tokio_util::sync::CancellationToken,
};

pub use alloy_primitives::U256;

#[derive(Debug, Clone)]
pub struct Request {
    pub orders: Vec<Order>,
    pub pools: Vec<Pool>,
    /// Prices the auction itself supplies, tried before any external
    /// source.
    pub native_prices: HashMap<TokenAddress, U256>,
    pub gas_price: GasPrice,
    /// Unix timestamp the solve request was issued at, used to reject
    /// already-expired orders.
    pub now: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Response {
    pub solutions: Vec<Solution>,
    /// Set when the configured deadline fired before `solve_inner` produced
    /// a result, so the HTTP layer can report 408 instead of an ordinary
    /// empty solution list.
    pub deadline_exceeded: bool,
}

pub struct Driver {
    oracle: Arc<oracle::Aggregator>,
    pathfinder_config: pathfinder::Config,
    deadline: Duration,
}

impl Driver {
    pub fn new(oracle: Arc<oracle::Aggregator>, pathfinder_config: pathfinder::Config, deadline: Duration) -> Self {
        Self { oracle, pathfinder_config, deadline }
    }

    /// Solves one auction, racing the whole pipeline against the configured
    /// deadline and an external cancellation signal. Never errors: every
    /// failure mode (an unparsable order, an unquotable pool, insufficient
    /// oracle coverage) degrades to fewer settlements rather than aborting
    /// the request, down to an empty solution list in the worst case.
    pub async fn solve(&self, request: Request, cancellation: CancellationToken) -> Response {
        if cancellation.is_cancelled() {
            return Response::default();
        }
        tokio::select! {
            response = self.solve_inner(request, &cancellation) => response,
            _ = tokio::time::sleep(self.deadline) => {
                tracing::warn!(reason = "deadline_exceeded", "solve deadline exceeded");
                Response { solutions: Vec::new(), deadline_exceeded: true }
            }
            _ = cancellation.cancelled() => Response::default(),
        }
    }

    async fn solve_inner(&self, request: Request, cancellation: &CancellationToken) -> Response {
        let parsed = parse_orders(request.orders, request.now);
        let orders_by_uid: HashMap<OrderUid, ParsedOrder> =
            parsed.iter().map(|o| (o.uid().clone(), o.clone())).collect();

        let cow_matches = matching::find_matches(&parsed);
        let matched: HashSet<OrderUid> = cow_matches
            .iter()
            .flat_map(|m| [m.sell_x_order.clone(), m.sell_y_order.clone()])
            .collect();

        // The gas price is per-request; everything else about the
        // pathfinder's config is fixed at startup.
        let pathfinder_config = pathfinder::Config {
            gas_price: request.gas_price,
            ..self.pathfinder_config.clone()
        };

        let mut settlements: Vec<Settlement> = cow_matches.into_iter().map(Settlement::Cow).collect();
        for order in parsed.iter().filter(|o| !matched.contains(o.uid())) {
            if cancellation.is_cancelled() {
                break;
            }
            if let Some(path) = pathfinder::find_path(order, &request.pools, &pathfinder_config) {
                settlements.push(Settlement::Route(path));
            }
        }

        settlements = uniform_price::enforce(settlements, &orders_by_uid);
        if settlements.is_empty() {
            return Response::default();
        }

        let tokens = touched_tokens(&settlements);
        let native_prices = match self.oracle.prices(&tokens, &request.native_prices).await {
            Ok(prices) => prices,
            Err(err) => {
                tracing::warn!(%err, reason = "oracle_failure", "dropping auction: insufficient oracle coverage");
                return Response::default();
            }
        };

        let solutions = solution::build(&settlements, &orders_by_uid, &native_prices, request.gas_price);
        Response {
            solutions: solution::rank(solutions),
            deadline_exceeded: false,
        }
    }
}

fn parse_orders(orders: Vec<Order>, now: u32) -> Vec<ParsedOrder> {
    orders
        .into_iter()
        .filter_map(|raw| match order::parse(raw, now) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::debug!(%err, reason = "invalid_order", "dropping order");
                None
            }
        })
        .collect()
}

fn touched_tokens(settlements: &[Settlement]) -> Vec<TokenAddress> {
    let mut tokens = HashSet::new();
    for settlement in settlements {
        let (a, b) = settlement.token_pair();
        tokens.insert(a);
        tokens.insert(b);
    }
    tokens.into_iter().collect()
}
