//! The solution builder and scorer (C8): turns a set of settlements into a
//! scored [`Solution`] the driver can compare against solutions from other
//! solvers, and ranks a batch of candidate solutions.
//!
//! Scoring expresses every order's surplus in ETH via the oracle's native
//! prices, sums it, and subtracts the settlement's gas cost at the
//! auction's gas price — the same "surplus minus cost" objective used
//! throughout the driver's own scoring module, just without the protocol
//! fee deduction this solver doesn't charge.

use {
    alloy_primitives::U256,
    eth::{Ether, Gas, GasPrice, OrderUid, TokenAddress},
    fixed_point::{PRECISION, U256Ext},
    order::{Kind, ParsedOrder},
    settlement::{Hop, Settlement},
    std::collections::HashMap,
};

#[derive(Debug, Clone)]
pub struct Trade {
    pub order: OrderUid,
    pub sell_token: TokenAddress,
    pub buy_token: TokenAddress,
    pub executed_sell: U256,
    pub executed_buy: U256,
    pub surplus_native: Ether,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub id: u64,
    pub trades: Vec<Trade>,
    pub interactions: Vec<Hop>,
    pub gas_estimate: u64,
    pub score: Ether,
}

/// Converts a token-denominated amount into ETH using the oracle's native
/// price for that token (scaled by [`PRECISION`]).
fn to_native(amount: U256, token: TokenAddress, native_prices: &HashMap<TokenAddress, U256>) -> Option<Ether> {
    let price = native_prices.get(&token)?;
    amount.checked_mul_div(*price, PRECISION).ok().map(Ether)
}

fn trades_for(
    settlement: &Settlement,
    orders: &HashMap<OrderUid, ParsedOrder>,
    native_prices: &HashMap<TokenAddress, U256>,
) -> Option<Vec<Trade>> {
    match settlement {
        Settlement::Cow(m) => {
            let sell_x = orders.get(&m.sell_x_order)?;
            let sell_y = orders.get(&m.sell_y_order)?;
            let surplus_x = to_native(m.surplus_sell_x, m.token_y, native_prices)?;
            let surplus_y = to_native(m.surplus_sell_y, m.token_x, native_prices)?;
            Some(vec![
                Trade {
                    order: m.sell_x_order.clone(),
                    sell_token: m.token_x,
                    buy_token: m.token_y,
                    executed_sell: sell_x.order.sell_amount.checked_sub(sell_x.order.fee_amount)?,
                    executed_buy: m.y_traded,
                    surplus_native: surplus_x,
                },
                Trade {
                    order: m.sell_y_order.clone(),
                    sell_token: m.token_y,
                    buy_token: m.token_x,
                    executed_sell: sell_y.order.sell_amount.checked_sub(sell_y.order.fee_amount)?,
                    executed_buy: m.x_traded,
                    surplus_native: surplus_y,
                },
            ])
        }
        Settlement::Route(p) => {
            let order = orders.get(&p.order)?;
            let (executed_sell, executed_buy, surplus_token, surplus_amount) = match order.kind() {
                Kind::Sell => {
                    let min_buy = order.min_buy_after_fee?;
                    let surplus = p.amount_out.checked_sub(min_buy)?;
                    (p.amount_in, p.amount_out, order.buy_token(), surplus)
                }
                Kind::Buy => {
                    let max_sell = order.max_sell_after_fee?;
                    let surplus = max_sell.checked_sub(p.amount_in)?;
                    (p.amount_in, p.amount_out, order.sell_token(), surplus)
                }
            };
            let surplus_native = to_native(surplus_amount, surplus_token, native_prices)?;
            Some(vec![Trade {
                order: p.order.clone(),
                sell_token: order.sell_token(),
                buy_token: order.buy_token(),
                executed_sell,
                executed_buy,
                surplus_native,
            }])
        }
    }
}

/// Builds one scored [`Solution`] per settlement, each independently
/// dropped if its own surplus doesn't clear its own gas cost — a CoW match
/// and a routed order are separate solutions the auction can choose among,
/// not a single bundle scored as a whole.
pub fn build(
    settlements: &[Settlement],
    orders: &HashMap<OrderUid, ParsedOrder>,
    native_prices: &HashMap<TokenAddress, U256>,
    gas_price: GasPrice,
) -> Vec<Solution> {
    settlements
        .iter()
        .enumerate()
        .filter_map(|(id, settlement)| build_one(id as u64, settlement, orders, native_prices, gas_price))
        .collect()
}

fn build_one(
    id: u64,
    settlement: &Settlement,
    orders: &HashMap<OrderUid, ParsedOrder>,
    native_prices: &HashMap<TokenAddress, U256>,
    gas_price: GasPrice,
) -> Option<Solution> {
    let trades = trades_for(settlement, orders, native_prices)?;
    let interactions = match settlement {
        Settlement::Route(p) => p.hops.clone(),
        Settlement::Cow(_) => Vec::new(),
    };
    let gas_estimate = settlement.gas_estimate();

    let total_surplus = trades
        .iter()
        .try_fold(U256::ZERO, |acc, t| acc.checked_add(t.surplus_native.0))?;
    let gas_cost = Gas(gas_estimate).cost(gas_price).0;
    if total_surplus <= gas_cost {
        return None;
    }

    Some(Solution {
        id,
        trades,
        interactions,
        gas_estimate,
        score: Ether(total_surplus - gas_cost),
    })
}

/// Sorts solutions by descending score, the order the driver reports them
/// to the auction in.
pub fn rank(mut solutions: Vec<Solution>) -> Vec<Solution> {
    solutions.sort_by(|a, b| b.score.0.cmp(&a.score.0));
    solutions
}

#[cfg(test)]
mod tests {
    use super::*;
    use {alloy_primitives::Address, pools::PoolAddress, settlement::{ExecutionPath, Hop}};

    fn token(byte: u8) -> TokenAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Address::from(bytes).into()
    }

    fn sell_order(uid: &str, sell_token: TokenAddress, buy_token: TokenAddress, sell: u64, buy: u64) -> ParsedOrder {
        let raw = order::Order {
            uid: uid.parse().unwrap(),
            sell_token,
            buy_token,
            sell_amount: U256::from(sell),
            buy_amount: U256::from(buy),
            kind: Kind::Sell,
            partially_fillable: false,
            valid_to: 1_000,
            fee_amount: U256::ZERO,
            owner: sell_token,
        };
        order::parse(raw, 0).unwrap()
    }

    #[test]
    fn scores_a_profitable_route_above_its_gas_cost() {
        let a = token(1);
        let b = token(2);
        let order = sell_order("0x01", a, b, 1_000, 900);
        let mut orders = HashMap::new();
        orders.insert(order.uid().clone(), order.clone());

        let mut native_prices = HashMap::new();
        native_prices.insert(b, PRECISION); // 1 unit of b == 1 wei-scale unit

        let settlement = Settlement::Route(ExecutionPath {
            order: order.uid().clone(),
            hops: vec![Hop {
                pool: PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(950u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(950u64),
            gas_estimate: 10,
        });

        let solutions = build(&[settlement], &orders, &native_prices, GasPrice(U256::from(1u64)));
        assert_eq!(solutions.len(), 1);
        // surplus = 950 - 900 = 50, gas cost = 10 * 1 = 10 wei
        assert_eq!(solutions[0].score.0, U256::from(40u64));
    }

    #[test]
    fn drops_solution_whose_surplus_does_not_cover_gas() {
        let a = token(1);
        let b = token(2);
        let order = sell_order("0x01", a, b, 1_000, 900);
        let mut orders = HashMap::new();
        orders.insert(order.uid().clone(), order.clone());

        let mut native_prices = HashMap::new();
        native_prices.insert(b, PRECISION);

        let settlement = Settlement::Route(ExecutionPath {
            order: order.uid().clone(),
            hops: vec![Hop {
                pool: PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(901u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(901u64),
            gas_estimate: 1_000_000,
        });

        // surplus = 1, gas cost = 1_000_000 * 1_000_000_000 wei, dwarfs it.
        assert!(build(&[settlement], &orders, &native_prices, GasPrice(U256::from(1_000_000_000u64))).is_empty());
    }

    #[test]
    fn scores_each_settlement_as_its_own_solution_and_drops_unprofitable_ones() {
        let a = token(1);
        let b = token(2);
        let profitable_order = sell_order("0x01", a, b, 1_000, 900);
        let unprofitable_order = sell_order("0x02", a, b, 1_000, 900);
        let mut orders = HashMap::new();
        orders.insert(profitable_order.uid().clone(), profitable_order.clone());
        orders.insert(unprofitable_order.uid().clone(), unprofitable_order.clone());

        let mut native_prices = HashMap::new();
        native_prices.insert(b, PRECISION);

        let profitable = Settlement::Route(ExecutionPath {
            order: profitable_order.uid().clone(),
            hops: vec![Hop {
                pool: PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(950u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(950u64),
            gas_estimate: 10,
        });
        let unprofitable = Settlement::Route(ExecutionPath {
            order: unprofitable_order.uid().clone(),
            hops: vec![Hop {
                pool: PoolAddress([2; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(901u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(901u64),
            gas_estimate: 1_000_000,
        });

        let solutions = build(&[profitable, unprofitable], &orders, &native_prices, GasPrice(U256::from(1u64)));

        assert_eq!(solutions.len(), 1, "the unprofitable settlement is dropped on its own, not bundled in");
        assert_eq!(solutions[0].trades.len(), 1);
        assert_eq!(solutions[0].trades[0].order, profitable_order.uid().clone());
    }

    #[test]
    fn ranks_solutions_by_descending_score() {
        let low = Solution {
            id: 1,
            trades: vec![],
            interactions: vec![],
            gas_estimate: 0,
            score: Ether(U256::from(10u64)),
        };
        let high = Solution {
            id: 2,
            trades: vec![],
            interactions: vec![],
            gas_estimate: 0,
            score: Ether(U256::from(100u64)),
        };
        let ranked = rank(vec![low, high]);
        assert_eq!(ranked[0].id, 2);
    }
}
