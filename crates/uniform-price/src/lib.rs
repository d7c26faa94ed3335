//! The uniform-price enforcer (C7): every settlement touching the same
//! token pair must clear at one shared price, so no two trades in the same
//! pair imply a different exchange rate. Settlements are grouped by pair,
//! snapped to their group's median implied price, and re-validated — a
//! settlement whose surplus goes non-positive after the snap is dropped
//! rather than settled at a loss to its trader.

use {
    alloy_primitives::U256,
    eth::{OrderUid, TokenAddress},
    fixed_point::{PRECISION, U256Ext},
    order::ParsedOrder,
    settlement::{CowMatch, Settlement},
    std::collections::{BTreeMap, HashMap},
};

/// Re-clears every settlement at its pair's median implied price, dropping
/// any that no longer clear profitably for every order they touch.
///
/// `orders` must contain every order referenced by `settlements`.
pub fn enforce(
    settlements: Vec<Settlement>,
    orders: &HashMap<OrderUid, ParsedOrder>,
) -> Vec<Settlement> {
    let mut by_pair: BTreeMap<(TokenAddress, TokenAddress), Vec<Settlement>> = BTreeMap::new();
    for settlement in settlements {
        by_pair.entry(settlement.token_pair()).or_default().push(settlement);
    }

    let mut result = Vec::new();
    for (pair, mut group) in by_pair {
        group.sort_by(|a, b| a.orders().cmp(&b.orders()));
        let Some(price) = median_implied_price(pair, &group) else {
            continue;
        };
        for settlement in group {
            if let Some(snapped) = reclear(settlement, pair, price, orders) {
                result.push(snapped);
            }
        }
    }
    result
}

/// `pair.1` per `pair.0`, scaled by [`PRECISION`], implied by a settlement.
fn implied_price(pair: (TokenAddress, TokenAddress), settlement: &Settlement) -> Option<U256> {
    match settlement {
        Settlement::Cow(m) => {
            if m.token_x == pair.0 {
                Some(m.clearing_price)
            } else {
                invert(m.clearing_price)
            }
        }
        Settlement::Route(p) => {
            let forward = p.amount_out.checked_mul_div(PRECISION, p.amount_in).ok()?;
            if p.token_in() == pair.0 { Some(forward) } else { invert(forward) }
        }
    }
}

fn invert(price: U256) -> Option<U256> {
    if price.is_zero() {
        return None;
    }
    PRECISION.checked_mul_div(PRECISION, price).ok()
}

fn median_implied_price(pair: (TokenAddress, TokenAddress), group: &[Settlement]) -> Option<U256> {
    let mut prices: Vec<U256> = group.iter().filter_map(|s| implied_price(pair, s)).collect();
    if prices.is_empty() {
        return None;
    }
    prices.sort();
    let mid = prices.len() / 2;
    if prices.len() % 2 == 1 {
        Some(prices[mid])
    } else {
        Some((prices[mid - 1] + prices[mid]) / U256::from(2u8))
    }
}

fn reclear(
    settlement: Settlement,
    pair: (TokenAddress, TokenAddress),
    pair_price: U256,
    orders: &HashMap<OrderUid, ParsedOrder>,
) -> Option<Settlement> {
    match settlement {
        Settlement::Cow(m) => reclear_cow(m, pair, pair_price, orders).map(Settlement::Cow),
        Settlement::Route(p) => {
            let forward = p.token_in() == pair.0;
            let price = if forward { pair_price } else { invert(pair_price)? };
            let order = orders.get(&p.order)?;
            let amount_out = p.amount_in.checked_mul_div(price, PRECISION).ok()?;
            let surplus = match order.kind() {
                order::Kind::Sell => settlement::surplus_of_sell_order(order, amount_out)?,
                order::Kind::Buy => {
                    // amount_in here is the ceiling the buy order is willing
                    // to pay; treat `amount_out` as still the buy-token
                    // delivered and size the actual spend down to what the
                    // order demands, capped at its limit.
                    let spend = order
                        .order
                        .buy_amount
                        .checked_mul_div(PRECISION, price)
                        .ok()?;
                    settlement::surplus_of_buy_order(order, spend)?
                }
            };
            if surplus.is_zero() {
                tracing::debug!(order = %p.order, reason = "negative_surplus", "dropping route after uniform-price snap");
                return None;
            }
            Some(Settlement::Route(settlement::ExecutionPath {
                amount_out,
                ..p
            }))
        }
    }
}

fn reclear_cow(
    m: CowMatch,
    pair: (TokenAddress, TokenAddress),
    pair_price: U256,
    orders: &HashMap<OrderUid, ParsedOrder>,
) -> Option<CowMatch> {
    let forward = m.token_x == pair.0;
    let clearing_price = if forward { pair_price } else { invert(pair_price)? };

    let sell_x_order = orders.get(&m.sell_x_order)?;
    let sell_y_order = orders.get(&m.sell_y_order)?;
    let x_capacity = sell_x_order
        .order
        .sell_amount
        .checked_sub(sell_x_order.order.fee_amount)?;
    let y_capacity = sell_y_order
        .order
        .sell_amount
        .checked_sub(sell_y_order.order.fee_amount)?;

    let x_from_y = y_capacity.checked_mul_div(PRECISION, clearing_price).ok()?;
    let x_traded = x_capacity.min(x_from_y);
    let y_traded = x_traded.checked_mul_div(clearing_price, PRECISION).ok()?;

    let surplus_sell_x = y_traded.checked_sub(sell_x_order.min_buy_after_fee?)?;
    let surplus_sell_y = x_traded.checked_sub(sell_y_order.min_buy_after_fee?)?;
    if surplus_sell_x.is_zero() || surplus_sell_y.is_zero() {
        tracing::debug!(
            sell_x = %m.sell_x_order,
            sell_y = %m.sell_y_order,
            reason = "negative_surplus",
            "dropping CoW match after uniform-price snap"
        );
        return None;
    }

    Some(CowMatch {
        clearing_price,
        x_traded,
        y_traded,
        surplus_sell_x,
        surplus_sell_y,
        ..m
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use {
        alloy_primitives::Address,
        settlement::{ExecutionPath, Hop},
    };

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
            kind: order::Kind::Sell,
            partially_fillable: false,
            valid_to: 1_000,
            fee_amount: U256::ZERO,
            owner: sell_token,
        };
        order::parse(raw, 0).unwrap()
    }

    #[test]
    fn snaps_two_routes_to_their_median_price() {
        let a = token(1);
        let b = token(2);
        let order_a = sell_order("0x01", a, b, 1_000, 900);
        let order_b = sell_order("0x02", a, b, 1_000, 800);
        let mut orders = HashMap::new();
        orders.insert(order_a.uid().clone(), order_a.clone());
        orders.insert(order_b.uid().clone(), order_b.clone());

        let cheap_route = Settlement::Route(ExecutionPath {
            order: order_a.uid().clone(),
            hops: vec![Hop {
                pool: pools::PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(950u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(950u64),
            gas_estimate: 150_000,
        });
        let rich_route = Settlement::Route(ExecutionPath {
            order: order_b.uid().clone(),
            hops: vec![Hop {
                pool: pools::PoolAddress([2; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(1_050u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(1_050u64),
            gas_estimate: 150_000,
        });

        let result = enforce(vec![cheap_route, rich_route], &orders);
        assert_eq!(result.len(), 2);
        for settlement in &result {
            if let Settlement::Route(p) = settlement {
                // both snap to the ~1000/1000 median, i.e. 1:1
                assert_eq!(p.amount_out, U256::from(1_000u64));
            }
        }
    }

    #[test]
    fn drops_settlements_that_no_longer_clear_profitably() {
        let a = token(1);
        let b = token(2);
        // demands at least 1_000 out for 1_000 in: a 1:1 snap leaves zero
        // surplus, which is dropped.
        let order_a = sell_order("0x01", a, b, 1_000, 1_000);
        let mut orders = HashMap::new();
        orders.insert(order_a.uid().clone(), order_a.clone());

        let route = Settlement::Route(ExecutionPath {
            order: order_a.uid().clone(),
            hops: vec![Hop {
                pool: pools::PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(1_000u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(1_000u64),
            gas_estimate: 150_000,
        });

        assert!(enforce(vec![route], &orders).is_empty());
    }

    #[test]
    fn forward_and_reverse_settlements_are_not_merged_into_one_median() {
        let a = token(1);
        let b = token(2);
        let order_a = sell_order("0x01", a, b, 1_000, 900);
        let order_b = sell_order("0x02", b, a, 1_000, 900);
        let mut orders = HashMap::new();
        orders.insert(order_a.uid().clone(), order_a.clone());
        orders.insert(order_b.uid().clone(), order_b.clone());

        let forward = Settlement::Route(ExecutionPath {
            order: order_a.uid().clone(),
            hops: vec![Hop {
                pool: pools::PoolAddress([1; 20]),
                token_in: a,
                token_out: b,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(950u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(950u64),
            gas_estimate: 150_000,
        });
        let reverse = Settlement::Route(ExecutionPath {
            order: order_b.uid().clone(),
            hops: vec![Hop {
                pool: pools::PoolAddress([2; 20]),
                token_in: b,
                token_out: a,
                amount_in: U256::from(1_000u64),
                amount_out: U256::from(1_050u64),
            }],
            amount_in: U256::from(1_000u64),
            amount_out: U256::from(1_050u64),
            gas_estimate: 150_000,
        });

        // A forward A->B route and a reverse B->A route on the same pair are
        // each the only member of their own direction's group, so each
        // median-of-one leaves its raw quote untouched. If they were wrongly
        // folded onto one unordered pair, both amounts would move toward a
        // blended price instead.
        let result = enforce(vec![forward, reverse], &orders);
        assert_eq!(result.len(), 2);
        for settlement in &result {
            let Settlement::Route(p) = settlement else { unreachable!() };
            if p.token_in() == a {
                assert_eq!(p.amount_out, U256::from(950u64));
            } else {
                assert_eq!(p.amount_out, U256::from(1_050u64));
            }
        }
    }
}
