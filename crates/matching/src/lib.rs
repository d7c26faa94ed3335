//! The coincidence-of-wants matcher (C5): pairs up orders that sell opposite
//! sides of the same token pair and settles them directly against each
//! other, with no on-chain liquidity involved.

use {
    alloy_primitives::U256,
    eth::TokenAddress,
    fixed_point::{PRECISION, U256Ext, isqrt},
    order::{Kind, ParsedOrder},
    settlement::CowMatch,
    std::collections::{HashMap, HashSet},
};

/// A crossing pair of opposite-direction orders, priced and sized but not
/// yet checked against other candidates for the same order.
struct Candidate<'a> {
    sell_x: &'a ParsedOrder,
    sell_y: &'a ParsedOrder,
    clearing_price: U256,
    x_traded: U256,
    y_traded: U256,
    surplus_x: U256,
    surplus_y: U256,
}

/// Finds every profitable direct match among `orders`, greedily accepting
/// the highest-surplus candidates first and never reusing an order across
/// more than one match.
///
/// Only [`Kind::Sell`] orders participate: a CoW match is, by construction,
/// two counterparties each selling what the other wants, which is exactly
/// what a sell order expresses. Buy orders are left for the pathfinder.
pub fn find_matches(orders: &[ParsedOrder]) -> Vec<CowMatch> {
    let mut by_pair: HashMap<(TokenAddress, TokenAddress), Vec<&ParsedOrder>> = HashMap::new();
    for order in orders {
        if order.kind() != Kind::Sell {
            continue;
        }
        by_pair
            .entry(ordered_pair(order.sell_token(), order.buy_token()))
            .or_default()
            .push(order);
    }

    let mut candidates = Vec::new();
    for (_, group) in &by_pair {
        for a in group {
            for b in group {
                if a.sell_token() == b.sell_token() {
                    continue;
                }
                if let Some(candidate) = try_cross(a, b) {
                    candidates.push(candidate);
                }
            }
        }
    }

    candidates.sort_by(|a, b| {
        let total_a = a.surplus_x.saturating_add(a.surplus_y);
        let total_b = b.surplus_x.saturating_add(b.surplus_y);
        total_b.cmp(&total_a)
    });

    let mut settled = HashSet::new();
    let mut matches = Vec::new();
    for candidate in candidates {
        let x_uid = candidate.sell_x.uid();
        let y_uid = candidate.sell_y.uid();
        if settled.contains(x_uid) || settled.contains(y_uid) {
            continue;
        }
        settled.insert(x_uid.clone());
        settled.insert(y_uid.clone());
        matches.push(CowMatch {
            sell_x_order: x_uid.clone(),
            sell_y_order: y_uid.clone(),
            token_x: candidate.sell_x.sell_token(),
            token_y: candidate.sell_y.sell_token(),
            clearing_price: candidate.clearing_price,
            x_traded: candidate.x_traded,
            y_traded: candidate.y_traded,
            surplus_sell_x: candidate.surplus_x,
            surplus_sell_y: candidate.surplus_y,
        });
    }
    matches
}

fn ordered_pair(a: TokenAddress, b: TokenAddress) -> (TokenAddress, TokenAddress) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Checks whether `sell_x` (selling `token_x` for `token_y`) and `sell_y`
/// (selling `token_y` for `token_x`) cross, and if so sizes and surplus-
/// checks the trade.
fn try_cross<'a>(sell_x: &'a ParsedOrder, sell_y: &'a ParsedOrder) -> Option<Candidate<'a>> {
    if sell_x.buy_token() != sell_y.sell_token() || sell_y.buy_token() != sell_x.sell_token() {
        return None;
    }

    // sell_x.limit_price is Y per X; sell_y.limit_price is X per Y. The
    // orders cross when their combined requirement leaves room for a
    // clearing price, i.e. the two limit prices multiply to no more than
    // PRECISION^2.
    let product = sell_x.limit_price.checked_mul(sell_y.limit_price)?;
    if product > PRECISION.checked_mul(PRECISION)? {
        return None;
    }
    let clearing_price = isqrt(product).ok()?;

    let x_capacity = sell_x
        .order
        .sell_amount
        .checked_sub(sell_x.order.fee_amount)?;
    let y_capacity = sell_y
        .order
        .sell_amount
        .checked_sub(sell_y.order.fee_amount)?;

    // How much X the Y-seller's offer can absorb at the clearing price.
    let x_from_y = y_capacity.checked_mul_div(PRECISION, clearing_price).ok()?;
    let x_traded = x_capacity.min(x_from_y);
    let y_traded = x_traded.checked_mul_div(clearing_price, PRECISION).ok()?;

    let surplus_x = y_traded.checked_sub(sell_x.min_buy_after_fee?).filter(|s| !s.is_zero())?;
    let surplus_y = x_traded.checked_sub(sell_y.min_buy_after_fee?).filter(|s| !s.is_zero())?;

    Some(Candidate {
        sell_x,
        sell_y,
        clearing_price,
        x_traded,
        y_traded,
        surplus_x,
        surplus_y,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

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
    fn matches_two_crossing_orders() {
        let x = token(1);
        let y = token(2);
        // A sells 100 X for at least 90 Y (limit price 0.9 Y/X).
        // B sells 100 Y for at least 90 X (limit price 0.9 X/Y).
        // 0.9 * 0.9 = 0.81 <= 1, so they cross.
        let a = sell_order("0x01", x, y, 100, 90);
        let b = sell_order("0x02", y, x, 100, 90);

        let matches = find_matches(&[a, b]);
        assert_eq!(matches.len(), 1);
        let m = &matches[0];
        assert!(m.surplus_sell_x > U256::ZERO && m.surplus_sell_y > U256::ZERO);
    }

    #[test]
    fn does_not_match_non_crossing_orders() {
        let x = token(1);
        let y = token(2);
        // A wants at least 1.1 Y per X, B wants at least 1.1 X per Y: they
        // don't cross (product > 1).
        let a = sell_order("0x01", x, y, 100, 110);
        let b = sell_order("0x02", y, x, 100, 110);

        assert!(find_matches(&[a, b]).is_empty());
    }

    #[test]
    fn each_order_settles_at_most_once() {
        let x = token(1);
        let y = token(2);
        let a = sell_order("0x01", x, y, 100, 90);
        let b = sell_order("0x02", y, x, 100, 90);
        let c = sell_order("0x03", y, x, 100, 90);

        let matches = find_matches(&[a, b, c]);
        assert_eq!(matches.len(), 1);
    }
}
