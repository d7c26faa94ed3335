//! Shared settlement types produced by the CoW matcher and the liquidity
//! pathfinder, and consumed by the uniform-price enforcer and the solution
//! builder. Kept in its own crate so neither producer needs to depend on the
//! other.

use {
    alloy_primitives::U256,
    eth::{OrderUid, TokenAddress},
    order::ParsedOrder,
    pools::PoolAddress,
};

/// One hop of a multi-hop AMM route.
#[derive(Debug, Clone)]
pub struct Hop {
    pub pool: PoolAddress,
    pub token_in: TokenAddress,
    pub token_out: TokenAddress,
    pub amount_in: U256,
    pub amount_out: U256,
}

/// A single order filled by routing it through one or more pools.
#[derive(Debug, Clone)]
pub struct ExecutionPath {
    pub order: OrderUid,
    pub hops: Vec<Hop>,
    pub amount_in: U256,
    pub amount_out: U256,
    pub gas_estimate: u64,
}

impl ExecutionPath {
    pub fn token_in(&self) -> TokenAddress {
        self.hops.first().expect("path has at least one hop").token_in
    }

    pub fn token_out(&self) -> TokenAddress {
        self.hops.last().expect("path has at least one hop").token_out
    }
}

/// Two opposing orders over the same token pair, filled directly against
/// each other without touching on-chain liquidity.
#[derive(Debug, Clone)]
pub struct CowMatch {
    /// The order selling `token_x` for `token_y`.
    pub sell_x_order: OrderUid,
    /// The order selling `token_y` for `token_x`.
    pub sell_y_order: OrderUid,
    pub token_x: TokenAddress,
    pub token_y: TokenAddress,
    /// `token_y` per `token_x`, scaled by [`fixed_point::PRECISION`].
    pub clearing_price: U256,
    pub x_traded: U256,
    pub y_traded: U256,
    pub surplus_sell_x: U256,
    pub surplus_sell_y: U256,
}

/// A filled piece of the auction: either two orders matched directly, or one
/// order routed through on-chain liquidity.
#[derive(Debug, Clone)]
pub enum Settlement {
    Cow(CowMatch),
    Route(ExecutionPath),
}

impl Settlement {
    pub fn orders(&self) -> Vec<OrderUid> {
        match self {
            Self::Cow(m) => vec![m.sell_x_order.clone(), m.sell_y_order.clone()],
            Self::Route(p) => vec![p.order.clone()],
        }
    }

    /// The `(sell_token, buy_token)` pair this settlement clears, in its own
    /// trade direction. Callers grouping settlements by pair must use this
    /// ordered form as the key: a forward `A -> B` settlement and a reverse
    /// `B -> A` settlement are independent markets and must never be
    /// canonicalized onto the same key.
    pub fn token_pair(&self) -> (TokenAddress, TokenAddress) {
        match self {
            Self::Cow(m) => (m.token_x, m.token_y),
            Self::Route(p) => (p.token_in(), p.token_out()),
        }
    }

    pub fn gas_estimate(&self) -> u64 {
        match self {
            Self::Cow(_) => 0,
            Self::Route(p) => p.gas_estimate,
        }
    }

    pub fn total_surplus(&self) -> U256 {
        match self {
            Self::Cow(m) => m.surplus_sell_x.saturating_add(m.surplus_sell_y),
            // A routed order's surplus is scored against its own limit
            // price by the solution builder, not summed here.
            Self::Route(_) => U256::ZERO,
        }
    }
}

/// The amount an order's counterparty must deliver for the order to receive
/// exactly as much as its own limit price demands, i.e. the order's
/// requested amount net of surplus. `None` if the order type doesn't carry
/// the field being asked for (e.g. `min_buy_after_fee` on a buy order).
pub fn surplus_of_sell_order(order: &ParsedOrder, executed_buy: U256) -> Option<U256> {
    let min_buy = order.min_buy_after_fee?;
    executed_buy.checked_sub(min_buy)
}

pub fn surplus_of_buy_order(order: &ParsedOrder, executed_sell: U256) -> Option<U256> {
    let max_sell = order.max_sell_after_fee?;
    max_sell.checked_sub(executed_sell)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(byte: u8) -> TokenAddress {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        alloy_primitives::Address::from(bytes).into()
    }

    fn sell_order(sell: u64, buy: u64, fee: u64, kind: order::Kind) -> ParsedOrder {
        let raw = order::Order {
            uid: "0x01".parse().unwrap(),
            sell_token: token(1),
            buy_token: token(2),
            sell_amount: U256::from(sell),
            buy_amount: U256::from(buy),
            kind,
            partially_fillable: false,
            valid_to: 1_000,
            fee_amount: U256::from(fee),
            owner: token(1),
        };
        order::parse(raw, 0).unwrap()
    }

    #[test]
    fn sell_order_surplus_is_excess_over_min_buy() {
        let parsed = sell_order(100, 90, 10, order::Kind::Sell);
        // min_buy_after_fee = 81 (see the order crate's own tests)
        assert_eq!(surplus_of_sell_order(&parsed, U256::from(100u64)), Some(U256::from(19u64)));
        assert_eq!(surplus_of_buy_order(&parsed, U256::from(100u64)), None);
    }

    #[test]
    fn buy_order_surplus_is_savings_under_max_sell() {
        let parsed = sell_order(100, 90, 10, order::Kind::Buy);
        // max_sell_after_fee = 110
        assert_eq!(surplus_of_buy_order(&parsed, U256::from(100u64)), Some(U256::from(10u64)));
    }

    #[test]
    fn token_pair_follows_trade_direction_not_address_order() {
        let a = token(1);
        let b = token(2);
        let route = Settlement::Route(ExecutionPath {
            order: "0x01".parse().unwrap(),
            hops: vec![Hop {
                pool: PoolAddress([0; 20]),
                token_in: b,
                token_out: a,
                amount_in: U256::from(1u64),
                amount_out: U256::from(1u64),
            }],
            amount_in: U256::from(1u64),
            amount_out: U256::from(1u64),
            gas_estimate: 150_000,
        });
        // token_in is b (the numerically larger address), so the pair must
        // come back (b, a), not re-sorted to (a, b).
        assert_eq!(route.token_pair(), (b, a));
    }
}
