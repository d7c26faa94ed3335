//! Order parsing (C4 in the design doc): turns a raw, signer-supplied order
//! into a [`ParsedOrder`] carrying the derived fields every downstream
//! component (CoW matcher, pathfinder, scorer) needs, or rejects it.
//!
//! Rejections are not fatal to the auction — the caller drops the order and
//! keeps going, per the "input validation errors" policy in the design doc's
//! error handling section.

use {
    alloy_primitives::U256,
    eth::{OrderUid, TokenAddress},
    fixed_point::{MathError, PRECISION, U256Ext},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Sell,
    Buy,
}

/// A raw order as received in the auction payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub uid: OrderUid,
    pub sell_token: TokenAddress,
    pub buy_token: TokenAddress,
    pub sell_amount: U256,
    pub buy_amount: U256,
    pub kind: Kind,
    pub partially_fillable: bool,
    pub valid_to: u32,
    pub fee_amount: U256,
    pub owner: TokenAddress,
}

/// An order plus the fields derived from it by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOrder {
    pub order: Order,
    /// Buy token per sell token, scaled by [`PRECISION`].
    pub limit_price: U256,
    /// `Some` only for [`Kind::Sell`] orders.
    pub min_buy_after_fee: Option<U256>,
    /// `Some` only for [`Kind::Buy`] orders.
    pub max_sell_after_fee: Option<U256>,
}

impl ParsedOrder {
    pub fn uid(&self) -> &OrderUid {
        &self.order.uid
    }

    pub fn sell_token(&self) -> TokenAddress {
        self.order.sell_token
    }

    pub fn buy_token(&self) -> TokenAddress {
        self.order.buy_token
    }

    pub fn kind(&self) -> Kind {
        self.order.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("sell token and buy token must differ")]
    SameToken,
    #[error("sell amount must be greater than zero")]
    ZeroSellAmount,
    #[error("buy amount must be greater than zero")]
    ZeroBuyAmount,
    #[error("fee amount must be less than sell amount")]
    FeeTooLarge,
    #[error("order expired")]
    Expired,
    #[error(transparent)]
    Math(#[from] MathError),
}

/// Validates a raw order and computes its derived fields.
///
/// `now` is the current unix timestamp; orders whose `valid_to` has already
/// passed are rejected (the auction's liveness is checked once, up front, by
/// the driver — not re-checked after this point).
pub fn parse(order: Order, now: u32) -> Result<ParsedOrder, ParseError> {
    if order.sell_token == order.buy_token {
        return Err(ParseError::SameToken);
    }
    if order.sell_amount.is_zero() {
        return Err(ParseError::ZeroSellAmount);
    }
    if order.buy_amount.is_zero() {
        return Err(ParseError::ZeroBuyAmount);
    }
    if order.fee_amount >= order.sell_amount {
        return Err(ParseError::FeeTooLarge);
    }
    if order.valid_to < now {
        return Err(ParseError::Expired);
    }

    let limit_price = order.buy_amount.checked_mul_div(PRECISION, order.sell_amount)?;

    let (min_buy_after_fee, max_sell_after_fee) = match order.kind {
        Kind::Sell => {
            let sell_after_fee = order
                .sell_amount
                .checked_sub(order.fee_amount)
                .ok_or(MathError::Overflow)?;
            let min_buy = sell_after_fee.checked_mul_div(limit_price, PRECISION)?;
            (Some(min_buy), None)
        }
        Kind::Buy => {
            let max_sell = order
                .sell_amount
                .checked_add(order.fee_amount)
                .ok_or(MathError::Overflow)?;
            (None, Some(max_sell))
        }
    };

    Ok(ParsedOrder {
        order,
        limit_price,
        min_buy_after_fee,
        max_sell_after_fee,
    })
}
