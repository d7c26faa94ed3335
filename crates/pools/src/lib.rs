//! The pool model (C2): a closed, tagged-sum set of AMM variants, each
//! exposing one capability — quote `(token_in, token_out, amount_in)` to
//! `amount_out` — plus the ordered reserve vector the pathfinder needs to
//! decide whether a pool is worth visiting at all.
//!
//! Dispatch is a `match` at the quote entry point rather than a trait
//! object: the variant set is small and closed, and keeping it a sum type
//! means the hot path never allocates or goes through a vtable.

mod concentrated;
mod constant_product;
mod pmm;
mod stable;
mod weighted;

pub use {
    concentrated::Concentrated,
    constant_product::ConstantProduct,
    pmm::{Pmm, RState},
    stable::Stable,
    weighted::Weighted,
};

use eth::TokenAddress;

/// Denominator basis points are quoted against, e.g. `30` out of `10_000`
/// for a standard UniswapV2 30 bps fee.
pub const FEE_BPS_DENOM: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("pool has an unquotable (zero) reserve")]
    UnquotableReserves,
    #[error("token is not part of this pool")]
    TokenNotInPool,
    #[error("arithmetic overflow computing quote")]
    Overflow,
    #[error("trade exceeds the pool's within-tick size cap")]
    ExceedsWithinTickCap,
}

impl From<fixed_point::MathError> for QuoteError {
    fn from(_: fixed_point::MathError) -> Self {
        // mul_div only ever fails with Overflow or DivByZero in this module's
        // call sites, and a zero denominator here always traces back to a
        // zero reserve, so both collapse to the same caller-facing skip
        // reason.
        Self::Overflow
    }
}

/// An opaque pool identifier, unique within one auction's liquidity
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PoolAddress(pub [u8; 20]);

#[derive(Debug, Clone)]
pub enum Kind {
    ConstantProduct(ConstantProduct),
    Weighted(Weighted),
    Stable(Stable),
    Pmm(Pmm),
    Concentrated(Concentrated),
}

impl Kind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConstantProduct(_) => "ConstantProduct",
            Self::Weighted(_) => "Weighted",
            Self::Stable(_) => "Stable",
            Self::Pmm(_) => "PMM",
            Self::Concentrated(_) => "Concentrated",
        }
    }
}

/// A liquidity pool snapshot as provided in the auction payload.
#[derive(Debug, Clone)]
pub struct Pool {
    pub address: PoolAddress,
    pub tokens: Vec<TokenAddress>,
    pub reserves: Vec<alloy_primitives::U256>,
    pub gas_estimate: u64,
    pub kind: Kind,
}

impl Pool {
    /// The reserve vector, ordered identically to [`Self::tokens`]. Exposed
    /// as its own method (rather than a single summed balance) because
    /// alignment with `tokens` is part of the contract every caller relies
    /// on.
    pub fn reserves_by_token(&self) -> &[alloy_primitives::U256] {
        &self.reserves
    }

    pub fn is_quotable(&self) -> bool {
        !self.reserves.iter().any(|r| r.is_zero())
    }

    fn index_of(&self, token: TokenAddress) -> Result<usize, QuoteError> {
        self.tokens
            .iter()
            .position(|t| *t == token)
            .ok_or(QuoteError::TokenNotInPool)
    }

    /// Quotes a trade through this pool, applying the pool's fee to the
    /// input side.
    pub fn quote(
        &self,
        token_in: TokenAddress,
        token_out: TokenAddress,
        amount_in: alloy_primitives::U256,
    ) -> Result<alloy_primitives::U256, QuoteError> {
        if !self.is_quotable() {
            return Err(QuoteError::UnquotableReserves);
        }
        let idx_in = self.index_of(token_in)?;
        let idx_out = self.index_of(token_out)?;

        match &self.kind {
            Kind::ConstantProduct(pool) => {
                pool.quote(self.reserves[idx_in], self.reserves[idx_out], amount_in)
            }
            Kind::Weighted(pool) => pool.quote(
                self.reserves[idx_in],
                self.reserves[idx_out],
                pool.weight(idx_in),
                pool.weight(idx_out),
                amount_in,
            ),
            Kind::Stable(pool) => pool.quote(&self.reserves, idx_in, idx_out, amount_in),
            Kind::Pmm(pool) => pool.quote(idx_in, idx_out, amount_in),
            Kind::Concentrated(pool) => pool.quote(idx_in, amount_in),
        }
    }
}
