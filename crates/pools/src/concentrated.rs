use {
    crate::{FEE_BPS_DENOM, QuoteError},
    alloy_primitives::U256,
    fixed_point::U256Ext,
};

/// A Uniswap V3-style concentrated-liquidity pool, quoted within its current
/// tick only. Token index `0` is `token0`, index `1` is `token1`, matching
/// the convention `sqrt_price_x96` is expressed in (`token1` per `token0`).
///
/// Real V3 pools walk the tick bitmap and re-price as liquidity changes
/// across tick boundaries; this solver never crosses a tick. Instead each
/// pool snapshot carries `within_tick_cap`, the largest input amount the
/// liquidity provider for this tick can absorb at the current price, and
/// trades above that are rejected rather than approximated.
#[derive(Debug, Clone, Copy)]
pub struct Concentrated {
    /// `sqrt(price) * 2^96`, the standard V3 fixed-point price encoding.
    pub sqrt_price_x96: U256,
    pub within_tick_cap: U256,
    pub fee_bps: u32,
}

const Q96_SHIFT: usize = 96;

impl Concentrated {
    pub fn quote(&self, idx_in: usize, amount_in: U256) -> Result<U256, QuoteError> {
        if amount_in > self.within_tick_cap {
            return Err(QuoteError::ExceedsWithinTickCap);
        }
        let amount_in_post_fee = amount_in.checked_mul_div(
            U256::from(FEE_BPS_DENOM - self.fee_bps),
            U256::from(FEE_BPS_DENOM),
        )?;
        let q96 = U256::from(1u8) << Q96_SHIFT;

        // amount_out = amount_in' * sqrtP^2 / 2^192, computed as two chained
        // mul_divs so neither intermediate needs more than 256 bits on its
        // own even though sqrtP^2 alone would not fit.
        let amount_out = if idx_in == 0 {
            let step = amount_in_post_fee.checked_mul_div(self.sqrt_price_x96, q96)?;
            step.checked_mul_div(self.sqrt_price_x96, q96)?
        } else {
            let step = amount_in_post_fee.checked_mul_div(q96, self.sqrt_price_x96)?;
            step.checked_mul_div(q96, self.sqrt_price_x96)?
        };
        if amount_out.is_zero() {
            return Err(QuoteError::UnquotableReserves);
        }
        Ok(amount_out)
    }
}
