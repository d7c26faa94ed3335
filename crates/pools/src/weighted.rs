use {
    crate::{FEE_BPS_DENOM, QuoteError},
    alloy_primitives::U256,
    fixed_point::{PRECISION, U256Ext, pow_frac},
};

/// The Balancer-style weighted-pool invariant, generalized UniswapV2 to
/// arbitrary (normalized) token weights:
///
/// `amount_out = reserve_out * (1 - (reserve_in / (reserve_in + amount_in')) ^ (w_in / w_out))`
#[derive(Debug, Clone)]
pub struct Weighted {
    pub fee_bps: u32,
    /// Normalized weights, one per pool token, scaled by [`PRECISION`] and
    /// summing to `PRECISION`.
    pub weights: Vec<U256>,
}

impl Weighted {
    pub fn weight(&self, index: usize) -> U256 {
        self.weights[index]
    }

    pub fn quote(
        &self,
        reserve_in: U256,
        reserve_out: U256,
        weight_in: U256,
        weight_out: U256,
        amount_in: U256,
    ) -> Result<U256, QuoteError> {
        let amount_in_post_fee = amount_in.checked_mul_div(
            U256::from(FEE_BPS_DENOM - self.fee_bps),
            U256::from(FEE_BPS_DENOM),
        )?;
        let denominator = reserve_in
            .checked_add(amount_in_post_fee)
            .ok_or(QuoteError::Overflow)?;
        let base = reserve_in.checked_mul_div(PRECISION, denominator)?;
        let exponent = weight_in.checked_mul_div(PRECISION, weight_out)?;
        let power = pow_frac(base, exponent)?;
        if power >= PRECISION {
            return Err(QuoteError::UnquotableReserves);
        }
        let complement = PRECISION - power;
        let amount_out = reserve_out.checked_mul_div(complement, PRECISION)?;
        if amount_out >= reserve_out {
            return Err(QuoteError::UnquotableReserves);
        }
        Ok(amount_out)
    }
}
