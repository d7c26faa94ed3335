use {
    crate::{FEE_BPS_DENOM, QuoteError},
    alloy_primitives::U256,
    fixed_point::U256Ext,
};

/// The `x * y = k` curve used by UniswapV2, PancakeSwap and their many
/// forks. The only thing that differs between deployments is the fee, so it
/// is read per-pool rather than assumed to be the UniswapV2 default of 30
/// bps.
#[derive(Debug, Clone, Copy)]
pub struct ConstantProduct {
    pub fee_bps: u32,
}

impl ConstantProduct {
    pub fn quote(
        &self,
        reserve_in: U256,
        reserve_out: U256,
        amount_in: U256,
    ) -> Result<U256, QuoteError> {
        let amount_in_post_fee = amount_in.checked_mul_div(
            U256::from(FEE_BPS_DENOM - self.fee_bps),
            U256::from(FEE_BPS_DENOM),
        )?;
        let denominator = reserve_in
            .checked_add(amount_in_post_fee)
            .ok_or(QuoteError::Overflow)?;
        let amount_out = amount_in_post_fee.checked_mul_div(reserve_out, denominator)?;
        if amount_out >= reserve_out {
            return Err(QuoteError::UnquotableReserves);
        }
        Ok(amount_out)
    }
}
