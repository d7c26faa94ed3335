use {
    crate::{FEE_BPS_DENOM, QuoteError},
    alloy_primitives::U256,
    fixed_point::{PRECISION, U256Ext},
};

/// Which side of its target the pool currently sits on. DODO-style PMM pools
/// track this to bias pricing toward rebalancing trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RState {
    One,
    AboveOne,
    BelowOne,
}

/// An oracle-parameterized market maker curve in the style of DODO's PMM:
/// quotes are a blend of a pure oracle-price fill (zero slippage) and a
/// constant-product fill, weighted by the curve parameter `k`.
///
/// This is a deliberately reduced model of the real DODO curve — it does not
/// reproduce the full piecewise virtual-reserve algebra, only the R-state's
/// effect on which reserve pair backs the constant-product component. Token
/// index `0` is always the base asset, index `1` the quote asset.
#[derive(Debug, Clone, Copy)]
pub struct Pmm {
    /// Quote-per-base price from the oracle, scaled by [`PRECISION`].
    pub oracle_price: U256,
    /// Curve steepness, `0..=PRECISION`. `0` degenerates to pure
    /// constant-product, `PRECISION` degenerates to pure oracle pricing.
    pub k: U256,
    pub base_reserve: U256,
    pub quote_reserve: U256,
    pub base_target: U256,
    pub quote_target: U256,
    pub r_state: RState,
    pub fee_bps: u32,
}

impl Pmm {
    pub fn quote(&self, idx_in: usize, idx_out: usize, amount_in: U256) -> Result<U256, QuoteError> {
        if idx_in == idx_out || idx_in > 1 || idx_out > 1 {
            return Err(QuoteError::TokenNotInPool);
        }
        let amount_in_post_fee = amount_in.checked_mul_div(
            U256::from(FEE_BPS_DENOM - self.fee_bps),
            U256::from(FEE_BPS_DENOM),
        )?;

        let (virtual_base, virtual_quote) = match self.r_state {
            RState::One => (self.base_reserve, self.quote_reserve),
            RState::AboveOne => (self.base_reserve, self.quote_target),
            RState::BelowOne => (self.base_target, self.quote_reserve),
        };

        let selling_base = idx_in == 0;
        let (cp_reserve_in, cp_reserve_out, actual_reserve_out, oracle_out) = if selling_base {
            let oracle_out = amount_in_post_fee.checked_mul_div(self.oracle_price, PRECISION)?;
            (virtual_base, virtual_quote, self.quote_reserve, oracle_out)
        } else {
            let oracle_out = amount_in_post_fee.checked_mul_div(PRECISION, self.oracle_price)?;
            (virtual_quote, virtual_base, self.base_reserve, oracle_out)
        };

        let denom = cp_reserve_in
            .checked_add(amount_in_post_fee)
            .ok_or(QuoteError::Overflow)?;
        let cp_out = amount_in_post_fee.checked_mul_div(cp_reserve_out, denom)?;

        let cp_weight = PRECISION.checked_sub(self.k).ok_or(QuoteError::Overflow)?;
        let cp_component = cp_out.checked_mul_div(cp_weight, PRECISION)?;
        let oracle_component = oracle_out.checked_mul_div(self.k, PRECISION)?;
        let amount_out = cp_component
            .checked_add(oracle_component)
            .ok_or(QuoteError::Overflow)?;

        if amount_out >= actual_reserve_out {
            return Err(QuoteError::UnquotableReserves);
        }
        Ok(amount_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balanced(k: U256) -> Pmm {
        Pmm {
            oracle_price: PRECISION * U256::from(2_000u64),
            k,
            base_reserve: U256::from(1_000u64) * PRECISION,
            quote_reserve: U256::from(2_000_000u64) * PRECISION,
            base_target: U256::from(1_000u64) * PRECISION,
            quote_target: U256::from(2_000_000u64) * PRECISION,
            r_state: RState::One,
            fee_bps: 0,
        }
    }

    #[test]
    fn k_zero_has_no_slippage() {
        let pool = balanced(PRECISION);
        let amount_in = PRECISION; // 1 base token
        let amount_out = pool.quote(0, 1, amount_in).unwrap();
        // pure oracle price: 1 base -> 2000 quote, exactly
        assert_eq!(amount_out, U256::from(2_000u64) * PRECISION);
    }

    #[test]
    fn k_one_matches_constant_product() {
        let pool = balanced(U256::ZERO);
        let amount_in = PRECISION;
        let amount_out = pool.quote(0, 1, amount_in).unwrap();
        let expected = amount_in.checked_mul_div(
            pool.quote_reserve,
            pool.base_reserve.checked_add(amount_in).unwrap(),
        ).unwrap();
        assert_eq!(amount_out, expected);
    }

    #[test]
    fn rejects_invalid_token_indices() {
        let pool = balanced(PRECISION / U256::from(2u8));
        assert_eq!(pool.quote(0, 0, PRECISION), Err(QuoteError::TokenNotInPool));
        assert_eq!(pool.quote(2, 1, PRECISION), Err(QuoteError::TokenNotInPool));
    }
}
