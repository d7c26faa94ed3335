use {
    crate::{FEE_BPS_DENOM, QuoteError},
    alloy_primitives::U256,
    fixed_point::{MathError, U256Ext, isqrt},
};

/// The Curve StableSwap invariant, generalized to `n` tokens:
///
/// `A*n^n*sum(x) + D = A*n^n*D + D^(n+1) / (n^n * prod(x))`
///
/// `amplification` controls how flat the curve is near the 1:1 price; higher
/// values behave more like a constant-sum pool, lower values converge toward
/// constant-product.
#[derive(Debug, Clone, Copy)]
pub struct Stable {
    pub amplification: u32,
    pub fee_bps: u32,
}

impl Stable {
    pub fn quote(
        &self,
        reserves: &[U256],
        idx_in: usize,
        idx_out: usize,
        amount_in: U256,
    ) -> Result<U256, QuoteError> {
        let amount_in_post_fee = amount_in.checked_mul_div(
            U256::from(FEE_BPS_DENOM - self.fee_bps),
            U256::from(FEE_BPS_DENOM),
        )?;
        let n = reserves.len() as u32;
        let ann = U256::from(self.amplification) * U256::from(n).pow(U256::from(n));
        let d = compute_d(reserves, ann)?;
        let new_balance_in = reserves[idx_in]
            .checked_add(amount_in_post_fee)
            .ok_or(QuoteError::Overflow)?;
        let new_balance_out = get_y(reserves, ann, d, idx_in, idx_out, new_balance_in)?;
        let amount_out = reserves[idx_out]
            .checked_sub(new_balance_out)
            .ok_or(QuoteError::UnquotableReserves)?;
        if amount_out >= reserves[idx_out] {
            return Err(QuoteError::UnquotableReserves);
        }
        Ok(amount_out)
    }
}

/// Solves for the invariant `D` given the current balances, via Newton's
/// method.
fn compute_d(xp: &[U256], ann: U256) -> Result<U256, MathError> {
    let n = U256::from(xp.len() as u64);
    let s = xp
        .iter()
        .try_fold(U256::ZERO, |acc, x| acc.checked_add(*x).ok_or(MathError::Overflow))?;
    if s.is_zero() {
        return Ok(U256::ZERO);
    }

    let mut d = s;
    const MAX_ITERATIONS: usize = 255;
    for _ in 0..MAX_ITERATIONS {
        let mut d_p = d;
        for x in xp {
            let denom = x.checked_mul(n).ok_or(MathError::Overflow)?;
            d_p = d_p.checked_mul_div(d, denom)?;
        }
        let d_prev = d;

        let ann_s = ann.checked_mul(s).ok_or(MathError::Overflow)?;
        let d_p_n = d_p.checked_mul(n).ok_or(MathError::Overflow)?;
        let numerator_coeff = ann_s.checked_add(d_p_n).ok_or(MathError::Overflow)?;

        let ann_minus_one = ann.checked_sub(U256::from(1u8)).ok_or(MathError::Overflow)?;
        let term_a = ann_minus_one.checked_mul(d).ok_or(MathError::Overflow)?;
        let n_plus_one = n.checked_add(U256::from(1u8)).ok_or(MathError::Overflow)?;
        let term_b = n_plus_one.checked_mul(d_p).ok_or(MathError::Overflow)?;
        let denominator = term_a.checked_add(term_b).ok_or(MathError::Overflow)?;

        d = numerator_coeff.checked_mul_div(d, denominator)?;

        let diff = if d > d_prev { d - d_prev } else { d_prev - d };
        if diff <= U256::from(1u8) {
            return Ok(d);
        }
    }
    Err(MathError::NoConvergence)
}

/// Solves for the balance of `idx_out` that keeps the invariant `D`
/// satisfied, given every other balance (with `idx_in` updated to
/// `new_balance_in`). Reduces to a quadratic in the unknown balance
/// regardless of `n`, solved directly with [`isqrt`] rather than a second
/// Newton loop.
fn get_y(
    xp: &[U256],
    ann: U256,
    d: U256,
    idx_in: usize,
    idx_out: usize,
    new_balance_in: U256,
) -> Result<U256, MathError> {
    let n = U256::from(xp.len() as u64);

    let mut c = d;
    let mut sum_other = U256::ZERO;
    for (k, &balance) in xp.iter().enumerate() {
        if k == idx_out {
            continue;
        }
        let x = if k == idx_in { new_balance_in } else { balance };
        sum_other = sum_other.checked_add(x).ok_or(MathError::Overflow)?;
        let denom = x.checked_mul(n).ok_or(MathError::Overflow)?;
        c = c.checked_mul_div(d, denom)?;
    }
    let ann_n = ann.checked_mul(n).ok_or(MathError::Overflow)?;
    c = c.checked_mul_div(d, ann_n)?;

    let d_over_ann = d.checked_div(ann).ok_or(MathError::DivByZero)?;
    let b = sum_other.checked_add(d_over_ann).ok_or(MathError::Overflow)?;

    // y^2 + (b - D) y - c = 0, positive root via the quadratic formula. `b`
    // and `D` are unsigned, so the `(b - D)` term is carried as a
    // magnitude-and-sign pair instead of a native signed subtraction.
    let (diff, d_ge_b) = if d >= b { (d - b, true) } else { (b - d, false) };
    let diff_sq = diff.checked_mul(diff).ok_or(MathError::Overflow)?;
    let four_c = c.checked_mul(U256::from(4u8)).ok_or(MathError::Overflow)?;
    let discriminant = diff_sq.checked_add(four_c).ok_or(MathError::Overflow)?;
    let sqrt_disc = isqrt(discriminant)?;

    let numerator = if d_ge_b {
        diff.checked_add(sqrt_disc).ok_or(MathError::Overflow)?
    } else {
        sqrt_disc.checked_sub(diff).ok_or(MathError::Overflow)?
    };
    Ok(numerator / U256::from(2u8))
}
