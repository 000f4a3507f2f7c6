//! Integer fixed-point helpers.
//!
//! Products of two `u128` amounts routinely exceed 128 bits (an 18-decimal
//! price times a token amount), so intermediates are widened to 256 bits and
//! narrowed back once the division has brought them into range.

use bnum::cast::As;
use bnum::types::U256;

use crate::shared::errors::MathError;
use crate::shared::types::{Amount, Bips, BIPS_SCALE};

fn narrow(value: U256) -> Result<u128, MathError> {
    if value > U256::from(u128::MAX) {
        return Err(MathError::Overflow);
    }
    Ok(value.as_::<u128>())
}

/// floor(a * b / denominator)
pub fn mul_div_floor(a: u128, b: u128, denominator: u128) -> Result<u128, MathError> {
    if denominator == 0 {
        return Err(MathError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(MathError::Overflow)?;
    narrow(product / U256::from(denominator))
}

/// 10^exp as a 256-bit integer; errors past 10^77
pub fn pow10(exp: u32) -> Result<U256, MathError> {
    U256::from(10u8).checked_pow(exp).ok_or(MathError::Overflow)
}

/// value * 10^exp
pub fn scale_up(value: u128, exp: u32) -> Result<u128, MathError> {
    let scaled = U256::from(value)
        .checked_mul(pow10(exp)?)
        .ok_or(MathError::Overflow)?;
    narrow(scaled)
}

/// floor(value / 10^exp)
pub fn scale_down(value: u128, exp: u32) -> Result<u128, MathError> {
    narrow(U256::from(value) / pow10(exp)?)
}

/// floor(amount * bips / 10_000)
pub fn bips_of(amount: Amount, bips: Bips) -> Result<Amount, MathError> {
    mul_div_floor(amount, bips as u128, BIPS_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_floor_rounds_down() {
        assert_eq!(mul_div_floor(7, 3, 2).unwrap(), 10);
        assert_eq!(mul_div_floor(1000, 2000, 1000).unwrap(), 2000);
        assert_eq!(mul_div_floor(0, 5, 3).unwrap(), 0);
    }

    #[test]
    fn test_mul_div_floor_wide_intermediate() {
        // The product overflows u128 but the quotient does not
        let a = u128::MAX / 2;
        assert_eq!(mul_div_floor(a, 4, 4).unwrap(), a);
        assert_eq!(mul_div_floor(u128::MAX, u128::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn test_mul_div_floor_zero_denominator() {
        assert_eq!(mul_div_floor(1, 1, 0), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_scale_up_and_down() {
        assert_eq!(scale_up(2, 18).unwrap(), 2_000_000_000_000_000_000);
        assert_eq!(scale_down(123_456, 3).unwrap(), 123);
        // 10^77 is the largest power of ten that fits 256 bits
        assert_eq!(scale_down(u64::MAX as u128, 77).unwrap(), 0);
        assert_eq!(scale_down(1, 78), Err(MathError::Overflow));
        assert_eq!(scale_up(u128::MAX, 1), Err(MathError::Overflow));
    }

    #[test]
    fn test_bips_of() {
        assert_eq!(bips_of(100, 30).unwrap(), 0);
        assert_eq!(bips_of(10_000, 30).unwrap(), 30);
        assert_eq!(bips_of(1_000_000, 10_000).unwrap(), 1_000_000);
    }
}
