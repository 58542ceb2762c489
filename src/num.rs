//! Display-amount ⇄ fixed-point conversion.
//!
//! Every token handled by the SDK uses 18 decimals, so [`to_fixed_point`]
//! and [`from_fixed_point`] cover the common case; [`Converter`] is kept
//! generic for tokens with other precision.

use alloy::primitives::{I256, U256};
use fastnum::{
    UD256, bint,
    decimal::{Context, Decimal, RoundingMode, UnsignedDecimal},
};

use crate::error::OceanError;

/// Decimals of datatokens, pool shares and OCEAN.
pub const TOKEN_DECIMALS: u8 = 18;

/// Fixed-point to decimal converter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Converter {
    decimals: i32,
}

impl Converter {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals: decimals as i32,
        }
    }

    /// Converter for 18-decimal tokens.
    pub fn wei() -> Self {
        Self::new(TOKEN_DECIMALS)
    }

    pub fn decimals(&self) -> u8 {
        self.decimals as u8
    }

    pub fn from_unsigned<const N: usize>(&self, value: U256) -> UnsignedDecimal<N> {
        let unscaled = bint::UInt::<N>::from_le_slice(value.as_le_slice()).unwrap_or_default();
        UnsignedDecimal::<N>::from_parts(unscaled, -self.decimals, floor())
    }

    pub fn from_signed<const N: usize>(&self, value: I256) -> Decimal<N> {
        let unscaled =
            bint::UInt::<N>::from_le_slice(value.unsigned_abs().as_le_slice()).unwrap_or_default();
        Decimal::<N>::from_parts(
            unscaled,
            -self.decimals,
            match value.sign() {
                alloy::primitives::Sign::Negative => fastnum::decimal::Sign::Minus,
                alloy::primitives::Sign::Positive => fastnum::decimal::Sign::Plus,
            },
            floor(),
        )
    }

    /// Scales `value` by 10^decimals, dropping digits past the last
    /// representable decimal place.
    ///
    /// Fails for NaN, infinities and values whose fixed-point form does not
    /// fit in a `U256`.
    pub fn to_unsigned<const N: usize>(
        &self,
        value: UnsignedDecimal<N>,
    ) -> Result<U256, OceanError> {
        let bound = UnsignedDecimal::<N>::from_parts(
            self.unscaled_bound(U256::MAX),
            -self.decimals,
            floor(),
        );
        if !value.is_finite() || value > bound {
            return Err(OceanError::InvalidAmount(format!(
                "{value} has no {}-decimal fixed-point form",
                self.decimals
            )));
        }
        let rescaled = value
            .with_rounding_mode(RoundingMode::Down)
            .rescale(self.decimals as i16);
        fixed_digits(rescaled.digits())
    }

    /// Signed counterpart of [`Self::to_unsigned`], bounded by `I256::MAX`
    /// in magnitude.
    pub fn to_signed<const N: usize>(&self, value: Decimal<N>) -> Result<I256, OceanError> {
        let bound = Decimal::<N>::from_parts(
            self.unscaled_bound(I256::MAX.into_raw()),
            -self.decimals,
            fastnum::decimal::Sign::Plus,
            floor(),
        );
        if !value.is_finite() || value.abs() > bound {
            return Err(OceanError::InvalidAmount(format!(
                "{value} has no signed {}-decimal fixed-point form",
                self.decimals
            )));
        }
        let rescaled = value
            .with_rounding_mode(RoundingMode::Down)
            .rescale(self.decimals as i16);
        let magnitude = I256::from_raw(fixed_digits(rescaled.digits())?);
        Ok(if value.is_negative() {
            -magnitude
        } else {
            magnitude
        })
    }

    /// Largest fixed-point value up to `max` that `N` words can hold.
    fn unscaled_bound<const N: usize>(&self, max: U256) -> bint::UInt<N> {
        bint::UInt::<N>::from_le_slice(max.as_le_slice()).unwrap_or(bint::UInt::<N>::MAX)
    }
}

fn fixed_digits<const N: usize>(digits: bint::UInt<N>) -> Result<U256, OceanError> {
    U256::try_from_le_slice(digits.to_radix_le(256).as_slice())
        .ok_or_else(|| OceanError::InvalidAmount("fixed-point amount overflows 256 bits".into()))
}

fn floor() -> Context {
    Context::default().with_rounding_mode(RoundingMode::Floor)
}

/// Parses a display amount, e.g. `"12.5"`.
///
/// Special values such as `"NaN"` or `"inf"` are rejected.
pub fn parse_amount(value: &str) -> Result<UD256, OceanError> {
    let amount = UD256::from_str(value.trim(), floor())
        .map_err(|err| OceanError::InvalidAmount(format!("{value:?}: {err}")))?;
    if !amount.is_finite() {
        return Err(OceanError::InvalidAmount(format!("{value:?} is not a finite amount")));
    }
    Ok(amount)
}

/// Display amount to 18-decimal fixed point, truncating excess precision.
pub fn to_fixed_point(value: UD256) -> Result<U256, OceanError> {
    Converter::wei().to_unsigned(value)
}

/// 18-decimal fixed point to display amount, lossless.
pub fn from_fixed_point(value: U256) -> UD256 {
    Converter::wei().from_unsigned(value)
}

/// Parses and converts a display amount in one step.
pub fn parse_fixed_point(value: &str) -> Result<U256, OceanError> {
    parse_amount(value).and_then(to_fixed_point)
}

#[cfg(test)]
mod tests {
    use fastnum::{D256, dec256, udec256};

    use super::*;

    #[test]
    fn test_converter_respects_token_decimals() {
        // 6-decimal stablecoin
        assert_eq!(
            Converter::new(6).from_unsigned(U256::from(2_500_000)),
            udec256!(2.5)
        );
        assert_eq!(
            Converter::new(6).to_unsigned(udec256!(0.0000019)).unwrap(),
            U256::from(1)
        );
        assert_eq!(
            Converter::wei().from_unsigned(U256::from(42)),
            udec256!(0.000000000000000042)
        );
        assert_eq!(Converter::wei().decimals(), TOKEN_DECIMALS);
    }

    #[test]
    fn test_converter_signed_deltas() {
        assert_eq!(
            Converter::wei().from_signed(I256::try_from(-1_500_000_000_000_000_000_i128).unwrap()),
            dec256!(-1.5)
        );
        assert_eq!(
            Converter::wei().from_signed(I256::from_raw(to_fixed_point(udec256!(50)).unwrap())),
            dec256!(50)
        );
    }

    #[test]
    fn test_converter_to_signed() {
        let converter = Converter::wei();
        assert_eq!(
            converter.to_signed(dec256!(-1.5)).unwrap(),
            I256::try_from(-1_500_000_000_000_000_000_i128).unwrap()
        );
        assert_eq!(converter.to_signed(dec256!(0)).unwrap(), I256::ZERO);
        for delta in [dec256!(-0.000000000000000001), dec256!(42.25), dec256!(-1000)] {
            assert_eq!(converter.from_signed(converter.to_signed(delta).unwrap()), delta);
        }
        assert!(matches!(
            converter.to_signed(-D256::from_str("1e60", floor()).unwrap()),
            Err(OceanError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_to_fixed_point_whole_and_fractional() {
        assert_eq!(
            to_fixed_point(udec256!(50)).unwrap(),
            U256::from(50_000_000_000_000_000_000_u128)
        );
        assert_eq!(
            to_fixed_point(udec256!(0.5)).unwrap(),
            U256::from(500_000_000_000_000_000_u128)
        );
        assert_eq!(
            to_fixed_point(udec256!(0.000000000000000001)).unwrap(),
            U256::from(1)
        );
        assert_eq!(to_fixed_point(udec256!(0)).unwrap(), U256::ZERO);
    }

    #[test]
    fn test_to_fixed_point_truncates_excess_precision() {
        assert_eq!(
            to_fixed_point(udec256!(1.0000000000000000019)).unwrap(),
            U256::from(1_000_000_000_000_000_001_u128)
        );
        assert_eq!(
            to_fixed_point(udec256!(0.0000000000000000009)).unwrap(),
            U256::ZERO
        );
    }

    #[test]
    fn test_to_fixed_point_rejects_amounts_beyond_u256() {
        let max = from_fixed_point(U256::MAX);
        assert_eq!(to_fixed_point(max).unwrap(), U256::MAX);
        assert!(matches!(
            to_fixed_point(parse_amount("1e60").unwrap()),
            Err(OceanError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_from_fixed_point_is_lossless() {
        assert_eq!(
            from_fixed_point(U256::from(1_000_000_000_000_000_001_u128)),
            udec256!(1.000000000000000001)
        );
        assert_eq!(from_fixed_point(U256::ZERO), udec256!(0));
    }

    #[test]
    fn test_round_trip_within_precision() {
        for value in [
            udec256!(0),
            udec256!(1),
            udec256!(0.25),
            udec256!(1234.567890123456789012),
            udec256!(10000000),
        ] {
            let truncated = from_fixed_point(to_fixed_point(value).unwrap());
            assert_eq!(from_fixed_point(to_fixed_point(truncated).unwrap()), truncated);
        }
        assert_eq!(
            from_fixed_point(to_fixed_point(udec256!(0.123456789012345678)).unwrap()),
            udec256!(0.123456789012345678)
        );
    }

    #[test]
    fn test_parse_fixed_point() {
        assert_eq!(
            parse_fixed_point("100").unwrap(),
            U256::from(100_000_000_000_000_000_000_u128)
        );
        assert_eq!(
            parse_fixed_point(" 0.3 ").unwrap(),
            U256::from(300_000_000_000_000_000_u128)
        );
        assert!(matches!(
            parse_fixed_point("ten"),
            Err(OceanError::InvalidAmount(_))
        ));
        assert!(parse_fixed_point("-1").is_err());
    }

    #[test]
    fn test_parse_fixed_point_rejects_special_and_oversized_values() {
        for input in ["NaN", "nan", "inf", "Infinity", "1e60"] {
            assert!(
                matches!(parse_fixed_point(input), Err(OceanError::InvalidAmount(_))),
                "{input} was accepted"
            );
        }
        assert!(parse_amount("inf").is_err());
        assert_eq!(
            parse_fixed_point("1e3").unwrap(),
            U256::from(1_000_000_000_000_000_000_000_u128)
        );
    }
}
