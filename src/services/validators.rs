use rust_decimal::Decimal;
use validator::ValidationError;

/// Fractional digits kept by the `decimal(15, 4)` quantity, level and cost columns
pub const STORAGE_SCALE: u32 = 4;

/// Exclusive bound on the magnitude those columns hold (10^11)
pub fn storage_limit() -> Decimal {
    Decimal::from(100_000_000_000_i64)
}

/// Whether `value` is stored without rounding or overflow
pub fn fits_storage(value: Decimal) -> bool {
    value.normalize().scale() <= STORAGE_SCALE && value.abs() < storage_limit()
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn storage_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if fits_storage(*value) {
        Ok(())
    } else {
        Err(invalid(
            "storage_range",
            "must be below 100000000000 with at most 4 decimal places",
        ))
    }
}

pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    storage_decimal(value)?;
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(invalid("positive", "must be greater than zero"))
    }
}

pub fn non_negative_decimal(value: &Decimal) -> Result<(), ValidationError> {
    storage_decimal(value)?;
    if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(invalid("non_negative", "must not be negative"))
    }
}

pub fn non_zero_decimal(value: &Decimal) -> Result<(), ValidationError> {
    storage_decimal(value)?;
    if value.is_zero() {
        Err(invalid("non_zero", "must not be zero"))
    } else {
        Ok(())
    }
}

/// 0 to 100 with at most 2 decimal places, as `decimal(5, 2)` stores it
pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > 2 {
        return Err(invalid("percentage_scale", "must have at most 2 decimal places"));
    }
    if *value >= Decimal::ZERO && *value <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        Err(invalid("percentage", "must be between 0 and 100"))
    }
}

pub fn slug(value: &str) -> Result<(), ValidationError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
        && !value.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(invalid(
            "slug",
            "must contain lowercase letters, digits and inner hyphens only",
        ))
    }
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(invalid("not_blank", "must not be blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn decimal_rules() {
        assert!(positive_decimal(&dec!(0.0001)).is_ok());
        assert!(positive_decimal(&dec!(0)).is_err());
        assert!(non_negative_decimal(&dec!(0)).is_ok());
        assert!(non_negative_decimal(&dec!(-1)).is_err());
        assert!(non_zero_decimal(&dec!(-2.5)).is_ok());
        assert!(non_zero_decimal(&dec!(0.000)).is_err());
        assert!(percentage(&dec!(100)).is_ok());
        assert!(percentage(&dec!(100.01)).is_err());
        assert!(percentage(&dec!(12.5)).is_ok());
        assert!(percentage(&dec!(12.505)).is_err());
    }

    #[test]
    fn decimals_must_fit_the_storage_columns() {
        assert!(positive_decimal(&dec!(99999999999.9999)).is_ok());
        assert!(positive_decimal(&dec!(100000000000)).is_err());
        assert!(positive_decimal(&Decimal::MAX).is_err());
        assert!(non_zero_decimal(&dec!(-100000000000)).is_err());
        assert!(non_zero_decimal(&dec!(0.00005)).is_err());
        assert!(non_negative_decimal(&dec!(1.50000)).is_ok());
        assert!(storage_decimal(&dec!(0.0001)).is_ok());
        assert!(!fits_storage(dec!(9.99995)));
    }

    #[test]
    fn slug_rules() {
        assert!(slug("acme-bakery-2").is_ok());
        assert!(slug("Acme").is_err());
        assert!(slug("-acme").is_err());
        assert!(slug("").is_err());
        assert!(not_blank("   ").is_err());
    }
}
