//! Column constraints enforced by the store write routines.

use rust_decimal::Decimal;

use crate::error::{ModelError, ModelResult};

pub const MAX_CHAR_LENGTH: usize = 255;
pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub fn check_max_length(field: &'static str, value: &str, max: usize) -> ModelResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(ModelError::max_length(field, max, len));
    }
    Ok(())
}

pub fn check_optional_max_length(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> ModelResult<()> {
    match value {
        Some(v) => check_max_length(field, v, max),
        None => Ok(()),
    }
}

pub fn check_positive(field: &'static str, value: i32) -> ModelResult<()> {
    if value <= 0 {
        return Err(ModelError::constraint(
            "fields.positive",
            field,
            format!("Ensure this value is greater than 0 (it is {}).", value),
        ));
    }
    Ok(())
}

/// NUMERIC(5, 2): at most two decimal places and three integer digits.
pub fn check_price(field: &'static str, value: Decimal) -> ModelResult<()> {
    let normalized = value.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        return Err(ModelError::constraint(
            "fields.decimal_places",
            field,
            format!(
                "Ensure that there are no more than {} decimal places.",
                PRICE_DECIMAL_PLACES
            ),
        ));
    }
    let integer_limit = Decimal::from(10i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
    if normalized.abs().trunc() >= integer_limit {
        return Err(ModelError::constraint(
            "fields.max_digits",
            field,
            format!(
                "Ensure that there are no more than {} digits in total.",
                PRICE_MAX_DIGITS
            ),
        ));
    }
    Ok(())
}
