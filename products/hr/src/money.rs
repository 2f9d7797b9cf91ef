use rust_decimal::Decimal;

use crate::error::{HrError, HrResult};

/// Normalizes a stored amount to exactly two decimal places.
pub fn money(value: Decimal) -> Decimal {
    let mut value = value.round_dp(2);
    value.rescale(2);
    value
}

/// Checks an incoming amount against a `max_digits`/2-decimal column.
pub(crate) fn validate_money(field: &str, value: Decimal, max_digits: u32) -> HrResult<Decimal> {
    if value.normalize().scale() > 2 {
        return Err(HrError::validation(format!(
            "{field}: Ensure that there are no more than 2 decimal places."
        )));
    }
    let whole_digits = max_digits - 2;
    let ceiling = Decimal::from(10_i64.pow(whole_digits));
    if value.trunc().abs() >= ceiling {
        return Err(HrError::validation(format!(
            "{field}: Ensure that there are no more than {whole_digits} digits before the decimal point."
        )));
    }
    Ok(money(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn amounts_render_with_two_places() {
        assert_eq!(money(Decimal::from(1_000_000)).to_string(), "1000000.00");
        assert_eq!(money(Decimal::from_str("12.5").unwrap()).to_string(), "12.50");
        assert_eq!(
            money(Decimal::from_str("799999.999999").unwrap()).to_string(),
            "800000.00"
        );
    }

    #[test]
    fn precision_is_enforced() {
        assert!(validate_money("budget", Decimal::from_str("1.234").unwrap(), 12).is_err());
        assert!(validate_money("salary", Decimal::from(100_000_000), 10).is_err());
        assert_eq!(
            validate_money("salary", Decimal::from_str("99999999.99").unwrap(), 10)
                .unwrap()
                .to_string(),
            "99999999.99"
        );
        assert!(validate_money("budget", Decimal::from_str("1.50").unwrap(), 12).is_ok());
    }
}
