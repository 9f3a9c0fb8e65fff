//! Input checks the rate engine leaves to its callers.

use ratekeeper_common::{CurrencyCode, Result, ServiceError};
use ratekeeper_fx::parse_currency_filter;

/// Parse a currency argument, rejecting anything but three letters.
pub fn currency(field: &str, raw: &str) -> Result<CurrencyCode> {
    let code = CurrencyCode::new(raw);
    if !code.is_well_formed() {
        return Err(ServiceError::validation(
            field,
            format!("{} must be a 3-letter currency code, got {:?}", field, raw),
        ));
    }
    Ok(code)
}

/// Check an amount is a positive finite number.
pub fn amount(raw: f64) -> Result<f64> {
    if !raw.is_finite() || raw <= 0.0 {
        return Err(ServiceError::validation(
            "amount",
            format!("amount must be a positive number, got {}", raw),
        ));
    }
    Ok(raw)
}

/// Parse a comma-separated currency filter, checking every code.
pub fn currency_filter(raw: Option<&str>) -> Result<Option<Vec<CurrencyCode>>> {
    let codes = match raw.and_then(parse_currency_filter) {
        Some(codes) => codes,
        None => return Ok(None),
    };

    for code in &codes {
        currency("currencies", code.code())?;
    }
    Ok(Some(codes))
}
