//! Static USD-denominated reference rates.
//!
//! Used whenever the upstream provider cannot be reached, and per currency
//! whenever a live table is missing a code.

use ratekeeper_common::CurrencyCode;

use crate::RateTable;

/// Rate assumed for a currency that appears in no table at all.
pub const UNKNOWN_CURRENCY_RATE: f64 = 1.0;

/// Units of each currency per 1 USD.
const REFERENCE_RATES: &[(&str, f64)] = &[
    ("USD", 1.0),
    ("EUR", 0.85),
    ("GBP", 0.73),
    ("JPY", 110.0),
    ("AUD", 1.35),
    ("CAD", 1.25),
    ("CHF", 0.92),
    ("CNY", 6.45),
    ("HKD", 7.78),
    ("NZD", 1.42),
    ("SEK", 8.6),
    ("NOK", 8.6),
    ("DKK", 6.35),
    ("KRW", 1180.0),
    ("SGD", 1.35),
    ("MXN", 20.0),
    ("INR", 74.5),
    ("RUB", 73.0),
    ("ZAR", 14.5),
    ("TRY", 8.5),
    ("BRL", 5.2),
    ("TWD", 28.0),
    ("PLN", 3.9),
    ("THB", 32.5),
    ("IDR", 14300.0),
    ("HUF", 300.0),
    ("CZK", 21.5),
    ("ILS", 3.25),
    ("CLP", 750.0),
    ("PHP", 50.0),
    ("AED", 3.67),
    ("COP", 3800.0),
    ("SAR", 3.75),
    ("MYR", 4.15),
    ("RON", 4.2),
    ("ARS", 98.0),
    ("BGN", 1.66),
    ("HRK", 6.4),
    ("ISK", 125.0),
    ("PKR", 160.0),
    ("EGP", 15.7),
    ("VND", 23000.0),
    ("NGN", 410.0),
    ("BDT", 85.0),
    ("UAH", 27.0),
    ("KZT", 425.0),
    ("QAR", 3.64),
    ("KWD", 0.3),
    ("BHD", 0.376),
    ("OMR", 0.385),
    ("JOD", 0.709),
    ("LKR", 200.0),
    ("KES", 108.0),
    ("MAD", 8.9),
    ("PEN", 3.9),
    ("DZD", 135.0),
    ("TND", 2.8),
    ("GHS", 6.0),
    ("UGX", 3550.0),
    ("TZS", 2310.0),
    ("XOF", 557.0),
    ("XAF", 557.0),
    ("ETB", 44.0),
    ("IQD", 1460.0),
    ("NPR", 119.0),
    ("MMK", 1800.0),
    ("KHR", 4080.0),
    ("LAK", 9500.0),
    ("MNT", 2850.0),
    ("GEL", 3.1),
    ("AMD", 490.0),
    ("AZN", 1.7),
    ("BYN", 2.5),
    ("MDL", 17.7),
    ("RSD", 100.0),
    ("MKD", 52.0),
    ("ALL", 103.0),
    ("BAM", 1.66),
    ("UYU", 43.5),
    ("PYG", 6900.0),
    ("BOB", 6.9),
    ("DOP", 57.0),
    ("CRC", 620.0),
    ("GTQ", 7.75),
    ("JMD", 150.0),
    ("TTD", 6.78),
    ("XCD", 2.7),
    ("FJD", 2.08),
    ("MUR", 42.0),
    ("BWP", 11.0),
    ("MOP", 8.0),
];

/// Immutable table of USD-denominated reference rates.
#[derive(Debug, Clone)]
pub struct FallbackRateTable {
    rates: RateTable,
}

impl FallbackRateTable {
    /// The built-in reference table.
    pub fn standard() -> Self {
        Self::from_rates(
            REFERENCE_RATES
                .iter()
                .map(|(code, rate)| (CurrencyCode::new(code), *rate)),
        )
    }

    /// Build a table from arbitrary USD-denominated rates.
    pub fn from_rates(rates: impl IntoIterator<Item = (CurrencyCode, f64)>) -> Self {
        Self {
            rates: rates.into_iter().collect(),
        }
    }

    /// Rate for `code`, or [`UNKNOWN_CURRENCY_RATE`] if the table has none.
    pub fn lookup(&self, code: &CurrencyCode) -> f64 {
        self.get(code).unwrap_or(UNKNOWN_CURRENCY_RATE)
    }

    /// Rate for `code` if the table knows it.
    pub fn get(&self, code: &CurrencyCode) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.rates.contains_key(code)
    }

    /// The whole table as a USD-based rate map.
    pub fn to_table(&self) -> RateTable {
        self.rates.clone()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl Default for FallbackRateTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_contents() {
        let table = FallbackRateTable::standard();

        assert!(table.len() >= 80);
        assert_eq!(table.len(), REFERENCE_RATES.len());
        assert_eq!(table.lookup(&CurrencyCode::usd()), 1.0);
        assert_eq!(table.lookup(&CurrencyCode::eur()), 0.85);
        assert_eq!(table.lookup(&CurrencyCode::gbp()), 0.73);
    }

    #[test]
    fn test_all_reference_rates_positive() {
        for (code, rate) in FallbackRateTable::standard().to_table() {
            assert!(rate.is_finite() && rate > 0.0, "{} has rate {}", code, rate);
        }
    }

    #[test]
    fn test_unknown_code_defaults_to_one() {
        let table = FallbackRateTable::standard();
        let unknown = CurrencyCode::new("XYZ");

        assert!(!table.contains(&unknown));
        assert_eq!(table.get(&unknown), None);
        assert_eq!(table.lookup(&unknown), UNKNOWN_CURRENCY_RATE);
    }

    #[test]
    fn test_lookup_is_case_insensitive_through_code() {
        let table = FallbackRateTable::standard();
        assert_eq!(table.lookup(&CurrencyCode::new("jpy")), 110.0);
    }

    #[test]
    fn test_custom_table() {
        let table = FallbackRateTable::from_rates(vec![(CurrencyCode::new("eur"), 0.9)]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup(&CurrencyCode::eur()), 0.9);
        assert_eq!(table.lookup(&CurrencyCode::gbp()), 1.0);
    }
}
