//! Unit tests for the Money module
//!
//! Covers creation, parsing of declarations-page amounts, settlement
//! arithmetic and currency handling.

use core_kernel::{Money, Currency, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_minor_units() {
        let m = Money::new(dec!(100.125), Currency::USD);
        assert_eq!(m.amount(), dec!(100.12));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::CAD);
        assert!(m.is_zero());
        assert_eq!(m.currency(), Currency::CAD);
    }

    #[test]
    fn test_usd_shorthand() {
        assert_eq!(Money::usd(dec!(500)).currency(), Currency::USD);
    }
}

mod parsing {
    use super::*;

    #[test]
    fn test_parse_with_symbol_and_separators() {
        let m = Money::parse("$100,000", Currency::USD).unwrap();
        assert_eq!(m.amount(), dec!(100000));
    }

    #[test]
    fn test_parse_with_code_prefix() {
        let m = Money::parse("USD 1,250.50", Currency::USD).unwrap();
        assert_eq!(m.amount(), dec!(1250.50));
    }

    #[test]
    fn test_parse_rejects_text() {
        let result = Money::parse("Actual Cash Value", Currency::USD);
        assert!(matches!(result, Err(MoneyError::InvalidAmount(_))));
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(Money::parse("  ", Currency::USD).is_err());
    }
}

mod settlement_arithmetic {
    use super::*;

    #[test]
    fn test_loss_minus_deductible() {
        let loss = Money::usd(dec!(3200));
        let deductible = Money::usd(dec!(500));
        assert_eq!(loss.saturating_sub(&deductible).unwrap(), Money::usd(dec!(2700)));
    }

    #[test]
    fn test_saturating_sub_below_deductible_is_zero() {
        let loss = Money::usd(dec!(450));
        let deductible = Money::usd(dec!(500));
        assert!(loss.saturating_sub(&deductible).unwrap().is_zero());
    }

    #[test]
    fn test_saturating_sub_currency_mismatch() {
        let usd = Money::usd(dec!(1));
        let eur = Money::new(dec!(1), Currency::EUR);
        assert!(matches!(usd.saturating_sub(&eur), Err(MoneyError::CurrencyMismatch(_, _))));
    }
}

mod predicates {
    use super::*;

    #[test]
    fn test_zero_is_not_negative() {
        let m = Money::zero(Currency::USD);
        assert!(m.is_zero());
        assert!(!m.is_negative());
    }

    #[test]
    fn test_negative_amount() {
        assert!(Money::usd(dec!(-1)).is_negative());
    }
}

mod serialization {
    use super::*;

    #[test]
    fn test_money_json_round_trip_preserves_currency() {
        let m = Money::usd(dec!(2700));
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"USD\""));
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
