//! Unit-price normalization: a monetary price plus a free-text weight
//! string becomes a raw price per kilogram.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::listing::ProductListing;
use crate::weight::{parse_weight, WeightSpec};

/// Currency-per-mass unit of a normalized price. Single-currency engine:
/// everything is EUR per kilogram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceUnit {
    #[serde(rename = "EUR/kg")]
    EurPerKg,
}

impl fmt::Display for PriceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceUnit::EurPerKg => write!(f, "EUR/kg"),
        }
    }
}

/// A derived price per kilogram.
///
/// Recomputed whenever price or weight changes; never mutated
/// independently. The value is the raw float — rounding and locale
/// suffixes (`"€/kg"`) belong to the presentation boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitPrice {
    pub value: f64,
    pub unit: PriceUnit,
}

impl UnitPrice {
    #[must_use]
    pub fn per_kg(value: f64) -> Self {
        Self {
            value,
            unit: PriceUnit::EurPerKg,
        }
    }
}

/// Computes the raw price per kilogram for a price and a free-text weight
/// string.
///
/// Returns `None` when the price is non-finite or not positive, the weight
/// string does not parse, or the converted mass is not positive. Soft
/// failure only — callers skip the product for unit-price purposes.
#[must_use]
pub fn unit_price_per_kg(price: f64, weight_text: &str) -> Option<f64> {
    if !price.is_finite() || price <= 0.0 {
        return None;
    }
    let grams = parse_weight(weight_text)?.grams();
    if grams <= 0.0 {
        return None;
    }
    Some(price / grams * 1000.0)
}

/// Weight and unit price derived together from one listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedPricing {
    pub weight: WeightSpec,
    pub grams: f64,
    pub unit_price: UnitPrice,
}

/// Derives weight and unit price for a listing, resolving the weight text
/// via [`ProductListing::weight_text`] (detail field preferred, else name).
#[must_use]
pub fn derive_listing_pricing(listing: &ProductListing) -> Option<DerivedPricing> {
    if !listing.price.is_finite() || listing.price <= 0.0 {
        return None;
    }
    let weight = parse_weight(listing.weight_text())?;
    let grams = weight.grams();
    if grams <= 0.0 {
        return None;
    }
    Some(DerivedPricing {
        weight,
        grams,
        unit_price: UnitPrice::per_kg(listing.price / grams * 1000.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weight::WeightUnit;

    fn make_listing(name: &str, price: f64, details_weight: Option<&str>) -> ProductListing {
        ProductListing {
            id: 1,
            name: name.to_string(),
            brand: "Acme".to_string(),
            price,
            currency: "EUR".to_string(),
            category: None,
            pet_type: None,
            source: "zooshop".to_string(),
            details_weight: details_weight.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn fifteen_kilos_normalizes_to_price_over_fifteen() {
        let unit = unit_price_per_kg(59.99, "15kg").expect("unit price");
        assert!((unit - 59.99 / 15.0).abs() < 1e-9, "got {unit}");
    }

    #[test]
    fn grams_scale_up_to_kilograms() {
        let unit = unit_price_per_kg(2.0, "400g").expect("unit price");
        assert!((unit - 5.0).abs() < 1e-9, "got {unit}");
    }

    #[test]
    fn empty_weight_string_is_none_for_any_price() {
        assert!(unit_price_per_kg(9.99, "").is_none());
        assert!(unit_price_per_kg(0.01, "").is_none());
        assert!(unit_price_per_kg(1_000_000.0, "").is_none());
    }

    #[test]
    fn invalid_prices_are_none() {
        assert!(unit_price_per_kg(0.0, "1kg").is_none());
        assert!(unit_price_per_kg(-5.0, "1kg").is_none());
        assert!(unit_price_per_kg(f64::NAN, "1kg").is_none());
        assert!(unit_price_per_kg(f64::INFINITY, "1kg").is_none());
    }

    #[test]
    fn unparseable_weight_is_none() {
        assert!(unit_price_per_kg(9.99, "Adult Dog Food").is_none());
    }

    #[test]
    fn no_rounding_is_applied() {
        // 10 / 3kg = 3.3333... — the raw float is exposed.
        let unit = unit_price_per_kg(10.0, "3kg").expect("unit price");
        assert!((unit - 10.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn multipack_weight_feeds_the_calculation() {
        // 4 x 100g = 400g → 8.0 / 0.4kg = 20 EUR/kg.
        let unit = unit_price_per_kg(8.0, "4 x 100g").expect("unit price");
        assert!((unit - 20.0).abs() < 1e-9, "got {unit}");
    }

    #[test]
    fn derive_prefers_detail_weight_over_name() {
        let listing = make_listing("Some Food 99kg", 10.0, Some("1kg"));
        let derived = derive_listing_pricing(&listing).expect("derived");
        assert_eq!(derived.weight.value, 1.0);
        assert_eq!(derived.weight.unit, WeightUnit::Kg);
        assert!((derived.unit_price.value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn derive_falls_back_to_name() {
        let listing = make_listing("Adult Medium 4kg", 24.99, None);
        let derived = derive_listing_pricing(&listing).expect("derived");
        assert_eq!(derived.grams, 4000.0);
        assert!((derived.unit_price.value - 24.99 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn derive_none_when_nothing_parseable() {
        let listing = make_listing("Adult Dog Food", 24.99, None);
        assert!(derive_listing_pricing(&listing).is_none());
    }

    #[test]
    fn derive_none_for_bad_price() {
        let listing = make_listing("Adult 4kg", f64::NAN, None);
        assert!(derive_listing_pricing(&listing).is_none());
    }

    #[test]
    fn unit_price_serializes_with_currency_unit() {
        let json = serde_json::to_string(&UnitPrice::per_kg(4.0)).expect("serialize");
        assert_eq!(json, r#"{"value":4.0,"unit":"EUR/kg"}"#);
    }
}
