use serde::{Deserialize, Serialize};

/// One purchasable listing as scraped from a retail site.
///
/// Read-only input to the engine: only `name`, `brand`, `price`, and the
/// weight hint are ever inspected. Construction from stored rows happens at
/// the persistence boundary — the engine never sees a database row type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductListing {
    pub id: i64,
    pub name: String,
    pub brand: String,
    /// Listed price in `currency`. Single-currency engine: EUR throughout.
    pub price: f64,
    /// ISO 4217 currency code (e.g., `"EUR"`).
    pub currency: String,
    pub category: Option<String>,
    pub pet_type: Option<String>,
    /// Retail site the listing was scraped from.
    pub source: String,
    /// Weight string from the product detail page, when the scraper found
    /// one. Free text either way — `"1,5 kg"`, `"4 x 100g"`, `"12.5"`.
    pub details_weight: Option<String>,
}

impl ProductListing {
    /// The text to parse a weight from: the structured detail field when
    /// present and non-empty, else the full product name.
    #[must_use]
    pub fn weight_text(&self) -> &str {
        match self.details_weight.as_deref() {
            Some(w) if !w.trim().is_empty() => w,
            _ => &self.name,
        }
    }
}
