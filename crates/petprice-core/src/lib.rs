//! Pure pricing and grouping engine for the pet-product price comparison
//! service, plus the application configuration shared by every layer.
//!
//! The engine modules ([`weight`], [`unit_price`], [`similarity`],
//! [`grouping`]) are synchronous and I/O-free: they operate on plain input
//! records and local accumulators only, so they are safe to call from any
//! number of concurrent request handlers. Malformed input data never panics
//! and never produces an error value — every soft failure is an `Option`,
//! a `false`, or an empty collection, and the caller decides what absence
//! means.

mod app_config;
mod config;
pub mod grouping;
pub mod listing;
pub mod similarity;
pub mod unit_price;
pub mod weight;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use grouping::{
    build_groups, GroupConfig, GroupVariant, GroupingMode, PriceRange, ProductGroup,
    DEFAULT_MIN_PERSIST_VARIANTS,
};
pub use listing::ProductListing;
pub use similarity::{same_base_product, MatchConfig, DEFAULT_SIMILARITY_THRESHOLD};
pub use unit_price::{
    derive_listing_pricing, unit_price_per_kg, DerivedPricing, PriceUnit, UnitPrice,
};
pub use weight::{parse_weight, strip_weight_tokens, WeightSpec, WeightUnit};

use thiserror::Error;

/// Errors raised while loading application configuration from the
/// environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
