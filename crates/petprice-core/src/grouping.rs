//! Greedy clustering of listings into base-product groups with ranked
//! variants and a best-value pick.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::listing::ProductListing;
use crate::similarity::{same_base_product, MatchConfig};
use crate::unit_price::{derive_listing_pricing, UnitPrice};
use crate::weight::{strip_weight_tokens, WeightSpec};

/// Minimum variant count for a group to be worth persisting.
pub const DEFAULT_MIN_PERSIST_VARIANTS: usize = 2;

/// How strict the engine is about emitting small groups.
///
/// Both modes run the identical code path; the mode is a single parameter,
/// not a second implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingMode {
    /// Request path: a single-variant group is still useful comparison
    /// output.
    LiveQuery,
    /// Batch path: only groups with at least
    /// [`GroupConfig::min_persist_variants`] variants are persisted.
    BatchPersist,
}

/// Tunables for [`build_groups`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupConfig {
    pub match_config: MatchConfig,
    /// Minimum variants for a group to survive
    /// [`GroupingMode::BatchPersist`].
    pub min_persist_variants: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            match_config: MatchConfig::default(),
            min_persist_variants: DEFAULT_MIN_PERSIST_VARIANTS,
        }
    }
}

/// One concrete purchasable listing inside a [`ProductGroup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupVariant {
    pub product_id: i64,
    /// Raw weight text the size was parsed from.
    pub size: String,
    /// Parsed weight, absent when the size text was unusable.
    pub weight: Option<WeightSpec>,
    pub price: f64,
    /// Absent when price or weight could not be normalized; such variants
    /// sort after every priced one.
    pub unit_price: Option<UnitPrice>,
    /// Exactly one variant per group carries `true`.
    pub best_value: bool,
}

/// Raw and normalized price spans across a group's variants.
///
/// `min`/`max` cover every variant; `unit_min`/`unit_max` cover only the
/// variants with a computable unit price. `unit_min <= unit_max` always.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
    pub unit_min: f64,
    pub unit_max: f64,
}

/// A base product with its size variants, ranked by unit price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductGroup {
    /// Weight-stripped name of the cluster seed.
    pub base_product_name: String,
    pub brand: String,
    pub category: Option<String>,
    pub pet_type: Option<String>,
    pub variant_count: usize,
    pub price_range: PriceRange,
    /// Product id of the variant with the minimum valid unit price.
    pub best_value_product_id: i64,
    pub variants: Vec<GroupVariant>,
}

/// Partitions listings into base-product groups.
///
/// Greedy single-pass clustering with O(n²) pairwise comparisons: each
/// unprocessed listing seeds a cluster and absorbs every later unprocessed
/// listing the matcher accepts. Which listing seeds a cluster follows input
/// order and is not otherwise guaranteed; callers may rely only on the
/// sorted variant order inside each group.
///
/// A cluster is emitted only when at least one member has a computable unit
/// price; [`GroupingMode::BatchPersist`] additionally drops groups below
/// the configured variant minimum. Empty input yields empty output; no
/// input data can make this panic.
#[must_use]
pub fn build_groups(
    products: &[ProductListing],
    mode: GroupingMode,
    config: &GroupConfig,
) -> Vec<ProductGroup> {
    let mut processed: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    for (i, seed) in products.iter().enumerate() {
        if processed.contains(&i) {
            continue;
        }
        processed.insert(i);

        let mut members = vec![seed];
        for (j, candidate) in products.iter().enumerate().skip(i + 1) {
            if processed.contains(&j) {
                continue;
            }
            if same_base_product(seed, candidate, &config.match_config) {
                processed.insert(j);
                members.push(candidate);
            }
        }

        if let Some(group) = assemble_group(seed, &members, mode, config) {
            groups.push(group);
        }
    }

    groups
}

fn assemble_group(
    seed: &ProductListing,
    members: &[&ProductListing],
    mode: GroupingMode,
    config: &GroupConfig,
) -> Option<ProductGroup> {
    let mut variants: Vec<GroupVariant> = members
        .iter()
        .map(|p| {
            let derived = derive_listing_pricing(p);
            GroupVariant {
                product_id: p.id,
                size: p.weight_text().to_owned(),
                weight: derived.map(|d| d.weight),
                price: p.price,
                unit_price: derived.map(|d| d.unit_price),
                best_value: false,
            }
        })
        .collect();

    if !variants.iter().any(|v| v.unit_price.is_some()) {
        return None;
    }
    if mode == GroupingMode::BatchPersist && variants.len() < config.min_persist_variants {
        return None;
    }

    // Ascending unit price, unpriced variants last. The sort is stable, so
    // equal unit prices keep input order and reruns are deterministic.
    variants.sort_by(|a, b| match (a.unit_price, b.unit_price) {
        (Some(x), Some(y)) => x.value.partial_cmp(&y.value).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    variants[0].best_value = true;
    let best_value_product_id = variants[0].product_id;

    let min = variants.iter().map(|v| v.price).fold(f64::INFINITY, f64::min);
    let max = variants
        .iter()
        .map(|v| v.price)
        .fold(f64::NEG_INFINITY, f64::max);
    let unit_min = variants
        .iter()
        .filter_map(|v| v.unit_price.map(|u| u.value))
        .fold(f64::INFINITY, f64::min);
    let unit_max = variants
        .iter()
        .filter_map(|v| v.unit_price.map(|u| u.value))
        .fold(f64::NEG_INFINITY, f64::max);

    Some(ProductGroup {
        base_product_name: strip_weight_tokens(&seed.name),
        brand: seed.brand.clone(),
        category: seed.category.clone(),
        pet_type: seed.pet_type.clone(),
        variant_count: variants.len(),
        price_range: PriceRange {
            min,
            max,
            unit_min,
            unit_max,
        },
        best_value_product_id,
        variants,
    })
}
