//! Same-base-product matching across differently sized listings.

use std::collections::HashSet;

use crate::listing::ProductListing;
use crate::weight::strip_weight_tokens;

/// Jaccard similarity a stripped-name pair must strictly exceed to count as
/// the same base product. A tunable business policy, not a derived value.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Tunables for [`same_base_product`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchConfig {
    pub similarity_threshold: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Decides whether two listings are size variants of one base product.
/// Symmetric in its arguments.
///
/// Policy, in order:
/// 1. Both listings need a non-blank name and brand.
/// 2. Brands must be equal by exact, case-sensitive comparison. Storage
///    lookups elsewhere are case-insensitive; this check deliberately is
///    not, so cross-source casing differences do not merge brands.
/// 3. Weight/size tokens are stripped from both names; equal stripped names
///    match outright.
/// 4. Otherwise word-level Jaccard similarity over the stripped names must
///    strictly exceed the configured threshold.
#[must_use]
pub fn same_base_product(a: &ProductListing, b: &ProductListing, config: &MatchConfig) -> bool {
    if a.name.trim().is_empty()
        || b.name.trim().is_empty()
        || a.brand.trim().is_empty()
        || b.brand.trim().is_empty()
    {
        return false;
    }
    if a.brand != b.brand {
        return false;
    }

    let stripped_a = strip_weight_tokens(&a.name);
    let stripped_b = strip_weight_tokens(&b.name);
    if stripped_a == stripped_b {
        return true;
    }

    jaccard(&stripped_a, &stripped_b) > config.similarity_threshold
}

/// Word-level Jaccard similarity over lowercase whitespace-split token
/// sets. An empty union is not similar (0.0), never a division by zero.
fn jaccard(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let set_a: HashSet<&str> = a.split_whitespace().collect();
    let set_b: HashSet<&str> = b.split_whitespace().collect();

    let union = set_a.union(&set_b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = set_a.intersection(&set_b).count();
    intersection as f64 / union as f64
}
