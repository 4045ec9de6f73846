//! Weight parsing and mass conversion for free-text size strings.
//!
//! Single source of truth for the unit vocabulary and every weight regex in
//! the workspace: extraction ([`parse_weight`]) and name stripping
//! ([`strip_weight_tokens`]) share the same token list, so the two cannot
//! drift apart. Parsing never fails hard — every malformed input maps to
//! `None` and the caller skips the product for unit-price purposes.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Units accepted in product weight/size strings.
///
/// Volume units are treated as mass via a pet-food density approximation
/// (1 l ≈ 1 kg, 1 ml ≈ 1 g). Unknown unit tokens are rejected by the
/// parser, so no degraded conversion path exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    G,
    Kg,
    Lb,
    Oz,
    Ml,
    L,
}

impl WeightUnit {
    /// Grams per one unit.
    #[must_use]
    pub fn grams_factor(self) -> f64 {
        match self {
            WeightUnit::G | WeightUnit::Ml => 1.0,
            WeightUnit::Kg | WeightUnit::L => 1000.0,
            WeightUnit::Lb => 453.592,
            WeightUnit::Oz => 28.3495,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "g" => Some(Self::G),
            "kg" => Some(Self::Kg),
            "lb" => Some(Self::Lb),
            "oz" => Some(Self::Oz),
            "ml" => Some(Self::Ml),
            "l" => Some(Self::L),
            _ => None,
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            WeightUnit::G => "g",
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
            WeightUnit::Oz => "oz",
            WeightUnit::Ml => "ml",
            WeightUnit::L => "l",
        };
        write!(f, "{token}")
    }
}

/// A parsed weight: positive value plus unit.
///
/// Ephemeral — computed on demand from a string; only its derived form
/// (grams, unit price) is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightSpec {
    pub value: f64,
    pub unit: WeightUnit,
}

impl WeightSpec {
    /// Canonical mass in grams.
    #[must_use]
    pub fn grams(self) -> f64 {
        self.value * self.unit.grams_factor()
    }
}

// Longest token first inside each ambiguous pair (kg before g, ml/lb before
// l) so the alternation cannot settle for a prefix.
static MULTIPACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*x\s*(\d+(?:[.,]\d+)?)\s*(kg|g|lb|oz|ml|l)\b")
        .expect("valid multipack regex")
});

static VALUE_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(kg|g|lb|oz|ml|l)\b").expect("valid weight regex")
});

// Stripping matches a number immediately followed by a unit token, then a
// space or end of string. Looser spacing is left alone on purpose: the
// matcher compares what remains, and over-stripping erases signal.
static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+(?:[.,]\d+)?(?:kg|g|lb|oz|ml|l)(?:\s|$)").expect("valid strip regex")
});

static BARE_INT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Extracts a weight from an arbitrary string.
///
/// Precedence:
/// 1. Multipack `"<count> x <num><unit>"` → `count * num` with the trailing
///    unit (`"4 x 100g"` → 400 g). Tried first so the pack count is not
///    lost to a partial `"100g"` match.
/// 2. `"<num><unit>"` / `"<num> <unit>"`, case-insensitive, anywhere in the
///    string.
/// 3. First bare integer, unit assumed grams — a deliberately lossy last
///    resort, known to misread strings whose digits are not weights.
///
/// Comma decimals (`"1,5kg"`) parse the same as dot decimals. Returns
/// `None` when the string has no digits, the number does not parse to a
/// finite value, or the value is not positive.
#[must_use]
pub fn parse_weight(text: &str) -> Option<WeightSpec> {
    let text = normalize(text);
    if text.is_empty() {
        return None;
    }

    if let Some(spec) = MULTIPACK_RE.captures(&text).and_then(multipack_spec) {
        return Some(spec);
    }
    if let Some(spec) = VALUE_UNIT_RE.captures(&text).and_then(value_unit_spec) {
        return Some(spec);
    }

    let value = parse_num(BARE_INT_RE.find(&text)?.as_str())?;
    positive_spec(value, WeightUnit::G)
}

/// Removes weight/size tokens from a product name and collapses the
/// remaining whitespace. Case is preserved; matching is not.
#[must_use]
pub fn strip_weight_tokens(name: &str) -> String {
    let stripped = STRIP_RE.replace_all(name, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_num(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

fn positive_spec(value: f64, unit: WeightUnit) -> Option<WeightSpec> {
    (value.is_finite() && value > 0.0).then_some(WeightSpec { value, unit })
}

fn multipack_spec(caps: regex::Captures<'_>) -> Option<WeightSpec> {
    let count = parse_num(caps.get(1)?.as_str())?;
    let per_item = parse_num(caps.get(2)?.as_str())?;
    let unit = WeightUnit::from_token(caps.get(3)?.as_str())?;
    positive_spec(count * per_item, unit)
}

fn value_unit_spec(caps: regex::Captures<'_>) -> Option<WeightSpec> {
    let value = parse_num(caps.get(1)?.as_str())?;
    let unit = WeightUnit::from_token(caps.get(2)?.as_str())?;
    positive_spec(value, unit)
}
