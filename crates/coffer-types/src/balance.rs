//! Multi-asset, exact-arithmetic balance values.
//!
//! A [`Balance`] maps asset codes (e.g. `USD`) to exact rational magnitudes.
//! An absent asset is equivalent to a zero magnitude, and every mutating
//! operation maintains the invariant that zero entries are never stored, so
//! structural equality is semantic equality.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque short string identifying a currency or commodity, e.g. `"USD"`.
pub type AssetType = String;

/// The fewest fractional digits ever emitted when rendering a magnitude.
const MIN_DISPLAY_SCALE: usize = 3;

/// A mapping from asset type to an exact rational magnitude.
///
/// Balances form an abelian group per asset under [`Balance::add`] /
/// [`Balance::negate`]. Magnitudes are kept as reduced fractions; arithmetic
/// never rounds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Balance(BTreeMap<AssetType, BigRational>);

impl Balance {
    /// An empty (all-zero) balance.
    pub fn new() -> Self {
        Self::default()
    }

    /// A balance holding a single asset at the given magnitude.
    pub fn single(asset: impl Into<AssetType>, magnitude: BigRational) -> Self {
        let mut retval = Self::new();
        retval.set(asset, magnitude);
        retval
    }

    /// Sets the magnitude for one asset, dropping the entry when it is zero.
    pub fn set(&mut self, asset: impl Into<AssetType>, magnitude: BigRational) {
        let asset = asset.into();
        if magnitude.is_zero() {
            self.0.remove(&asset);
        } else {
            self.0.insert(asset, magnitude);
        }
    }

    /// The magnitude recorded for `asset`, zero when absent.
    pub fn magnitude(&self, asset: &str) -> BigRational {
        self.0.get(asset).cloned().unwrap_or_else(BigRational::zero)
    }

    /// True when every asset has a zero magnitude.
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates entries in lexicographic asset order.
    pub fn iter(&self) -> impl Iterator<Item = (&AssetType, &BigRational)> {
        self.0.iter()
    }

    /// The asset types present, in lexicographic order.
    pub fn assets(&self) -> impl Iterator<Item = &AssetType> {
        self.0.keys()
    }

    /// Per-asset sum of two balances.
    pub fn add(&self, other: &Balance) -> Balance {
        let mut retval = self.clone();
        for (asset, magnitude) in &other.0 {
            let updated = retval.magnitude(asset) + magnitude;
            retval.set(asset.clone(), updated);
        }
        retval
    }

    /// Per-asset difference, `self - other`.
    pub fn sub(&self, other: &Balance) -> Balance {
        self.add(&other.negate())
    }

    /// Per-asset additive inverse.
    pub fn negate(&self) -> Balance {
        Balance(
            self.0
                .iter()
                .map(|(asset, magnitude)| (asset.clone(), -magnitude))
                .collect(),
        )
    }

    /// Parses a balance literal: one or more `<ASSET> <decimal>` pairs,
    /// whitespace separated and order independent. Decimals are exact; they
    /// are never routed through binary floating point. Empty input parses as
    /// the zero balance.
    pub fn parse(input: &str) -> Result<Balance, BalanceParseError> {
        let mut retval = Balance::new();
        let mut pending: Option<(AssetType, usize, usize)> = None;

        for (start, token) in tokenize(input) {
            let end = start + token.len();
            match pending.take() {
                None => {
                    if !is_asset_token(token) {
                        return Err(BalanceParseError::ExpectedAsset {
                            token: token.to_string(),
                            start,
                            end,
                        });
                    }
                    pending = Some((token.to_string(), start, end));
                }
                Some((asset, _, _)) => {
                    let magnitude = parse_decimal(token).ok_or_else(|| {
                        BalanceParseError::ExpectedAmount {
                            token: token.to_string(),
                            start,
                            end,
                        }
                    })?;
                    let updated = retval.magnitude(&asset) + magnitude;
                    retval.set(asset, updated);
                }
            }
        }

        if let Some((asset, start, end)) = pending {
            return Err(BalanceParseError::MissingAmount {
                token: asset,
                start,
                end,
            });
        }

        Ok(retval)
    }

    /// The canonical encoding hashed into object identities: reduced
    /// `<asset> <numerator>/<denominator>` pairs in asset order.
    ///
    /// This form is fixed independently of the display rendering so that two
    /// implementations disagreeing about decimal padding still derive the
    /// same IDs.
    pub fn canonical_encoding(&self) -> String {
        let mut pairs = Vec::with_capacity(self.0.len());
        for (asset, magnitude) in &self.0 {
            pairs.push(format!("{} {}/{}", asset, magnitude.numer(), magnitude.denom()));
        }
        pairs.join(" ")
    }
}

impl fmt::Display for Balance {
    /// Renders `<ASSET> <decimal>` pairs in asset order. The decimal always
    /// carries at least three fractional digits and as many more as are
    /// needed to re-parse to an equal balance.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (asset, magnitude) in &self.0 {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{} {}", asset, decimal_string(magnitude))?;
        }
        Ok(())
    }
}

impl FromStr for Balance {
    type Err = BalanceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Balance::parse(s)
    }
}

impl Serialize for Balance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (asset, magnitude) in &self.0 {
            map.serialize_entry(asset, &format!("{}/{}", magnitude.numer(), magnitude.denom()))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BalanceVisitor;

        impl<'de> Visitor<'de> for BalanceVisitor {
            type Value = Balance;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from asset type to a numerator/denominator fraction")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Balance, A::Error> {
                let mut retval = Balance::new();
                while let Some((asset, raw)) = access.next_entry::<AssetType, String>()? {
                    let magnitude = parse_fraction(&raw).ok_or_else(|| {
                        serde::de::Error::custom(format!(
                            "{:?} is not a valid fraction for asset {}",
                            raw, asset
                        ))
                    })?;
                    let updated = retval.magnitude(&asset) + magnitude;
                    retval.set(asset, updated);
                }
                Ok(retval)
            }
        }

        deserializer.deserialize_map(BalanceVisitor)
    }
}

/// Failure to interpret a balance literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceParseError {
    /// A token appeared where an asset code was expected.
    #[error("expected an asset code at bytes {start}..{end}, found {token:?}")]
    ExpectedAsset {
        /// The offending token.
        token: String,
        /// Byte offset where the token begins.
        start: usize,
        /// Byte offset just past the token.
        end: usize,
    },
    /// A token appeared where a decimal amount was expected.
    #[error("expected a decimal amount at bytes {start}..{end}, found {token:?}")]
    ExpectedAmount {
        /// The offending token.
        token: String,
        /// Byte offset where the token begins.
        start: usize,
        /// Byte offset just past the token.
        end: usize,
    },
    /// The literal ended with an asset code that has no amount.
    #[error("asset {token:?} at bytes {start}..{end} has no amount")]
    MissingAmount {
        /// The dangling asset code.
        token: String,
        /// Byte offset where the token begins.
        start: usize,
        /// Byte offset just past the token.
        end: usize,
    },
}

/// Splits on whitespace, yielding each token with its byte offset.
fn tokenize(input: &str) -> impl Iterator<Item = (usize, &str)> + '_ {
    input
        .split_whitespace()
        .map(move |token| (offset_of(input, token), token))
}

fn offset_of(input: &str, token: &str) -> usize {
    token.as_ptr() as usize - input.as_ptr() as usize
}

fn is_asset_token(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric())
}

/// Interprets an optionally signed decimal literal as an exact fraction,
/// e.g. `"12.34"` becomes `1234/100` before reduction.
fn parse_decimal(token: &str) -> Option<BigRational> {
    let (negative, rest) = match token.as_bytes().first()? {
        b'-' => (true, &token[1..]),
        b'+' => (false, &token[1..]),
        _ => (false, token),
    };

    let (int_part, frac_part) = match rest.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part),
        None => (rest, ""),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if rest.contains('.') && (frac_part.is_empty() || !frac_part.bytes().all(|b| b.is_ascii_digit()))
    {
        return None;
    }

    let mut digits = String::with_capacity(int_part.len() + frac_part.len());
    digits.push_str(int_part);
    digits.push_str(frac_part);

    let mut numerator = BigInt::parse_bytes(digits.as_bytes(), 10)?;
    if negative {
        numerator = -numerator;
    }
    let denominator = num_traits::pow(BigInt::from(10), frac_part.len());
    Some(BigRational::new(numerator, denominator))
}

/// Parses the canonical `numerator/denominator` form used on disk.
fn parse_fraction(raw: &str) -> Option<BigRational> {
    let (numer, denom) = match raw.split_once('/') {
        Some((numer, denom)) => (numer, denom),
        None => (raw, "1"),
    };
    let numer = BigInt::parse_bytes(numer.as_bytes(), 10)?;
    let denom = BigInt::parse_bytes(denom.as_bytes(), 10)?;
    if denom.is_zero() {
        return None;
    }
    Some(BigRational::new(numer, denom))
}

/// Renders a magnitude as a decimal with at least [`MIN_DISPLAY_SCALE`]
/// fractional digits, extending the scale as far as needed for the expansion
/// to terminate. Magnitudes whose reduced denominator has a prime factor
/// other than 2 or 5 cannot terminate and are rounded at the minimum scale,
/// ties away from zero.
fn decimal_string(value: &BigRational) -> String {
    let negative = value.is_negative();
    let numerator = value.numer().abs();
    let denominator = value.denom().clone();

    let mut residue = denominator.clone();
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut twos = 0usize;
    let mut fives = 0usize;
    while (&residue % &two).is_zero() {
        residue /= &two;
        twos += 1;
    }
    while (&residue % &five).is_zero() {
        residue /= &five;
        fives += 1;
    }

    let scale = if residue.is_one() {
        MIN_DISPLAY_SCALE.max(twos.max(fives))
    } else {
        MIN_DISPLAY_SCALE
    };

    let shift = num_traits::pow(BigInt::from(10), scale);
    let product = numerator * &shift;
    let quotient = &product / &denominator;
    let remainder = &product % &denominator;
    let scaled = if &remainder * 2 >= denominator {
        quotient + 1
    } else {
        quotient
    };

    let mut digits = scaled.to_string();
    if digits.len() <= scale {
        digits.insert_str(0, &"0".repeat(scale + 1 - digits.len()));
    }
    digits.insert(digits.len() - scale, '.');
    if negative && !scaled.is_zero() {
        digits.insert(0, '-');
    }
    digits
}
