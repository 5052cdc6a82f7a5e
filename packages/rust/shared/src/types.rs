//! Core domain types for MapSweep: regions, listings, and business records.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::{MapSweepError, Result};

/// Placeholder strings providers emit for absent fields.
const PLACEHOLDERS: &[&str] = &["n/a", "na", "-", "none", "null"];

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for sweep run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A point on the globe, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside their valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Unit a region radius is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceUnit {
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "m")]
    Meters,
}

impl DistanceUnit {
    /// Convert a value in this unit to meters.
    pub fn to_meters(self, value: f64) -> f64 {
        match self {
            Self::Kilometers => value * 1000.0,
            Self::Meters => value,
        }
    }

    /// Short label used in query text and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Kilometers => "km",
            Self::Meters => "m",
        }
    }
}

impl std::fmt::Display for DistanceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for DistanceUnit {
    type Err = MapSweepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "km" | "kilometers" | "kilometres" => Ok(Self::Kilometers),
            "m" | "meters" | "metres" => Ok(Self::Meters),
            other => Err(MapSweepError::config(format!(
                "unknown distance unit '{other}': expected 'km' or 'm'"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// SearchRegion
// ---------------------------------------------------------------------------

/// A circular area to be searched, tagged with its recursion depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchRegion {
    pub center: LatLng,
    pub radius: f64,
    pub unit: DistanceUnit,
    pub depth: u32,
}

impl SearchRegion {
    /// The initial region of a sweep (depth 0).
    pub fn root(center: LatLng, radius: f64, unit: DistanceUnit) -> Self {
        Self {
            center,
            radius,
            unit,
            depth: 0,
        }
    }

    /// Radius converted to meters, for unit-independent comparisons.
    pub fn radius_meters(&self) -> f64 {
        self.unit.to_meters(self.radius)
    }

    /// Check the region invariants: valid center, finite positive radius.
    pub fn validate(&self) -> Result<()> {
        if !self.center.is_valid() {
            return Err(MapSweepError::config(format!(
                "invalid center ({}, {})",
                self.center.lat, self.center.lng
            )));
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(MapSweepError::config(format!(
                "radius must be a positive number, got {}",
                self.radius
            )));
        }
        Ok(())
    }
}

impl std::fmt::Display for SearchRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} @ ({:.5}, {:.5}) depth {}",
            self.radius, self.unit, self.center.lat, self.center.lng, self.depth
        )
    }
}

// ---------------------------------------------------------------------------
// Listings and records
// ---------------------------------------------------------------------------

/// An opaque reference to a candidate business returned by a search.
///
/// `name` and `address` are the optional summary fields some providers
/// return alongside the handle; when both are present the identity key can
/// be computed without a detail fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingHandle {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ListingHandle {
    /// A handle with no summary fields.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: None,
        }
    }

    /// Identity key derived from the summary, if both parts are usable.
    pub fn pre_key(&self) -> Option<IdentityKey> {
        match (&self.name, &self.address) {
            (Some(name), Some(address)) => IdentityKey::new(name, address).ok(),
            _ => None,
        }
    }
}

/// A single customer review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
}

/// Full details of one business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessRecord {
    pub name: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviews: Vec<Review>,
}

impl BusinessRecord {
    /// A record with only the identity fields set.
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            rating: None,
            review_count: None,
            services: Vec::new(),
            phone: None,
            website: None,
            reviews: Vec::new(),
        }
    }

    /// Identity key for this record. Fails if name or address is blank.
    pub fn identity_key(&self) -> Result<IdentityKey> {
        IdentityKey::new(&self.name, &self.address)
    }

    /// Drop reviews whose text repeats an earlier review, keeping order.
    pub fn dedup_reviews(&mut self) {
        let mut seen = HashSet::new();
        self.reviews
            .retain(|review| seen.insert(collapse_whitespace(&review.text)));
    }
}

// ---------------------------------------------------------------------------
// IdentityKey
// ---------------------------------------------------------------------------

/// Normalized `(name, address)` composite identifying a real-world business.
///
/// Both parts are case-folded and whitespace-collapsed, so listings surfaced
/// by overlapping regions with cosmetic differences map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Build a key from raw name and address text.
    pub fn new(name: &str, address: &str) -> Result<Self> {
        let name = normalize_part(name)
            .ok_or_else(|| MapSweepError::parse("business name is missing"))?;
        let address = normalize_part(address)
            .ok_or_else(|| MapSweepError::parse(format!("address is missing for '{name}'")))?;
        Ok(Self(format!("{name}{KEY_SEPARATOR}{address}")))
    }

    /// The normalized `(name, address)` parts.
    pub fn parts(&self) -> (&str, &str) {
        self.0
            .split_once(KEY_SEPARATOR)
            .unwrap_or((self.0.as_str(), ""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex SHA-256 of the key, used as a storage primary key.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (name, address) = self.parts();
        write!(f, "{name} | {address}")
    }
}

/// Joins the two key parts. Control characters never survive normalization.
const KEY_SEPARATOR: char = '\u{1f}';

/// Case-fold and collapse whitespace; `None` for blanks and placeholders.
fn normalize_part(raw: &str) -> Option<String> {
    let collapsed = collapse_whitespace(&raw.replace(char::is_control, " ")).to_lowercase();
    if collapsed.is_empty() || PLACEHOLDERS.contains(&collapsed.as_str()) {
        None
    } else {
        Some(collapsed)
    }
}

fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim a provider field, mapping blanks and placeholders like `N/A` to `None`.
pub fn clean_field(value: Option<String>) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() || PLACEHOLDERS.contains(&trimmed.to_lowercase().as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// PersistOutcome
// ---------------------------------------------------------------------------

/// What a result sink did with a batch of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistOutcome {
    /// Records written for the first time.
    pub inserted: usize,
    /// Records skipped because the sink already held their key.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn identity_key_normalizes_case_and_whitespace() {
        let a = IdentityKey::new("Acme  Tools", " 12 Main St,\tSpringfield ").unwrap();
        let b = IdentityKey::new("ACME TOOLS", "12 main st, springfield").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.parts(), ("acme tools", "12 main st, springfield"));
        assert_eq!(a.to_string(), "acme tools | 12 main st, springfield");
    }

    #[test]
    fn identity_key_keeps_name_and_address_apart() {
        let a = IdentityKey::new("A|B", "C").unwrap();
        let b = IdentityKey::new("A", "B|C").unwrap();
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());

        let sneaky = IdentityKey::new("A\u{1f}B", "C").unwrap();
        assert_eq!(sneaky.parts(), ("a b", "c"));
    }

    #[test]
    fn identity_key_rejects_blank_and_placeholder_parts() {
        assert!(IdentityKey::new("   ", "12 Main St").is_err());
        assert!(IdentityKey::new("Acme", "N/A").is_err());
        let err = IdentityKey::new("Acme", "").unwrap_err();
        assert!(matches!(err, MapSweepError::Parse { .. }));
    }

    #[test]
    fn identity_key_digest_is_stable_hex() {
        let key = IdentityKey::new("Acme", "1 Road").unwrap();
        let digest = key.digest();
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, IdentityKey::new("acme", "1  road").unwrap().digest());
    }

    #[test]
    fn pre_key_requires_both_summary_fields() {
        let mut handle = ListingHandle::bare("p1");
        assert!(handle.pre_key().is_none());

        handle.name = Some("Acme".into());
        assert!(handle.pre_key().is_none());

        handle.address = Some("1 Road".into());
        assert_eq!(
            handle.pre_key(),
            Some(IdentityKey::new("acme", "1 road").unwrap())
        );
    }

    #[test]
    fn dedup_reviews_keeps_first_occurrence() {
        let mut record = BusinessRecord::new("Acme", "1 Road");
        for (author, text) in [("a", "Great"), ("b", "Slow"), ("c", "Great "), ("d", "Fine")] {
            record.reviews.push(Review {
                author: Some(author.into()),
                text: text.into(),
                rating: None,
            });
        }
        record.dedup_reviews();
        let authors: Vec<_> = record
            .reviews
            .iter()
            .map(|r| r.author.as_deref().unwrap())
            .collect();
        assert_eq!(authors, ["a", "b", "d"]);
    }

    #[test]
    fn region_validation() {
        let ok = SearchRegion::root(LatLng::new(41.8781, -87.6298), 5.0, DistanceUnit::Kilometers);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.radius_meters(), 5000.0);

        let zero = SearchRegion { radius: 0.0, ..ok };
        assert!(zero.validate().is_err());

        let off_globe = SearchRegion {
            center: LatLng::new(95.0, 0.0),
            ..ok
        };
        assert!(off_globe.validate().is_err());
    }

    #[test]
    fn distance_unit_parsing() {
        assert_eq!("KM".parse::<DistanceUnit>().unwrap(), DistanceUnit::Kilometers);
        assert_eq!("m".parse::<DistanceUnit>().unwrap(), DistanceUnit::Meters);
        assert!("miles".parse::<DistanceUnit>().is_err());
    }

    #[test]
    fn clean_field_drops_placeholders() {
        assert_eq!(clean_field(Some(" N/A ".into())), None);
        assert_eq!(clean_field(Some("".into())), None);
        assert_eq!(clean_field(None), None);
        assert_eq!(
            clean_field(Some(" +1 312 555 0100 ".into())),
            Some("+1 312 555 0100".into())
        );
    }

    #[test]
    fn business_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/business.fixture.json")
            .expect("read fixture");
        let parsed: BusinessRecord =
            serde_json::from_str(&fixture).expect("deserialize fixture record");
        assert_eq!(parsed.name, "Lakeside Fabrication Works");
        assert_eq!(parsed.services.len(), 2);
        assert_eq!(parsed.reviews.len(), 2);
        assert!(parsed.identity_key().is_ok());
    }
}
