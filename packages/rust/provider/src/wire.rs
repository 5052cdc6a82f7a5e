//! JSON shapes exchanged with the listing sidecar.
//!
//! The sidecar scrapes rendered map pages, so numeric fields arrive in
//! whatever form the page showed them: `4.2`, `"4.2"`, `"(31)"`, `"1,204"`.

use mapsweep_shared::{BusinessRecord, ListingHandle, MapSweepError, Result, Review, clean_field};
use serde::Deserialize;
use serde_json::Value;

/// `GET /search` response body.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<WireListing>,
}

#[derive(Debug, Deserialize)]
pub struct WireListing {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl From<WireListing> for ListingHandle {
    fn from(listing: WireListing) -> Self {
        Self {
            id: listing.id,
            name: clean_field(listing.name),
            address: clean_field(listing.address),
        }
    }
}

/// `GET /places/{id}` response body.
#[derive(Debug, Deserialize)]
pub struct PlaceDetail {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub review_count: Option<Value>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub reviews: Vec<WireReview>,
}

#[derive(Debug, Deserialize)]
pub struct WireReview {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
}

impl PlaceDetail {
    /// Convert into a record. `listing_id` only feeds error messages.
    pub fn into_record(self, listing_id: &str) -> Result<BusinessRecord> {
        let name = clean_field(self.name)
            .ok_or_else(|| MapSweepError::parse(format!("{listing_id}: detail has no name")))?;
        let address = clean_field(self.address).ok_or_else(|| {
            MapSweepError::parse(format!("{listing_id}: detail for '{name}' has no address"))
        })?;

        let mut record = BusinessRecord::new(name, address);
        record.rating = self
            .rating
            .as_ref()
            .and_then(parse_number)
            .map(|r| r as f32);
        record.review_count = self
            .review_count
            .as_ref()
            .and_then(parse_number)
            .filter(|n| *n >= 0.0)
            .map(|n| n as u32);
        record.services = self
            .services
            .into_iter()
            .filter_map(|s| clean_field(Some(s)))
            .collect();
        record.phone = clean_field(self.phone);
        record.website = clean_field(self.website);
        record.reviews = self
            .reviews
            .into_iter()
            .filter_map(|review| {
                let text = clean_field(review.text)?;
                Some(Review {
                    author: clean_field(review.author),
                    text,
                    rating: review.rating.as_ref().and_then(parse_number).map(|r| r as f32),
                })
            })
            .collect();
        record.dedup_reviews();

        Ok(record)
    }
}

/// Read a number from a JSON number or from a display string.
///
/// Display strings contribute only their first numeric token, so `"4.2/5"`
/// is 4.2 and `"4.5 (1,204)"` is 4.5. Placeholders and strings without
/// digits give `None`.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => leading_number(s),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// First run of digits with at most one decimal part.
///
/// A comma followed by exactly three digits groups thousands; any other
/// comma or dot between digits is the decimal mark.
fn leading_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let text = &text[start..];

    let mut token = String::new();
    let mut has_fraction = false;
    for (i, c) in text.char_indices() {
        match c {
            '0'..='9' => token.push(c),
            ',' | '.' if !has_fraction => {
                let run = text[i + 1..]
                    .chars()
                    .take_while(char::is_ascii_digit)
                    .count();
                if run == 0 {
                    break;
                }
                if c == ',' && run == 3 {
                    continue;
                }
                token.push('.');
                has_fraction = true;
            }
            _ => break,
        }
    }
    token.parse().ok()
}
