//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A location reported by one geolocation provider.
///
/// Any of the place names may be empty. Coordinates of exactly `(0.0, 0.0)`
/// mean the provider did not report a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    /// Name of the provider that produced this location.
    pub source: String,
}

impl Location {
    pub fn has_coordinates(&self) -> bool {
        self.lat != 0.0 || self.lon != 0.0
    }

    /// "City, Region, Country", dropping empty parts and a region that
    /// just repeats the city.
    pub fn place_line(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(3);
        if !self.city.is_empty() {
            parts.push(&self.city);
        }
        if !self.region.is_empty() && self.region != self.city {
            parts.push(&self.region);
        }
        if !self.country.is_empty() {
            parts.push(&self.country);
        }
        if parts.is_empty() {
            return "Unknown location".to_string();
        }
        parts.join(", ")
    }

    pub fn display_line(&self) -> String {
        format!(
            "\u{1F4CD} {}\n  \u{1F4D0} {}\n  \u{1F50E} via {}",
            self.place_line(),
            format_coords(self.lat, self.lon),
            self.source
        )
    }
}

/// Format coordinates as e.g. `52.5200°N, 13.4050°E`.
pub fn format_coords(lat: f64, lon: f64) -> String {
    let ns = if lat >= 0.0 { 'N' } else { 'S' };
    let ew = if lon >= 0.0 { 'E' } else { 'W' };
    format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", lat.abs(), ns, lon.abs(), ew)
}

/// Completeness score of a location, 0 (nothing known) to 7 (everything).
///
/// Only looks at which fields are filled in, so scores from different
/// providers are comparable.
pub fn quality_hint(loc: &Location) -> u8 {
    let mut score = 0;
    if !loc.city.is_empty() {
        score += 2;
    }
    if !loc.region.is_empty() {
        score += 2;
    }
    if !loc.country.is_empty() {
        score += 1;
    }
    if loc.has_coordinates() {
        score += 2;
    }
    score
}

/// Why a single provider call produced no location.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("deadline expired before the request was sent")]
    DeadlineExceeded,
    #[error("HTTP status {0}")]
    Status(u16),
    /// The provider answered but reported that it could not locate us.
    #[error("{0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    Decode(String),
}

/// The only failure `locate` reports to its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("all location providers failed or timed out")]
    Exhausted,
}
